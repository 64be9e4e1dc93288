use crate::error::RefDataError;
use crate::tables;
use crate::uuid::{normalize, short_form_key, UuidFormat};

/// Which embedded table a match was found in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Category {
    Service,
    Characteristic,
    Descriptor,
    Member,
    ServiceClass,
    Company,
    Appearance,
}

impl Category {
    fn as_str(self) -> &'static str {
        match self {
            Category::Service => "service",
            Category::Characteristic => "characteristic",
            Category::Descriptor => "descriptor",
            Category::Member => "member",
            Category::ServiceClass => "service_class",
            Category::Company => "company",
            Category::Appearance => "appearance",
        }
    }

    /// `identify_uuid` walks categories in this order and returns the
    /// first hit, on the theory that a GATT service/characteristic/
    /// descriptor identity is more specific (and more commonly what a
    /// caller wants) than a vendor or appearance hit on the same 16-bit
    /// value.
    const PRIORITY: [Category; 7] = [
        Category::Service,
        Category::Characteristic,
        Category::Descriptor,
        Category::Member,
        Category::ServiceClass,
        Category::Company,
        Category::Appearance,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One table hit: which category, the assigned name, and which embedded
/// source table it came from (all tables in this crate derive from the
/// Bluetooth SIG assigned-numbers documents, so `source` is currently
/// always `"bluetooth-sig"`, but the field exists for when a vendor-private
/// table is added).
#[derive(Clone, Debug, PartialEq)]
pub struct UuidMatch {
    pub category: Category,
    pub name: String,
    pub source: &'static str,
}

/// Result of [`identify_uuid`]: the single best match for an identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentifiedUuid {
    pub category: Category,
    pub short_form: Option<u32>,
    pub name: String,
}

/// Result of [`translate_uuid`]: every table hit for an identifier, plus
/// its normalized form.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslatedUuid {
    pub normalized_128: String,
    pub format: UuidFormat,
    pub short_form: Option<u32>,
    pub matches: Vec<UuidMatch>,
}

fn table_for(category: Category) -> &'static once_cell::sync::Lazy<std::collections::HashMap<String, String>> {
    match category {
        Category::Service => &tables::SERVICES,
        Category::Characteristic => &tables::CHARACTERISTICS,
        Category::Descriptor => &tables::DESCRIPTORS,
        Category::Member => &tables::MEMBERS,
        Category::ServiceClass => &tables::SERVICE_CLASSES,
        Category::Company => &tables::COMPANIES,
        Category::Appearance => &tables::APPEARANCES,
    }
}

fn lookup_key(category: Category, short_form: u32) -> String {
    match category {
        Category::Company | Category::Appearance => short_form.to_string(),
        _ => short_form_key(short_form),
    }
}

/// Returns the single best (most specific) match for `uuid`, or `None` if
/// no embedded table recognizes it.
pub fn identify_uuid(uuid: &str) -> Result<Option<IdentifiedUuid>, RefDataError> {
    let parsed = normalize(uuid)?;
    let Some(short_form) = parsed.short_form else {
        return Ok(None);
    };
    for category in Category::PRIORITY {
        let key = lookup_key(category, short_form);
        if let Some(name) = table_for(category).get(&key) {
            return Ok(Some(IdentifiedUuid {
                category,
                short_form: Some(short_form),
                name: name.clone(),
            }));
        }
    }
    Ok(None)
}

/// Returns every table hit for `input`, since a 16-bit value can
/// legitimately appear in more than one category (e.g. a company ID and an
/// appearance code never collide, but service vs. service-class numbering
/// spaces are independent and a short value can coincidentally hit both).
pub fn translate_uuid(input: &str) -> Result<TranslatedUuid, RefDataError> {
    let parsed = normalize(input)?;
    let mut matches = Vec::new();
    if let Some(short_form) = parsed.short_form {
        for category in Category::PRIORITY {
            let key = lookup_key(category, short_form);
            if let Some(name) = table_for(category).get(&key) {
                matches.push(UuidMatch {
                    category,
                    name: name.clone(),
                    source: "bluetooth-sig",
                });
            }
        }
    }
    Ok(TranslatedUuid {
        normalized_128: parsed.normalized_128.to_string(),
        format: parsed.format,
        short_form: parsed.short_form,
        matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_a_known_service() {
        let identified = identify_uuid("180a").unwrap().unwrap();
        assert_eq!(identified.category, Category::Service);
        assert_eq!(identified.name, "Device Information");
    }

    #[test]
    fn translate_returns_all_matches() {
        let translated = translate_uuid("180a").unwrap();
        assert_eq!(translated.short_form, Some(0x180a));
        assert!(translated
            .matches
            .iter()
            .any(|m| m.category == Category::Service));
    }

    #[test]
    fn unknown_vendor_uuid_has_no_matches() {
        let translated = translate_uuid("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        assert!(translated.matches.is_empty());
    }

    #[test]
    fn unparsable_input_is_an_error() {
        assert!(identify_uuid("zz").is_err());
    }
}

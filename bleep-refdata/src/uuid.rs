use uuid::Uuid;

use crate::error::RefDataError;

/// Bluetooth SIG base UUID: 16- and 32-bit short forms are this UUID with
/// the short value spliced into the first 32 bits.
const BASE_UUID: &str = "00000000-0000-1000-8000-00805f9b34fb";

/// The width the caller's input was expressed in, before normalization to
/// a full 128-bit UUID.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UuidFormat {
    Bit16,
    Bit32,
    Bit128,
}

/// A parsed identifier: the input normalized to its full 128-bit form, the
/// format it was originally expressed in, and the short numeric value when
/// the input was 16- or 32-bit.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedUuid {
    pub normalized_128: Uuid,
    pub format: UuidFormat,
    pub short_form: Option<u32>,
}

/// Parses a UUID expressed as a bare 16-bit hex string (`"180a"`), a bare
/// 32-bit hex string, or a full 128-bit UUID (with or without dashes), and
/// normalizes it to the full 128-bit Bluetooth SIG form.
pub fn normalize(input: &str) -> Result<NormalizedUuid, RefDataError> {
    let trimmed = input.trim();

    if let Ok(full) = Uuid::parse_str(trimmed) {
        let short_form = extract_short_form(&full);
        return Ok(NormalizedUuid {
            normalized_128: full,
            format: UuidFormat::Bit128,
            short_form,
        });
    }

    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        let value = u32::from_str_radix(trimmed, 16)
            .map_err(|_| RefDataError::UnparsableInput(input.to_string()))?;
        return Ok(NormalizedUuid {
            normalized_128: splice_short_form(value),
            format: UuidFormat::Bit16,
            short_form: Some(value),
        });
    }

    if trimmed.len() == 8 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        let value = u32::from_str_radix(trimmed, 16)
            .map_err(|_| RefDataError::UnparsableInput(input.to_string()))?;
        return Ok(NormalizedUuid {
            normalized_128: splice_short_form(value),
            format: UuidFormat::Bit32,
            short_form: Some(value),
        });
    }

    Err(RefDataError::UnparsableInput(input.to_string()))
}

fn splice_short_form(value: u32) -> Uuid {
    let base = Uuid::parse_str(BASE_UUID).expect("base UUID constant is valid");
    let mut bytes = *base.as_bytes();
    bytes[0..4].copy_from_slice(&value.to_be_bytes());
    Uuid::from_bytes(bytes)
}

/// Returns the 16/32-bit short form encoded in a full UUID, if it follows
/// the Bluetooth SIG base UUID pattern.
fn extract_short_form(full: &Uuid) -> Option<u32> {
    let base = Uuid::parse_str(BASE_UUID).ok()?;
    let full_bytes = full.as_bytes();
    let base_bytes = base.as_bytes();
    if full_bytes[4..] == base_bytes[4..] {
        Some(u32::from_be_bytes([
            full_bytes[0],
            full_bytes[1],
            full_bytes[2],
            full_bytes[3],
        ]))
    } else {
        None
    }
}

/// Renders a short form as the zero-padded 4-hex-digit key the embedded
/// tables are indexed by (e.g. `0x180a` -> `"180a"`).
pub fn short_form_key(short_form: u32) -> String {
    format!("{:04x}", short_form & 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_16_bit_hex() {
        let parsed = normalize("180a").unwrap();
        assert_eq!(parsed.format, UuidFormat::Bit16);
        assert_eq!(parsed.short_form, Some(0x180a));
        assert_eq!(
            parsed.normalized_128.to_string(),
            "0000180a-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn normalizes_full_128_bit_back_to_short_form() {
        let parsed = normalize("0000180a-0000-1000-8000-00805f9b34fb").unwrap();
        assert_eq!(parsed.format, UuidFormat::Bit128);
        assert_eq!(parsed.short_form, Some(0x180a));
    }

    #[test]
    fn vendor_128_bit_has_no_short_form() {
        let parsed = normalize("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        assert_eq!(parsed.short_form, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(normalize("not-a-uuid").is_err());
    }
}

use std::collections::HashMap;

use once_cell::sync::Lazy;

macro_rules! embedded_table {
    ($name:ident, $path:literal) => {
        pub(crate) static $name: Lazy<HashMap<String, String>> = Lazy::new(|| {
            serde_json::from_str(include_str!($path))
                .expect("embedded reference table is valid JSON")
        });
    };
}

embedded_table!(SERVICES, "data/services.json");
embedded_table!(CHARACTERISTICS, "data/characteristics.json");
embedded_table!(DESCRIPTORS, "data/descriptors.json");
embedded_table!(MEMBERS, "data/members.json");
embedded_table!(SERVICE_CLASSES, "data/service_classes.json");
embedded_table!(COMPANIES, "data/companies.json");
embedded_table!(APPEARANCES, "data/appearances.json");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn services_table_loads_and_has_gatt_entry() {
        assert_eq!(SERVICES.get("180a").map(String::as_str), Some("Device Information"));
    }

    #[test]
    fn companies_table_is_keyed_by_decimal_id() {
        assert_eq!(COMPANIES.get("76").map(String::as_str), Some("Google"));
    }
}

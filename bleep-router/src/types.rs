use std::collections::HashSet;

use regex::Regex;
use serde_derive::{Deserialize, Serialize};

/// The kind of signal a route can match on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SignalType {
    Notification,
    Indication,
    PropertyChange,
    Read,
    Write,
    Any,
}

impl SignalType {
    fn matches(self, other: SignalType) -> bool {
        matches!(self, SignalType::Any) || self == other
    }
}

/// One observed event, already flattened into the fields routes can filter and act on. Built by
/// the IPC integration layer from a [`bleep_async::BluetoothEvent`] (or a read/write outcome),
/// enriched with whatever GATT metadata the caller already has cached so the router itself never
/// needs to call back into IPC to resolve a UUID.
#[derive(Clone, Debug)]
pub struct RouterEvent {
    pub signal_type: SignalType,
    pub mac: Option<String>,
    pub service_uuid: Option<String>,
    pub characteristic_uuid: Option<String>,
    pub path: String,
    pub property: Option<String>,
    pub value: Option<Vec<u8>>,
}

/// A filter clause. Every `Some` field must match for the filter to match; `None` fields are
/// ignored. An entirely empty filter matches everything.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Filter {
    pub signal_type: Option<SignalType>,
    #[serde(default)]
    pub macs: HashSet<String>,
    pub service_uuid: Option<String>,
    pub characteristic_uuid: Option<String>,
    #[serde(with = "optional_regex")]
    #[serde(default)]
    pub path_regex: Option<Regex>,
    pub property: Option<String>,
    #[serde(with = "optional_regex")]
    #[serde(default)]
    pub value_regex: Option<Regex>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl Filter {
    pub fn matches(&self, event: &RouterEvent) -> bool {
        if let Some(signal_type) = self.signal_type {
            if !signal_type.matches(event.signal_type) {
                return false;
            }
        }
        if !self.macs.is_empty() {
            let Some(mac) = &event.mac else { return false };
            if !self.macs.contains(mac) {
                return false;
            }
        }
        if let Some(uuid) = &self.service_uuid {
            if event.service_uuid.as_deref() != Some(uuid.as_str()) {
                return false;
            }
        }
        if let Some(uuid) = &self.characteristic_uuid {
            if event.characteristic_uuid.as_deref() != Some(uuid.as_str()) {
                return false;
            }
        }
        if let Some(regex) = &self.path_regex {
            if !regex.is_match(&event.path) {
                return false;
            }
        }
        if let Some(property) = &self.property {
            if event.property.as_deref() != Some(property.as_str()) {
                return false;
            }
        }
        if let Some(regex) = &self.value_regex {
            let Some(value) = &event.value else { return false };
            if !regex.is_match(&String::from_utf8_lossy(value)) {
                return false;
            }
        }
        if let Some(min) = self.min_length {
            if event.value.as_ref().map_or(0, Vec::len) < min {
                return false;
            }
        }
        if let Some(max) = self.max_length {
            if event.value.as_ref().map_or(0, Vec::len) > max {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SaveFormat {
    Csv,
    Json,
}

/// An action a route runs when its filter matches. `Transform` rewrites the event in place before
/// the rest of the route's actions (and any subsequent routes) see it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Action {
    Log(LogLevel),
    Save { file: String, format: SaveFormat },
    Callback(String),
    StoreInObservation,
    Forward(String),
    Transform(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One named, orderable route: a filter and the actions to run when it matches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub enabled: bool,
    pub filter: Filter,
    pub actions: Vec<Action>,
}

mod optional_regex {
    use regex::Regex;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Regex>, serializer: S) -> Result<S::Ok, S::Error> {
        value.as_ref().map(Regex::as_str).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Regex>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|pattern| Regex::new(&pattern).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> RouterEvent {
        RouterEvent {
            signal_type: SignalType::Notification,
            mac: Some("aa:bb:cc:dd:ee:ff".to_owned()),
            service_uuid: Some("0000180d-0000-1000-8000-00805f9b34fb".to_owned()),
            characteristic_uuid: Some("00002a37-0000-1000-8000-00805f9b34fb".to_owned()),
            path: "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF/service0010/char0011".to_owned(),
            property: Some("Value".to_owned()),
            value: Some(vec![0x01, 0x02]),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::default().matches(&event()));
    }

    #[test]
    fn signal_type_any_matches_everything() {
        let filter = Filter { signal_type: Some(SignalType::Any), ..Filter::default() };
        assert!(filter.matches(&event()));
    }

    #[test]
    fn mac_set_excludes_other_devices() {
        let mut macs = HashSet::new();
        macs.insert("11:22:33:44:55:66".to_owned());
        let filter = Filter { macs, ..Filter::default() };
        assert!(!filter.matches(&event()));
    }

    #[test]
    fn min_length_rejects_short_values() {
        let filter = Filter { min_length: Some(10), ..Filter::default() };
        assert!(!filter.matches(&event()));
    }

    #[test]
    fn path_regex_matches_service_segment() {
        let filter = Filter {
            path_regex: Some(Regex::new(r"service0010").unwrap()),
            ..Filter::default()
        };
        assert!(filter.matches(&event()));
    }
}

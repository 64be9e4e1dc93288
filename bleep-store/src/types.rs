use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AddressType {
    Public,
    Random,
    Unknown,
}

impl AddressType {
    pub fn as_str(self) -> &'static str {
        match self {
            AddressType::Public => "public",
            AddressType::Random => "random",
            AddressType::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "public" => AddressType::Public,
            "random" => AddressType::Random,
            _ => AddressType::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    Unknown,
    Classic,
    Le,
    Dual,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Unknown => "unknown",
            Classification::Classic => "classic",
            Classification::Le => "le",
            Classification::Dual => "dual",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "classic" => Classification::Classic,
            "le" => Classification::Le,
            "dual" => Classification::Dual,
            _ => Classification::Unknown,
        }
    }

    /// Whether `other` represents at least as strong evidence as `self`.
    /// A classification is only ever updated on stronger evidence: `dual`
    /// is strongest, then `classic`/`le` (incomparable to each other but
    /// both stronger than `unknown`), then `unknown`.
    pub fn is_weaker_than(self, other: Classification) -> bool {
        self.rank() < other.rank()
    }

    fn rank(self) -> u8 {
        match self {
            Classification::Unknown => 0,
            Classification::Classic | Classification::Le => 1,
            Classification::Dual => 2,
        }
    }
}

/// Normalizes a MAC address to lowercase-with-colons, the canonical form
/// device identity is always keyed by.
pub fn normalize_mac(mac: &str) -> String {
    mac.trim().to_ascii_lowercase()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub address: String,
    pub address_type: AddressType,
    pub name: Option<String>,
    pub appearance: Option<u32>,
    pub device_class: Option<u32>,
    pub manufacturer_id: Option<u32>,
    pub manufacturer_data: Option<Vec<u8>>,
    pub last_rssi: Option<i16>,
    pub min_rssi: Option<i16>,
    pub max_rssi: Option<i16>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub classification: Classification,
    pub notes: Option<String>,
}

/// Attributes a caller supplies to [`Store::upsert_device`]; timestamps and
/// first/last-seen bookkeeping are the store's own responsibility, not the
/// caller's. First-seen is set iff the row is new; last-seen is advanced
/// unconditionally.
#[derive(Clone, Debug, Default)]
pub struct DeviceAttrs {
    pub address_type: Option<AddressType>,
    pub name: Option<String>,
    pub appearance: Option<u32>,
    pub device_class: Option<u32>,
    pub manufacturer_id: Option<u32>,
    pub manufacturer_data: Option<Vec<u8>>,
    pub rssi: Option<i16>,
    pub classification: Option<Classification>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvertisementReport {
    pub address: String,
    pub timestamp: DateTime<Utc>,
    pub rssi: Option<i16>,
    pub raw: Vec<u8>,
    pub decoded: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GattServiceInput {
    pub uuid: String,
    pub handle_start: Option<String>,
    pub handle_end: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GattCharacteristicInput {
    pub uuid: String,
    pub handle: Option<String>,
    pub flags: Vec<String>,
    pub permission_map: Option<serde_json::Value>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum HistorySource {
    Read,
    Write,
    Notification,
    Unknown,
}

impl HistorySource {
    pub fn as_str(self) -> &'static str {
        match self {
            HistorySource::Read => "read",
            HistorySource::Write => "write",
            HistorySource::Notification => "notification",
            HistorySource::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassicServiceRecordInput {
    pub service_uuid: String,
    pub rfcomm_channel: Option<u8>,
    pub name: Option<String>,
    pub handle: Option<u32>,
    pub profile_descriptors: Vec<(String, u16)>,
    pub version: Option<u16>,
    pub description: Option<String>,
}

/// A previously persisted GATT service, as read back by [`crate::Store::get_services`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GattServiceRecord {
    pub id: i64,
    pub uuid: String,
    pub handle_start: Option<i64>,
    pub handle_end: Option<i64>,
    pub name: Option<String>,
}

/// A previously persisted GATT characteristic, as read back by
/// [`crate::Store::get_characteristics`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GattCharacteristicRecord {
    pub id: i64,
    pub service_id: i64,
    pub uuid: String,
    pub handle: Option<i64>,
    pub flags: Vec<String>,
    pub last_value: Option<Vec<u8>>,
    pub permission_map: Option<serde_json::Value>,
}

/// A previously persisted classic service record, as read back by
/// [`crate::Store::get_classic_service_records`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassicServiceRecordOutput {
    pub service_uuid: String,
    pub rfcomm_channel: Option<u8>,
    pub name: Option<String>,
    pub handle: Option<u32>,
    pub profile_descriptors: Vec<(String, u16)>,
    pub version: Option<u16>,
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum EvidenceWeight {
    Conclusive,
    Strong,
    Weak,
    Inconclusive,
}

impl EvidenceWeight {
    pub fn as_str(self) -> &'static str {
        match self {
            EvidenceWeight::Conclusive => "conclusive",
            EvidenceWeight::Strong => "strong",
            EvidenceWeight::Weak => "weak",
            EvidenceWeight::Inconclusive => "inconclusive",
        }
    }

    pub fn parse(value: &str) -> Result<Self, StoreError> {
        Ok(match value {
            "conclusive" => EvidenceWeight::Conclusive,
            "strong" => EvidenceWeight::Strong,
            "weak" => EvidenceWeight::Weak,
            "inconclusive" => EvidenceWeight::Inconclusive,
            other => {
                return Err(StoreError::MalformedRecord(format!(
                    "unknown evidence weight '{other}'"
                )))
            }
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub evidence_type: String,
    pub weight: EvidenceWeight,
    pub source: String,
    pub value: String,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Hex-encodes blob bytes for JSON export; byte values must always be
/// hex-encoded rather than emitted as raw JSON arrays.
pub fn to_json_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

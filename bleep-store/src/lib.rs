//! Versioned SQLite-backed observation store for every device, GATT and
//! classic service record, time-series history row, and classification
//! evidence row BLEEP collects. One writer connection behind a mutex;
//! schema migrations are linear, forward-only, and idempotent under retry.

mod error;
mod schema;
mod store;
mod types;

pub use error::StoreError;
pub use store::Store;
pub use types::{
    normalize_mac, to_json_hex, AddressType, AdvertisementReport, Classification,
    ClassicServiceRecordInput, ClassicServiceRecordOutput, DeviceAttrs, DeviceRecord,
    EvidenceRecord, EvidenceWeight, GattCharacteristicInput, GattCharacteristicRecord,
    GattServiceInput, GattServiceRecord, HistorySource,
};

//! Embedded Bluetooth SIG assigned-number tables (services,
//! characteristics, descriptors, member/vendor UUIDs, service classes,
//! company IDs, appearance codes) and a device-class decoder, bundled at
//! compile time so lookups never depend on network access or an installed
//! `bluetoothd` assigned-numbers database.

mod device_class;
mod error;
mod lookup;
mod tables;
mod uuid;

pub use device_class::{decode_class_of_device, DeviceClassInfo};
pub use error::RefDataError;
pub use lookup::{identify_uuid, translate_uuid, Category, IdentifiedUuid, TranslatedUuid, UuidMatch};
pub use uuid::{normalize, NormalizedUuid, UuidFormat};

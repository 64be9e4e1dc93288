use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

use bleep_store::Classification;

/// OBEX Object Push and OBEX File Transfer service class UUIDs (16-bit, assigned-numbers
/// short form), used to recognize OBEX profiles among a device's classic service records.
const OBEX_OBJECT_PUSH_UUID: &str = "00001105-0000-1000-8000-00805f9b34fb";
const OBEX_FILE_TRANSFER_UUID: &str = "00001106-0000-1000-8000-00805f9b34fb";

/// GATT characteristic flags (`org.bluez.GattCharacteristic1`'s `Flags` property) that require
/// encryption or authentication on a read.
const ENCRYPTED_READ_FLAGS: &[&str] =
    &["encrypt-read", "encrypt-authenticated-read", "secure-read"];

/// GATT characteristic flags that require encryption or authentication on a write.
const ENCRYPTED_WRITE_FLAGS: &[&str] = &[
    "encrypt-write",
    "encrypt-authenticated-write",
    "secure-write",
    "authenticated-signed-writes",
];

/// A single security-relevant observation surfaced by [`crate::analyze::analyze_device`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SecurityFinding {
    /// Nothing about the device's persisted services or characteristics requires
    /// authentication or encryption at all.
    NoPairingRequired,
    /// A characteristic accepts writes (`write` or `write-without-response`) without any
    /// encryption or authentication flag set.
    WeakGattPermissions { service_uuid: String, characteristic_uuid: String, flags: Vec<String> },
    /// A classic (SDP) profile advertised a version below the configured minimum.
    LegacyClassicProfile { service_uuid: String, advertised_version: u16, minimum_version: u16 },
    /// A characteristic notifies or indicates without any encryption or authentication flag
    /// set on its read side.
    UnencryptedNotify { service_uuid: String, characteristic_uuid: String },
    /// An OBEX profile (Object Push or File Transfer) is present with no evidence BLEEP ever
    /// saw an authorization prompt for it.
    OpenObexAuthorization { service_uuid: String },
}

/// Minimum acceptable classic profile version before [`SecurityFinding::LegacyClassicProfile`]
/// fires, in the same `(major << 8) | minor` encoding SDP profile descriptor lists use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AoiThresholds {
    pub minimum_classic_profile_version: u16,
}

impl Default for AoiThresholds {
    fn default() -> Self {
        // Bluetooth Core Spec 1.1 (0x0101): anything advertised below this predates
        // the baseline most current classic profiles assume.
        Self { minimum_classic_profile_version: 0x0101 }
    }
}

/// Cross-subsystem security snapshot for one device, serialized to `aoi/<mac>.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AoiReport {
    pub address: String,
    pub classification: Classification,
    pub findings: Vec<SecurityFinding>,
    pub generated_at: DateTime<Utc>,
}

pub(crate) fn is_obex_service(service_uuid: &str) -> bool {
    let uuid = service_uuid.to_ascii_lowercase();
    uuid == OBEX_OBJECT_PUSH_UUID || uuid == OBEX_FILE_TRANSFER_UUID
}

pub(crate) fn has_any_flag(flags: &[String], candidates: &[&str]) -> bool {
    flags.iter().any(|flag| candidates.contains(&flag.as_str()))
}

pub(crate) fn is_encrypted_read(flags: &[String]) -> bool {
    has_any_flag(flags, ENCRYPTED_READ_FLAGS)
}

pub(crate) fn is_encrypted_write(flags: &[String]) -> bool {
    has_any_flag(flags, ENCRYPTED_WRITE_FLAGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_both_obex_profiles() {
        assert!(is_obex_service("00001105-0000-1000-8000-00805f9b34fb"));
        assert!(is_obex_service("00001106-0000-1000-8000-00805F9B34FB"));
        assert!(!is_obex_service("0000180a-0000-1000-8000-00805f9b34fb"));
    }

    #[test]
    fn encrypted_flag_detection() {
        let plain = vec!["read".to_string(), "write".to_string()];
        let encrypted = vec!["read".to_string(), "encrypt-write".to_string()];
        assert!(!is_encrypted_write(&plain));
        assert!(is_encrypted_write(&encrypted));
        assert!(!is_encrypted_read(&plain));
    }
}

use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;

use bitflags::bitflags;
use uuid::Uuid;

use crate::error::CoreError;
use crate::ids::{CharacteristicId, DescriptorId, ServiceId};

/// Information about a GATT service on a Bluetooth device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceInfo {
    pub id: ServiceId,
    pub uuid: Uuid,
    pub primary: bool,
}

/// Information about a GATT characteristic on a Bluetooth device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CharacteristicInfo {
    pub id: CharacteristicId,
    pub uuid: Uuid,
    pub flags: CharacteristicFlags,
}

/// Information about a GATT descriptor on a Bluetooth device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DescriptorInfo {
    pub id: DescriptorId,
    pub uuid: Uuid,
}

bitflags! {
    /// The set of flags (a.k.a. properties) of a characteristic, defining how it can be used.
    pub struct CharacteristicFlags: u16 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const SIGNED_WRITE = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
        const RELIABLE_WRITE = 0x100;
        const WRITABLE_AUXILIARIES = 0x200;
        const ENCRYPT_READ = 0x400;
        const ENCRYPT_WRITE = 0x800;
        const ENCRYPT_AUTHENTICATED_READ = 0x1000;
        const ENCRYPT_AUTHENTICATED_WRITE = 0x2000;
        const AUTHORIZE = 0x4000;
    }
}

impl TryFrom<Vec<String>> for CharacteristicFlags {
    type Error = CoreError;

    fn try_from(value: Vec<String>) -> Result<Self, CoreError> {
        let mut flags = Self::empty();
        for flag_string in value {
            let flag = match flag_string.as_ref() {
                "broadcast" => Self::BROADCAST,
                "read" => Self::READ,
                "write-without-response" => Self::WRITE_WITHOUT_RESPONSE,
                "write" => Self::WRITE,
                "notify" => Self::NOTIFY,
                "indicate" => Self::INDICATE,
                "authenticated-signed-write" => Self::SIGNED_WRITE,
                "extended-properties" => Self::EXTENDED_PROPERTIES,
                "reliable-write" => Self::RELIABLE_WRITE,
                "writable-auxiliaries" => Self::WRITABLE_AUXILIARIES,
                "encrypt-read" => Self::ENCRYPT_READ,
                "encrypt-write" => Self::ENCRYPT_WRITE,
                "encrypt-authenticated-read" => Self::ENCRYPT_AUTHENTICATED_READ,
                "encrypt-authenticated-write" => Self::ENCRYPT_AUTHENTICATED_WRITE,
                "authorize" => Self::AUTHORIZE,
                _ => return Err(CoreError::FlagParseError(flag_string)),
            };
            flags.insert(flag);
        }
        Ok(flags)
    }
}

/// The full GATT shape discovered under one device, keyed by handle with
/// cross-links back to UUIDs — built by walking the D-Bus object tree and
/// classifying each child node by which interface it implements.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GattMapping {
    pub services: Vec<ServiceInfo>,
    pub characteristics: Vec<CharacteristicInfo>,
    pub descriptors: Vec<DescriptorInfo>,
}

impl GattMapping {
    pub fn characteristics_of(&self, service: &ServiceId) -> impl Iterator<Item = &CharacteristicInfo> {
        self.characteristics
            .iter()
            .filter(move |c| &c.id.service() == service)
    }
}

/// Characteristics whose read caused a device stall or non-recoverable
/// failure. Subsequent enumeration passes skip these unless `force=true`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LandmineMap(HashSet<CharacteristicId>);

impl LandmineMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, id: CharacteristicId) {
        self.0.insert(id);
    }

    pub fn is_landmined(&self, id: &CharacteristicId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An operation attempted against a characteristic, for permission-map bookkeeping.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum GattOperation {
    Read,
    Write,
    Notify,
}

/// An error observed from the host stack in response to a GATT operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ObservedError {
    NotAuthorized,
    NotPermitted,
    NotSupported,
    InvalidArgs,
    Timeout,
    NotConnected,
    Other,
}

impl ObservedError {
    /// Classifies a D-Bus error name (e.g. `org.bluez.Error.NotPermitted`) into an [`ObservedError`].
    pub fn from_dbus_error_name(name: &str) -> Self {
        match name.rsplit('.').next().unwrap_or(name) {
            "NotAuthorized" => Self::NotAuthorized,
            "NotPermitted" => Self::NotPermitted,
            "NotSupported" => Self::NotSupported,
            "InvalidArguments" | "InvalidArgs" => Self::InvalidArgs,
            "NotConnected" => Self::NotConnected,
            "Failed" if name.contains("Timeout") => Self::Timeout,
            "NoReply" => Self::Timeout,
            _ => Self::Other,
        }
    }
}

/// Per characteristic, the mapping from requested operation to observed error, supporting
/// downstream permission analysis.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PermissionMap(HashMap<(CharacteristicId, GattOperation), ObservedError>);

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: CharacteristicId, operation: GattOperation, error: ObservedError) {
        self.0.insert((id, operation), error);
    }

    pub fn get(&self, id: &CharacteristicId, operation: GattOperation) -> Option<ObservedError> {
        self.0.get(&(id.clone(), operation)).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A payload generator used by brute-force writes, parsed from the grammar described in the
/// enumeration engine's write path: byte ranges, and a handful of named patterns.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PayloadSpec {
    /// Every single byte value in `[low, high]`, inclusive, one payload per value.
    Range(u8, u8),
    /// The printable ASCII range, one payload per character.
    Ascii,
    /// A length-prefixed incrementing counter: `[0x01, 0x00]`, `[0x02, 0x01]`, ... up to `count`.
    Inc(usize),
    /// Alternating `0x55`/`0xAA` of the given length.
    Alt(usize),
    /// `len` copies of `byte`.
    Repeat(u8, usize),
    /// A single fixed payload decoded from a hex string.
    Hex(Vec<u8>),
}

impl PayloadSpec {
    /// Parses the grammar: `0x00-0xFF`, `ascii`, `inc:<count>`, `alt:<len>`, `repeat:<byte>:<len>`,
    /// `hex:<string>`.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        if let Some((low, high)) = input.split_once('-') {
            let low = parse_byte(low)?;
            let high = parse_byte(high)?;
            return Ok(Self::Range(low, high));
        }
        let mut parts = input.splitn(3, ':');
        match parts.next() {
            Some("ascii") => Ok(Self::Ascii),
            Some("inc") => {
                let count = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| CoreError::InvalidPayloadSpec(input.to_owned()))?;
                Ok(Self::Inc(count))
            }
            Some("alt") => {
                let len = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| CoreError::InvalidPayloadSpec(input.to_owned()))?;
                Ok(Self::Alt(len))
            }
            Some("repeat") => {
                let byte = parts
                    .next()
                    .ok_or_else(|| CoreError::InvalidPayloadSpec(input.to_owned()))
                    .and_then(|s| parse_byte(s))?;
                let len = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| CoreError::InvalidPayloadSpec(input.to_owned()))?;
                Ok(Self::Repeat(byte, len))
            }
            Some("hex") => {
                let hex_string = parts
                    .next()
                    .ok_or_else(|| CoreError::InvalidPayloadSpec(input.to_owned()))?;
                let bytes = hex::decode(hex_string)
                    .map_err(|_| CoreError::InvalidPayloadSpec(input.to_owned()))?;
                Ok(Self::Hex(bytes))
            }
            _ => Err(CoreError::InvalidPayloadSpec(input.to_owned())),
        }
    }

    /// Expands this spec into the concrete sequence of payloads it describes.
    pub fn expand(&self) -> Vec<Vec<u8>> {
        match self {
            Self::Range(low, high) => (*low..=*high).map(|b| vec![b]).collect(),
            Self::Ascii => (0x20u8..=0x7e).map(|b| vec![b]).collect(),
            Self::Inc(count) => (0..*count)
                .map(|i| {
                    let mut payload = vec![(i + 1) as u8];
                    payload.extend((0..i).map(|j| j as u8));
                    payload
                })
                .collect(),
            Self::Alt(len) => vec![(0..*len)
                .map(|i| if i % 2 == 0 { 0x55 } else { 0xAA })
                .collect()],
            Self::Repeat(byte, len) => vec![vec![*byte; *len]],
            Self::Hex(bytes) => vec![bytes.clone()],
        }
    }
}

fn parse_byte(s: &str) -> Result<u8, CoreError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u8::from_str_radix(s, 16).map_err(|_| CoreError::InvalidPayloadSpec(s.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_byte_range() {
        let spec = PayloadSpec::parse("0x00-0x02").unwrap();
        assert_eq!(spec.expand(), vec![vec![0x00], vec![0x01], vec![0x02]]);
    }

    #[test]
    fn parses_repeat() {
        let spec = PayloadSpec::parse("repeat:0xAA:3").unwrap();
        assert_eq!(spec.expand(), vec![vec![0xAA, 0xAA, 0xAA]]);
    }

    #[test]
    fn parses_alt() {
        let spec = PayloadSpec::parse("alt:4").unwrap();
        assert_eq!(spec.expand(), vec![vec![0x55, 0xAA, 0x55, 0xAA]]);
    }

    #[test]
    fn parses_hex() {
        let spec = PayloadSpec::parse("hex:deadbeef").unwrap();
        assert_eq!(spec.expand(), vec![vec![0xde, 0xad, 0xbe, 0xef]]);
    }

    #[test]
    fn rejects_unknown_pattern() {
        assert!(PayloadSpec::parse("bogus:1").is_err());
    }

    #[test]
    fn landmine_map_tracks_membership() {
        let mut landmines = LandmineMap::new();
        let id = CharacteristicId::new("/org/bluez/hci0/dev_11_22_33_44_55_66/service0001/char0002");
        assert!(!landmines.is_landmined(&id));
        landmines.mark(id.clone());
        assert!(landmines.is_landmined(&id));
    }

    #[test]
    fn classifies_dbus_error_names() {
        assert_eq!(
            ObservedError::from_dbus_error_name("org.bluez.Error.NotPermitted"),
            ObservedError::NotPermitted
        );
        assert_eq!(
            ObservedError::from_dbus_error_name("org.bluez.Error.NotAuthorized"),
            ObservedError::NotAuthorized
        );
    }
}

use uuid::Uuid;

/// Splices a 16- or 32-bit short UUID into the Bluetooth SIG base UUID
/// (`0000xxxx-0000-1000-8000-00805f9b34fb`), the same transform BlueZ
/// itself performs before putting a UUID on the wire.
pub fn uuid_from_u32(short: u32) -> Uuid {
    let base = Uuid::parse_str("00000000-0000-1000-8000-00805f9b34fb").unwrap();
    let mut bytes = *base.as_bytes();
    bytes[0..4].copy_from_slice(&short.to_be_bytes());
    Uuid::from_bytes(bytes)
}

pub fn uuid_from_u16(short: u16) -> Uuid {
    uuid_from_u32(short as u32)
}

/// Convenience trait for converting a UUID back to its short form when it
/// follows the Bluetooth SIG base UUID pattern.
pub trait BleUuid {
    fn as_u32(&self) -> Option<u32>;
    fn as_u16(&self) -> Option<u16>;
}

impl BleUuid for Uuid {
    fn as_u32(&self) -> Option<u32> {
        let base = Uuid::parse_str("00000000-0000-1000-8000-00805f9b34fb").unwrap();
        let bytes = self.as_bytes();
        let base_bytes = base.as_bytes();
        if bytes[4..] == base_bytes[4..] {
            Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        } else {
            None
        }
    }

    fn as_u16(&self) -> Option<u16> {
        self.as_u32().and_then(|v| u16::try_from(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_16_bit() {
        let uuid = uuid_from_u16(0x180a);
        assert_eq!(uuid.as_u16(), Some(0x180a));
    }

    #[test]
    fn vendor_uuid_has_no_short_form() {
        let uuid = Uuid::parse_str("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        assert_eq!(uuid.as_u32(), None);
    }
}

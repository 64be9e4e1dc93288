/// A decoded Bluetooth Class of Device field (the 24-bit value BlueZ
/// reports as `Class` on `org.bluez.Device1`), per the Bluetooth
/// Assigned Numbers "Baseband" document's bit layout: bits 0-1 are the
/// format type, bits 2-7 the minor device class, bits 8-12 the major
/// device class, bits 13-23 the major service class bitmask.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceClassInfo {
    pub major_service_classes: Vec<&'static str>,
    pub major_device_class: &'static str,
    pub minor_device_class: &'static str,
}

const MAJOR_SERVICE_BITS: [(u32, &str); 9] = [
    (1 << 13, "Limited Discoverable Mode"),
    (1 << 16, "Positioning"),
    (1 << 17, "Networking"),
    (1 << 18, "Rendering"),
    (1 << 19, "Capturing"),
    (1 << 20, "Object Transfer"),
    (1 << 21, "Audio"),
    (1 << 22, "Telephony"),
    (1 << 23, "Information"),
];

fn major_device_class(bits: u32) -> &'static str {
    match bits {
        0x00 => "Miscellaneous",
        0x01 => "Computer",
        0x02 => "Phone",
        0x03 => "LAN/Network Access Point",
        0x04 => "Audio/Video",
        0x05 => "Peripheral",
        0x06 => "Imaging",
        0x07 => "Wearable",
        0x08 => "Toy",
        0x09 => "Health",
        0x1f => "Uncategorized",
        _ => "Reserved",
    }
}

fn minor_device_class(major: u32, bits: u32) -> &'static str {
    match (major, bits) {
        (0x01, 0x01) => "Desktop workstation",
        (0x01, 0x02) => "Server-class computer",
        (0x01, 0x03) => "Laptop",
        (0x01, 0x04) => "Handheld PC/PDA",
        (0x01, 0x05) => "Palm-size PC/PDA",
        (0x01, 0x06) => "Wearable computer",
        (0x02, 0x01) => "Cellular",
        (0x02, 0x02) => "Cordless",
        (0x02, 0x03) => "Smartphone",
        (0x02, 0x04) => "Wired modem or voice gateway",
        (0x02, 0x05) => "Common ISDN access",
        (0x04, 0x01) => "Wearable headset device",
        (0x04, 0x02) => "Hands-free device",
        (0x04, 0x04) => "Microphone",
        (0x04, 0x05) => "Loudspeaker",
        (0x04, 0x06) => "Headphones",
        (0x04, 0x07) => "Portable audio",
        (0x04, 0x08) => "Car audio",
        (0x04, 0x09) => "Set-top box",
        (0x04, 0x0a) => "HiFi audio device",
        (0x04, 0x0b) => "VCR",
        (0x04, 0x0c) => "Video camera",
        (0x04, 0x0d) => "Camcorder",
        (0x04, 0x0e) => "Video monitor",
        (0x05, 0x01) => "Joystick",
        (0x05, 0x02) => "Gamepad",
        (0x05, 0x03) => "Remote control",
        (0x05, 0x04) => "Sensing device",
        (0x05, 0x05) => "Digitizer tablet",
        (0x05, 0x06) => "Card reader",
        (0x05, 0x07) => "Digital pen",
        (0x05, 0x08) => "Handheld scanner",
        (0x07, 0x01) => "Wristwatch",
        (0x07, 0x02) => "Pager",
        (0x07, 0x03) => "Jacket",
        (0x07, 0x04) => "Helmet",
        (0x07, 0x05) => "Glasses",
        _ => "Uncategorized",
    }
}

/// Decodes a 24-bit Class of Device field as reported by BlueZ's
/// `Device1.Class` property.
pub fn decode_class_of_device(class: u32) -> DeviceClassInfo {
    let major_device_bits = (class >> 8) & 0x1f;
    let minor_device_bits = (class >> 2) & 0x3f;
    let major_service_classes = MAJOR_SERVICE_BITS
        .iter()
        .filter(|(mask, _)| class & mask != 0)
        .map(|(_, name)| *name)
        .collect();

    DeviceClassInfo {
        major_service_classes,
        major_device_class: major_device_class(major_device_bits),
        minor_device_class: minor_device_class(major_device_bits, minor_device_bits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_smartphone() {
        // Phone (major=0x02), Smartphone (minor=0x03), Networking + Telephony services.
        let class = (0x02 << 8) | (0x03 << 2) | (1 << 17) | (1 << 22);
        let decoded = decode_class_of_device(class);
        assert_eq!(decoded.major_device_class, "Phone");
        assert_eq!(decoded.minor_device_class, "Smartphone");
        assert!(decoded.major_service_classes.contains(&"Networking"));
        assert!(decoded.major_service_classes.contains(&"Telephony"));
    }

    #[test]
    fn unknown_minor_class_is_uncategorized() {
        let class = 0x09 << 8;
        let decoded = decode_class_of_device(class);
        assert_eq!(decoded.major_device_class, "Health");
        assert_eq!(decoded.minor_device_class, "Uncategorized");
    }
}

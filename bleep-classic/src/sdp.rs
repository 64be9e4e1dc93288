use std::collections::HashMap;
use std::time::Duration;

use bleep_async::{uuid_from_u16, uuid_from_u32, DeviceId, IpcPool};
use bleep_generated::OrgBluezDevice1;
use dbus::nonblock::Proxy;
use uuid::Uuid;

use crate::error::ClassicError;
use crate::pinger::{check_reachable, Pinger, DEFAULT_PING_ATTEMPTS, DEFAULT_PING_BUDGET};

/// One SDP service record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SdpRecord {
    pub uuid: Uuid,
    pub rfcomm_channel: Option<u8>,
    pub name: Option<String>,
    pub handle: u32,
    /// (profile UUID, version) pairs from the record's profile descriptor list.
    pub profile_descriptors: Vec<(Uuid, u16)>,
    pub service_version: Option<u16>,
    pub description: Option<String>,
}

/// Full SDP discovery via the device's native `GetServiceRecords` D-Bus method. Requires an
/// active Bluetooth connection to the device.
pub async fn discover_full(pool: &IpcPool, device: &DeviceId) -> Result<Vec<SdpRecord>, ClassicError> {
    let proxy = Proxy::new("org.bluez", device_path(device), Duration::from_secs(30), pool.connection().clone());
    let raw_records = proxy.get_service_records().await?;
    Ok(raw_records
        .iter()
        .filter_map(|bytes| parse_der_record(bytes).ok())
        .collect())
}

/// Connectionless SDP: ping the device first (it doesn't require a full GATT/RFCOMM connection
/// to succeed), then run discovery without connecting.
pub async fn discover_connectionless(
    pinger: &dyn Pinger,
    mac: &str,
) -> Result<Vec<SdpRecord>, ClassicError> {
    check_reachable(pinger, mac, DEFAULT_PING_ATTEMPTS, DEFAULT_PING_BUDGET).await?;
    // The native D-Bus interface doesn't expose connectionless SDP; fall back to parsing the
    // textual output of `sdptool browse`, same as the full-SDP fallback path.
    discover_via_external_tool(mac).await
}

/// Fallback path: parses the textual output of `sdptool browse <mac>` when native SDP produces
/// nothing (no connection available, or the adapter doesn't expose the property).
pub async fn discover_via_external_tool(mac: &str) -> Result<Vec<SdpRecord>, ClassicError> {
    let output = tokio::process::Command::new("sdptool")
        .args(["browse", mac])
        .output()
        .await?;
    let text = String::from_utf8_lossy(&output.stdout);
    parse_sdptool_output(&text)
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum SdpToolSection {
    None,
    ServiceClassIdList,
    ProfileDescriptorList,
}

fn parse_sdptool_output(text: &str) -> Result<Vec<SdpRecord>, ClassicError> {
    let mut records = Vec::new();
    let mut current: Option<SdpRecord> = None;
    let mut section = SdpToolSection::None;
    for line in text.lines() {
        let line = line.trim();
        if let Some(handle_str) = line.strip_prefix("Service RecHandle: 0x") {
            if let Some(record) = current.take() {
                records.push(record);
            }
            let handle = u32::from_str_radix(handle_str.trim(), 16).unwrap_or(0);
            current = Some(SdpRecord {
                uuid: Uuid::nil(),
                rfcomm_channel: None,
                name: None,
                handle,
                profile_descriptors: Vec::new(),
                service_version: None,
                description: None,
            });
            section = SdpToolSection::None;
        } else if let Some(name) = line.strip_prefix("Service Name: ") {
            if let Some(record) = current.as_mut() {
                record.name = Some(name.trim().to_owned());
            }
        } else if let Some(description) = line.strip_prefix("Service Description: ") {
            if let Some(record) = current.as_mut() {
                record.description = Some(description.trim().to_owned());
            }
        } else if let Some(channel) = line.strip_prefix("Channel: ") {
            if let Some(record) = current.as_mut() {
                record.rfcomm_channel = channel.trim().parse().ok();
            }
        } else if line.starts_with("Service Class ID List") {
            section = SdpToolSection::ServiceClassIdList;
        } else if line.starts_with("Profile Descriptor List") {
            section = SdpToolSection::ProfileDescriptorList;
        } else if line.starts_with("Protocol Descriptor List") || line.starts_with("Language Base Attr List") {
            section = SdpToolSection::None;
        } else if let Some(version_str) = line.strip_prefix("Version: 0x") {
            if let (Some(record), Ok(version)) =
                (current.as_mut(), u16::from_str_radix(version_str.trim(), 16))
            {
                if section == SdpToolSection::ProfileDescriptorList {
                    if let Some(last) = record.profile_descriptors.last_mut() {
                        last.1 = version;
                    }
                    record.service_version.get_or_insert(version);
                }
            }
        } else if let Some(uuid) = uuid_from_sdptool_line(line) {
            if let Some(record) = current.as_mut() {
                match section {
                    SdpToolSection::ServiceClassIdList => {
                        if record.uuid.is_nil() {
                            record.uuid = uuid;
                        }
                    }
                    SdpToolSection::ProfileDescriptorList => record.profile_descriptors.push((uuid, 0)),
                    SdpToolSection::None => {}
                }
            }
        }
    }
    if let Some(record) = current.take() {
        records.push(record);
    }
    if records.is_empty() {
        return Err(ClassicError::SdpToolOutputUnparsable);
    }
    Ok(records)
}

/// Extracts the `(0x....)` UUID shorthand `sdptool` prints after a class/profile name, e.g.
/// `"OBEX Object Push" (0x1105)`. 16-bit and 32-bit shorthands expand to the Bluetooth base UUID;
/// anything else (a line with no such suffix) yields `None`.
fn uuid_from_sdptool_line(line: &str) -> Option<Uuid> {
    let start = line.rfind("(0x")?;
    let hex = line[start + 3..].trim_end_matches(')').trim();
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        1..=4 => u16::from_str_radix(hex, 16).ok().map(uuid_from_u16),
        5..=8 => u32::from_str_radix(hex, 16).ok().map(uuid_from_u32),
        _ => None,
    }
}

const RFCOMM_PROTOCOL_UUID: u16 = 0x0003;

/// One decoded SDP data element. BlueZ's `GetServiceRecords` returns each service record as a
/// DES (data element sequence) of alternating attribute-id/value pairs; this is the generic
/// value type every attribute bottoms out in.
#[derive(Clone, Debug, PartialEq)]
enum DataElement {
    Nil,
    UInt(u64),
    Int(i64),
    Uuid(Uuid),
    Text(String),
    Bool(bool),
    Sequence(Vec<DataElement>),
    Alternative(Vec<DataElement>),
    Url(String),
}

fn fixed_element_size(size_index: u8) -> usize {
    match size_index {
        0 => 1,
        1 => 2,
        2 => 4,
        3 => 8,
        4 => 16,
        _ => 0,
    }
}

/// Decodes one data element starting at `bytes[0]`, returning it along with how many bytes it
/// (header plus payload) consumed.
fn parse_data_element(bytes: &[u8]) -> Result<(DataElement, usize), ClassicError> {
    let &header = bytes.first().ok_or(ClassicError::MalformedRecord("empty data element"))?;
    let kind = header >> 3;
    let size_index = header & 0x07;

    let (data_len, header_len) = if kind == 0 {
        (0usize, 1usize)
    } else {
        match size_index {
            0..=4 => (fixed_element_size(size_index), 1),
            5 => {
                let len = *bytes.get(1).ok_or(ClassicError::MalformedRecord("truncated element length"))?;
                (len as usize, 2)
            }
            6 => {
                let b = bytes.get(1..3).ok_or(ClassicError::MalformedRecord("truncated element length"))?;
                (u16::from_be_bytes([b[0], b[1]]) as usize, 3)
            }
            7 => {
                let b = bytes.get(1..5).ok_or(ClassicError::MalformedRecord("truncated element length"))?;
                (u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize, 5)
            }
            _ => return Err(ClassicError::MalformedRecord("invalid size descriptor")),
        }
    };

    let total = header_len + data_len;
    let payload = bytes
        .get(header_len..total)
        .ok_or(ClassicError::MalformedRecord("element payload runs past end of record"))?;

    let element = match kind {
        0 => DataElement::Nil,
        1 => DataElement::UInt(be_uint(payload)),
        2 => DataElement::Int(be_uint(payload) as i64),
        3 => DataElement::Uuid(uuid_from_element_bytes(payload)?),
        4 => DataElement::Text(String::from_utf8_lossy(payload).into_owned()),
        5 => DataElement::Bool(payload.first().copied().unwrap_or(0) != 0),
        6 => DataElement::Sequence(parse_sequence(payload)?),
        7 => DataElement::Alternative(parse_sequence(payload)?),
        8 => DataElement::Url(String::from_utf8_lossy(payload).into_owned()),
        _ => return Err(ClassicError::MalformedRecord("unknown data element type")),
    };
    Ok((element, total))
}

fn parse_sequence(bytes: &[u8]) -> Result<Vec<DataElement>, ClassicError> {
    let mut elements = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (element, consumed) = parse_data_element(&bytes[offset..])?;
        elements.push(element);
        offset += consumed;
    }
    Ok(elements)
}

fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |value, &b| (value << 8) | b as u64)
}

fn uuid_from_element_bytes(bytes: &[u8]) -> Result<Uuid, ClassicError> {
    match bytes.len() {
        2 => Ok(uuid_from_u16(u16::from_be_bytes([bytes[0], bytes[1]]))),
        4 => Ok(uuid_from_u32(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))),
        16 => Uuid::from_slice(bytes).map_err(|_| ClassicError::MalformedRecord("invalid 128-bit uuid")),
        _ => Err(ClassicError::MalformedRecord("invalid uuid length")),
    }
}

fn first_uuid_in(element: &DataElement) -> Option<Uuid> {
    match element {
        DataElement::Uuid(uuid) => Some(*uuid),
        DataElement::Sequence(items) | DataElement::Alternative(items) => items.iter().find_map(first_uuid_in),
        _ => None,
    }
}

/// `ProtocolDescriptorList` (attribute 0x0004) is a sequence of per-layer protocol sequences,
/// each starting with that layer's UUID. RFCOMM's layer carries the channel as the next element.
fn rfcomm_channel_from_protocol_list(value: &DataElement) -> Option<u8> {
    let DataElement::Sequence(protocols) = value else { return None };
    for protocol in protocols {
        let DataElement::Sequence(parts) = protocol else { continue };
        let Some(DataElement::Uuid(uuid)) = parts.first() else { continue };
        if *uuid == uuid_from_u16(RFCOMM_PROTOCOL_UUID) {
            if let Some(DataElement::UInt(channel)) = parts.get(1) {
                return Some(*channel as u8);
            }
        }
    }
    None
}

/// `BluetoothProfileDescriptorList` (attribute 0x0009) is a sequence of `[UUID, UInt16 version]`
/// pairs, one per profile the record advertises conformance to.
fn profile_descriptors_from(value: &DataElement) -> Vec<(Uuid, u16)> {
    let DataElement::Sequence(entries) = value else { return Vec::new() };
    entries
        .iter()
        .filter_map(|entry| {
            let DataElement::Sequence(parts) = entry else { return None };
            let uuid = parts.iter().find_map(|p| match p {
                DataElement::Uuid(u) => Some(*u),
                _ => None,
            })?;
            let version = parts.iter().find_map(|p| match p {
                DataElement::UInt(v) => Some(*v as u16),
                _ => None,
            })?;
            Some((uuid, version))
        })
        .collect()
}

/// Parses a raw SDP data-element-sequence blob as returned by `GetServiceRecords` into the
/// handful of attributes BLEEP cares about: the service class UUID (0x0001), RFCOMM channel
/// (from 0x0004), profile descriptor list and inferred version (0x0009), name (0x0100) and
/// description (0x0101). Unrecognized attributes are skipped, not rejected.
fn parse_der_record(bytes: &[u8]) -> Result<SdpRecord, ClassicError> {
    let (element, _) = parse_data_element(bytes)?;
    let DataElement::Sequence(attributes) = element else {
        return Err(ClassicError::MalformedRecord("top-level element is not a sequence"));
    };

    let mut record = SdpRecord {
        uuid: Uuid::nil(),
        rfcomm_channel: None,
        name: None,
        handle: 0,
        profile_descriptors: Vec::new(),
        service_version: None,
        description: None,
    };

    let mut pairs = attributes.into_iter();
    while let (Some(id_element), Some(value)) = (pairs.next(), pairs.next()) {
        let DataElement::UInt(attr_id) = id_element else { continue };
        match attr_id {
            0x0000 => {
                if let DataElement::UInt(handle) = value {
                    record.handle = handle as u32;
                }
            }
            0x0001 => {
                if let Some(uuid) = first_uuid_in(&value) {
                    record.uuid = uuid;
                }
            }
            0x0004 => record.rfcomm_channel = rfcomm_channel_from_protocol_list(&value),
            0x0009 => {
                record.profile_descriptors = profile_descriptors_from(&value);
                record.service_version = record.profile_descriptors.first().map(|(_, version)| *version);
            }
            0x0100 => {
                if let DataElement::Text(name) = value {
                    record.name = Some(name);
                }
            }
            0x0101 => {
                if let DataElement::Text(description) = value {
                    record.description = Some(description);
                }
            }
            _ => {}
        }
    }

    Ok(record)
}

fn device_path(device: &DeviceId) -> dbus::Path<'static> {
    device.clone().into()
}

/// Anomaly surfaced by SDP analysis: a profile's advertised version doesn't match the
/// device's dominant inferred spec version.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VersionAnomaly {
    pub profile: Uuid,
    pub advertised_version: u16,
    pub expected_version: u16,
}

/// Derived view over a batch of SDP records: the protocol/profile UUIDs seen, a histogram of
/// profile versions, the inferred spec version (with confidence), and any anomalies.
#[derive(Clone, Debug, Default)]
pub struct SdpAnalysis {
    pub protocol_set: Vec<Uuid>,
    pub profile_version_histogram: HashMap<Uuid, HashMap<u16, u32>>,
    pub inferred_spec_version: Option<InferredVersion>,
    pub anomalies: Vec<VersionAnomaly>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InferredVersion {
    pub core_spec_version: &'static str,
    pub confidence: Confidence,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Heuristic LMP-version-to-core-spec-version mapping, matching the table BlueZ's own `hciconfig`
/// output is derived from.
fn spec_version_for_lmp(lmp_version: u8) -> &'static str {
    match lmp_version {
        0 => "1.0b",
        1 => "1.1",
        2 => "1.2",
        3 => "2.0+EDR",
        4 => "2.1+EDR",
        5 => "3.0+HS",
        6 => "4.0",
        7 => "4.1",
        8 => "4.2",
        9 => "5.0",
        10 => "5.1",
        11 => "5.2",
        12 => "5.3",
        _ => "unknown",
    }
}

pub fn analyze(records: &[SdpRecord], lmp_version: Option<u8>) -> SdpAnalysis {
    let mut protocol_set = Vec::new();
    let mut histogram: HashMap<Uuid, HashMap<u16, u32>> = HashMap::new();
    for record in records {
        if !protocol_set.contains(&record.uuid) {
            protocol_set.push(record.uuid);
        }
        for (profile, version) in &record.profile_descriptors {
            *histogram.entry(*profile).or_default().entry(*version).or_insert(0) += 1;
        }
    }

    let inferred_spec_version = lmp_version.map(|v| InferredVersion {
        core_spec_version: spec_version_for_lmp(v),
        confidence: if v <= 12 { Confidence::High } else { Confidence::Low },
    });

    let mut anomalies = Vec::new();
    if let Some(inferred) = inferred_spec_version {
        let expected_version = lmp_version.unwrap_or(0) as u16;
        for (profile, versions) in &histogram {
            for (&version, _) in versions {
                if version > expected_version + 1 {
                    anomalies.push(VersionAnomaly {
                        profile: *profile,
                        advertised_version: version,
                        expected_version,
                    });
                }
            }
        }
        let _ = inferred;
    }

    SdpAnalysis { protocol_set, profile_version_histogram: histogram, inferred_spec_version, anomalies }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sdptool_output() {
        let text = "Service Search failed: No such service\n\
                     Service RecHandle: 0x10001\n\
                     Service Name: OBEX Object Push\n\
                     Service Description: OBEX Push service\n\
                     Channel: 9\n";
        let records = parse_sdptool_output(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].handle, 0x10001);
        assert_eq!(records[0].rfcomm_channel, Some(9));
        assert_eq!(records[0].name.as_deref(), Some("OBEX Object Push"));
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(matches!(
            parse_sdptool_output(""),
            Err(ClassicError::SdpToolOutputUnparsable)
        ));
    }

    #[test]
    fn parses_sdptool_service_class_and_profile_version() {
        let text = "Service RecHandle: 0x10001\n\
                     Service Class ID List:\n\
                     \"OBEX Object Push\" (0x1105)\n\
                     Profile Descriptor List:\n\
                     \"OBEX Object Push\" (0x1105)\n\
                     \tVersion: 0x0100\n";
        let records = parse_sdptool_output(text).unwrap();
        assert_eq!(records[0].uuid, uuid_from_u16(0x1105));
        assert_eq!(records[0].profile_descriptors, vec![(uuid_from_u16(0x1105), 0x0100)]);
        assert_eq!(records[0].service_version, Some(0x0100));
    }

    #[test]
    fn parses_der_record_handle_and_service_class_uuid() {
        // A minimal DES: [attr 0x0000 = UInt32 0x00010001, attr 0x0001 = Sequence[UUID16 0x1105]]
        let bytes: [u8; 18] = [
            0x35, 0x10, // outer sequence, 16 bytes of content
            0x09, 0x00, 0x00, // UInt16 attribute id 0x0000
            0x0A, 0x00, 0x01, 0x00, 0x01, // UInt32 value 0x00010001
            0x09, 0x00, 0x01, // UInt16 attribute id 0x0001
            0x35, 0x03, 0x19, 0x11, 0x05, // sequence containing one UUID16 0x1105
        ];
        let record = parse_der_record(&bytes).unwrap();
        assert_eq!(record.handle, 0x0001_0001);
        assert_eq!(record.uuid, uuid_from_u16(0x1105));
    }

    #[test]
    fn der_record_too_short_is_malformed() {
        assert!(matches!(parse_der_record(&[]), Err(ClassicError::MalformedRecord(_))));
    }

    #[test]
    fn flags_version_anomaly() {
        let mut record = SdpRecord {
            uuid: Uuid::nil(),
            rfcomm_channel: None,
            name: None,
            handle: 1,
            profile_descriptors: vec![(Uuid::nil(), 5)],
            service_version: None,
            description: None,
        };
        record.uuid = Uuid::parse_str("00001105-0000-1000-8000-00805f9b34fb").unwrap();
        let analysis = analyze(&[record], Some(1));
        assert_eq!(analysis.anomalies.len(), 1);
        assert_eq!(analysis.anomalies[0].advertised_version, 5);
    }
}

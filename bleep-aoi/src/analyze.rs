use std::path::{Path, PathBuf};

use bleep_store::Store;
use chrono::Utc;
use log::debug;

use crate::error::AoiError;
use crate::types::{
    is_encrypted_read, is_encrypted_write, is_obex_service, AoiReport, AoiThresholds,
    SecurityFinding,
};

/// Reads everything persisted for one device (GATT services/characteristics and classic
/// service records) and derives its [`AoiReport`], using the thresholds in `thresholds`.
pub fn analyze_device(
    store: &Store,
    mac: &str,
    thresholds: &AoiThresholds,
) -> Result<AoiReport, AoiError> {
    let device = store.get_device(mac)?.ok_or_else(|| AoiError::UnknownDevice(mac.to_string()))?;

    let mut findings = Vec::new();
    let mut saw_any_security_surface = false;

    for service in store.get_services(&device.address)? {
        for characteristic in store.get_characteristics(service.id)? {
            let writable = has_write_properties(&characteristic.flags)
                || permission_map_says_open(&characteristic.permission_map, "write");
            let notifying = has_notify_properties(&characteristic.flags);
            let encrypted_write = is_encrypted_write(&characteristic.flags);
            let encrypted_read = is_encrypted_read(&characteristic.flags);

            if writable || notifying || encrypted_write || encrypted_read {
                saw_any_security_surface = true;
            }

            if writable && !encrypted_write {
                findings.push(SecurityFinding::WeakGattPermissions {
                    service_uuid: service.uuid.clone(),
                    characteristic_uuid: characteristic.uuid.clone(),
                    flags: characteristic.flags.clone(),
                });
            }
            if notifying && !encrypted_read {
                findings.push(SecurityFinding::UnencryptedNotify {
                    service_uuid: service.uuid.clone(),
                    characteristic_uuid: characteristic.uuid.clone(),
                });
            }
        }
    }

    for record in store.get_classic_service_records(&device.address)? {
        saw_any_security_surface = true;
        if is_obex_service(&record.service_uuid) {
            findings.push(SecurityFinding::OpenObexAuthorization {
                service_uuid: record.service_uuid.clone(),
            });
        }
        if let Some(version) = record.version {
            if version < thresholds.minimum_classic_profile_version {
                findings.push(SecurityFinding::LegacyClassicProfile {
                    service_uuid: record.service_uuid.clone(),
                    advertised_version: version,
                    minimum_version: thresholds.minimum_classic_profile_version,
                });
            }
        }
    }

    if !saw_any_security_surface {
        findings.push(SecurityFinding::NoPairingRequired);
    }

    debug!("analyzed {}: {} finding(s)", device.address, findings.len());

    Ok(AoiReport {
        address: device.address,
        classification: device.classification,
        findings,
        generated_at: Utc::now(),
    })
}

fn has_write_properties(flags: &[String]) -> bool {
    flags.iter().any(|flag| flag == "write" || flag == "write-without-response")
}

fn has_notify_properties(flags: &[String]) -> bool {
    flags.iter().any(|flag| flag == "notify" || flag == "indicate")
}

/// A permission map is a freeform `{operation: disposition}` JSON object attached to a
/// characteristic by whatever collected it; `"open"` means no access control was observed,
/// regardless of what the GATT `Flags` property itself advertised.
fn permission_map_says_open(permission_map: &Option<serde_json::Value>, operation: &str) -> bool {
    permission_map
        .as_ref()
        .and_then(|map| map.get(operation))
        .and_then(|value| value.as_str())
        .map(|disposition| disposition.eq_ignore_ascii_case("open"))
        .unwrap_or(false)
}

/// Writes a report to `<aoi_dir>/<mac-with-dashes>.json`, atomically (write a temp file, then
/// rename over the destination) so a reader never observes a half-written snapshot.
pub fn write_snapshot(aoi_dir: &Path, report: &AoiReport) -> Result<(), AoiError> {
    std::fs::create_dir_all(aoi_dir)?;
    let file_name = format!("{}.json", report.address.replace(':', "-"));
    let final_path: PathBuf = aoi_dir.join(file_name);
    let tmp_path = final_path.with_extension("json.tmp");
    std::fs::write(&tmp_path, serde_json::to_vec_pretty(report)?)?;
    std::fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bleep_store::{
        ClassicServiceRecordInput, DeviceAttrs, GattCharacteristicInput, GattServiceInput,
    };

    fn store_with_device(mac: &str) -> Store {
        let store = Store::open_in_memory().unwrap();
        store.upsert_device(mac, &DeviceAttrs::default()).unwrap();
        store
    }

    #[test]
    fn device_with_nothing_persisted_has_no_pairing_required() {
        let store = store_with_device("aa:bb:cc:dd:ee:ff");
        let report =
            analyze_device(&store, "aa:bb:cc:dd:ee:ff", &AoiThresholds::default()).unwrap();
        assert_eq!(report.findings, vec![SecurityFinding::NoPairingRequired]);
    }

    #[test]
    fn writable_characteristic_without_encryption_is_weak() {
        let store = store_with_device("aa:bb:cc:dd:ee:ff");
        let service_ids = store
            .upsert_services(
                "aa:bb:cc:dd:ee:ff",
                &[GattServiceInput {
                    uuid: "0000180a-0000-1000-8000-00805f9b34fb".to_string(),
                    handle_start: None,
                    handle_end: None,
                    name: None,
                }],
            )
            .unwrap();
        store
            .upsert_characteristics(
                service_ids[0],
                &[GattCharacteristicInput {
                    uuid: "00002a29-0000-1000-8000-00805f9b34fb".to_string(),
                    handle: None,
                    flags: vec!["write".to_string()],
                    permission_map: None,
                }],
            )
            .unwrap();

        let report =
            analyze_device(&store, "aa:bb:cc:dd:ee:ff", &AoiThresholds::default()).unwrap();
        assert!(report.findings.iter().any(|f| matches!(f, SecurityFinding::WeakGattPermissions { .. })));
        assert!(!report.findings.contains(&SecurityFinding::NoPairingRequired));
    }

    #[test]
    fn encrypted_write_does_not_trigger_weak_permissions() {
        let store = store_with_device("aa:bb:cc:dd:ee:ff");
        let service_ids = store
            .upsert_services(
                "aa:bb:cc:dd:ee:ff",
                &[GattServiceInput {
                    uuid: "0000180a-0000-1000-8000-00805f9b34fb".to_string(),
                    handle_start: None,
                    handle_end: None,
                    name: None,
                }],
            )
            .unwrap();
        store
            .upsert_characteristics(
                service_ids[0],
                &[GattCharacteristicInput {
                    uuid: "00002a29-0000-1000-8000-00805f9b34fb".to_string(),
                    handle: None,
                    flags: vec!["write".to_string(), "encrypt-write".to_string()],
                    permission_map: None,
                }],
            )
            .unwrap();

        let report =
            analyze_device(&store, "aa:bb:cc:dd:ee:ff", &AoiThresholds::default()).unwrap();
        assert!(!report.findings.iter().any(|f| matches!(f, SecurityFinding::WeakGattPermissions { .. })));
    }

    #[test]
    fn open_permission_map_triggers_weak_permissions_even_without_write_flag() {
        let store = store_with_device("aa:bb:cc:dd:ee:ff");
        let service_ids = store
            .upsert_services(
                "aa:bb:cc:dd:ee:ff",
                &[GattServiceInput {
                    uuid: "0000180a-0000-1000-8000-00805f9b34fb".to_string(),
                    handle_start: None,
                    handle_end: None,
                    name: None,
                }],
            )
            .unwrap();
        store
            .upsert_characteristics(
                service_ids[0],
                &[GattCharacteristicInput {
                    uuid: "00002a29-0000-1000-8000-00805f9b34fb".to_string(),
                    handle: None,
                    flags: vec!["read".to_string()],
                    permission_map: Some(serde_json::json!({"write": "open"})),
                }],
            )
            .unwrap();

        let report =
            analyze_device(&store, "aa:bb:cc:dd:ee:ff", &AoiThresholds::default()).unwrap();
        assert!(report.findings.iter().any(|f| matches!(f, SecurityFinding::WeakGattPermissions { .. })));
    }

    #[test]
    fn notify_without_encrypted_read_is_flagged() {
        let store = store_with_device("aa:bb:cc:dd:ee:ff");
        let service_ids = store
            .upsert_services(
                "aa:bb:cc:dd:ee:ff",
                &[GattServiceInput {
                    uuid: "0000180a-0000-1000-8000-00805f9b34fb".to_string(),
                    handle_start: None,
                    handle_end: None,
                    name: None,
                }],
            )
            .unwrap();
        store
            .upsert_characteristics(
                service_ids[0],
                &[GattCharacteristicInput {
                    uuid: "00002a29-0000-1000-8000-00805f9b34fb".to_string(),
                    handle: None,
                    flags: vec!["notify".to_string()],
                    permission_map: None,
                }],
            )
            .unwrap();

        let report =
            analyze_device(&store, "aa:bb:cc:dd:ee:ff", &AoiThresholds::default()).unwrap();
        assert!(report.findings.iter().any(|f| matches!(f, SecurityFinding::UnencryptedNotify { .. })));
    }

    #[test]
    fn legacy_classic_profile_below_minimum_version_is_flagged() {
        let store = store_with_device("aa:bb:cc:dd:ee:ff");
        store
            .upsert_classic_service_record(
                "aa:bb:cc:dd:ee:ff",
                &ClassicServiceRecordInput {
                    service_uuid: "00001108-0000-1000-8000-00805f9b34fb".to_string(),
                    rfcomm_channel: Some(1),
                    name: Some("Headset".to_string()),
                    handle: Some(1),
                    profile_descriptors: vec![],
                    version: Some(0x0100),
                    description: None,
                },
            )
            .unwrap();

        let report =
            analyze_device(&store, "aa:bb:cc:dd:ee:ff", &AoiThresholds::default()).unwrap();
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, SecurityFinding::LegacyClassicProfile { advertised_version: 0x0100, .. })));
    }

    #[test]
    fn obex_profile_is_flagged_open() {
        let store = store_with_device("aa:bb:cc:dd:ee:ff");
        store
            .upsert_classic_service_record(
                "aa:bb:cc:dd:ee:ff",
                &ClassicServiceRecordInput {
                    service_uuid: "00001105-0000-1000-8000-00805f9b34fb".to_string(),
                    rfcomm_channel: Some(9),
                    name: Some("OBEX Object Push".to_string()),
                    handle: Some(2),
                    profile_descriptors: vec![],
                    version: Some(0x0102),
                    description: None,
                },
            )
            .unwrap();

        let report =
            analyze_device(&store, "aa:bb:cc:dd:ee:ff", &AoiThresholds::default()).unwrap();
        assert!(report.findings.iter().any(|f| matches!(f, SecurityFinding::OpenObexAuthorization { .. })));
    }

    #[test]
    fn unknown_device_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        let result = analyze_device(&store, "00:00:00:00:00:00", &AoiThresholds::default());
        assert!(matches!(result, Err(AoiError::UnknownDevice(_))));
    }

    #[test]
    fn write_snapshot_round_trips_through_json() {
        let dir = std::env::temp_dir().join(format!("bleep-aoi-test-{}", std::process::id()));
        let store = store_with_device("aa:bb:cc:dd:ee:ff");
        let report =
            analyze_device(&store, "aa:bb:cc:dd:ee:ff", &AoiThresholds::default()).unwrap();
        write_snapshot(&dir, &report).unwrap();
        let contents = std::fs::read_to_string(dir.join("aa-bb-cc-dd-ee-ff.json")).unwrap();
        let parsed: AoiReport = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.address, report.address);
        std::fs::remove_dir_all(&dir).ok();
    }
}

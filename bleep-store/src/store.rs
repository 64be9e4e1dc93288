use std::path::Path;

use chrono::Utc;
use log::{error, warn};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::schema;
use crate::types::{
    normalize_mac, AddressType, AdvertisementReport, Classification, ClassicServiceRecordInput,
    ClassicServiceRecordOutput, DeviceAttrs, DeviceRecord, EvidenceRecord, EvidenceWeight,
    GattCharacteristicInput, GattCharacteristicRecord, GattServiceInput, GattServiceRecord,
    HistorySource,
};

/// The observation store: a single SQLite database file behind one writer
/// connection. Reads and writes both go through the same mutex-guarded
/// connection rather than a pool, since `rusqlite` connections aren't
/// `Sync` and this workload only needs a short-held mutex per write batch,
/// not genuine read/write concurrency.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut conn = Connection::open(path)?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates the device row on first observation, or updates it in place.
    /// `first_seen` is set only for a brand-new row; `last_seen` always
    /// advances to now; `classification` is only overwritten when the
    /// caller's classification outranks the stored one.
    pub fn upsert_device(&self, mac: &str, attrs: &DeviceAttrs) -> Result<(), StoreError> {
        let address = normalize_mac(mac);
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock();

        let existing = conn
            .query_row(
                "SELECT classification FROM devices WHERE address = ?1",
                params![address],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO devices (
                        address, address_type, name, appearance, device_class,
                        manufacturer_id, manufacturer_data, last_rssi, min_rssi, max_rssi,
                        first_seen, last_seen, classification, notes
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8, ?9, ?9, ?10, NULL)",
                    params![
                        address,
                        attrs.address_type.unwrap_or(AddressType::Unknown).as_str(),
                        attrs.name,
                        attrs.appearance,
                        attrs.device_class,
                        attrs.manufacturer_id,
                        attrs.manufacturer_data,
                        attrs.rssi,
                        now,
                        attrs.classification.unwrap_or(Classification::Unknown).as_str(),
                    ],
                )?;
            }
            Some(current_classification) => {
                let current = Classification::parse(&current_classification);
                let next_classification = match attrs.classification {
                    Some(candidate) if current.is_weaker_than(candidate) => candidate.as_str(),
                    _ => current_classification.as_str(),
                };
                conn.execute(
                    "UPDATE devices SET
                        address_type = COALESCE(?2, address_type),
                        name = COALESCE(?3, name),
                        appearance = COALESCE(?4, appearance),
                        device_class = COALESCE(?5, device_class),
                        manufacturer_id = COALESCE(?6, manufacturer_id),
                        manufacturer_data = COALESCE(?7, manufacturer_data),
                        last_rssi = COALESCE(?8, last_rssi),
                        min_rssi = CASE WHEN ?8 IS NOT NULL AND (min_rssi IS NULL OR ?8 < min_rssi) THEN ?8 ELSE min_rssi END,
                        max_rssi = CASE WHEN ?8 IS NOT NULL AND (max_rssi IS NULL OR ?8 > max_rssi) THEN ?8 ELSE max_rssi END,
                        last_seen = ?9,
                        classification = ?10
                    WHERE address = ?1",
                    params![
                        address,
                        attrs.address_type.map(|a| a.as_str()),
                        attrs.name,
                        attrs.appearance,
                        attrs.device_class,
                        attrs.manufacturer_id,
                        attrs.manufacturer_data,
                        attrs.rssi,
                        now,
                        next_classification,
                    ],
                )?;
            }
        }
        Ok(())
    }

    pub fn get_device(&self, mac: &str) -> Result<Option<DeviceRecord>, StoreError> {
        let address = normalize_mac(mac);
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT address, address_type, name, appearance, device_class, manufacturer_id,
                        manufacturer_data, last_rssi, min_rssi, max_rssi, first_seen, last_seen,
                        classification, notes
                 FROM devices WHERE address = ?1",
                params![address],
                |row| {
                    Ok(DeviceRecord {
                        address: row.get(0)?,
                        address_type: AddressType::parse(&row.get::<_, String>(1)?),
                        name: row.get(2)?,
                        appearance: row.get(3)?,
                        device_class: row.get(4)?,
                        manufacturer_id: row.get(5)?,
                        manufacturer_data: row.get(6)?,
                        last_rssi: row.get(7)?,
                        min_rssi: row.get(8)?,
                        max_rssi: row.get(9)?,
                        first_seen: parse_timestamp(&row.get::<_, String>(10)?),
                        last_seen: parse_timestamp(&row.get::<_, String>(11)?),
                        classification: Classification::parse(&row.get::<_, String>(12)?),
                        notes: row.get(13)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Appends an advertisement report. Always commits; this table is
    /// append-only time-series data.
    pub fn insert_adv(
        &self,
        mac: &str,
        report: &AdvertisementReport,
    ) -> Result<(), StoreError> {
        let address = normalize_mac(mac);
        let decoded = report
            .decoded
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO advertisement_reports (address, timestamp, rssi, raw, decoded)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                address,
                report.timestamp.to_rfc3339(),
                report.rssi,
                report.raw,
                decoded,
            ],
        );
        if let Err(err) = &result {
            error!("insert_adv failed for {address}: {err}");
        }
        result?;
        Ok(())
    }

    /// Reconciles a device's GATT services against a freshly enumerated
    /// list. Matching is case-insensitive on UUID since different
    /// enumeration paths (full vs. cached) can produce different casing
    /// for the same 128-bit UUID string.
    pub fn upsert_services(
        &self,
        mac: &str,
        services: &[GattServiceInput],
    ) -> Result<Vec<i64>, StoreError> {
        let address = normalize_mac(mac);
        let conn = self.conn.lock();
        let mut ids = Vec::with_capacity(services.len());
        for service in services {
            let uuid = service.uuid.to_ascii_lowercase();
            let handle_start = service.handle_start.as_deref().map(hex_to_int);
            let handle_end = service.handle_end.as_deref().map(hex_to_int);

            let existing_id: Option<i64> = conn
                .query_row(
                    "SELECT id FROM gatt_services WHERE address = ?1 AND LOWER(uuid) = ?2",
                    params![address, uuid],
                    |row| row.get(0),
                )
                .optional()?;

            let id = match existing_id {
                Some(id) => {
                    conn.execute(
                        "UPDATE gatt_services SET handle_start = COALESCE(?2, handle_start),
                            handle_end = COALESCE(?3, handle_end), name = COALESCE(?4, name)
                         WHERE id = ?1",
                        params![id, handle_start, handle_end, service.name],
                    )?;
                    id
                }
                None => {
                    conn.execute(
                        "INSERT INTO gatt_services (address, uuid, handle_start, handle_end, name)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![address, uuid, handle_start, handle_end, service.name],
                    )?;
                    conn.last_insert_rowid()
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn upsert_characteristics(
        &self,
        service_id: i64,
        characteristics: &[GattCharacteristicInput],
    ) -> Result<Vec<i64>, StoreError> {
        let conn = self.conn.lock();
        let mut ids = Vec::with_capacity(characteristics.len());
        for characteristic in characteristics {
            let uuid = characteristic.uuid.to_ascii_lowercase();
            let handle = characteristic.handle.as_deref().map(hex_to_int);
            let flags = serde_json::to_string(&characteristic.flags)?;
            let permission_map = characteristic
                .permission_map
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            let existing_id: Option<i64> = conn
                .query_row(
                    "SELECT id FROM gatt_characteristics WHERE service_id = ?1 AND LOWER(uuid) = ?2",
                    params![service_id, uuid],
                    |row| row.get(0),
                )
                .optional()?;

            let id = match existing_id {
                Some(id) => {
                    conn.execute(
                        "UPDATE gatt_characteristics SET handle = COALESCE(?2, handle),
                            flags = ?3, permission_map = COALESCE(?4, permission_map)
                         WHERE id = ?1",
                        params![id, handle, flags, permission_map],
                    )?;
                    id
                }
                None => {
                    conn.execute(
                        "INSERT INTO gatt_characteristics (service_id, uuid, handle, flags, permission_map)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![service_id, uuid, handle, flags, permission_map],
                    )?;
                    conn.last_insert_rowid()
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn record_characteristic_value(
        &self,
        characteristic_id: i64,
        value: &[u8],
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE gatt_characteristics SET last_value = ?2, last_read_at = ?3 WHERE id = ?1",
            params![characteristic_id, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Appends a characteristic history row. Must commit synchronously:
    /// `rusqlite`'s default journal mode commits each
    /// statement's transaction durably before `execute` returns, so no
    /// extra `PRAGMA synchronous` handling is required here beyond not
    /// batching this call with others.
    pub fn insert_char_history(
        &self,
        mac: &str,
        service_uuid: &str,
        characteristic_uuid: &str,
        value: &[u8],
        source: HistorySource,
    ) -> Result<(), StoreError> {
        let address = normalize_mac(mac);
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO characteristic_history
                (address, service_uuid, characteristic_uuid, timestamp, value, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                address,
                service_uuid.to_ascii_lowercase(),
                characteristic_uuid.to_ascii_lowercase(),
                Utc::now().to_rfc3339(),
                value,
                source.as_str(),
            ],
        );
        if let Err(err) = &result {
            error!("insert_char_history failed for {address}: {err}");
        }
        result?;
        Ok(())
    }

    pub fn upsert_classic_service_record(
        &self,
        mac: &str,
        record: &ClassicServiceRecordInput,
    ) -> Result<(), StoreError> {
        let address = normalize_mac(mac);
        let profile_descriptors = serde_json::to_string(&record.profile_descriptors)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO classic_service_records
                (address, service_uuid, rfcomm_channel, name, handle, profile_descriptors,
                 version, description, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                address,
                record.service_uuid.to_ascii_lowercase(),
                record.rfcomm_channel,
                record.name,
                record.handle,
                profile_descriptors,
                record.version,
                record.description,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Upserts one piece of device-type evidence, keyed by
    /// (device, evidence-type, source).
    pub fn store_device_type_evidence(
        &self,
        mac: &str,
        evidence_type: &str,
        weight: EvidenceWeight,
        source: &str,
        value: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), StoreError> {
        let address = normalize_mac(mac);
        let metadata = metadata.map(serde_json::to_string).transpose()?;
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO evidence (address, evidence_type, weight, source, value, metadata, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(address, evidence_type, source) DO UPDATE SET
                weight = excluded.weight,
                value = excluded.value,
                metadata = excluded.metadata,
                timestamp = excluded.timestamp",
            params![
                address,
                evidence_type,
                weight.as_str(),
                source,
                value,
                metadata,
                Utc::now().to_rfc3339(),
            ],
        );
        if let Err(err) = &result {
            error!("store_device_type_evidence failed for {address}: {err}");
        }
        result?;
        Ok(())
    }

    pub fn get_device_evidence(&self, mac: &str) -> Result<Vec<EvidenceRecord>, StoreError> {
        let address = normalize_mac(mac);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT evidence_type, weight, source, value, metadata, timestamp
             FROM evidence WHERE address = ?1 ORDER BY evidence_type, source",
        )?;
        let rows = stmt.query_map(params![address], |row| {
            let metadata_text: Option<String> = row.get(4)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                metadata_text,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (evidence_type, weight, source, value, metadata_text, timestamp) = row?;
            let metadata = metadata_text
                .map(|text| serde_json::from_str(&text))
                .transpose()?;
            records.push(EvidenceRecord {
                evidence_type,
                weight: EvidenceWeight::parse(&weight)?,
                source,
                value,
                metadata,
                timestamp: parse_timestamp(&timestamp),
            });
        }
        Ok(records)
    }

    /// Reads back every GATT service persisted for a device, ordered by UUID for a stable
    /// report ordering.
    pub fn get_services(&self, mac: &str) -> Result<Vec<GattServiceRecord>, StoreError> {
        let address = normalize_mac(mac);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, uuid, handle_start, handle_end, name FROM gatt_services
             WHERE address = ?1 ORDER BY uuid",
        )?;
        let rows = stmt.query_map(params![address], |row| {
            Ok(GattServiceRecord {
                id: row.get(0)?,
                uuid: row.get(1)?,
                handle_start: row.get(2)?,
                handle_end: row.get(3)?,
                name: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Reads back every GATT characteristic persisted under one service.
    pub fn get_characteristics(&self, service_id: i64) -> Result<Vec<GattCharacteristicRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, service_id, uuid, handle, flags, last_value, permission_map
             FROM gatt_characteristics WHERE service_id = ?1 ORDER BY uuid",
        )?;
        let rows = stmt.query_map(params![service_id], |row| {
            let flags_text: String = row.get(4)?;
            let permission_map_text: Option<String> = row.get(6)?;
            Ok((row.get(0)?, row.get(1)?, row.get::<_, String>(2)?, row.get(3)?, flags_text, row.get(5)?, permission_map_text))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, service_id, uuid, handle, flags_text, last_value, permission_map_text) = row?;
            records.push(GattCharacteristicRecord {
                id,
                service_id,
                uuid,
                handle,
                flags: serde_json::from_str(&flags_text)?,
                last_value,
                permission_map: permission_map_text.map(|text| serde_json::from_str(&text)).transpose()?,
            });
        }
        Ok(records)
    }

    /// Reads back every classic (SDP) service record persisted for a device.
    pub fn get_classic_service_records(&self, mac: &str) -> Result<Vec<ClassicServiceRecordOutput>, StoreError> {
        let address = normalize_mac(mac);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT service_uuid, rfcomm_channel, name, handle, profile_descriptors, version, description
             FROM classic_service_records WHERE address = ?1 ORDER BY timestamp",
        )?;
        let rows = stmt.query_map(params![address], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get::<_, String>(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (service_uuid, rfcomm_channel, name, handle, profile_descriptors_text, version, description) = row?;
            records.push(ClassicServiceRecordOutput {
                service_uuid,
                rfcomm_channel,
                name,
                handle,
                profile_descriptors: serde_json::from_str(&profile_descriptors_text)?,
                version,
                description,
            });
        }
        Ok(records)
    }

    /// A stable hash of the device's current evidence set, for cache
    /// keying by the classifier. Built from a sorted,
    /// deterministic rendering of each evidence row so the hash doesn't
    /// depend on SQLite's row order.
    pub fn get_device_evidence_signature(&self, mac: &str) -> Result<String, StoreError> {
        use std::hash::{Hash, Hasher};
        let evidence = self.get_device_evidence(mac)?;
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for record in &evidence {
            record.evidence_type.hash(&mut hasher);
            record.weight.as_str().hash(&mut hasher);
            record.source.hash(&mut hasher);
            record.value.hash(&mut hasher);
        }
        Ok(format!("{:016x}", hasher.finish()))
    }
}

fn hex_to_int(hex: &str) -> i64 {
    let trimmed = hex.trim_start_matches("0x").trim_start_matches("0X");
    i64::from_str_radix(trimmed, 16).unwrap_or_else(|_| {
        warn!("handle '{hex}' is not valid hex, storing as 0");
        0
    })
}

fn parse_timestamp(text: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_device_sets_first_seen_once() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_device("AA:BB:CC:DD:EE:FF", &DeviceAttrs::default()).unwrap();
        let first = store.get_device("aa:bb:cc:dd:ee:ff").unwrap().unwrap();
        store.upsert_device("aa:bb:cc:dd:ee:ff", &DeviceAttrs::default()).unwrap();
        let second = store.get_device("aa:bb:cc:dd:ee:ff").unwrap().unwrap();
        assert_eq!(first.first_seen, second.first_seen);
        assert!(second.last_seen >= first.last_seen);
    }

    #[test]
    fn classification_only_upgrades() {
        let store = Store::open_in_memory().unwrap();
        let mut attrs = DeviceAttrs::default();
        attrs.classification = Some(Classification::Le);
        store.upsert_device("11:22:33:44:55:66", &attrs).unwrap();

        let mut weaker = DeviceAttrs::default();
        weaker.classification = Some(Classification::Unknown);
        store.upsert_device("11:22:33:44:55:66", &weaker).unwrap();
        let record = store.get_device("11:22:33:44:55:66").unwrap().unwrap();
        assert_eq!(record.classification, Classification::Le);

        let mut stronger = DeviceAttrs::default();
        stronger.classification = Some(Classification::Dual);
        store.upsert_device("11:22:33:44:55:66", &stronger).unwrap();
        let record = store.get_device("11:22:33:44:55:66").unwrap().unwrap();
        assert_eq!(record.classification, Classification::Dual);
    }

    #[test]
    fn upsert_services_is_case_insensitive() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_device("aa:bb:cc:dd:ee:ff", &DeviceAttrs::default()).unwrap();
        let first = store
            .upsert_services(
                "aa:bb:cc:dd:ee:ff",
                &[GattServiceInput {
                    uuid: "0000180A-0000-1000-8000-00805F9B34FB".to_string(),
                    handle_start: Some("0x0010".to_string()),
                    handle_end: Some("0x0020".to_string()),
                    name: Some("Device Information".to_string()),
                }],
            )
            .unwrap();
        let second = store
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
        assert_eq!(first, second);
    }

    #[test]
    fn evidence_signature_is_stable_and_order_independent() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_device("aa:bb:cc:dd:ee:ff", &DeviceAttrs::default()).unwrap();
        store
            .store_device_type_evidence(
                "aa:bb:cc:dd:ee:ff",
                "appearance",
                EvidenceWeight::Strong,
                "gatt",
                "generic-watch",
                None,
            )
            .unwrap();
        let first = store.get_device_evidence_signature("aa:bb:cc:dd:ee:ff").unwrap();
        store
            .store_device_type_evidence(
                "aa:bb:cc:dd:ee:ff",
                "appearance",
                EvidenceWeight::Strong,
                "gatt",
                "generic-watch",
                None,
            )
            .unwrap();
        let second = store.get_device_evidence_signature("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn get_services_reads_back_what_was_upserted() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_device("aa:bb:cc:dd:ee:ff", &DeviceAttrs::default()).unwrap();
        store
            .upsert_services(
                "aa:bb:cc:dd:ee:ff",
                &[GattServiceInput {
                    uuid: "0000180a-0000-1000-8000-00805f9b34fb".to_string(),
                    handle_start: Some("0x0010".to_string()),
                    handle_end: Some("0x0020".to_string()),
                    name: Some("Device Information".to_string()),
                }],
            )
            .unwrap();
        let services = store.get_services("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].uuid, "0000180a-0000-1000-8000-00805f9b34fb");
        assert_eq!(services[0].handle_start, Some(0x0010));
        assert_eq!(services[0].handle_end, Some(0x0020));
        assert_eq!(services[0].name.as_deref(), Some("Device Information"));
    }

    #[test]
    fn get_services_is_empty_for_unknown_device() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_services("00:00:00:00:00:00").unwrap().is_empty());
    }

    #[test]
    fn get_characteristics_reads_back_flags_and_permission_map() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_device("aa:bb:cc:dd:ee:ff", &DeviceAttrs::default()).unwrap();
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
        let service_id = service_ids[0];
        let characteristic_ids = store
            .upsert_characteristics(
                service_id,
                &[GattCharacteristicInput {
                    uuid: "00002a29-0000-1000-8000-00805f9b34fb".to_string(),
                    handle: Some("0x0011".to_string()),
                    flags: vec!["read".to_string(), "notify".to_string()],
                    permission_map: Some(serde_json::json!({"read": "open", "write": "denied"})),
                }],
            )
            .unwrap();
        let characteristic_id = characteristic_ids[0];
        store.record_characteristic_value(characteristic_id, b"Acme Corp").unwrap();

        let characteristics = store.get_characteristics(service_id).unwrap();
        assert_eq!(characteristics.len(), 1);
        let characteristic = &characteristics[0];
        assert_eq!(characteristic.service_id, service_id);
        assert_eq!(characteristic.uuid, "00002a29-0000-1000-8000-00805f9b34fb");
        assert_eq!(characteristic.handle, Some(0x0011));
        assert_eq!(characteristic.flags, vec!["read".to_string(), "notify".to_string()]);
        assert_eq!(characteristic.last_value.as_deref(), Some(&b"Acme Corp"[..]));
        assert_eq!(
            characteristic.permission_map,
            Some(serde_json::json!({"read": "open", "write": "denied"}))
        );
    }

    #[test]
    fn get_characteristics_is_empty_for_unknown_service() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_characteristics(9999).unwrap().is_empty());
    }

    #[test]
    fn get_classic_service_records_reads_back_profile_descriptors() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_device("aa:bb:cc:dd:ee:ff", &DeviceAttrs::default()).unwrap();
        store
            .upsert_classic_service_record(
                "aa:bb:cc:dd:ee:ff",
                &ClassicServiceRecordInput {
                    service_uuid: "0000110a-0000-1000-8000-00805f9b34fb".to_string(),
                    rfcomm_channel: Some(3),
                    name: Some("Audio Source".to_string()),
                    handle: Some(0x10000),
                    profile_descriptors: vec![("0000110a-0000-1000-8000-00805f9b34fb".to_string(), 0x0103)],
                    version: Some(0x0103),
                    description: Some("A2DP source".to_string()),
                },
            )
            .unwrap();

        let records = store.get_classic_service_records("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.service_uuid, "0000110a-0000-1000-8000-00805f9b34fb");
        assert_eq!(record.rfcomm_channel, Some(3));
        assert_eq!(record.name.as_deref(), Some("Audio Source"));
        assert_eq!(record.handle, Some(0x10000));
        assert_eq!(
            record.profile_descriptors,
            vec![("0000110a-0000-1000-8000-00805f9b34fb".to_string(), 0x0103)]
        );
        assert_eq!(record.version, Some(0x0103));
        assert_eq!(record.description.as_deref(), Some("A2DP source"));
    }

    #[test]
    fn get_classic_service_records_is_empty_for_unknown_device() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_classic_service_records("00:00:00:00:00:00").unwrap().is_empty());
    }
}

use log::info;
use rusqlite::Connection;

use crate::error::StoreError;

/// Linear, forward-only schema migrations. Each entry is applied inside its
/// own transaction and is written to be idempotent under retry (`CREATE
/// TABLE IF NOT EXISTS`, `CREATE INDEX IF NOT EXISTS`) so a crash between
/// "ran the DDL" and "recorded the version" never leaves the database
/// unusable on the next startup.
const MIGRATIONS: &[&str] = &[
    // v1: migration bookkeeping + devices
    r#"
    CREATE TABLE IF NOT EXISTS devices (
        address             TEXT PRIMARY KEY,
        address_type        TEXT NOT NULL DEFAULT 'unknown',
        name                TEXT,
        appearance          INTEGER,
        device_class        INTEGER,
        manufacturer_id     INTEGER,
        manufacturer_data   BLOB,
        last_rssi           INTEGER,
        min_rssi            INTEGER,
        max_rssi            INTEGER,
        first_seen          TEXT NOT NULL,
        last_seen           TEXT NOT NULL,
        classification      TEXT NOT NULL DEFAULT 'unknown',
        notes               TEXT
    );
    "#,
    // v2: advertisement reports
    r#"
    CREATE TABLE IF NOT EXISTS advertisement_reports (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        address     TEXT NOT NULL REFERENCES devices(address),
        timestamp   TEXT NOT NULL,
        rssi        INTEGER,
        raw         BLOB NOT NULL,
        decoded     TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_adv_reports_device ON advertisement_reports(address);
    CREATE INDEX IF NOT EXISTS idx_adv_reports_timestamp ON advertisement_reports(timestamp);
    "#,
    // v3: GATT services / characteristics / descriptors
    r#"
    CREATE TABLE IF NOT EXISTS gatt_services (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        address         TEXT NOT NULL REFERENCES devices(address),
        uuid            TEXT NOT NULL,
        handle_start    INTEGER,
        handle_end      INTEGER,
        name            TEXT,
        UNIQUE(address, uuid)
    );
    CREATE INDEX IF NOT EXISTS idx_gatt_services_device_uuid ON gatt_services(address, uuid);

    CREATE TABLE IF NOT EXISTS gatt_characteristics (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        service_id          INTEGER NOT NULL REFERENCES gatt_services(id),
        uuid                TEXT NOT NULL,
        handle              INTEGER,
        flags               TEXT NOT NULL DEFAULT '[]',
        last_value          BLOB,
        last_read_at        TEXT,
        permission_map      TEXT,
        UNIQUE(service_id, uuid)
    );

    CREATE TABLE IF NOT EXISTS gatt_descriptors (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        characteristic_id   INTEGER NOT NULL REFERENCES gatt_characteristics(id),
        uuid                TEXT NOT NULL,
        last_value          BLOB,
        UNIQUE(characteristic_id, uuid)
    );
    "#,
    // v4: characteristic history
    r#"
    CREATE TABLE IF NOT EXISTS characteristic_history (
        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
        address                 TEXT NOT NULL REFERENCES devices(address),
        service_uuid            TEXT NOT NULL,
        characteristic_uuid     TEXT NOT NULL,
        timestamp               TEXT NOT NULL,
        value                   BLOB NOT NULL,
        source                  TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_char_history_device ON characteristic_history(address);
    CREATE INDEX IF NOT EXISTS idx_char_history_timestamp ON characteristic_history(timestamp);
    "#,
    // v5: classic service records
    r#"
    CREATE TABLE IF NOT EXISTS classic_service_records (
        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
        address                 TEXT NOT NULL REFERENCES devices(address),
        service_uuid            TEXT NOT NULL,
        rfcomm_channel          INTEGER,
        name                    TEXT,
        handle                  INTEGER,
        profile_descriptors     TEXT NOT NULL DEFAULT '[]',
        version                 INTEGER,
        description             TEXT,
        timestamp               TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_classic_records_device ON classic_service_records(address);
    "#,
    // v6: evidence
    r#"
    CREATE TABLE IF NOT EXISTS evidence (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        address         TEXT NOT NULL REFERENCES devices(address),
        evidence_type   TEXT NOT NULL,
        weight          TEXT NOT NULL,
        source          TEXT NOT NULL,
        value           TEXT NOT NULL,
        metadata        TEXT,
        timestamp       TEXT NOT NULL,
        UNIQUE(address, evidence_type, source)
    );
    "#,
];

pub fn current_version(conn: &Connection) -> Result<u32, StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL)",
        [],
    )?;
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

pub fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let applied = current_version(conn)?;
    for (index, ddl) in MIGRATIONS.iter().enumerate() {
        let version = index as u32 + 1;
        if version <= applied {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(ddl)
            .map_err(|source| StoreError::Migration { version, source })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, chrono::Utc::now().to_rfc3339()],
        )
        .map_err(|source| StoreError::Migration { version, source })?;
        tx.commit()?;
        info!("applied schema migration v{version}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_to_latest_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), MIGRATIONS.len() as u32);
    }

    #[test]
    fn migration_is_idempotent_under_retry() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), MIGRATIONS.len() as u32);
    }
}

use std::path::PathBuf;

use serde_derive::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::AgentError;

/// A completed pairing, keyed by device address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BondRecord {
    pub mac: String,
    pub capability: String,
    pub bonded_at_unix: u64,
}

impl BondRecord {
    pub fn new(mac: impl Into<String>, capability: Capability, bonded_at_unix: u64) -> Self {
        Self { mac: mac.into(), capability: capability.as_str().to_owned(), bonded_at_unix }
    }
}

/// Persists completed pairings. `bleep-store`-agnostic: the observation
/// database and the bond store are independent concerns, so a caller can
/// swap this out (e.g. in tests) without touching `bleep-store`.
pub trait BondStore: Send + Sync {
    fn store(&self, record: &BondRecord) -> Result<(), AgentError>;
    fn load(&self, mac: &str) -> Result<Option<BondRecord>, AgentError>;
    fn remove(&self, mac: &str) -> Result<(), AgentError>;
    fn list(&self) -> Result<Vec<BondRecord>, AgentError>;
}

/// Stores one bond per file under `bonds_dir`, named after the sanitized
/// device address with a `.dat` extension. Writes go through a temp file in
/// the same directory and an atomic rename, so a bond file is never observed
/// half-written.
pub struct FilesystemBondStore {
    bonds_dir: PathBuf,
}

impl FilesystemBondStore {
    pub fn new(bonds_dir: impl Into<PathBuf>) -> Self {
        Self { bonds_dir: bonds_dir.into() }
    }

    fn file_name(mac: &str) -> String {
        format!("{}.dat", mac.replace(':', "-"))
    }

    fn path_for(&self, mac: &str) -> PathBuf {
        self.bonds_dir.join(Self::file_name(mac))
    }
}

impl BondStore for FilesystemBondStore {
    fn store(&self, record: &BondRecord) -> Result<(), AgentError> {
        std::fs::create_dir_all(&self.bonds_dir)?;
        let final_path = self.path_for(&record.mac);
        let tmp_path = final_path.with_extension("dat.tmp");
        std::fs::write(&tmp_path, serde_json::to_vec_pretty(record)?)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    fn load(&self, mac: &str) -> Result<Option<BondRecord>, AgentError> {
        let path = self.path_for(mac);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read(path)?;
        Ok(Some(serde_json::from_slice(&contents)?))
    }

    fn remove(&self, mac: &str) -> Result<(), AgentError> {
        let path = self.path_for(mac);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<BondRecord>, AgentError> {
        if !self.bonds_dir.exists() {
            return Ok(vec![]);
        }
        let mut records = vec![];
        for entry in std::fs::read_dir(&self.bonds_dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("dat") {
                continue;
            }
            let contents = std::fs::read(entry.path())?;
            records.push(serde_json::from_slice(&contents)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bleep-agent-bonds-{}-{}", std::process::id(), line!()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn store_then_load_roundtrips() {
        let dir = temp_dir();
        let store = FilesystemBondStore::new(&dir);
        let record = BondRecord::new("aa:bb:cc:dd:ee:ff", Capability::DisplayYesNo, 1_700_000_000);
        store.store(&record).unwrap();
        let loaded = store.load("aa:bb:cc:dd:ee:ff").unwrap().unwrap();
        assert_eq!(loaded, record);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_bond_is_none_not_an_error() {
        let dir = temp_dir();
        let store = FilesystemBondStore::new(&dir);
        assert!(store.load("aa:bb:cc:dd:ee:ff").unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn remove_then_load_is_none() {
        let dir = temp_dir();
        let store = FilesystemBondStore::new(&dir);
        let record = BondRecord::new("aa:bb", Capability::NoInputNoOutput, 0);
        store.store(&record).unwrap();
        store.remove("aa:bb").unwrap();
        assert!(store.load("aa:bb").unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn list_returns_every_stored_bond() {
        let dir = temp_dir();
        let store = FilesystemBondStore::new(&dir);
        store.store(&BondRecord::new("aa:bb", Capability::DisplayOnly, 1)).unwrap();
        store.store(&BondRecord::new("cc:dd", Capability::KeyboardOnly, 2)).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }
}

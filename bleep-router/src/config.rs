use std::path::PathBuf;

use crate::error::RouterError;
use crate::types::Route;

/// A named, persisted set of routes.
#[derive(Clone, Debug, serde_derive::Serialize, serde_derive::Deserialize)]
pub struct RouterConfig {
    pub name: String,
    pub routes: Vec<Route>,
}

/// Loads, stores, renames and deletes named router configs as JSON documents under
/// `configs_dir`, one file per config (`<name>.json`).
pub struct ConfigStore {
    configs_dir: PathBuf,
}

impl ConfigStore {
    pub fn new(configs_dir: impl Into<PathBuf>) -> Self {
        Self { configs_dir: configs_dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.configs_dir.join(format!("{name}.json"))
    }

    pub fn load(&self, name: &str) -> Result<RouterConfig, RouterError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(RouterError::UnknownConfig(name.to_owned()));
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn store(&self, config: &RouterConfig) -> Result<(), RouterError> {
        std::fs::create_dir_all(&self.configs_dir)?;
        let path = self.path_for(&config.name);
        let contents = serde_json::to_string_pretty(config)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<(), RouterError> {
        let mut config = self.load(from)?;
        config.name = to.to_owned();
        self.store(&config)?;
        std::fs::remove_file(self.path_for(from))?;
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<(), RouterError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(RouterError::UnknownConfig(name.to_owned()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<String>, RouterError> {
        if !self.configs_dir.exists() {
            return Ok(vec![]);
        }
        let mut names = vec![];
        for entry in std::fs::read_dir(&self.configs_dir)? {
            let entry = entry?;
            if let Some(name) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                    names.push(name.to_owned());
                }
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Filter;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bleep-router-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn empty_config(name: &str) -> RouterConfig {
        RouterConfig { name: name.to_owned(), routes: vec![] }
    }

    #[test]
    fn store_then_load_roundtrips() {
        let dir = temp_dir();
        let store = ConfigStore::new(&dir);
        store.store(&empty_config("default")).unwrap();
        let loaded = store.load("default").unwrap();
        assert_eq!(loaded.name, "default");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rename_moves_the_file() {
        let dir = temp_dir();
        let store = ConfigStore::new(&dir);
        store.store(&empty_config("a")).unwrap();
        store.rename("a", "b").unwrap();
        assert!(store.load("b").is_ok());
        assert!(store.load("a").is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = temp_dir();
        let store = ConfigStore::new(&dir);
        assert!(matches!(store.load("nope"), Err(RouterError::UnknownConfig(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn filter_round_trips_through_json() {
        let dir = temp_dir();
        let store = ConfigStore::new(&dir);
        let mut config = empty_config("with-filter");
        config.routes.push(Route {
            name: "r1".to_owned(),
            enabled: true,
            filter: Filter::default(),
            actions: vec![],
        });
        store.store(&config).unwrap();
        let loaded = store.load("with-filter").unwrap();
        assert_eq!(loaded.routes.len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}

use std::env;
use std::path::PathBuf;

/// Resolved runtime configuration, built once from environment variables at
/// [`crate::Context`] construction.
#[derive(Clone, Debug)]
pub struct Config {
    /// `$HOME/.bleep/` by default; every other path is relative to this one unless
    /// individually overridden.
    pub config_root: PathBuf,
    /// Overridable via `BLEEP_DB_PATH`; defaults to `<config_root>/bleep.db`.
    pub db_path: PathBuf,
    /// `<config_root>/aoi`.
    pub aoi_dir: PathBuf,
    /// `<config_root>/bonds`.
    pub bonds_dir: PathBuf,
    /// `<config_root>/logs`.
    pub logs_dir: PathBuf,
    /// `BLEEP_LOG_LEVEL`, defaults to `info`.
    pub log_level: String,
    /// `BLE_CTF_MAC`, required only by the `ble_ctf` orchestrator.
    pub ble_ctf_mac: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let config_root = env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".bleep"))
            .unwrap_or_else(|| PathBuf::from(".bleep"));

        let db_path = env::var_os("BLEEP_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_root.join("bleep.db"));

        let log_level = env::var("BLEEP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let ble_ctf_mac = env::var("BLE_CTF_MAC").ok();

        Self {
            aoi_dir: config_root.join("aoi"),
            bonds_dir: config_root.join("bonds"),
            logs_dir: config_root.join("logs"),
            db_path,
            log_level,
            config_root,
            ble_ctf_mac,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_defaults_under_config_root() {
        let config = Config {
            config_root: PathBuf::from("/home/user/.bleep"),
            db_path: PathBuf::from("/home/user/.bleep/bleep.db"),
            aoi_dir: PathBuf::from("/home/user/.bleep/aoi"),
            bonds_dir: PathBuf::from("/home/user/.bleep/bonds"),
            logs_dir: PathBuf::from("/home/user/.bleep/logs"),
            log_level: "info".to_string(),
            ble_ctf_mac: None,
        };
        assert_eq!(config.db_path, config.config_root.join("bleep.db"));
    }
}

//! Server configuration, read from `server.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "MERCHANT_SERVER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Root of the `items/` and `merchants/` TOML directories
    pub data_dir: PathBuf,
    /// Merchant scripts, one `<merchant name>.lua` per merchant
    pub scripts_dir: PathBuf,
    pub restock_tick_secs: u64,
    /// Default tracing directive when `RUST_LOG` is unset
    pub log_filter: String,
    pub hot_reload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            scripts_dir: PathBuf::from("data/scripts/merchants"),
            restock_tick_secs: 60,
            log_filter: "merchant_server=info".to_string(),
            hot_reload: cfg!(debug_assertions),
        }
    }
}

impl ServerConfig {
    /// Load from `$MERCHANT_SERVER_CONFIG`, falling back to `server.toml`.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, String> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
        Self::parse(&contents).map_err(|e| format!("Failed to parse {:?}: {}", path, e))
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Restock tick period, never shorter than one second
    pub fn restock_tick(&self) -> Duration {
        Duration::from_secs(self.restock_tick_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = ServerConfig::load_from(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.restock_tick(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("server.toml");
        std::fs::write(&path, "data_dir = \"world\"\nrestock_tick_secs = 0\n").unwrap();

        let config = ServerConfig::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("world"));
        assert_eq!(config.scripts_dir, PathBuf::from("data/scripts/merchants"));
        assert_eq!(config.log_filter, "merchant_server=info");
        assert_eq!(config.restock_tick(), Duration::from_secs(1));
    }

    #[test]
    fn test_bad_file_is_an_error() {
        assert!(ServerConfig::parse("restock_tick_secs = \"often\"").is_err());
    }
}

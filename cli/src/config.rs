//! Keystore configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use keystore_store::CURRENT_SCHEMA_VERSION;
use keystore_store_lmdb::StoreOptions;
use keystore_types::{KeyringId, SchemaVersion, LOCAL_KEYRING_ID};
use keystore_utils::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Configuration for the keystore.
///
/// Can be loaded from a TOML file via [`KeystoreConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeystoreConfig {
    /// Directory holding the key store database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Schema version to migrate to.
    #[serde(default = "default_target_version")]
    pub target_version: u32,

    /// Maximum size of the LMDB memory map, in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Maximum number of named LMDB databases.
    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,

    /// Id of the keyring that owns the fixed legacy key lists.
    #[serde(default = "default_local_keyring_id")]
    pub local_keyring_id: String,

    /// JSON snapshot of legacy storage to import from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_path: Option<PathBuf>,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./keystore_data")
}

fn default_target_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

fn default_map_size_mb() -> usize {
    64
}

fn default_max_dbs() -> u32 {
    16
}

fn default_local_keyring_id() -> String {
    LOCAL_KEYRING_ID.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl KeystoreConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            data_dir: self.data_dir.clone(),
            map_size: self.map_size_mb.saturating_mul(1024 * 1024),
            max_dbs: self.max_dbs,
        }
    }

    pub fn target(&self) -> SchemaVersion {
        SchemaVersion::new(self.target_version)
    }

    pub fn local_keyring(&self) -> Result<KeyringId, ConfigError> {
        KeyringId::new(self.local_keyring_id.as_str()).map_err(|e| ConfigError::Invalid {
            field: "local_keyring_id",
            reason: e.to_string(),
        })
    }
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            target_version: default_target_version(),
            map_size_mb: default_map_size_mb(),
            max_dbs: default_max_dbs(),
            local_keyring_id: default_local_keyring_id(),
            legacy_path: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = KeystoreConfig {
            legacy_path: Some(PathBuf::from("legacy.json")),
            ..KeystoreConfig::default()
        };
        let toml_str = config.to_toml_string().unwrap();
        let parsed = KeystoreConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = KeystoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, KeystoreConfig::default());
        assert_eq!(config.data_dir, PathBuf::from("./keystore_data"));
        assert_eq!(config.target_version, 1);
        assert_eq!(config.local_keyring_id, "localhost|#|mailvelope");
        assert_eq!(config.log_format, LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            map_size_mb = 8
            log_format = "json"
        "#;
        let config = KeystoreConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.map_size_mb, 8);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.max_dbs, 16); // default
        assert_eq!(config.store_options().map_size, 8 * 1024 * 1024);
    }

    #[test]
    fn missing_file_returns_io_error() {
        let result = KeystoreConfig::from_toml_file(Path::new("/nonexistent/keystore.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn empty_local_keyring_is_invalid() {
        let config = KeystoreConfig {
            local_keyring_id: String::new(),
            ..KeystoreConfig::default()
        };
        assert!(matches!(
            config.local_keyring(),
            Err(ConfigError::Invalid { field: "local_keyring_id", .. })
        ));
    }

    #[test]
    fn store_options_place_db_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = KeystoreConfig {
            data_dir: dir.path().to_path_buf(),
            ..KeystoreConfig::default()
        };
        assert_eq!(config.store_options().db_path(), dir.path().join("keystore"));
    }
}

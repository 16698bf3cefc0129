use std::fs;
use std::path::{Path, PathBuf};

use common::nodes::NodeStoreConfig;
use object_store::ObjectStoreConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;

pub const DEFAULT_CONFIG_FILE: &str = "shelf.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix every node path is scoped under, e.g. a per-user root
    #[serde(default)]
    pub base_path: String,
    /// One of trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for log files (optional, logs to stderr only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Object storage backend
    #[serde(default)]
    pub store: ObjectStoreConfig,
    #[serde(default)]
    pub nodes: NodeStoreConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            log_level: default_log_level(),
            log_dir: None,
            store: ObjectStoreConfig::default(),
            nodes: NodeStoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] in the working
    /// directory. Only a missing default file falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if required {
                return Err(ConfigError::NotFound(path));
            }
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.level()?;
        Ok(config)
    }

    pub fn level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::parse(
            r#"
            base_path = "users/u1"
            log_level = "debug"
            log_dir = "/var/log/shelf"

            [store]
            type = "local"
            path = "/tmp/shelf.json"

            [nodes]
            id_length = 8

            [nodes.default_share]
            isPublic = true
            "#,
        )
        .unwrap();

        assert_eq!(config.base_path, "users/u1");
        assert_eq!(config.level().unwrap(), Level::DEBUG);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/shelf")));
        assert!(matches!(config.store, ObjectStoreConfig::Local { .. }));
        assert_eq!(config.nodes.id_length, 8);
        assert_eq!(config.nodes.upload_url_expiry_secs, 900);
        assert!(config.nodes.default_share.is_public);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.base_path, "");
        assert_eq!(config.level().unwrap(), Level::INFO);
        assert!(matches!(config.store, ObjectStoreConfig::Memory));
    }

    #[test]
    fn test_invalid_log_level() {
        let result = AppConfig::parse(r#"log_level = "loud""#);
        assert!(matches!(result, Err(ConfigError::InvalidLogLevel(l)) if l == "loud"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(matches!(
            AppConfig::load(Some(&missing)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("shelf.toml");
        fs::write(&path, "base_path = \"team\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.base_path, "team");
    }
}

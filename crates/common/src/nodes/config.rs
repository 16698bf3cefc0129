use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::share::ShareSettings;

/// Service settings, passed into [`NodeStore::new`](super::NodeStore::new).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStoreConfig {
    /// Length of generated node ids
    pub id_length: usize,
    /// Lifetime of pre-signed upload urls, in seconds
    pub upload_url_expiry_secs: u64,
    /// Settings in effect where no ancestor defines any
    pub default_share: ShareSettings,
}

fn default_id_length() -> usize {
    12
}

fn default_upload_url_expiry_secs() -> u64 {
    15 * 60
}

impl Default for NodeStoreConfig {
    fn default() -> Self {
        Self {
            id_length: default_id_length(),
            upload_url_expiry_secs: default_upload_url_expiry_secs(),
            default_share: ShareSettings::default(),
        }
    }
}

impl NodeStoreConfig {
    pub fn upload_url_expiry(&self) -> Duration {
        Duration::from_secs(self.upload_url_expiry_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: NodeStoreConfig = serde_json::from_str(r#"{"id_length": 8}"#).unwrap();
        assert_eq!(config.id_length, 8);
        assert_eq!(config.upload_url_expiry(), Duration::from_secs(900));
        assert!(!config.default_share.is_public);
    }
}

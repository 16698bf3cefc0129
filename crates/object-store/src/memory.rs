//! In-memory object store, optionally persisted to a JSON snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;
use url::Url;

use crate::client::{
    apply_patch, Listing, Metadata, MetadataPatch, ObjectEntry, ObjectStoreClient, PutOptions,
    SEPARATOR,
};
use crate::error::{ObjectStoreError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredObject {
    #[serde(serialize_with = "encode_data", deserialize_with = "decode_data")]
    data: Vec<u8>,
    content_type: Option<String>,
    metadata: Metadata,
    updated_at: DateTime<Utc>,
}

fn encode_data<S: Serializer>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

fn decode_data<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

impl StoredObject {
    fn entry(&self, key: &str) -> ObjectEntry {
        ObjectEntry {
            key: key.to_string(),
            size: self.data.len() as u64,
            content_type: self.content_type.clone(),
            updated_at: self.updated_at,
            metadata: self.metadata.clone(),
        }
    }
}

/// A [`BTreeMap`]-backed store. Used for tests and the `local` backend.
///
/// When opened with a snapshot path, every mutation rewrites the snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    snapshot: Option<PathBuf>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`, loading it if the file exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let objects = match tokio::fs::read(path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|_| ObjectStoreError::CorruptSnapshot(path.to_path_buf()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            objects: RwLock::new(objects),
            snapshot: Some(path.to_path_buf()),
            persist_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// All keys currently stored, in order.
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Raw metadata of a key, bypassing the client trait.
    pub fn metadata(&self, key: &str) -> Option<Metadata> {
        self.objects.read().get(key).map(|o| o.metadata.clone())
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().await;
        let encoded = {
            let objects = self.objects.read();
            serde_json::to_vec(&*objects)?
        };
        tokio::fs::write(path, encoded).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStoreClient for MemoryStore {
    async fn list(&self, prefix: &str, delimited: bool) -> Result<Listing> {
        let objects = self.objects.read();
        let mut listing = Listing::default();
        let mut prefixes = BTreeSet::new();

        for (key, object) in objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            let rest = &key[prefix.len()..];
            match rest.find(SEPARATOR) {
                Some(i) if delimited => {
                    prefixes.insert(key[..prefix.len() + i + 1].to_string());
                }
                _ => listing.objects.push(object.entry(key)),
            }
        }
        listing.common_prefixes = prefixes.into_iter().collect();

        debug!(
            prefix,
            delimited,
            objects = listing.objects.len(),
            prefixes = listing.common_prefixes.len(),
            "memory list"
        );
        Ok(listing)
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectEntry>> {
        Ok(self.objects.read().get(key).map(|o| o.entry(key)))
    }

    async fn set_metadata(&self, key: &str, patch: &MetadataPatch) -> Result<()> {
        {
            let mut objects = self.objects.write();
            let object = objects
                .get_mut(key)
                .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))?;
            apply_patch(&mut object.metadata, patch);
            object.updated_at = Utc::now();
        }
        self.persist().await
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        if key.is_empty() {
            return Err(ObjectStoreError::InvalidKey {
                key: key.to_string(),
                reason: "empty key".to_string(),
            });
        }
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: options.content_type,
                metadata: options.metadata,
                updated_at: Utc::now(),
            },
        );
        self.persist().await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let removed = self.objects.write().remove(key).is_some();
        if removed {
            self.persist().await?;
        }
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        {
            let mut objects = self.objects.write();
            let object = objects
                .remove(from)
                .ok_or_else(|| ObjectStoreError::NotFound(from.to_string()))?;
            objects.insert(to.to_string(), object);
        }
        self.persist().await
    }

    async fn signed_upload_url(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<Url> {
        let mut url = Url::parse("memory://uploads/")?;
        url.path_segments_mut()
            .map_err(|_| ObjectStoreError::Config("memory url has no path".to_string()))?
            .pop_if_empty()
            .extend(key.split(SEPARATOR));
        url.query_pairs_mut()
            .append_pair("contentType", content_type)
            .append_pair("expires", &expires_in.as_secs().to_string());
        Ok(url)
    }
}

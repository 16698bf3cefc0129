//! The minimal capability the node service needs from a flat object store.
//!
//! Keys are `/`-separated strings. A key ending in [`SEPARATOR`] is a
//! directory placeholder; everything else is a file. Custom metadata is a
//! flat string map attached to each key.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use url::Url;

use crate::error::Result;

/// Separator between key segments.
pub const SEPARATOR: char = '/';

/// Custom metadata as stored on a key.
pub type Metadata = BTreeMap<String, String>;

/// A metadata update. `None` removes the field.
pub type MetadataPatch = BTreeMap<String, Option<String>>;

/// One object as seen by a listing or a head request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full key, including the trailing separator for directories
    pub key: String,
    /// Payload size in bytes
    pub size: u64,
    /// Content type recorded at upload, if any
    pub content_type: Option<String>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Custom metadata
    pub metadata: Metadata,
}

/// Result of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Objects under the prefix. In delimited mode only the ones at the
    /// first level (including the prefix key itself).
    pub objects: Vec<ObjectEntry>,
    /// Delimited mode only: deeper keys folded into their first-level
    /// prefix, each ending with [`SEPARATOR`].
    pub common_prefixes: Vec<String>,
}

/// Options for [`ObjectStoreClient::put`].
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub metadata: Metadata,
}

impl PutOptions {
    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            content_type: None,
            metadata,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Flat key/value object store with prefix listing and per-key metadata.
///
/// Implementations do not retry; failures are surfaced as-is.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync + std::fmt::Debug {
    /// List every key starting with `prefix`. With `delimited` set, only
    /// the first level below the prefix is returned.
    async fn list(&self, prefix: &str, delimited: bool) -> Result<Listing>;

    /// Fetch the entry for a single key, `None` when it does not exist.
    async fn head(&self, key: &str) -> Result<Option<ObjectEntry>>;

    /// Apply a metadata patch to an existing key.
    async fn set_metadata(&self, key: &str, patch: &MetadataPatch) -> Result<()>;

    /// Write a key, replacing any existing object.
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()>;

    /// Delete a key. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Move a key, carrying its payload and metadata.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Pre-sign a URL a client can upload `key` to.
    async fn signed_upload_url(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<Url>;

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.head(key).await?.is_some())
    }
}

/// Apply a patch to a metadata map in place.
pub fn apply_patch(metadata: &mut Metadata, patch: &MetadataPatch) {
    for (field, value) in patch {
        match value {
            Some(value) => {
                metadata.insert(field.clone(), value.clone());
            }
            None => {
                metadata.remove(field);
            }
        }
    }
}

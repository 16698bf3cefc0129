//! Object storage backend abstraction (S3/MinIO/local snapshot/memory).

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use http::Method;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, GetResult, ObjectMeta, ObjectStore,
    PutOptions as StorePutOptions, PutPayload,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::{
    apply_patch, Listing, Metadata, MetadataPatch, ObjectEntry, ObjectStoreClient, PutOptions,
    SEPARATOR,
};
use crate::error::{ObjectStoreError, Result};
use crate::memory::MemoryStore;

/// Object name standing in for a directory key, since object paths cannot
/// end with a separator.
pub const DIR_MARKER: &str = ".shelf-dir";

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// In-memory storage persisted to a JSON snapshot file
    Local {
        /// Path to the snapshot file
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

impl ObjectStoreConfig {
    /// Build a client for this configuration.
    pub async fn connect(&self) -> Result<Arc<dyn ObjectStoreClient>> {
        let client: Arc<dyn ObjectStoreClient> = match self {
            ObjectStoreConfig::Memory => Arc::new(MemoryStore::new()),
            ObjectStoreConfig::Local { path } => Arc::new(MemoryStore::open(path).await?),
            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let s3 = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"))
                    .build()
                    .map_err(|e| ObjectStoreError::Config(e.to_string()))?;
                let s3 = Arc::new(s3);
                let storage = Storage::with_signer(s3.clone(), s3);
                storage.verify_bucket(bucket).await?;
                Arc::new(storage)
            }
        };
        Ok(client)
    }
}

/// [`ObjectStoreClient`] over any `object_store` backend.
///
/// Custom metadata travels as [`Attribute::Metadata`]; directory keys are
/// stored as a [`DIR_MARKER`] object inside the directory.
#[derive(Debug, Clone)]
pub struct Storage {
    inner: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
}

impl Storage {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            signer: None,
        }
    }

    pub fn with_signer(inner: Arc<dyn ObjectStore>, signer: Arc<dyn Signer>) -> Self {
        Self {
            inner,
            signer: Some(signer),
        }
    }

    /// Storage over an `object_store` in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Fail fast if the bucket does not exist.
    async fn verify_bucket(&self, bucket: &str) -> Result<()> {
        let mut stream = self.inner.list(None);
        match stream.try_next().await {
            Ok(_) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => {
                Err(ObjectStoreError::BucketNotFound(bucket.to_string()))
            }
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("NoSuchBucket") {
                    return Err(ObjectStoreError::BucketNotFound(bucket.to_string()));
                }
                Err(e.into())
            }
        }
    }

    /// Map a store key onto an object path.
    fn object_path(key: &str) -> Result<ObjectPath> {
        let invalid = |reason: String| ObjectStoreError::InvalidKey {
            key: key.to_string(),
            reason,
        };
        let raw = match key.strip_suffix(SEPARATOR) {
            Some(dir) if dir.is_empty() => return Err(invalid("root has no key".to_string())),
            Some(dir) => format!("{dir}{SEPARATOR}{DIR_MARKER}"),
            None => key.to_string(),
        };
        ObjectPath::parse(raw).map_err(|e| invalid(e.to_string()))
    }

    /// Map a listing prefix onto an object path prefix.
    fn prefix_path(prefix: &str) -> Result<Option<ObjectPath>> {
        let trimmed = prefix.trim_end_matches(SEPARATOR);
        if trimmed.is_empty() {
            return Ok(None);
        }
        ObjectPath::parse(trimmed)
            .map(Some)
            .map_err(|e| ObjectStoreError::InvalidKey {
                key: prefix.to_string(),
                reason: e.to_string(),
            })
    }

    /// Map an object path back onto a store key.
    fn key_of(location: &ObjectPath) -> String {
        let raw = location.as_ref();
        if raw == DIR_MARKER {
            return String::new();
        }
        match raw.strip_suffix(DIR_MARKER) {
            Some(dir) if dir.ends_with(SEPARATOR) => dir.to_string(),
            _ => raw.to_string(),
        }
    }

    fn split_attributes(attributes: &Attributes) -> (Option<String>, Metadata) {
        let mut content_type = None;
        let mut metadata = Metadata::new();
        for (attribute, value) in attributes.iter() {
            match attribute {
                Attribute::ContentType => content_type = Some(value.as_ref().to_string()),
                Attribute::Metadata(field) => {
                    metadata.insert(field.to_string(), value.as_ref().to_string());
                }
                _ => {}
            }
        }
        (content_type, metadata)
    }

    fn build_attributes(content_type: Option<&str>, metadata: &Metadata) -> Attributes {
        let mut attributes = Attributes::new();
        if let Some(content_type) = content_type {
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(content_type.to_string()),
            );
        }
        for (field, value) in metadata {
            attributes.insert(
                Attribute::Metadata(Cow::Owned(field.clone())),
                AttributeValue::from(value.clone()),
            );
        }
        attributes
    }

    fn entry_of(meta: &ObjectMeta, attributes: &Attributes) -> ObjectEntry {
        let (content_type, metadata) = Self::split_attributes(attributes);
        ObjectEntry {
            key: Self::key_of(&meta.location),
            size: meta.size as u64,
            content_type,
            updated_at: meta.last_modified,
            metadata,
        }
    }

    async fn get_head(&self, path: &ObjectPath) -> Result<Option<GetResult>> {
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        match self.inner.get_opts(path, options).await {
            Ok(result) => Ok(Some(result)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn entry_at(&self, path: &ObjectPath) -> Result<Option<ObjectEntry>> {
        Ok(self
            .get_head(path)
            .await?
            .map(|result| Self::entry_of(&result.meta, &result.attributes)))
    }

    async fn entries(&self, metas: Vec<ObjectMeta>) -> Result<Vec<ObjectEntry>> {
        // listings do not carry attributes, so each object needs a head
        let heads = metas.iter().map(|meta| self.entry_at(&meta.location));
        let entries = futures::future::try_join_all(heads).await?;
        Ok(entries.into_iter().flatten().collect())
    }
}

#[async_trait]
impl ObjectStoreClient for Storage {
    async fn list(&self, prefix: &str, delimited: bool) -> Result<Listing> {
        let path = Self::prefix_path(prefix)?;

        let (metas, common_prefixes) = if delimited {
            let result = self.inner.list_with_delimiter(path.as_ref()).await?;
            let prefixes = result
                .common_prefixes
                .iter()
                .map(|p| format!("{}{SEPARATOR}", p.as_ref()))
                .collect();
            (result.objects, prefixes)
        } else {
            let metas: Vec<ObjectMeta> = self.inner.list(path.as_ref()).try_collect().await?;
            (metas, Vec::new())
        };

        let mut objects = self.entries(metas).await?;
        objects.retain(|entry| !entry.key.is_empty() && entry.key.starts_with(prefix));
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        let common_prefixes = common_prefixes
            .into_iter()
            .filter(|p: &String| p.starts_with(prefix))
            .collect();

        debug!(prefix, delimited, objects = objects.len(), "object store list");
        Ok(Listing {
            objects,
            common_prefixes,
        })
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectEntry>> {
        let path = Self::object_path(key)?;
        self.entry_at(&path).await
    }

    async fn set_metadata(&self, key: &str, patch: &MetadataPatch) -> Result<()> {
        // no native metadata update: rewrite the object with merged attributes
        let path = Self::object_path(key)?;
        let result = match self.inner.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(ObjectStoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let (content_type, mut metadata) = Self::split_attributes(&result.attributes);
        let data = result.bytes().await?;
        apply_patch(&mut metadata, patch);

        let options = StorePutOptions {
            attributes: Self::build_attributes(content_type.as_deref(), &metadata),
            ..Default::default()
        };
        self.inner
            .put_opts(&path, PutPayload::from(data), options)
            .await?;
        Ok(())
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        let path = Self::object_path(key)?;
        let put_options = StorePutOptions {
            attributes: Self::build_attributes(options.content_type.as_deref(), &options.metadata),
            ..Default::default()
        };
        self.inner
            .put_opts(&path, PutPayload::from(data), put_options)
            .await?;
        debug!(key, "put object");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = Self::object_path(key)?;
        match self.inner.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = Self::object_path(from)?;
        let to_path = Self::object_path(to)?;
        match self.inner.rename(&from_path, &to_path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => {
                Err(ObjectStoreError::NotFound(from.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn signed_upload_url(
        &self,
        key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> Result<Url> {
        let signer = self
            .signer
            .as_ref()
            .ok_or(ObjectStoreError::Unsupported("signed upload urls"))?;
        let path = Self::object_path(key)?;
        Ok(signer.signed_url(Method::PUT, &path, expires_in).await?)
    }
}

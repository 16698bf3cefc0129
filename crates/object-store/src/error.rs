//! Error types for the object store client.

use std::path::PathBuf;

/// Errors that can occur when talking to the backing object store.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    /// Object storage error
    #[error("object storage error: {0}")]
    Backend(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error
    #[error("snapshot error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL construction error
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Key not present in the store
    #[error("key not found: {0}")]
    NotFound(String),

    /// Key cannot be represented by the backend
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Operation not available on this backend
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Snapshot file could not be decoded
    #[error("corrupt snapshot at {0}")]
    CorruptSnapshot(PathBuf),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before starting.")]
    BucketNotFound(String),
}

/// Result type alias for object store operations.
pub type Result<T> = std::result::Result<T, ObjectStoreError>;

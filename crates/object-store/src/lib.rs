//! Object store client
//!
//! This crate defines the small capability a hierarchical node service needs
//! from a flat object store: prefix listing, per-key custom metadata, put,
//! delete, rename and pre-signed uploads. It ships two implementations:
//!
//! - [`MemoryStore`]: a sorted in-memory map, optionally persisted to a
//!   JSON snapshot file
//! - [`Storage`]: an adapter over the `object_store` crate (S3/MinIO and its
//!   in-memory backend)
//!
//! # Example
//!
//! ```rust,no_run
//! use shelf_object_store::{ObjectStoreConfig, ObjectStoreClient};
//!
//! # async fn example() -> Result<(), shelf_object_store::ObjectStoreError> {
//! let client = ObjectStoreConfig::Memory.connect().await?;
//! let listing = client.list("users/u1/", true).await?;
//! println!("{} objects", listing.objects.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod memory;
mod storage;

pub use client::{
    apply_patch, Listing, Metadata, MetadataPatch, ObjectEntry, ObjectStoreClient, PutOptions,
    SEPARATOR,
};
pub use error::{ObjectStoreError, Result};
pub use memory::MemoryStore;
pub use storage::{ObjectStoreConfig, Storage, DIR_MARKER};

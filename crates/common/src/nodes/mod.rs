//! Hierarchical nodes over a flat object store
//!
//! This module emulates a file/directory tree on top of a store that only
//! knows flat keys:
//!
//! - **[`StorageNode`]**: one file or directory, rebuilt from the store on
//!   every call
//! - **[`ShareSettings`]** / **[`Share`]**: per-node access control, inherited
//!   from the nearest ancestor that defines some
//! - **[`NodeStore`]**: listing, creation, moves, renames, removal, sharing
//!   and upload reconciliation
//!
//! # Key layout
//!
//! ```text
//! <base>/photos/            directory key (trailing separator, empty body)
//! <base>/photos/a.png       file key
//! <base>/photos/2024/b.png  file key; implies directory photos/2024
//! ```
//!
//! Directories implied by deeper keys but missing their own key are
//! *virtual*. Listings report them with `exists == false`; writes that touch
//! them create the key.
//!
//! ## Metadata
//!
//! Every key carries two custom string fields: `id`, a short random token,
//! and `share`, the JSON encoding of the node's own [`ShareSettings`]. An
//! absent `share` means the node inherits.

pub mod config;
pub mod hierarchy;
pub mod materializer;
pub mod metadata;
pub mod node;
pub mod path;
pub mod share;
mod store;

pub use config::NodeStoreConfig;
pub use hierarchy::NodeHierarchy;
pub use metadata::{MetadataError, NodeMeta};
pub use node::{NodeType, StorageNode};
pub use path::PathError;
pub use share::{merge as merge_share, Share, ShareSettings};
pub use store::{NodeStore, NodeStoreError, UploadRequest};

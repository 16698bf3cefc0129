/**
 * Files and directories emulated on top of
 *  a flat object store.
 * Path helpers, the metadata codec, share
 *  inheritance and the node service.
 */
pub mod nodes;

pub mod prelude {
    pub use crate::nodes::{
        NodeStore, NodeStoreConfig, NodeStoreError, NodeType, Share, ShareSettings, StorageNode,
        UploadRequest,
    };
}

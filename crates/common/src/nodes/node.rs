use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::NodeMeta;
use super::path;
use super::share::Share;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    File,
    Dir,
}

/**
 * Storage nodes
 * =============
 * A node is a file or directory in the tree emulated on top of the flat
 *  object store. Nodes are values: they are rebuilt from the store on every
 *  call and never cached, so the store stays the only source of truth.
 * `path` is relative to the caller's base path and is unique within it.
 *  `exists` is false for directories that are only implied by deeper keys.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageNode {
    /// Short opaque id, `None` until assigned
    pub id: Option<String>,
    pub node_type: NodeType,
    pub path: String,
    pub name: String,
    pub dir: String,
    /// File only
    pub content_type: Option<String>,
    /// File only
    pub size: Option<u64>,
    pub share: Share,
    pub exists: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StorageNode {
    fn bare(path: &str, node_type: NodeType) -> Self {
        let (dir, name) = path::split(path);
        Self {
            id: None,
            node_type,
            path: path.to_string(),
            name: name.to_string(),
            dir: dir.to_string(),
            content_type: None,
            size: None,
            share: Share::Inherited,
            exists: false,
            updated_at: None,
        }
    }

    /// A directory implied by deeper keys but not stored itself.
    pub fn virtual_dir(path: &str) -> Self {
        Self::bare(path, NodeType::Dir)
    }

    /// A file that is not stored (yet).
    pub fn virtual_file(path: &str) -> Self {
        Self::bare(path, NodeType::File)
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Dir
    }

    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }

    pub fn meta(&self) -> NodeMeta {
        NodeMeta {
            id: self.id.clone(),
            share: self.share.clone(),
        }
    }

    /// The same node at another path.
    pub fn relocated(&self, path: &str) -> Self {
        let (dir, name) = path::split(path);
        Self {
            path: path.to_string(),
            name: name.to_string(),
            dir: dir.to_string(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_virtual_dir_derives_name_and_dir() {
        let node = StorageNode::virtual_dir("a/b/c");
        assert_eq!(node.name, "c");
        assert_eq!(node.dir, "a/b");
        assert!(!node.exists);
        assert!(node.is_dir());

        let top = StorageNode::virtual_dir("top");
        assert_eq!(top.dir, "");
        assert_eq!(top.name, "top");
    }

    #[test]
    fn test_relocated_keeps_identity() {
        let mut node = StorageNode::virtual_file("photos/a.png");
        node.id = Some("n1".to_string());
        node.exists = true;

        let moved = node.relocated("archive/photos/a.png");
        assert_eq!(moved.id.as_deref(), Some("n1"));
        assert_eq!(moved.dir, "archive/photos");
        assert_eq!(moved.name, "a.png");
        assert!(moved.exists);
    }
}

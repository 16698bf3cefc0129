use std::collections::BTreeMap;

use super::node::StorageNode;
use super::path;
use super::share::ShareSettings;

/// The directories around a set of target paths, loaded once per operation.
///
/// Holds real and virtual (`exists == false`) directory nodes keyed by path
/// and answers inheritance questions without going back to the store.
#[derive(Debug, Clone, Default)]
pub struct NodeHierarchy {
    nodes: BTreeMap<String, StorageNode>,
    default_share: ShareSettings,
}

impl NodeHierarchy {
    pub fn new(default_share: ShareSettings) -> Self {
        Self {
            nodes: BTreeMap::new(),
            default_share,
        }
    }

    pub fn insert(&mut self, node: StorageNode) {
        self.nodes.insert(node.path.clone(), node);
    }

    pub fn get(&self, path: &str) -> Option<&StorageNode> {
        self.nodes.get(path)
    }

    /// Whether `path` is stored. The root always exists.
    pub fn exists(&self, path: &str) -> bool {
        path.is_empty() || self.nodes.get(path).is_some_and(|n| n.exists)
    }

    /// Effective settings at `path`: the explicit settings of `path` or of
    /// its nearest stored ancestor that has some, else the default.
    pub fn nearest_share_settings(&self, path: &str) -> ShareSettings {
        let mut current = path;
        loop {
            if let Some(settings) = self
                .nodes
                .get(current)
                .filter(|n| n.exists)
                .and_then(|n| n.share.explicit())
            {
                return settings.clone();
            }
            if current.is_empty() {
                return self.default_share.clone();
            }
            current = path::parent(current);
        }
    }

    /// Nearest stored directory at or above `path`, if any.
    pub fn nearest_existing(&self, path: &str) -> Option<&StorageNode> {
        let mut current = path;
        while !current.is_empty() {
            if let Some(node) = self.nodes.get(current).filter(|n| n.exists) {
                return Some(node);
            }
            current = path::parent(current);
        }
        None
    }
}

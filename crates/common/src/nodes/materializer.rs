//! Turns raw store entries into [`StorageNode`]s and fills in the
//! directories a set of nodes implies.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use futures::future::try_join_all;
use object_store::{MetadataPatch, ObjectEntry, ObjectStoreClient, PutOptions};
use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use super::config::NodeStoreConfig;
use super::hierarchy::NodeHierarchy;
use super::metadata::{self, ID_FIELD};
use super::node::{NodeType, StorageNode};
use super::path;
use super::share::Share;
use super::store::NodeStoreError;

/// Nodes of one operation, keyed by path.
pub type NodeMap = BTreeMap<String, StorageNode>;

/// Borrowed view of the service used to read and write nodes.
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'a> {
    client: &'a dyn ObjectStoreClient,
    base: &'a str,
    config: &'a NodeStoreConfig,
}

impl<'a> Materializer<'a> {
    pub fn new(
        client: &'a dyn ObjectStoreClient,
        base: &'a str,
        config: &'a NodeStoreConfig,
    ) -> Self {
        Self {
            client,
            base,
            config,
        }
    }

    /// Build a node from a listed entry. `None` for the scope root or keys
    /// outside the base path.
    pub fn to_node(&self, entry: &ObjectEntry) -> Option<StorageNode> {
        let (relative, node_type) = path::relativize(self.base, &entry.key)?;
        let meta = metadata::decode(&entry.metadata);
        let mut node = match node_type {
            NodeType::Dir => StorageNode::virtual_dir(&relative),
            NodeType::File => {
                let mut node = StorageNode::virtual_file(&relative);
                node.content_type = entry.content_type.clone();
                node.size = Some(entry.size);
                node
            }
        };
        node.id = meta.id;
        node.share = meta.share;
        node.exists = true;
        node.updated_at = Some(entry.updated_at);
        Some(node)
    }

    /// Store key of a node.
    pub fn key_of(&self, node: &StorageNode) -> String {
        match node.node_type {
            NodeType::Dir => path::dir_key(self.base, &node.path),
            NodeType::File => path::file_key(self.base, &node.path),
        }
    }

    pub fn new_id(&self) -> String {
        rand::rng()
            .sample_iter(Alphanumeric)
            .take(self.config.id_length.max(1))
            .map(char::from)
            .collect()
    }

    /// Give a stored node an id if it has none. No-op otherwise.
    pub async fn assign_id(&self, node: &mut StorageNode) -> Result<(), NodeStoreError> {
        if node.id.is_some() {
            return Ok(());
        }
        let id = self.new_id();
        let mut patch = MetadataPatch::new();
        patch.insert(ID_FIELD.to_string(), Some(id.clone()));
        self.client.set_metadata(&self.key_of(node), &patch).await?;
        debug!(path = %node.path, id = %id, "assigned node id");
        node.id = Some(id);
        Ok(())
    }

    /// Load every directory at or above the given paths.
    pub async fn load_hierarchy<I, S>(&self, dirs: I) -> Result<NodeHierarchy, NodeStoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = path::split_hierarchy(dirs);
        let heads = paths.iter().map(|p| async move {
            let entry = self.client.head(&path::dir_key(self.base, p)).await?;
            Ok::<_, NodeStoreError>(
                entry
                    .and_then(|entry| self.to_node(&entry))
                    .unwrap_or_else(|| StorageNode::virtual_dir(p)),
            )
        });

        let mut hierarchy = NodeHierarchy::new(self.config.default_share.clone());
        for node in try_join_all(heads).await? {
            hierarchy.insert(node);
        }
        Ok(hierarchy)
    }

    /// Make sure every directory in `paths` is stored, with an id.
    ///
    /// Missing directories copy the effective settings of their nearest
    /// stored ancestor. `hierarchy` must already hold every ancestor of
    /// `paths` and is updated with the result. Returns the node for each
    /// path.
    ///
    /// Fails with [`NodeStoreError::PathAlreadyExists`] before writing
    /// anything when a file sits where a missing directory would go.
    pub async fn ensure_dirs(
        &self,
        hierarchy: &mut NodeHierarchy,
        paths: &BTreeSet<String>,
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let missing: Vec<&String> = paths.iter().filter(|p| !hierarchy.exists(p)).collect();
        let file_keys: Vec<String> = missing
            .iter()
            .map(|p| path::file_key(self.base, p))
            .collect();
        let clashes = try_join_all(file_keys.iter().map(|key| self.client.exists(key))).await?;
        if let Some((p, _)) = missing.iter().zip(clashes).find(|(_, clash)| *clash) {
            return Err(NodeStoreError::PathAlreadyExists(p.to_string()));
        }

        let pending = paths.iter().map(|p| {
            let existing = hierarchy.get(p).filter(|n| n.exists).cloned();
            let inherited = hierarchy.nearest_share_settings(p);
            async move {
                match existing {
                    Some(mut node) => {
                        self.assign_id(&mut node).await?;
                        Ok::<_, NodeStoreError>(node)
                    }
                    None => self.create_dir(p, Share::from_settings(Some(inherited))).await,
                }
            }
        });

        let nodes = try_join_all(pending).await?;
        for node in &nodes {
            hierarchy.insert(node.clone());
        }
        Ok(nodes)
    }

    async fn create_dir(&self, dir: &str, share: Share) -> Result<StorageNode, NodeStoreError> {
        let mut node = StorageNode::virtual_dir(dir);
        node.id = Some(self.new_id());
        node.share = share;

        let stored = metadata::to_metadata(&node.meta())?;
        self.client
            .put(&self.key_of(&node), Bytes::new(), PutOptions::with_metadata(stored))
            .await?;
        info!(path = %dir, "created directory");

        node.exists = true;
        Ok(node)
    }

    /// Add a virtual (`exists == false`) node for every directory implied
    /// by the nodes in `nodes` that lies below `boundary` and is missing
    /// from the map. No store calls; write paths use
    /// [`Materializer::ensure_dirs`] instead.
    ///
    /// Returns the nodes that were added.
    pub fn pad_ancestors(&self, nodes: &mut NodeMap, boundary: &str) -> Vec<StorageNode> {
        let implied = path::split_hierarchy(nodes.values().map(|n| n.dir.as_str()));
        let added: Vec<StorageNode> = implied
            .into_iter()
            .filter(|p| path::is_descendant(p, boundary) && !nodes.contains_key(p))
            .map(|p| StorageNode::virtual_dir(&p))
            .collect();
        if !added.is_empty() {
            debug!(count = added.len(), "padding virtual ancestors");
        }

        for node in &added {
            nodes.insert(node.path.clone(), node.clone());
        }
        added
    }

    /// Write a node's share field.
    pub async fn write_share(&self, node: &StorageNode) -> Result<(), NodeStoreError> {
        let patch = metadata::encode_share_patch(&node.share)?;
        self.client.set_metadata(&self.key_of(node), &patch).await?;
        Ok(())
    }

    /// Write a node's id and share fields together.
    pub async fn write_meta(&self, node: &StorageNode) -> Result<(), NodeStoreError> {
        let patch = metadata::encode(&node.meta())?;
        self.client.set_metadata(&self.key_of(node), &patch).await?;
        Ok(())
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::TryFutureExt;
use object_store::{ObjectEntry, ObjectStoreClient, ObjectStoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::config::NodeStoreConfig;
use super::materializer::{Materializer, NodeMap};
use super::metadata::MetadataError;
use super::node::{NodeType, StorageNode};
use super::path::{self, PathError};
use super::share::{self, Share, ShareSettings};

#[derive(Debug, thiserror::Error)]
pub enum NodeStoreError {
    #[error("invalid path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathError,
    },
    #[error("source and destination are the same: {0}")]
    SamePath(String),
    #[error("cannot move '{from}' to '{to}': destination is inside source")]
    MoveIntoSelf { from: String, to: String },
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("path already exists: {0}")]
    PathAlreadyExists(String),
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("object store error: {0}")]
    Store(#[from] ObjectStoreError),
}

impl NodeStoreError {
    /// Errors caused by the request itself; retrying it unchanged fails
    /// the same way.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            NodeStoreError::InvalidPath { .. }
                | NodeStoreError::SamePath(_)
                | NodeStoreError::MoveIntoSelf { .. }
                | NodeStoreError::PathAlreadyExists(_)
        )
    }
}

/// One requested upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub path: String,
    pub content_type: String,
}

impl UploadRequest {
    pub fn new(path: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
        }
    }
}

/// Files and directories on top of a flat object store.
///
/// Every call rebuilds its view from the store; the service keeps no state
/// between calls. Fan-out writes run in parallel and the first failure is
/// returned, possibly after some of the writes landed. Every operation can
/// be re-run with the same arguments to finish the job.
#[derive(Debug, Clone)]
pub struct NodeStore {
    client: Arc<dyn ObjectStoreClient>,
    config: Arc<NodeStoreConfig>,
    base: String,
}

impl NodeStore {
    pub fn new(client: Arc<dyn ObjectStoreClient>, config: NodeStoreConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
            base: String::new(),
        }
    }

    /// The same service scoped to `base`, e.g. a per-user root. Paths in
    /// and out are relative to it.
    pub fn with_base_path(&self, base: &str) -> Result<Self, NodeStoreError> {
        let base = Self::check_optional(Some(base))?;
        Ok(Self {
            client: self.client.clone(),
            config: self.config.clone(),
            base,
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base
    }

    pub fn config(&self) -> &NodeStoreConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn ObjectStoreClient> {
        &self.client
    }

    fn materializer(&self) -> Materializer<'_> {
        Materializer::new(self.client.as_ref(), &self.base, &self.config)
    }

    fn check(path: &str) -> Result<String, NodeStoreError> {
        path::validate(path).map_err(|source| NodeStoreError::InvalidPath {
            path: path.to_string(),
            source,
        })
    }

    fn check_optional(path: Option<&str>) -> Result<String, NodeStoreError> {
        match path.map(path::normalize) {
            Some(p) if !p.is_empty() => Self::check(&p),
            _ => Ok(String::new()),
        }
    }

    fn check_all<S: AsRef<str>>(paths: &[S]) -> Result<Vec<String>, NodeStoreError> {
        paths.iter().map(|p| Self::check(p.as_ref())).collect()
    }

    fn check_move(from: &str, to: &str) -> Result<(), NodeStoreError> {
        if from == to {
            return Err(NodeStoreError::SamePath(from.to_string()));
        }
        if path::is_descendant(to, from) {
            return Err(NodeStoreError::MoveIntoSelf {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Whether anything is stored at or below the directory `path`, its
    /// own key or only deeper keys.
    async fn dir_occupied(&self, path: &str) -> Result<bool, NodeStoreError> {
        let listing = self
            .client
            .list(&path::dir_key(&self.base, path), false)
            .await?;
        Ok(!listing.objects.is_empty())
    }

    fn sorted(nodes: impl IntoIterator<Item = StorageNode>) -> Vec<StorageNode> {
        let mut nodes: Vec<_> = nodes.into_iter().collect();
        path::sort_nodes(&mut nodes);
        nodes
    }

    // Reads

    /// Look up a single node, file key first.
    pub async fn get_node(&self, path: &str) -> Result<Option<StorageNode>, NodeStoreError> {
        let path = Self::check(path)?;
        let m = self.materializer();
        let file_key = path::file_key(&self.base, &path);
        let dir_key = path::dir_key(&self.base, &path);
        let (file, dir) =
            futures::try_join!(self.client.head(&file_key), self.client.head(&dir_key))?;
        Ok(file.or(dir).and_then(|entry| m.to_node(&entry)))
    }

    /// Settings in effect at `path`, following inheritance.
    pub async fn effective_share_settings(
        &self,
        path: &str,
    ) -> Result<ShareSettings, NodeStoreError> {
        let node = self
            .get_node(path)
            .await?
            .ok_or_else(|| NodeStoreError::PathNotFound(path.to_string()))?;
        if let Some(settings) = node.share.explicit() {
            return Ok(settings.clone());
        }
        let hierarchy = self.materializer().load_hierarchy([node.dir.as_str()]).await?;
        Ok(hierarchy.nearest_share_settings(&node.dir))
    }

    /// Everything at or below `dir`, padded with virtual directories and in
    /// display order.
    ///
    /// When nothing exists at or below `dir`, the nearest stored ancestor is
    /// returned instead.
    pub async fn list_descendants(
        &self,
        dir: Option<&str>,
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let dir = Self::check_optional(dir)?;
        let m = self.materializer();

        let listing = self
            .client
            .list(&path::dir_key(&self.base, &dir), false)
            .await?;
        let mut nodes: NodeMap = listing
            .objects
            .iter()
            .filter_map(|entry| m.to_node(entry))
            .map(|node| (node.path.clone(), node))
            .collect();

        if nodes.is_empty() && !dir.is_empty() {
            let parent = path::parent(&dir);
            let hierarchy = m.load_hierarchy([parent]).await?;
            if let Some(ancestor) = hierarchy.nearest_existing(parent) {
                debug!(
                    dir = %dir,
                    ancestor = %ancestor.path,
                    "directory empty, falling back to ancestor"
                );
                nodes.insert(ancestor.path.clone(), ancestor.clone());
            }
        }

        m.pad_ancestors(&mut nodes, path::parent(&dir));
        Ok(Self::sorted(nodes.into_values()))
    }

    /// The immediate children of `dir`, in display order.
    ///
    /// Directories seen only through deeper keys are created on the way, as
    /// is `dir` itself once anything is found under it.
    pub async fn list_children(
        &self,
        dir: Option<&str>,
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let dir = Self::check_optional(dir)?;
        let m = self.materializer();

        let listing = self
            .client
            .list(&path::dir_key(&self.base, &dir), true)
            .await?;
        let mut children: NodeMap = listing
            .objects
            .iter()
            .filter_map(|entry| m.to_node(entry))
            .filter(|node| node.path != dir)
            .map(|node| (node.path.clone(), node))
            .collect();
        // keys below a file name are left alone rather than turned into a
        // directory on top of the file
        let subdirs: BTreeSet<String> = listing
            .common_prefixes
            .iter()
            .filter_map(|prefix| path::relativize(&self.base, prefix))
            .map(|(p, _)| p)
            .filter(|p| {
                let shadowed = children.get(p).is_some_and(|n| n.node_type == NodeType::File);
                if shadowed {
                    warn!(path = %p, "keys found below a file, skipping");
                }
                !shadowed
            })
            .collect();

        if children.is_empty() && subdirs.is_empty() {
            return Ok(Vec::new());
        }

        let mut observed = subdirs.clone();
        if !dir.is_empty() {
            observed.insert(dir.clone());
        }
        let wanted = path::split_hierarchy(&observed);
        let mut hierarchy = m.load_hierarchy(&wanted).await?;
        for node in m.ensure_dirs(&mut hierarchy, &wanted).await? {
            if subdirs.contains(&node.path) {
                children.insert(node.path.clone(), node);
            }
        }

        Ok(Self::sorted(children.into_values()))
    }

    // Writes

    /// Create directories and every missing ancestor.
    ///
    /// New directories copy the effective settings of their nearest stored
    /// ancestor; with none, the configured default applies. Returns the
    /// nodes of the requested paths and their ancestors.
    pub async fn create_dirs<S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let targets = Self::check_all(paths)?;
        let m = self.materializer();
        let wanted = path::split_hierarchy(&targets);
        let mut hierarchy = m.load_hierarchy(&wanted).await?;
        let nodes = m.ensure_dirs(&mut hierarchy, &wanted).await?;
        info!(requested = targets.len(), total = nodes.len(), "created directories");
        Ok(Self::sorted(nodes))
    }

    /// Move a directory and everything below it.
    ///
    /// The subtree is snapshotted first, then the directory key is moved,
    /// then every descendant in parallel. Explicit share settings are
    /// carried from the old parent to the new one with [`share::merge`].
    /// Missing ancestors of the destination are created.
    ///
    /// With the source directory key present the destination must be
    /// empty. Without it the call finishes an interrupted move, and only
    /// keys that would be overwritten are a conflict.
    pub async fn move_dir(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let from = Self::check(from)?;
        let to = Self::check(to)?;
        Self::check_move(&from, &to)?;
        let m = self.materializer();

        let from_key = path::dir_key(&self.base, &from);
        let to_key = path::dir_key(&self.base, &to);
        let to_file_key = path::file_key(&self.base, &to);
        let (listing, existing, to_is_file) = futures::try_join!(
            self.client.list(&from_key, false),
            self.client.list(&to_key, false),
            self.client.exists(&to_file_key),
        )?;
        let snapshot: Vec<StorageNode> = listing
            .objects
            .iter()
            .filter_map(|entry| m.to_node(entry))
            .collect();
        if snapshot.is_empty() {
            return Err(NodeStoreError::PathNotFound(from));
        }
        let source_dir = snapshot
            .iter()
            .find(|node| node.path == from && node.is_dir())
            .cloned();
        if to_is_file || (source_dir.is_some() && !existing.objects.is_empty()) {
            return Err(NodeStoreError::PathAlreadyExists(to));
        }

        let to_parent = path::parent(&to).to_string();
        let mut hierarchy = m
            .load_hierarchy([path::parent(&from), to.as_str()])
            .await?;
        let from_settings = hierarchy.nearest_share_settings(path::parent(&from));
        let to_settings = hierarchy.nearest_share_settings(&to_parent);

        let plan: Vec<(StorageNode, StorageNode)> = snapshot
            .iter()
            .map(|node| {
                let mut moved = node.relocated(&path::rebase(&node.path, &from, &to));
                if let Share::Explicit(settings) = &node.share {
                    let merged = share::merge(settings, &from_settings, &to_settings);
                    moved.share = Share::from_settings(Some(merged));
                }
                (node.clone(), moved)
            })
            .collect();

        let taken: BTreeSet<&str> = existing.objects.iter().map(|e| e.key.as_str()).collect();
        if let Some((_, moved)) = plan
            .iter()
            .find(|(_, moved)| taken.contains(m.key_of(moved).as_str()))
        {
            return Err(NodeStoreError::PathAlreadyExists(moved.path.clone()));
        }

        let dest_ancestors = path::split_hierarchy([to_parent.as_str()]);
        m.ensure_dirs(&mut hierarchy, &dest_ancestors).await?;

        let (own, descendants): (Vec<_>, Vec<_>) = plan
            .into_iter()
            .partition(|(node, _)| node.path == from && node.is_dir());

        let mut moved_nodes = Vec::with_capacity(snapshot.len() + 1);
        for (node, moved) in own {
            self.relocate(&m, &node, &moved).await?;
            moved_nodes.push(moved);
        }
        debug!(from = %from, to = %to, count = descendants.len(), "moving descendants");
        try_join_all(
            descendants
                .iter()
                .map(|(node, moved)| self.relocate(&m, node, moved)),
        )
        .await?;
        moved_nodes.extend(descendants.into_iter().map(|(_, moved)| moved));

        if source_dir.is_none() && !hierarchy.exists(&to) {
            let created = m
                .ensure_dirs(&mut hierarchy, &BTreeSet::from([to.clone()]))
                .await?;
            moved_nodes.extend(created);
        }

        info!(from = %from, to = %to, nodes = moved_nodes.len(), "moved directory");
        Ok(Self::sorted(moved_nodes))
    }

    /// Move a single file into an existing directory.
    pub async fn move_file(&self, from: &str, to: &str) -> Result<StorageNode, NodeStoreError> {
        let from = Self::check(from)?;
        let to = Self::check(to)?;
        Self::check_move(&from, &to)?;
        let m = self.materializer();

        let source_key = path::file_key(&self.base, &from);
        let dest_file_key = path::file_key(&self.base, &to);
        let (source, dest_file, dest_dir) = futures::try_join!(
            self.client.head(&source_key).map_err(NodeStoreError::from),
            self.client.exists(&dest_file_key).map_err(NodeStoreError::from),
            self.dir_occupied(&to),
        )?;
        let node = source
            .and_then(|entry| m.to_node(&entry))
            .ok_or_else(|| NodeStoreError::PathNotFound(from.clone()))?;
        if dest_file || dest_dir {
            return Err(NodeStoreError::PathAlreadyExists(to));
        }

        let to_parent = path::parent(&to);
        let hierarchy = m.load_hierarchy([node.dir.as_str(), to_parent]).await?;
        if !hierarchy.exists(to_parent) {
            return Err(NodeStoreError::PathNotFound(to_parent.to_string()));
        }

        let mut moved = node.relocated(&to);
        if let Share::Explicit(settings) = &node.share {
            let merged = share::merge(
                settings,
                &hierarchy.nearest_share_settings(&node.dir),
                &hierarchy.nearest_share_settings(to_parent),
            );
            moved.share = Share::from_settings(Some(merged));
        }
        self.relocate(&m, &node, &moved).await?;

        info!(from = %from, to = %to, "moved file");
        Ok(moved)
    }

    async fn relocate(
        &self,
        m: &Materializer<'_>,
        node: &StorageNode,
        moved: &StorageNode,
    ) -> Result<(), NodeStoreError> {
        self.client.rename(&m.key_of(node), &m.key_of(moved)).await?;
        if moved.share != node.share {
            m.write_share(moved).await?;
        }
        Ok(())
    }

    async fn check_rename(
        &self,
        path: &str,
        new_name: &str,
    ) -> Result<(String, String), NodeStoreError> {
        let path = Self::check(path)?;
        let name =
            path::validate_name(new_name).map_err(|source| NodeStoreError::InvalidPath {
                path: new_name.to_string(),
                source,
            })?;
        let to = path::join(path::parent(&path), &name);
        if to == path {
            return Err(NodeStoreError::SamePath(path));
        }

        let file_key = path::file_key(&self.base, &to);
        let (file, dir) = futures::try_join!(
            self.client.exists(&file_key).map_err(NodeStoreError::from),
            self.dir_occupied(&to),
        )?;
        if file || dir {
            return Err(NodeStoreError::PathAlreadyExists(to));
        }
        Ok((path, to))
    }

    /// Rename a directory within its parent.
    pub async fn rename_dir(
        &self,
        path: &str,
        new_name: &str,
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let (from, to) = self.check_rename(path, new_name).await?;
        self.move_dir(&from, &to).await
    }

    /// Rename a file within its directory.
    pub async fn rename_file(
        &self,
        path: &str,
        new_name: &str,
    ) -> Result<StorageNode, NodeStoreError> {
        let (from, to) = self.check_rename(path, new_name).await?;
        self.move_file(&from, &to).await
    }

    /// Delete directories with everything below them. Missing paths are
    /// skipped. Returns the deleted nodes.
    pub async fn remove_dirs<S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let dirs = Self::check_all(paths)?;
        let m = self.materializer();

        let prefixes: Vec<String> = dirs.iter().map(|dir| path::dir_key(&self.base, dir)).collect();
        let listings =
            try_join_all(prefixes.iter().map(|prefix| self.client.list(prefix, false))).await?;
        let doomed: NodeMap = listings
            .iter()
            .flat_map(|listing| listing.objects.iter())
            .filter_map(|entry| m.to_node(entry))
            .map(|node| (node.path.clone(), node))
            .collect();

        self.delete_all(&m, doomed.values()).await?;

        info!(requested = dirs.len(), deleted = doomed.len(), "removed directories");
        Ok(Self::sorted(doomed.into_values()))
    }

    /// Delete files. Missing paths are skipped. Returns the deleted nodes.
    pub async fn remove_files<S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let files = Self::check_all(paths)?;
        let m = self.materializer();

        let heads = self.head_files(&files).await?;
        let doomed: NodeMap = heads
            .iter()
            .flatten()
            .filter_map(|entry| m.to_node(entry))
            .map(|node| (node.path.clone(), node))
            .collect();

        self.delete_all(&m, doomed.values()).await?;

        info!(requested = files.len(), deleted = doomed.len(), "removed files");
        Ok(Self::sorted(doomed.into_values()))
    }

    async fn head_files(
        &self,
        files: &[String],
    ) -> Result<Vec<Option<ObjectEntry>>, NodeStoreError> {
        let keys: Vec<String> = files.iter().map(|f| path::file_key(&self.base, f)).collect();
        Ok(try_join_all(keys.iter().map(|key| self.client.head(key))).await?)
    }

    async fn delete_all<'n>(
        &self,
        m: &Materializer<'_>,
        nodes: impl Iterator<Item = &'n StorageNode>,
    ) -> Result<(), NodeStoreError> {
        let keys: Vec<String> = nodes.map(|node| m.key_of(node)).collect();
        try_join_all(keys.iter().map(|key| self.client.delete(key))).await?;
        Ok(())
    }

    /// Set or clear (`None`) a node's own share settings.
    ///
    /// For a directory, descendants with settings of their own are carried
    /// from the old effective settings to the new ones with
    /// [`share::merge`]; inheriting descendants follow automatically.
    /// Returns the node followed by its descendants.
    pub async fn set_share_settings(
        &self,
        path: &str,
        settings: Option<ShareSettings>,
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let mut node = self
            .get_node(path)
            .await?
            .ok_or_else(|| NodeStoreError::PathNotFound(path::normalize(path)))?;
        let m = self.materializer();
        let new_share = Share::from_settings(settings);

        if node.node_type == NodeType::File {
            if node.share != new_share {
                node.share = new_share;
                m.write_share(&node).await?;
            }
            info!(path = %node.path, "updated file share settings");
            return Ok(vec![node]);
        }

        let hierarchy = m.load_hierarchy([node.dir.as_str()]).await?;
        let inherited = hierarchy.nearest_share_settings(&node.dir);
        let old = node
            .share
            .explicit()
            .cloned()
            .unwrap_or_else(|| inherited.clone());
        let new = new_share.explicit().cloned().unwrap_or(inherited);

        node.share = new_share;
        m.write_share(&node).await?;

        let listing = self
            .client
            .list(&path::dir_key(&self.base, &node.path), false)
            .await?;
        let mut descendants: Vec<StorageNode> = listing
            .objects
            .iter()
            .filter_map(|entry| m.to_node(entry))
            .filter(|d| d.path != node.path)
            .collect();

        let mut changed = Vec::new();
        for descendant in descendants.iter_mut() {
            if let Share::Explicit(settings) = &descendant.share {
                let merged = Share::from_settings(Some(share::merge(settings, &old, &new)));
                if merged != descendant.share {
                    descendant.share = merged;
                    changed.push(descendant.clone());
                }
            }
        }
        try_join_all(changed.iter().map(|d| m.write_share(d))).await?;

        info!(
            path = %node.path,
            descendants = descendants.len(),
            rewritten = changed.len(),
            "updated directory share settings"
        );
        Ok(Self::sorted(std::iter::once(node).chain(descendants)))
    }

    // Uploads

    /// Pre-signed upload urls, one per request, in request order.
    pub async fn issue_upload_urls(
        &self,
        requests: &[UploadRequest],
    ) -> Result<Vec<Url>, NodeStoreError> {
        let keys: Vec<(String, &str)> = requests
            .iter()
            .map(|r| {
                let p = Self::check(&r.path)?;
                Ok((path::file_key(&self.base, &p), r.content_type.as_str()))
            })
            .collect::<Result<_, NodeStoreError>>()?;
        let expiry = self.config.upload_url_expiry();

        let urls = try_join_all(keys.iter().map(|(key, content_type)| {
            self.client.signed_upload_url(key, content_type, expiry)
        }))
        .await?;
        debug!(count = urls.len(), "issued upload urls");
        Ok(urls)
    }

    /// Bring freshly uploaded files into the tree.
    ///
    /// Each file gets an id if it has none, its missing ancestor directories
    /// are created, and a file without share settings copies those in effect
    /// at its directory. Paths that were never uploaded are skipped. Returns
    /// the files and the directories created for them.
    pub async fn reconcile_uploaded_files<S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Result<Vec<StorageNode>, NodeStoreError> {
        let files = Self::check_all(paths)?;
        let m = self.materializer();

        let heads = self.head_files(&files).await?;
        let mut uploaded = Vec::new();
        for (file, head) in files.iter().zip(heads) {
            match head.and_then(|entry| m.to_node(&entry)) {
                Some(node) => uploaded.push(node),
                None => warn!(path = %file, "uploaded file not found, skipping"),
            }
        }
        if uploaded.is_empty() {
            return Ok(Vec::new());
        }

        let dirs = path::split_hierarchy(uploaded.iter().map(|n| n.dir.as_str()));
        let mut hierarchy = m.load_hierarchy(&dirs).await?;
        let missing: BTreeSet<String> = dirs
            .iter()
            .filter(|d| !hierarchy.exists(d))
            .cloned()
            .collect();
        let created: Vec<StorageNode> = m
            .ensure_dirs(&mut hierarchy, &dirs)
            .await?
            .into_iter()
            .filter(|d| missing.contains(&d.path))
            .collect();

        let mut pending = Vec::new();
        for node in uploaded.iter_mut() {
            let mut dirty = false;
            if node.id.is_none() {
                node.id = Some(m.new_id());
                dirty = true;
            }
            if node.share.is_inherited() {
                let inherited = hierarchy.nearest_share_settings(&node.dir);
                let copied = Share::from_settings(Some(inherited));
                dirty |= copied != node.share;
                node.share = copied;
            }
            if dirty {
                pending.push(node.clone());
            }
        }
        try_join_all(pending.iter().map(|node| m.write_meta(node))).await?;

        info!(
            files = uploaded.len(),
            created_dirs = created.len(),
            "reconciled uploaded files"
        );
        Ok(Self::sorted(uploaded.into_iter().chain(created)))
    }
}

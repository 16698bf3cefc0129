//! Shared test utilities for node store integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ::common::nodes::{NodeStore, NodeStoreConfig, StorageNode};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::{
    Listing, MemoryStore, Metadata, MetadataPatch, ObjectEntry, ObjectStoreClient, PutOptions,
    Result,
};
use url::Url;

/// Set up a node store over a fresh in-memory object store
pub fn setup_test_env() -> (NodeStore, Arc<MemoryStore>) {
    let memory = Arc::new(MemoryStore::new());
    let store = NodeStore::new(memory.clone(), NodeStoreConfig::default());
    (store, memory)
}

/// Set up a node store whose object store counts every call
pub fn setup_counting_env() -> (NodeStore, Arc<CountingStore>) {
    let counting = Arc::new(CountingStore::new(Arc::new(MemoryStore::new())));
    let store = NodeStore::new(counting.clone(), NodeStoreConfig::default());
    (store, counting)
}

/// Write a raw key the way an external uploader would, with no node metadata
pub async fn put_raw(memory: &MemoryStore, key: &str) {
    memory
        .put(key, Bytes::from_static(b"data"), PutOptions::default())
        .await
        .unwrap();
}

/// Write a raw key carrying the given metadata
pub async fn put_raw_with_metadata(memory: &MemoryStore, key: &str, metadata: Metadata) {
    memory
        .put(
            key,
            Bytes::from_static(b"data"),
            PutOptions::with_metadata(metadata),
        )
        .await
        .unwrap();
}

/// Upload a file through the store and bring it into the tree
pub async fn upload_file(store: &NodeStore, memory: &MemoryStore, path: &str) -> StorageNode {
    let key = if store.base_path().is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", store.base_path(), path)
    };
    put_raw(memory, &key).await;
    store
        .reconcile_uploaded_files(&[path])
        .await
        .unwrap()
        .into_iter()
        .find(|n| n.path == path)
        .unwrap()
}

pub fn paths(nodes: &[StorageNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.path.as_str()).collect()
}

pub fn find<'a>(nodes: &'a [StorageNode], path: &str) -> &'a StorageNode {
    nodes
        .iter()
        .find(|n| n.path == path)
        .unwrap_or_else(|| panic!("no node at {path}"))
}

/// Object store wrapper counting calls made through the client trait
#[derive(Debug)]
pub struct CountingStore {
    inner: Arc<MemoryStore>,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStoreClient for CountingStore {
    async fn list(&self, prefix: &str, delimited: bool) -> Result<Listing> {
        self.tick();
        self.inner.list(prefix, delimited).await
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectEntry>> {
        self.tick();
        self.inner.head(key).await
    }

    async fn set_metadata(&self, key: &str, patch: &MetadataPatch) -> Result<()> {
        self.tick();
        self.inner.set_metadata(key, patch).await
    }

    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        self.tick();
        self.inner.put(key, data, options).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.tick();
        self.inner.delete(key).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.tick();
        self.inner.rename(from, to).await
    }

    async fn signed_upload_url(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<Url> {
        self.tick();
        self.inner
            .signed_upload_url(key, content_type, expires_in)
            .await
    }
}

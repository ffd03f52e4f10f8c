//! Test doubles for the embedding and index boundaries.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use aiops_core::{Point, ScoredPoint};
use async_trait::async_trait;
use tokio::sync::Notify;

use crate::embedding::{Embedder, ProviderError};
use crate::index::{IndexError, LocalVectorIndex, VectorIndex};

/// Bag-of-words embedder: each lowercase word increments one hashed bucket.
#[derive(Debug, Default)]
pub struct HashEmbedder {
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub const DIMENSION: usize = 64;

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `embed` calls so far, including the construction probe.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut vector = vec![0.0; Self::DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % Self::DIMENSION as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn model(&self) -> &str {
        "hash-bow"
    }
}

/// Embedder whose service is always down.
#[derive(Debug, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Unreachable("connection refused".to_string()))
    }

    fn model(&self) -> &str {
        "unreachable"
    }
}

/// Index that refuses every collection.
#[derive(Debug, Default)]
pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn create_collection(&self, _name: &str, _vector_size: usize) -> Result<(), IndexError> {
        Err(IndexError::Transport("index offline".to_string()))
    }

    async fn upload_points(&self, name: &str, _points: Vec<Point>) -> Result<(), IndexError> {
        Err(IndexError::NotFound(name.to_string()))
    }

    async fn search(
        &self,
        name: &str,
        _query: &[f32],
        _limit: usize,
        _score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        Err(IndexError::NotFound(name.to_string()))
    }

    async fn list_collections(&self) -> Result<Vec<String>, IndexError> {
        Ok(Vec::new())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// [`LocalVectorIndex`] that claims to be persistent, so one instance can be
/// shared by two stores to simulate a restart against a durable server.
#[derive(Debug, Default)]
pub struct PersistentIndex {
    inner: LocalVectorIndex,
}

#[async_trait]
impl VectorIndex for PersistentIndex {
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<(), IndexError> {
        self.inner.create_collection(name, vector_size).await
    }

    async fn upload_points(&self, name: &str, points: Vec<Point>) -> Result<(), IndexError> {
        self.inner.upload_points(name, points).await
    }

    async fn search(
        &self,
        name: &str,
        query: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        self.inner.search(name, query, limit, score_threshold).await
    }

    async fn list_collections(&self) -> Result<Vec<String>, IndexError> {
        self.inner.list_collections().await
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

/// Persistent index that creates collections but rejects every upload.
#[derive(Debug, Default)]
pub struct UploadFailingIndex {
    inner: LocalVectorIndex,
}

#[async_trait]
impl VectorIndex for UploadFailingIndex {
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<(), IndexError> {
        self.inner.create_collection(name, vector_size).await
    }

    async fn upload_points(&self, _name: &str, _points: Vec<Point>) -> Result<(), IndexError> {
        Err(IndexError::Transport("connection reset".to_string()))
    }

    async fn search(
        &self,
        name: &str,
        query: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        self.inner.search(name, query, limit, score_threshold).await
    }

    async fn list_collections(&self) -> Result<Vec<String>, IndexError> {
        self.inner.list_collections().await
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

/// In-memory index whose `create_collection` for one title parks until
/// [`GatedIndex::open`] is called.
#[derive(Debug)]
pub struct GatedIndex {
    inner: LocalVectorIndex,
    gated: String,
    entered: Notify,
    gate: Notify,
}

impl GatedIndex {
    pub fn new(gated: impl Into<String>) -> Self {
        Self {
            inner: LocalVectorIndex::new(),
            gated: gated.into(),
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Resolves once a create for the gated title is parked.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl VectorIndex for GatedIndex {
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<(), IndexError> {
        if name == self.gated {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        self.inner.create_collection(name, vector_size).await
    }

    async fn upload_points(&self, name: &str, points: Vec<Point>) -> Result<(), IndexError> {
        self.inner.upload_points(name, points).await
    }

    async fn search(
        &self,
        name: &str,
        query: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        self.inner.search(name, query, limit, score_threshold).await
    }

    async fn list_collections(&self) -> Result<Vec<String>, IndexError> {
        self.inner.list_collections().await
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

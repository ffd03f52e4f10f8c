//! Knowledge store: collections, uploads and retrieval.
//!
//! The store composes the chunker, the embedder, the vector index and, for
//! persistent indexes, the metadata store. It owns the title → collection map;
//! the index owns the points.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use aiops_core::{Collection, Document, IndexBackend, Passage, Point, PointPayload, StoreConfig};
use aiops_storage::{JsonMetadataStore, LoadFailure, LoadReport, MetadataStore};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::chunker::Chunker;
use crate::embedding::{Embedder, OllamaEmbeddingClient, ProviderError};
use crate::error::{KnowledgeError, Result};
use crate::index::{IndexError, LocalVectorIndex, VectorIndex};
use crate::qdrant::QdrantIndex;

/// Text embedded once at construction to learn the vector size.
const PROBE_TEXT: &str = "init";

/// Default number of passages returned by a retrieval.
pub const DEFAULT_LIMIT: usize = 3;

/// Default minimum similarity for a passage to be returned.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// How many passages to return and how similar they must be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrieveOptions {
    /// Maximum number of passages
    pub limit: usize,

    /// Minimum cosine similarity, in [-1, 1]
    pub threshold: f32,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// What [`KnowledgeStore::create_collection`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The collection was created and its documents uploaded
    Created {
        /// Points uploaded
        points: u64,
    },

    /// The title is already tracked by this store; nothing was done
    AlreadyTracked,

    /// The index already has a namespace with this title although this store
    /// does not track it (e.g. its metadata is missing); nothing was done
    IndexExists,
}

/// Manages collections and implements upload and retrieval.
pub struct KnowledgeStore {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    metadata: Option<Arc<dyn MetadataStore>>,
    chunker: Chunker,
    embedding_size: usize,
    collections: RwLock<HashMap<String, Arc<Mutex<Collection>>>>,
    metadata_failures: Vec<LoadFailure>,
}

impl KnowledgeStore {
    /// Build a store from configuration: Ollama embeddings, the configured
    /// index backend and, for Qdrant, JSON metadata under `base_path`.
    pub async fn new(config: StoreConfig) -> Result<Self> {
        let embedder = Arc::new(OllamaEmbeddingClient::new(config.embedding.clone()));
        let chunker = Chunker::from(config.chunking);

        match &config.index {
            IndexBackend::InMemory => {
                let index = Arc::new(LocalVectorIndex::new());
                Self::with_components(embedder, index, None, chunker).await
            }
            IndexBackend::Qdrant { url, timeout_secs } => {
                let metadata = JsonMetadataStore::new(&config.base_path).await?;
                Self::with_components(
                    embedder,
                    Arc::new(QdrantIndex::new(url.clone(), *timeout_secs)),
                    Some(Arc::new(metadata)),
                    chunker,
                )
                .await
            }
        }
    }

    /// Build a store from explicit components.
    ///
    /// The embedder is probed once to learn the vector size; failure is
    /// fatal. Metadata is only used when the index is persistent, in which
    /// case collections present both in the index and in the metadata are
    /// loaded.
    pub async fn with_components(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        metadata: Option<Arc<dyn MetadataStore>>,
        chunker: Chunker,
    ) -> Result<Self> {
        let probe = embedder.embed(PROBE_TEXT).await?;
        if probe.is_empty() {
            return Err(KnowledgeError::ProviderUnavailable(ProviderError::InvalidResponse(
                format!("model {} returned an empty embedding", embedder.model()),
            )));
        }
        let embedding_size = probe.len();
        info!("Embedding model {} produces {} dimensions", embedder.model(), embedding_size);

        let metadata = if index.is_persistent() {
            metadata
        } else {
            None
        };

        let mut collections = HashMap::new();
        let mut metadata_failures = Vec::new();
        if let Some(metadata) = &metadata {
            let report = discover(index.as_ref(), metadata.as_ref()).await?;
            for collection in report.loaded {
                collections.insert(collection.title.clone(), Arc::new(Mutex::new(collection)));
            }
            metadata_failures = report.failures;
            info!(
                "Loaded {} collections ({} metadata records skipped)",
                collections.len(),
                metadata_failures.len()
            );
        }

        Ok(Self {
            embedder,
            index,
            metadata,
            chunker,
            embedding_size,
            collections: RwLock::new(collections),
            metadata_failures,
        })
    }

    /// Vector size fixed at construction.
    pub fn embedding_size(&self) -> usize {
        self.embedding_size
    }

    /// Whether the index (and therefore the metadata) outlives the process.
    pub fn is_persistent(&self) -> bool {
        self.metadata.is_some()
    }

    /// Metadata records that failed to parse during startup discovery.
    pub fn metadata_failures(&self) -> &[LoadFailure] {
        &self.metadata_failures
    }

    /// Create a collection and upload its documents.
    ///
    /// The collection's `size` is reset to 0 since its index namespace is new.
    /// If an upload fails midway the collection stays tracked with the points
    /// uploaded so far and no metadata is written.
    pub async fn create_collection(
        &self,
        mut collection: Collection,
        show_progress: bool,
    ) -> Result<CreateOutcome> {
        validate_title(&collection.title)?;
        let title = collection.title.clone();

        // Reserve the title with the collection already locked, so the map
        // lock is not held across the remote create.
        let mut collection = {
            let mut collections = self.collections.write().await;
            if collections.contains_key(&title) {
                debug!("Collection {} already tracked", title);
                return Ok(CreateOutcome::AlreadyTracked);
            }

            collection.size = 0;
            let handle = Arc::new(Mutex::new(collection));
            let guard = handle.clone().lock_owned().await;
            collections.insert(title.clone(), handle);
            guard
        };

        if let Err(error) = self.index.create_collection(&title, self.embedding_size).await {
            self.collections.write().await.remove(&title);
            return match error {
                IndexError::CollectionExists(_) => {
                    warn!("Index already has an untracked collection named {}", title);
                    Ok(CreateOutcome::IndexExists)
                }
                source => Err(KnowledgeError::IndexCreation { name: title, source }),
            };
        }

        let documents = collection.documents.clone();
        let progress = progress_bar(documents.len(), &title, show_progress);
        for document in &documents {
            self.upload_locked(&mut collection, document).await?;
            progress.inc(1);
        }
        progress.finish_and_clear();

        if let Some(metadata) = &self.metadata {
            metadata.save(&collection).await?;
        }

        info!(
            "Collection {}: initialized with {} documents ({} points)",
            title,
            collection.documents.len(),
            collection.size
        );
        Ok(CreateOutcome::Created { points: collection.size })
    }

    /// Chunk, embed and upload a document to a tracked collection.
    ///
    /// Returns the ids assigned to the new points. The document is not added
    /// to the collection's document list; see [`Self::add_document`].
    pub async fn upload(&self, document: &Document, collection_name: &str) -> Result<Range<u64>> {
        let handle = self.handle(collection_name).await?;
        let mut collection = handle.lock().await;
        self.upload_locked(&mut collection, document).await
    }

    /// Upload a document, record it in the collection and persist metadata.
    pub async fn add_document(
        &self,
        document: Document,
        collection_name: &str,
    ) -> Result<Range<u64>> {
        let handle = self.handle(collection_name).await?;
        let mut collection = handle.lock().await;
        if collection.contains_document(&document.name) {
            warn!(
                "Collection {} already has a document named {}",
                collection.title, document.name
            );
        }

        let ids = self.upload_locked(&mut collection, &document).await?;
        collection.push_document(document);

        if let Some(metadata) = &self.metadata {
            metadata.save(&collection).await?;
        }
        Ok(ids)
    }

    /// Upload under the collection lock: read size, assign ids, upload, write
    /// size. `size` only moves once the index confirms the upload.
    async fn upload_locked(
        &self,
        collection: &mut Collection,
        document: &Document,
    ) -> Result<Range<u64>> {
        let start = collection.size;
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            debug!("Document {} is empty, nothing to index", document.name);
            return Ok(start..start);
        }

        let mut points = Vec::with_capacity(chunks.len());
        for (offset, text) in (0u64..).zip(chunks) {
            let vector = self.embedder.embed(text).await?;
            points.push(Point {
                id: start + offset,
                vector,
                payload: PointPayload {
                    text: text.to_string(),
                    title: document.name.clone(),
                    topic: document.topic,
                },
            });
        }

        let count = points.len() as u64;
        self.index.upload_points(&collection.title, points).await?;
        collection.size = start + count;

        debug!(
            "Uploaded {} ({} points) to {}",
            document.name, count, collection.title
        );
        Ok(start..collection.size)
    }

    /// Retrieve passage texts for `query`, best first.
    ///
    /// Returns `None` when nothing clears `threshold`.
    pub async fn retrieve_from(
        &self,
        query: &str,
        collection_name: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Option<Vec<String>>> {
        let passages = self
            .retrieve_passages(query, collection_name, RetrieveOptions { limit, threshold })
            .await?;

        if passages.is_empty() {
            Ok(None)
        } else {
            Ok(Some(passages.into_iter().map(|p| p.text).collect()))
        }
    }

    /// Retrieve passages with their source title, topic and score.
    pub async fn retrieve_passages(
        &self,
        query: &str,
        collection_name: &str,
        options: RetrieveOptions,
    ) -> Result<Vec<Passage>> {
        if query.trim().is_empty() {
            return Err(KnowledgeError::InvalidArgument("query cannot be empty".to_string()));
        }
        if options.limit == 0 {
            return Err(KnowledgeError::InvalidArgument("limit must be positive".to_string()));
        }
        if !(-1.0..=1.0).contains(&options.threshold) {
            return Err(KnowledgeError::InvalidArgument(format!(
                "threshold {} outside [-1, 1]",
                options.threshold
            )));
        }
        if !self.collections.read().await.contains_key(collection_name) {
            return Err(KnowledgeError::UnknownCollection(collection_name.to_string()));
        }

        let query_vector = self.embedder.embed(query).await?;
        let hits = self
            .index
            .search(collection_name, &query_vector, options.limit, options.threshold)
            .await?;

        debug!("Retrieved {} passages from {}", hits.len(), collection_name);
        Ok(hits.into_iter().map(Passage::from).collect())
    }

    /// Collections present both in the index and in the metadata directory,
    /// read fresh. `None` for in-memory stores.
    pub async fn get_available_collections(&self) -> Result<Option<HashMap<String, Collection>>> {
        let Some(metadata) = &self.metadata else {
            return Ok(None);
        };

        let report = discover(self.index.as_ref(), metadata.as_ref()).await?;
        Ok(Some(
            report
                .loaded
                .into_iter()
                .map(|c| (c.title.clone(), c))
                .collect(),
        ))
    }

    /// Snapshot of a tracked collection.
    pub async fn get_collection(&self, name: &str) -> Option<Collection> {
        let handle = self.collections.read().await.get(name).cloned()?;
        let collection = handle.lock().await;
        Some(collection.clone())
    }

    /// Snapshot of every tracked collection, ordered by id then title.
    pub async fn collections(&self) -> Vec<Collection> {
        let handles: Vec<_> = self.collections.read().await.values().cloned().collect();
        let mut snapshot = Vec::with_capacity(handles.len());
        for handle in handles {
            snapshot.push(handle.lock().await.clone());
        }
        snapshot.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.title.cmp(&b.title)));
        snapshot
    }

    async fn handle(&self, name: &str) -> Result<Arc<Mutex<Collection>>> {
        self.collections
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| KnowledgeError::UnknownCollection(name.to_string()))
    }
}

/// Render passages as prompt context, one `title:\ntext` block each.
pub fn format_context(passages: &[Passage]) -> String {
    passages.iter().map(|p| format!("{}\n\n", p)).collect()
}

/// Reconcile the index with the metadata: the index decides which
/// collections exist, the metadata describes them.
async fn discover(
    index: &dyn VectorIndex,
    metadata: &dyn MetadataStore,
) -> Result<LoadReport<Collection>> {
    let names = index.list_collections().await?;
    debug!("Index reports {} collections", names.len());
    Ok(metadata.load_all(&names).await?)
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(KnowledgeError::InvalidArgument("collection title cannot be empty".to_string()));
    }
    if title.contains(['/', '\\']) || title == "." || title == ".." {
        return Err(KnowledgeError::InvalidArgument(format!(
            "collection title {:?} is not a valid file name",
            title
        )));
    }
    Ok(())
}

fn progress_bar(len: usize, title: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!("Uploading {}", title));
    pb
}

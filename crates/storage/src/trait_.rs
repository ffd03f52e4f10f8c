//! Metadata store trait abstraction.

use std::path::PathBuf;

use aiops_core::Collection;
use async_trait::async_trait;

/// Error type for metadata operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while reading or writing metadata.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A persisted record is malformed (bad JSON, missing field, unknown topic)
    #[error("malformed record {}: {source}", path.display())]
    Parse {
        /// Offending file
        path: PathBuf,
        /// Underlying parser error
        #[source]
        source: serde_json::Error,
    },

    /// A record's `title` does not match the file it was read from
    #[error("record {} is titled {title:?}", path.display())]
    TitleMismatch {
        /// Offending file
        path: PathBuf,
        /// Title found inside the record
        title: String,
    },
}

/// A file that could not be turned into a record.
#[derive(Debug)]
pub struct LoadFailure {
    /// File that failed
    pub path: PathBuf,

    /// Why it failed
    pub error: StorageError,
}

/// Outcome of a bulk load: what loaded, and what was skipped and why.
#[derive(Debug)]
pub struct LoadReport<T> {
    /// Successfully loaded items
    pub loaded: Vec<T>,

    /// Files that failed to load
    pub failures: Vec<LoadFailure>,
}

impl<T> Default for LoadReport<T> {
    fn default() -> Self {
        Self {
            loaded: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> LoadReport<T> {
    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Durable record of each collection's identity, documents, topics and size.
///
/// Implementations only describe collections; whether a collection exists is
/// decided by the vector index, which callers pass in as `index_names`.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Write (create or replace) the record for `collection`, keyed by title.
    async fn save(&self, collection: &Collection) -> Result<()>;

    /// Load every record whose key matches one of `index_names`.
    ///
    /// Records without an index counterpart are ignored. A malformed record is
    /// reported in [`LoadReport::failures`] and does not stop the others.
    async fn load_all(&self, index_names: &[String]) -> Result<LoadReport<Collection>>;

    /// Current version of a collection's record, 0 if never saved.
    async fn version(&self, title: &str) -> Result<u64>;
}

//! Knowledge store errors.

use aiops_storage::StorageError;

use crate::embedding::ProviderError;
use crate::index::IndexError;

/// Result type for knowledge store operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;

/// Errors surfaced by the knowledge store.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    /// The embedding service is unreachable or misconfigured
    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderError),

    /// The named collection is not tracked by this store
    #[error("collection {0} does not exist")]
    UnknownCollection(String),

    /// A caller-supplied argument was rejected before any remote call
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The index refused to create a collection
    #[error("can't create collection {name}: {source}")]
    IndexCreation {
        /// Collection title
        name: String,
        /// Adapter error
        #[source]
        source: IndexError,
    },

    /// Any other vector index failure
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Metadata could not be read or written
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Filesystem error outside the metadata store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! AI-OPS knowledge store.
//!
//! Splits security documents into chunks, embeds them through an external
//! model, indexes them in a vector database and retrieves the passages most
//! similar to a query for use as prompt context.

#![warn(missing_docs)]

pub mod chunker;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod index;
pub mod qdrant;
pub mod store;

#[cfg(test)]
mod testing;

pub use chunker::Chunker;
pub use dataset::{discover_datasets, DatasetScan};
pub use embedding::{Embedder, OllamaEmbeddingClient, ProviderError};
pub use error::{KnowledgeError, Result};
pub use index::{cosine_similarity, IndexError, LocalVectorIndex, VectorIndex};
pub use qdrant::QdrantIndex;
pub use store::{
    format_context, CreateOutcome, KnowledgeStore, RetrieveOptions, DEFAULT_LIMIT,
    DEFAULT_THRESHOLD,
};

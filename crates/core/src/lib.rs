//! AI-OPS knowledge base data models.
//!
//! This crate defines the documents, collections and vector points shared by
//! the metadata store, the vector index adapters and the knowledge store, plus
//! the configuration types used to wire them together.

#![warn(missing_docs)]

// Identities
mod id;

// Knowledge base model
mod topic;
mod knowledge;

// Wiring
pub mod config;

// Re-exports
pub use id::{CollectionId, PointId};
pub use topic::{Topic, UnknownTopic};
pub use knowledge::{
    Collection, Document, Passage, Point, PointPayload, ScoredPoint,
};
pub use config::{ChunkingConfig, EmbeddingConfig, IndexBackend, StoreConfig};

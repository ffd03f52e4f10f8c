//! Knowledge base model - documents, collections and indexed points.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use crate::id::{CollectionId, PointId};
use crate::topic::Topic;

/// A named unit of knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Display name, also stored as the `title` of every point it produces
    pub name: String,

    /// Raw text
    pub content: String,

    /// Subject tag
    pub topic: Topic,
}

impl Document {
    /// Create a new document.
    pub fn new(name: impl Into<String>, content: impl Into<String>, topic: Topic) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            topic,
        }
    }
}

/// A group of documents sharing one vector index namespace.
///
/// `size` counts indexed points, not documents: one document usually yields
/// several chunks. It is only ever increased by uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Identifier
    pub id: CollectionId,

    /// Unique title, also the index namespace name
    pub title: String,

    /// Documents in insertion order
    pub documents: Vec<Document>,

    /// Topics present in the documents
    pub topics: BTreeSet<Topic>,

    /// Number of points uploaded to the index
    #[serde(default)]
    pub size: u64,
}

impl Collection {
    /// Create a collection, deriving its topic set from the documents.
    pub fn new(id: u64, title: impl Into<String>, documents: Vec<Document>) -> Self {
        let topics = documents.iter().map(|d| d.topic).collect();
        Self {
            id: CollectionId::new(id),
            title: title.into(),
            documents,
            topics,
            size: 0,
        }
    }

    /// Append a document and record its topic.
    pub fn push_document(&mut self, document: Document) {
        self.topics.insert(document.topic);
        self.documents.push(document);
    }

    /// Whether a document with this name is present.
    pub fn contains_document(&self, name: &str) -> bool {
        self.documents.iter().any(|d| d.name == name)
    }
}

/// Payload stored next to every vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointPayload {
    /// Chunk text
    pub text: String,

    /// Name of the source document
    pub title: String,

    /// Topic of the source document
    pub topic: Topic,
}

/// One embedded chunk as uploaded to the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Point id, unique within its collection
    pub id: PointId,

    /// Embedding
    pub vector: Vec<f32>,

    /// Payload
    pub payload: PointPayload,
}

/// A search hit returned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    /// Point id
    pub id: PointId,

    /// Cosine similarity to the query, in [-1, 1]
    pub score: f32,

    /// Payload
    pub payload: PointPayload,
}

/// A retrieved passage as handed to the agent for prompt context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Source document name
    pub title: String,

    /// Chunk text
    pub text: String,

    /// Source document topic
    pub topic: Topic,

    /// Similarity score
    pub score: f32,
}

impl From<ScoredPoint> for Passage {
    fn from(hit: ScoredPoint) -> Self {
        Self {
            title: hit.payload.title,
            text: hit.payload.text,
            topic: hit.payload.topic,
            score: hit.score,
        }
    }
}

impl std::fmt::Display for Passage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:\n{}", self.title, self.text)
    }
}

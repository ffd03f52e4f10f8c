//! Configuration for the knowledge store and its collaborators.
//!
//! Every component takes its configuration explicitly at construction time.
//! All structs deserialize from JSON with sensible defaults for missing fields,
//! so a config file only needs to mention what it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level knowledge store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding `knowledge/`, `meta/` and `datasets/`
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector index backend
    #[serde(default)]
    pub index: IndexBackend,

    /// Chunking policy
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

impl StoreConfig {
    /// Directory with one metadata record per collection.
    pub fn knowledge_dir(&self) -> PathBuf {
        self.base_path.join("knowledge")
    }

    /// Directory scanned for dataset files.
    pub fn datasets_dir(&self) -> PathBuf {
        self.base_path.join("datasets")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            embedding: EmbeddingConfig::default(),
            index: IndexBackend::default(),
            chunking: ChunkingConfig::default(),
        }
    }
}

/// Embedding provider configuration (Ollama).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Ollama server URL
    #[serde(default = "default_ollama_url")]
    pub url: String,

    /// Embedding model name (`nomic-embed-text`, `mxbai-embed-large`, `all-minilm`, ...)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Model options forwarded verbatim with every request
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout(),
            options: serde_json::Map::new(),
        }
    }
}

/// Which vector index the store talks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexBackend {
    /// In-process index; nothing survives the process and no metadata is written
    InMemory,

    /// Qdrant reached over its REST API
    Qdrant {
        /// Qdrant server URL
        #[serde(default = "default_qdrant_url")]
        url: String,

        /// Request timeout in seconds
        #[serde(default = "default_qdrant_timeout")]
        timeout_secs: u64,
    },
}

impl IndexBackend {
    /// Whether points outlive the process.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, IndexBackend::InMemory)
    }
}

impl Default for IndexBackend {
    fn default() -> Self {
        IndexBackend::Qdrant {
            url: default_qdrant_url(),
            timeout_secs: default_qdrant_timeout(),
        }
    }
}

/// Chunking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_base_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".aiops")
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_timeout() -> u64 {
    60
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_qdrant_timeout() -> u64 {
    30
}

fn default_chunk_size() -> usize {
    1000
}

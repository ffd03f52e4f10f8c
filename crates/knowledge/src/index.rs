//! Vector index boundary.
//!
//! [`VectorIndex`] is everything the knowledge store needs from a vector
//! database. Two variants exist: [`LocalVectorIndex`] keeps points in process
//! memory, [`crate::qdrant::QdrantIndex`] talks to a Qdrant server.

use std::collections::{BTreeMap, HashMap};

use aiops_core::{Point, ScoredPoint};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// Errors raised by a vector index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Tried to create a collection that already exists
    #[error("collection {0} already exists")]
    CollectionExists(String),

    /// The collection does not exist in the index
    #[error("collection {0} not found")]
    NotFound(String),

    /// A vector does not match the collection's configured size
    #[error("vector size mismatch: expected {expected}, found {found}")]
    SchemaMismatch {
        /// Configured size
        expected: usize,
        /// Offending vector size
        found: usize,
    },

    /// The index could not be reached or answered unexpectedly
    #[error("index transport error: {0}")]
    Transport(String),
}

/// Vector database operations used by the knowledge store.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create a collection holding vectors of `vector_size` dimensions
    /// compared by cosine similarity.
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<(), IndexError>;

    /// Upsert points. Every vector must match the configured size.
    async fn upload_points(&self, name: &str, points: Vec<Point>) -> Result<(), IndexError>;

    /// Up to `limit` points scoring at least `score_threshold`, best first.
    async fn search(
        &self,
        name: &str,
        query: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, IndexError>;

    /// Names of all collections in the index.
    async fn list_collections(&self) -> Result<Vec<String>, IndexError>;

    /// Whether points outlive the process.
    fn is_persistent(&self) -> bool;
}

/// Check every point against the configured vector size.
pub(crate) fn check_vector_sizes(points: &[Point], expected: usize) -> Result<(), IndexError> {
    match points.iter().find(|p| p.vector.len() != expected) {
        Some(point) => Err(IndexError::SchemaMismatch {
            expected,
            found: point.vector.len(),
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Default)]
struct LocalCollection {
    dimension: usize,
    points: BTreeMap<u64, Point>,
}

/// In-memory vector index for small-scale semantic search.
#[derive(Debug, Default)]
pub struct LocalVectorIndex {
    collections: RwLock<HashMap<String, LocalCollection>>,
}

impl LocalVectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of the points stored in a collection, ascending.
    pub async fn point_ids(&self, name: &str) -> Option<Vec<u64>> {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| c.points.keys().copied().collect())
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<(), IndexError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(IndexError::CollectionExists(name.to_string()));
        }
        collections.insert(
            name.to_string(),
            LocalCollection {
                dimension: vector_size,
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn upload_points(&self, name: &str, points: Vec<Point>) -> Result<(), IndexError> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| IndexError::NotFound(name.to_string()))?;

        check_vector_sizes(&points, collection.dimension)?;

        debug!("Uploading {} points to {}", points.len(), name);
        for point in points {
            collection.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        query: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| IndexError::NotFound(name.to_string()))?;

        if query.len() != collection.dimension {
            return Err(IndexError::SchemaMismatch {
                expected: collection.dimension,
                found: query.len(),
            });
        }

        let mut scored: Vec<_> = collection
            .points
            .values()
            .map(|p| (p, cosine_similarity(query, &p.vector)))
            .filter(|(_, score)| *score >= score_threshold)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(p, score)| ScoredPoint {
                id: p.id,
                score,
                payload: p.payload.clone(),
            })
            .collect())
    }

    async fn list_collections(&self) -> Result<Vec<String>, IndexError> {
        let mut names: Vec<_> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiops_core::{PointPayload, Topic};

    fn create_test_point(id: u64, vector: Vec<f32>) -> Point {
        Point {
            id,
            vector,
            payload: PointPayload {
                text: format!("chunk {}", id),
                title: "doc".to_string(),
                topic: Topic::Network,
            },
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 1.0);

        let c = vec![0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &c), 0.0);

        let d = vec![0.5, 0.5, 0.0];
        let similarity = cosine_similarity(&a, &d);
        assert!(similarity > 0.7 && similarity < 0.71);

        let e = vec![-1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &e), -1.0);
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let index = LocalVectorIndex::new();
        index.create_collection("kb", 3).await.unwrap();
        let err = index.create_collection("kb", 3).await.unwrap_err();
        assert!(matches!(err, IndexError::CollectionExists(name) if name == "kb"));
        assert_eq!(index.list_collections().await.unwrap(), vec!["kb".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_size() {
        let index = LocalVectorIndex::new();
        index.create_collection("kb", 3).await.unwrap();

        let err = index
            .upload_points("kb", vec![create_test_point(0, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::SchemaMismatch { expected: 3, found: 2 }));
        assert_eq!(index.point_ids("kb").await, Some(vec![]));
    }

    #[tokio::test]
    async fn test_upload_to_missing_collection() {
        let index = LocalVectorIndex::new();
        let err = index
            .upload_points("nope", vec![create_test_point(0, vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_threshold_limit_and_order() {
        let index = LocalVectorIndex::new();
        index.create_collection("kb", 3).await.unwrap();
        index
            .upload_points(
                "kb",
                vec![
                    create_test_point(0, vec![1.0, 0.0, 0.0]),
                    create_test_point(1, vec![0.0, 1.0, 0.0]),
                    create_test_point(2, vec![0.8, 0.2, 0.0]),
                    create_test_point(3, vec![0.6, 0.4, 0.0]),
                ],
            )
            .await
            .unwrap();

        let results = index.search("kb", &[1.0, 0.0, 0.0], 10, 0.5).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 2, 3]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

        let limited = index.search("kb", &[1.0, 0.0, 0.0], 2, 0.5).await.unwrap();
        assert_eq!(limited.len(), 2);

        let none = index.search("kb", &[0.0, 0.0, 1.0], 10, 0.5).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_upload_same_id_overwrites() {
        let index = LocalVectorIndex::new();
        index.create_collection("kb", 2).await.unwrap();
        for vector in [vec![1.0, 0.0], vec![0.0, 1.0]] {
            index
                .upload_points("kb", vec![create_test_point(0, vector)])
                .await
                .unwrap();
        }
        assert_eq!(index.point_ids("kb").await, Some(vec![0]));
    }
}

//! Qdrant vector index over the REST API.

use std::collections::HashMap;

use aiops_core::{Point, PointPayload, ScoredPoint};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::index::{check_vector_sizes, IndexError, VectorIndex};

/// Qdrant REST client implementing [`VectorIndex`].
pub struct QdrantIndex {
    /// HTTP client
    client: Client,

    /// Qdrant server URL
    url: String,

    /// Vector size per collection, filled on create or first use
    dimensions: RwLock<HashMap<String, usize>>,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionList {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Deserialize)]
struct VectorParams {
    size: usize,
}

#[derive(Deserialize)]
struct SearchHit {
    id: u64,
    score: f32,
    payload: Option<PointPayload>,
}

impl QdrantIndex {
    /// Create a client for the Qdrant server at `url`.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            url: url.into().trim_end_matches('/').to_string(),
            dimensions: RwLock::new(HashMap::new()),
        }
    }

    /// Server URL with `segments` appended, each percent-encoded so that a
    /// title like `what?` stays one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, IndexError> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| IndexError::Transport(format!("invalid Qdrant URL {}: {}", self.url, e)))?;
        url.path_segments_mut()
            .map_err(|_| IndexError::Transport(format!("invalid Qdrant URL {}", self.url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn collection_url(&self, name: &str) -> Result<Url, IndexError> {
        self.endpoint(&["collections", name])
    }

    /// Configured vector size of a collection, asked from Qdrant once.
    async fn vector_size(&self, name: &str) -> Result<usize, IndexError> {
        if let Some(size) = self.dimensions.read().await.get(name) {
            return Ok(*size);
        }

        let response = self
            .client
            .get(self.collection_url(name)?)
            .send()
            .await
            .map_err(transport)?;
        let info: QdrantResponse<CollectionInfo> =
            check(response, name).await?.json().await.map_err(transport)?;

        let size = info.result.config.params.vectors.size;
        self.dimensions.write().await.insert(name.to_string(), size);
        Ok(size)
    }
}

fn transport(e: reqwest::Error) -> IndexError {
    IndexError::Transport(e.to_string())
}

/// Map Qdrant's error statuses onto [`IndexError`].
async fn check(response: Response, name: &str) -> Result<Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status, &body, name))
}

fn classify_error(status: StatusCode, body: &str, name: &str) -> IndexError {
    if status == StatusCode::NOT_FOUND {
        IndexError::NotFound(name.to_string())
    } else if status == StatusCode::CONFLICT || body.contains("already exists") {
        IndexError::CollectionExists(name.to_string())
    } else {
        IndexError::Transport(format!("Qdrant API error (status {}): {}", status, body))
    }
}

fn create_collection_body(vector_size: usize) -> Value {
    json!({
        "vectors": {
            "size": vector_size,
            "distance": "Cosine",
        }
    })
}

fn upload_body(points: &[Point]) -> Value {
    json!({ "points": points })
}

fn search_body(query: &[f32], limit: usize, score_threshold: f32) -> Value {
    json!({
        "vector": query,
        "limit": limit,
        "score_threshold": score_threshold,
        "with_payload": true,
    })
}

fn parse_hits(hits: Vec<SearchHit>) -> Result<Vec<ScoredPoint>, IndexError> {
    hits.into_iter()
        .map(|hit| {
            let payload = hit
                .payload
                .ok_or_else(|| IndexError::Transport(format!("point {} has no payload", hit.id)))?;
            Ok(ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload,
            })
        })
        .collect()
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn create_collection(&self, name: &str, vector_size: usize) -> Result<(), IndexError> {
        let response = self
            .client
            .put(self.collection_url(name)?)
            .json(&create_collection_body(vector_size))
            .send()
            .await
            .map_err(transport)?;
        check(response, name).await?;

        self.dimensions.write().await.insert(name.to_string(), vector_size);
        info!("Created Qdrant collection {} ({} dimensions)", name, vector_size);
        Ok(())
    }

    async fn upload_points(&self, name: &str, points: Vec<Point>) -> Result<(), IndexError> {
        let expected = self.vector_size(name).await?;
        check_vector_sizes(&points, expected)?;

        let mut url = self.endpoint(&["collections", name, "points"])?;
        url.query_pairs_mut().append_pair("wait", "true");

        debug!("Uploading {} points to {}", points.len(), name);
        let response = self
            .client
            .put(url)
            .json(&upload_body(&points))
            .send()
            .await
            .map_err(transport)?;
        check(response, name).await?;
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        query: &[f32],
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        let response = self
            .client
            .post(self.endpoint(&["collections", name, "points", "search"])?)
            .json(&search_body(query, limit, score_threshold))
            .send()
            .await
            .map_err(transport)?;
        let hits: QdrantResponse<Vec<SearchHit>> =
            check(response, name).await?.json().await.map_err(transport)?;

        parse_hits(hits.result)
    }

    async fn list_collections(&self) -> Result<Vec<String>, IndexError> {
        let response = self
            .client
            .get(self.endpoint(&["collections"])?)
            .send()
            .await
            .map_err(transport)?;
        let list: QdrantResponse<CollectionList> =
            check(response, "").await?.json().await.map_err(transport)?;

        Ok(list.result.collections.into_iter().map(|c| c.name).collect())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

//! JSON file metadata store.
//!
//! Stores one pretty-printed record per collection under `knowledge/` and a
//! small per-collection meta marker (version + updated_at) under
//! `meta/knowledge/`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use aiops_core::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use super::{LoadFailure, LoadReport, MetadataStore, Result, StorageError};

/// File name of a collection's record: the title, with `.json` appended
/// unless the title already carries it.
pub fn record_file_name(title: &str) -> String {
    if title.ends_with(".json") {
        title.to_string()
    } else {
        format!("{}.json", title)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionMarker {
    version: u64,
    updated_at: DateTime<Utc>,
}

/// File-based JSON metadata store.
#[derive(Debug, Clone)]
pub struct JsonMetadataStore {
    root: PathBuf,
}

impl JsonMetadataStore {
    /// Open a store rooted at `root`, creating `knowledge/` and
    /// `meta/knowledge/` if they are missing.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("knowledge")).await?;
        fs::create_dir_all(root.join("meta").join("knowledge")).await?;

        Ok(Self { root })
    }

    /// Directory holding the collection records.
    pub fn knowledge_dir(&self) -> PathBuf {
        self.root.join("knowledge")
    }

    /// Path of the record for `title`.
    pub fn record_path(&self, title: &str) -> PathBuf {
        self.knowledge_dir().join(record_file_name(title))
    }

    fn meta_path(&self, title: &str) -> PathBuf {
        let name = title.strip_suffix(".json").unwrap_or(title);
        self.root
            .join("meta")
            .join("knowledge")
            .join(format!("{}.meta.json", name))
    }

    /// Load a single record by title.
    pub async fn load(&self, title: &str) -> Result<Option<Collection>> {
        read_record(&self.record_path(title)).await
    }

    /// Read and increment the record version, return the new version.
    async fn bump_version(&self, title: &str) -> Result<u64> {
        let path = self.meta_path(title);
        let mut version = match fs::read_to_string(&path).await {
            Ok(s) => {
                let marker: VersionMarker = serde_json::from_str(&s)
                    .map_err(|source| StorageError::Parse { path: path.clone(), source })?;
                marker.version
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        version += 1;
        let marker = VersionMarker {
            version,
            updated_at: Utc::now(),
        };
        fs::write(&path, serde_json::to_string_pretty(&marker)?.as_bytes()).await?;
        Ok(version)
    }
}

#[async_trait::async_trait]
impl MetadataStore for JsonMetadataStore {
    async fn save(&self, collection: &Collection) -> Result<()> {
        let path = self.record_path(&collection.title);
        let json = serde_json::to_string_pretty(collection)?;
        fs::write(&path, json.as_bytes()).await?;

        let version = self.bump_version(&collection.title).await?;
        debug!(
            "Saved metadata for {} (version {}, {} documents, {} points)",
            collection.title,
            version,
            collection.documents.len(),
            collection.size
        );
        Ok(())
    }

    async fn load_all(&self, index_names: &[String]) -> Result<LoadReport<Collection>> {
        let wanted: HashSet<String> = index_names.iter().map(|n| record_file_name(n)).collect();

        let mut paths = Vec::new();
        let mut rd = fs::read_dir(self.knowledge_dir()).await?;
        while let Some(entry) = rd.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut report = LoadReport::default();
        for path in paths {
            let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if !wanted.contains(file_name) {
                debug!("Ignoring metadata {} with no index counterpart", path.display());
                continue;
            }

            match read_record(&path).await {
                Ok(Some(collection)) if record_file_name(&collection.title) != file_name => {
                    warn!(
                        "Skipping metadata record {}: titled {}",
                        path.display(),
                        collection.title
                    );
                    let title = collection.title;
                    report.failures.push(LoadFailure {
                        error: StorageError::TitleMismatch { path: path.clone(), title },
                        path,
                    });
                }
                Ok(Some(collection)) => report.loaded.push(collection),
                Ok(None) => {}
                Err(error) => {
                    warn!("Skipping metadata record {}: {}", path.display(), error);
                    report.failures.push(LoadFailure { path, error });
                }
            }
        }

        Ok(report)
    }

    async fn version(&self, title: &str) -> Result<u64> {
        match fs::read_to_string(self.meta_path(title)).await {
            Ok(s) => {
                let marker: VersionMarker = serde_json::from_str(&s)?;
                Ok(marker.version)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

async fn read_record(path: &Path) -> Result<Option<Collection>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json).map_err(|source| StorageError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

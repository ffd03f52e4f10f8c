//! Dataset discovery.
//!
//! A dataset is a JSON file holding an array of rows
//! `{"title": ..., "content": ..., "category": ...}`. Each file becomes one
//! [`Collection`] titled by the file stem, with one [`Document`] per row.

use std::path::{Path, PathBuf};

use aiops_core::{Collection, Document, Topic};
use aiops_storage::{LoadFailure, LoadReport, StorageError};
use serde::{Deserialize, Deserializer};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Options for [`discover_datasets`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetScan {
    /// Delete files that are not `.json` datasets. Off by default.
    pub cleanup: bool,
}

#[derive(Debug, Deserialize)]
struct DatasetRow {
    title: String,
    content: String,
    #[serde(deserialize_with = "deserialize_topic")]
    category: Topic,
}

fn deserialize_topic<'de, D>(deserializer: D) -> std::result::Result<Topic, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// Scan `dir` for dataset files and turn each into a collection.
///
/// Files are visited in name order and accepted datasets get ids 0, 1, ...
/// A missing directory yields an empty report. Malformed datasets are
/// reported as failures and left on disk.
pub async fn discover_datasets(
    dir: &Path,
    scan: DatasetScan,
) -> Result<LoadReport<Collection>> {
    let mut report = LoadReport::default();
    if !fs::try_exists(dir).await? {
        debug!("Dataset directory {} does not exist", dir.display());
        return Ok(report);
    }

    let mut entries: Vec<PathBuf> = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();

    let mut next_id = 0u64;
    for path in entries {
        // follows symlinks; a dangling one is reported, not fatal
        let is_file = match fs::metadata(&path).await {
            Ok(metadata) => metadata.is_file(),
            Err(error) => {
                warn!("Skipping unreadable dataset entry {}: {}", path.display(), error);
                report.failures.push(LoadFailure {
                    path,
                    error: error.into(),
                });
                continue;
            }
        };
        let is_json = path.extension().and_then(|s| s.to_str()) == Some("json");

        if !(is_file && is_json) {
            if scan.cleanup && is_file {
                warn!("Removing non-dataset file {}", path.display());
                fs::remove_file(&path).await?;
            } else {
                debug!("Skipping non-dataset entry {}", path.display());
            }
            continue;
        }

        match read_dataset(&path, next_id).await {
            Ok(collection) => {
                debug!(
                    "Dataset {}: {} documents",
                    collection.title,
                    collection.documents.len()
                );
                report.loaded.push(collection);
                next_id += 1;
            }
            Err(error) => {
                warn!("Skipping dataset {}: {}", path.display(), error);
                report.failures.push(LoadFailure { path, error });
            }
        }
    }

    info!(
        "Discovered {} datasets in {} ({} skipped)",
        report.loaded.len(),
        dir.display(),
        report.failures.len()
    );
    Ok(report)
}

async fn read_dataset(path: &Path, id: u64) -> std::result::Result<Collection, StorageError> {
    let json = fs::read_to_string(path).await?;
    let rows: Vec<DatasetRow> = serde_json::from_str(&json).map_err(|source| StorageError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let documents = rows
        .into_iter()
        .map(|row| Document::new(row.title, row.content, row.category))
        .collect();

    Ok(Collection::new(id, title, documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiops_core::CollectionId;
    use tempfile::TempDir;

    const OWASP: &str = r#"[
        {"title": "XSS basics", "content": "Cross-site scripting injects script.", "category": "web"},
        {"title": "SQLi", "content": "Union based injection.", "category": "Web"},
        {"title": "Subdomains", "content": "Passive DNS.", "category": "osint"}
    ]"#;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let report = discover_datasets(&dir.path().join("datasets"), DatasetScan::default())
            .await
            .unwrap();
        assert!(report.loaded.is_empty());
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_rows_become_documents() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "owasp.json", OWASP);
        write(
            dir.path(),
            "network.json",
            r#"[{"title": "nmap", "content": "-sn", "category": "network"}]"#,
        );

        let report = discover_datasets(dir.path(), DatasetScan::default()).await.unwrap();
        assert_eq!(report.loaded.len(), 2);

        // name order: network.json, owasp.json
        let network = &report.loaded[0];
        assert_eq!(network.title, "network");
        assert_eq!(network.id, CollectionId::new(0));

        let owasp = &report.loaded[1];
        assert_eq!(owasp.id, CollectionId::new(1));
        assert_eq!(owasp.documents.len(), 3);
        assert_eq!(owasp.documents[1].topic, Topic::Web);
        assert_eq!(owasp.topics.len(), 2);
        assert_eq!(owasp.size, 0);
    }

    #[tokio::test]
    async fn test_scan_without_cleanup_keeps_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "owasp.json", OWASP);
        write(dir.path(), "notes.txt", "scratch");

        let report = discover_datasets(dir.path(), DatasetScan::default()).await.unwrap();
        assert_eq!(report.loaded.len(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_scan_with_cleanup_removes_non_datasets() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "owasp.json", OWASP);
        write(dir.path(), "notes.txt", "scratch");
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let report = discover_datasets(dir.path(), DatasetScan { cleanup: true }).await.unwrap();
        assert_eq!(report.loaded.len(), 1);
        assert!(!dir.path().join("notes.txt").exists());
        assert!(dir.path().join("owasp.json").exists());
        assert!(dir.path().join("nested").exists());
    }

    #[tokio::test]
    async fn test_malformed_dataset_reported_not_deleted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a-broken.json", "[{");
        write(
            dir.path(),
            "b-bad-topic.json",
            r#"[{"title": "x", "content": "y", "category": "cooking"}]"#,
        );
        write(dir.path(), "c-owasp.json", OWASP);

        let report = discover_datasets(dir.path(), DatasetScan { cleanup: true }).await.unwrap();
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.loaded[0].id, CollectionId::new(0));
        assert_eq!(report.failures.len(), 2);
        assert!(dir.path().join("a-broken.json").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_reported() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "owasp.json", OWASP);
        std::os::unix::fs::symlink(dir.path().join("gone.json"), dir.path().join("a-link.json"))
            .unwrap();

        let report = discover_datasets(dir.path(), DatasetScan { cleanup: true }).await.unwrap();
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.loaded[0].title, "owasp");
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, StorageError::Io(_)));
        assert!(std::fs::symlink_metadata(dir.path().join("a-link.json")).is_ok());
    }
}

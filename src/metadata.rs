use crate::error::MetadataError;
use crate::types::{IndexStats, RepoRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const METADATA_FILE: &str = "metadata.json";
const INDEX_DIR: &str = "index";

/// Record of the last successful index build for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub owner: String,
    pub repo: String,
    /// Branch that was indexed
    pub branch: String,
    /// Commit SHA the index was built from
    pub last_commit_sha: String,
    /// When the build finished
    pub last_indexed: DateTime<Utc>,
    /// Location of the persisted vector index
    pub index_path: PathBuf,
    #[serde(flatten)]
    pub stats: IndexStats,
    /// Embedding model used for the stored vectors
    pub embedding_model: String,
}

/// Persists one [`IndexMetadata`] record per repository under a storage root
///
/// Layout: `<root>/<owner>_<repo>/metadata.json` next to `<root>/<owner>_<repo>/index/`.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding everything stored for a repository
    pub fn repo_dir(&self, repo: &RepoRef) -> PathBuf {
        self.root.join(repo.storage_key())
    }

    /// Directory of the persisted vector index for a repository
    pub fn index_dir(&self, repo: &RepoRef) -> PathBuf {
        self.repo_dir(repo).join(INDEX_DIR)
    }

    fn metadata_path(&self, repo: &RepoRef) -> PathBuf {
        self.repo_dir(repo).join(METADATA_FILE)
    }

    /// Load the record for a repository
    ///
    /// A missing file yields `None`. A file that cannot be read or parsed is logged and
    /// also yields `None`, so the caller rebuilds and overwrites it.
    pub fn load(&self, repo: &RepoRef) -> Result<Option<IndexMetadata>, MetadataError> {
        let path = self.metadata_path(repo);
        if !path.exists() {
            tracing::debug!("No metadata for {} at {:?}", repo, path);
            return Ok(None);
        }

        match read_record(&path) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Ignoring unusable metadata for {}: {}", repo, e);
                Ok(None)
            }
        }
    }

    /// Save (or overwrite) the record for a repository
    pub fn save(&self, repo: &RepoRef, record: &IndexMetadata) -> Result<(), MetadataError> {
        let path = self.metadata_path(repo);
        let save_failed = |reason: String| MetadataError::SaveFailed {
            path: path.display().to_string(),
            reason,
        };

        let dir = self.repo_dir(repo);
        fs::create_dir_all(&dir).map_err(|e| save_failed(e.to_string()))?;

        let content =
            serde_json::to_string_pretty(record).map_err(|e| save_failed(e.to_string()))?;

        // Write-then-rename so an interrupted save never leaves a truncated record
        let tmp_path = dir.join(format!("{}.tmp", METADATA_FILE));
        fs::write(&tmp_path, content).map_err(|e| save_failed(e.to_string()))?;
        fs::rename(&tmp_path, &path).map_err(|e| save_failed(e.to_string()))?;

        tracing::debug!("Saved metadata for {} to {:?}", repo, path);
        Ok(())
    }

    /// All readable records under the storage root, sorted by owner and repo
    pub fn list(&self) -> Result<Vec<IndexMetadata>, MetadataError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|e| MetadataError::ReadFailed {
            path: self.root.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path().join(METADATA_FILE);
            if !path.is_file() {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping unusable metadata: {}", e),
            }
        }

        records.sort_by(|a, b| (&a.owner, &a.repo).cmp(&(&b.owner, &b.repo)));
        Ok(records)
    }
}

fn read_record(path: &Path) -> Result<IndexMetadata, MetadataError> {
    let read_failed = |reason: String| MetadataError::ReadFailed {
        path: path.display().to_string(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|e| read_failed(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| read_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo() -> RepoRef {
        RepoRef::new("testowner", "testrepo").unwrap()
    }

    fn record(store: &MetadataStore, sha: &str) -> IndexMetadata {
        IndexMetadata {
            owner: "testowner".to_string(),
            repo: "testrepo".to_string(),
            branch: "main".to_string(),
            last_commit_sha: sha.to_string(),
            last_indexed: Utc::now(),
            index_path: store.index_dir(&repo()),
            stats: IndexStats {
                files_indexed: 3,
                chunks_indexed: 12,
            },
            embedding_model: "all-MiniLM-L6-v2".to_string(),
        }
    }

    #[test]
    fn test_load_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("nonexistent"));
        assert!(store.load(&repo()).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        let saved = record(&store, "abc123def456");

        store.save(&repo(), &saved).unwrap();

        let path = dir.path().join("testowner_testrepo").join("metadata.json");
        assert!(path.exists());

        let loaded = store.load(&repo()).unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_saved_file_layout() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        store.save(&repo(), &record(&store, "abc123")).unwrap();

        let raw = fs::read_to_string(dir.path().join("testowner_testrepo/metadata.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["last_commit_sha"], "abc123");
        assert_eq!(json["owner"], "testowner");
        assert_eq!(json["repo"], "testrepo");
        assert_eq!(json["files_indexed"], 3);
        assert!(json.get("last_indexed").is_some());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        store.save(&repo(), &record(&store, "abc123")).unwrap();
        store.save(&repo(), &record(&store, "def456")).unwrap();

        assert_eq!(store.load(&repo()).unwrap().unwrap().last_commit_sha, "def456");
        assert!(!dir.path().join("testowner_testrepo/metadata.json.tmp").exists());
    }

    #[test]
    fn test_corrupted_metadata_is_treated_as_absent() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        let repo_dir = store.repo_dir(&repo());
        fs::create_dir_all(&repo_dir).unwrap();
        fs::write(repo_dir.join("metadata.json"), "invalid json").unwrap();

        assert!(store.load(&repo()).unwrap().is_none());
    }

    #[test]
    fn test_index_dir_layout() {
        let store = MetadataStore::new("/storage");
        assert_eq!(
            store.index_dir(&repo()),
            PathBuf::from("/storage/testowner_testrepo/index")
        );
    }

    #[test]
    fn test_list_records() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        let other = RepoRef::new("alpha", "zeta").unwrap();

        store.save(&repo(), &record(&store, "abc123")).unwrap();
        let mut other_record = record(&store, "fff000");
        other_record.owner = "alpha".to_string();
        other_record.repo = "zeta".to_string();
        store.save(&other, &other_record).unwrap();
        fs::create_dir_all(dir.path().join("stray_dir")).unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].owner, "alpha");
        assert_eq!(records[1].owner, "testowner");
    }

    #[test]
    fn test_list_missing_root() {
        let dir = tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("missing"));
        assert!(store.list().unwrap().is_empty());
    }
}

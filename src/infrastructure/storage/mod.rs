//! File-based storage implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

use crate::application::errors::{ConfigError, StorageError};
use crate::domain::traits::{ConfigStore, DocumentUpdate};

/// JSON document store, optionally backed by a single file.
///
/// All updates pass through one writer lock, so read-modify-write cycles on
/// the same document never interleave.
pub struct JsonStore {
    path: Option<PathBuf>,
    docs: RwLock<HashMap<String, serde_json::Value>>,
    writer: Mutex<()>,
}

impl JsonStore {
    /// A store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            path: None,
            docs: RwLock::new(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    /// Open or create the store file at `path`.
    ///
    /// An unreadable file is moved aside to `<file>.corrupt-<timestamp>` and
    /// the store starts empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let docs = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(docs) => docs,
                Err(e) => {
                    let err = ConfigError::Parse(format!("{}: {}", path.display(), e));
                    let backup = Self::quarantine(&path).await?;
                    tracing::error!(
                        backup = %backup.display(),
                        "{}, moved aside and starting with an empty store",
                        err
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            docs: RwLock::new(docs),
            writer: Mutex::new(()),
        })
    }

    async fn quarantine(path: &Path) -> Result<PathBuf, StorageError> {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".corrupt-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f")));
        let backup = path.with_file_name(name);
        tokio::fs::rename(path, &backup).await?;
        Ok(backup)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, docs: &HashMap<String, serde_json::Value>) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(docs)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonStore {
    async fn read(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let docs = self.docs.read().await;
        Ok(docs.get(key).cloned())
    }

    async fn update(&self, key: &str, update: DocumentUpdate) -> Result<serde_json::Value, StorageError> {
        let _writer = self.writer.lock().await;

        let mut next = self.docs.read().await.clone();
        let value = update(next.get(key).cloned());
        next.insert(key.to_string(), value.clone());

        // Only publish the new state once it is on disk
        self.persist(&next).await?;
        *self.docs.write().await = next;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _writer = self.writer.lock().await;

        let mut next = self.docs.read().await.clone();
        if next.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&next).await?;
        *self.docs.write().await = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("store.json");

        let store = JsonStore::open(&path).await.unwrap();
        store
            .update("plugins", Box::new(|_| serde_json::json!({ "disabled": ["weather"] })))
            .await
            .unwrap();

        let reopened = JsonStore::open(&path).await.unwrap();
        let doc = reopened.read("plugins").await.unwrap().unwrap();
        assert_eq!(doc["disabled"][0], "weather");
    }

    #[tokio::test]
    async fn test_update_sees_previous_value() {
        let store = JsonStore::in_memory();
        for _ in 0..3 {
            store
                .update(
                    "counter",
                    Box::new(|current| {
                        let n = current.and_then(|v| v.as_u64()).unwrap_or(0);
                        serde_json::json!(n + 1)
                    }),
                )
                .await
                .unwrap();
        }
        assert_eq!(store.read("counter").await.unwrap(), Some(serde_json::json!(3)));
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = JsonStore::open(&path).await.unwrap();
        assert_eq!(store.read("plugins").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_kept_after_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let corrupt = r#"{"admin": {"superAdmin": "1", "admins": ["2"]},, }"#;
        tokio::fs::write(&path, corrupt).await.unwrap();

        let store = JsonStore::open(&path).await.unwrap();
        store
            .update("plugins", Box::new(|_| serde_json::json!({ "disabled": [] })))
            .await
            .unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0], "store.json");
        assert!(names[1].starts_with("store.json.corrupt-"));

        let backup = std::fs::read_to_string(dir.path().join(&names[1])).unwrap();
        assert_eq!(backup, corrupt);
        let reopened = JsonStore::open(&path).await.unwrap();
        assert!(reopened.read("plugins").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let store = JsonStore::in_memory();
        store.update("admin", Box::new(|_| serde_json::json!({}))).await.unwrap();
        store.delete("admin").await.unwrap();
        store.delete("admin").await.unwrap();
        assert_eq!(store.read("admin").await.unwrap(), None);
    }
}

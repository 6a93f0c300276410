use async_trait::async_trait;

use crate::application::errors::StorageError;

/// Read-modify-write step applied to one persisted document
pub type DocumentUpdate = Box<dyn FnOnce(Option<serde_json::Value>) -> serde_json::Value + Send>;

/// Key-value store of JSON documents backing the runtime's persisted state.
///
/// Reads may happen concurrently. Implementations must serialize `update`
/// calls so two writers of the same document never interleave.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Apply `update` to the current value of `key` and persist the result
    async fn update(&self, key: &str, update: DocumentUpdate) -> Result<serde_json::Value, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

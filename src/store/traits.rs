//! store::traits
//!
//! The record store contract.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::StoreError;

/// Keyed persistence of serializable records.
///
/// Each backend chooses what a write reports (`WriteResult`) and what it
/// accepts (`WriteOptions`). IDs are validated before any I/O on every
/// operation; an invalid ID is [`StoreError::InvalidId`].
///
/// Missing records are not errors: `get` returns `None` and `delete` of a
/// missing record succeeds.
#[async_trait]
pub trait RecordStore<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// What a successful write reports.
    type WriteResult: Default + Send;

    /// Per-write options.
    type WriteOptions: Default + Send + Sync;

    /// Read a record.
    async fn get(&self, id: &str) -> Result<Option<T>, StoreError>;

    /// Create or replace a record.
    async fn put(
        &self,
        id: &str,
        value: &T,
        opts: &Self::WriteOptions,
    ) -> Result<Self::WriteResult, StoreError>;

    /// Write several records.
    ///
    /// An empty slice returns `WriteResult::default()` without any I/O.
    async fn put_many(
        &self,
        entries: &[(String, T)],
        opts: &Self::WriteOptions,
    ) -> Result<Self::WriteResult, StoreError>;

    /// Remove a record. Removing a missing record succeeds.
    async fn delete(
        &self,
        id: &str,
        opts: &Self::WriteOptions,
    ) -> Result<Self::WriteResult, StoreError>;

    /// IDs of all stored records, sorted.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Whether a record exists.
    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.get(id).await?.is_some())
    }
}

/// Serialize a record as the document stored for it.
pub(crate) fn encode_record<T: Serialize>(id: &str, value: &T) -> Result<String, StoreError> {
    let mut doc = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        id: id.to_string(),
        source,
    })?;
    doc.push('\n');
    Ok(doc)
}

/// Parse a stored document.
pub(crate) fn decode_record<T: DeserializeOwned>(id: &str, doc: &str) -> Result<T, StoreError> {
    serde_json::from_str(doc).map_err(|source| StoreError::Deserialize {
        id: id.to_string(),
        source,
    })
}

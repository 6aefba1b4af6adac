//! store::memory
//!
//! In-memory record store for tests.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::StoreError;
use super::id::validate_id;
use super::traits::{decode_record, encode_record, RecordStore};

/// Record store over a map of serialized documents.
///
/// Values go through the same JSON encoding as the persistent stores, so a
/// type that fails to round-trip fails here too. Clones share contents.
#[derive(Debug)]
pub struct MemoryStore<T> {
    docs: Arc<Mutex<BTreeMap<String, String>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            docs: Arc::clone(&self.docs),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            docs: Arc::new(Mutex::new(BTreeMap::new())),
            _marker: PhantomData,
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.docs().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.docs().is_empty()
    }

    fn docs(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<T> RecordStore<T> for MemoryStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type WriteResult = ();
    type WriteOptions = ();

    async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        validate_id(id)?;
        let doc = self.docs().get(id).cloned();
        doc.map(|doc| decode_record(id, &doc)).transpose()
    }

    async fn put(&self, id: &str, value: &T, _opts: &()) -> Result<(), StoreError> {
        validate_id(id)?;
        let doc = encode_record(id, value)?;
        self.docs().insert(id.to_string(), doc);
        Ok(())
    }

    async fn put_many(&self, entries: &[(String, T)], _opts: &()) -> Result<(), StoreError> {
        let mut docs = Vec::with_capacity(entries.len());
        for (id, value) in entries {
            validate_id(id)?;
            docs.push((id.clone(), encode_record(id, value)?));
        }
        self.docs().extend(docs);
        Ok(())
    }

    async fn delete(&self, id: &str, _opts: &()) -> Result<(), StoreError> {
        validate_id(id)?;
        self.docs().remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.docs().keys().cloned().collect())
    }
}

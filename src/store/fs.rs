//! store::fs
//!
//! Filesystem record store.
//!
//! # Layout
//!
//! Each record is one JSON document at `<base>/<encoded id>.<ext>`. The
//! directory is created on first write unless that is disabled.
//!
//! # Atomicity
//!
//! Writes go to a hidden temp file in the same directory, are synced, then
//! renamed over the target, so a reader never sees a half-written record.
//! A failed write removes its temp file.
//! `put_many` is not atomic across records.
//!
//! # Example
//!
//! ```
//! use gitrecords::store::{FsStore, RecordStore};
//!
//! # tokio_test::block_on(async {
//! let dir = tempfile::tempdir().unwrap();
//! let store: FsStore<serde_json::Value> = FsStore::new(dir.path());
//!
//! store.put("a", &serde_json::json!({"n": 1}), &()).await.unwrap();
//! assert_eq!(store.list().await.unwrap(), vec!["a"]);
//! # });
//! ```

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::error::StoreError;
use super::id::{storage_name, IdEncoder};
use super::traits::{decode_record, encode_record, RecordStore};

/// Default record file extension.
pub const DEFAULT_EXTENSION: &str = "json";

/// Record store backed by a directory of JSON files.
#[derive(Debug)]
pub struct FsStore<T> {
    base: PathBuf,
    extension: String,
    create_dirs: bool,
    encoder: Option<Arc<dyn IdEncoder>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FsStore<T> {
    /// Store rooted at `base`, using `.json` files.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            create_dirs: true,
            encoder: None,
            _marker: PhantomData,
        }
    }

    /// Use a different file extension (without the dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Whether `put` creates the base directory when it is missing.
    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    /// Map IDs through `encoder` before using them as file names.
    pub fn with_encoder(mut self, encoder: impl IdEncoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// The base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let name = storage_name(id, self.encoder.as_deref())?;
        Ok(self.base.join(format!("{name}.{}", self.extension)))
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    async fn write_atomic(&self, path: &Path, doc: &str) -> Result<(), StoreError> {
        if self.create_dirs {
            tokio::fs::create_dir_all(&self.base)
                .await
                .map_err(Self::io_error(&self.base))?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

        let written = async {
            {
                let mut file = tokio::fs::File::create(&temp_path)
                    .await
                    .map_err(Self::io_error(&temp_path))?;
                file.write_all(doc.as_bytes())
                    .await
                    .map_err(Self::io_error(&temp_path))?;
                file.sync_all().await.map_err(Self::io_error(&temp_path))?;
            }
            tokio::fs::rename(&temp_path, path)
                .await
                .map_err(Self::io_error(path))
        }
        .await;

        if written.is_err() {
            if let Err(e) = tokio::fs::remove_file(&temp_path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %temp_path.display(), error = %e, "failed to remove temp file");
                }
            }
        }
        written
    }
}

#[async_trait]
impl<T> RecordStore<T> for FsStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type WriteResult = ();
    type WriteOptions = ();

    async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(doc) => decode_record(id, &doc).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn put(&self, id: &str, value: &T, _opts: &()) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let doc = encode_record(id, value)?;
        self.write_atomic(&path, &doc).await?;
        debug!(id, path = %path.display(), "wrote record");
        Ok(())
    }

    async fn put_many(&self, entries: &[(String, T)], _opts: &()) -> Result<(), StoreError> {
        // Reject the batch up front if any ID is bad.
        for (id, _) in entries {
            self.path_for(id)?;
        }
        for (id, value) in entries {
            self.put(id, value, &()).await?;
        }
        Ok(())
    }

    async fn delete(&self, id: &str, _opts: &()) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(id, "deleted record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.base).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.base.clone(),
                    source,
                })
            }
        };

        let suffix = format!(".{}", self.extension);
        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(Self::io_error(&self.base))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            let Some(stem) = name.strip_suffix(&suffix) else {
                continue;
            };
            if !is_file {
                continue;
            }
            ids.push(match &self.encoder {
                Some(encoder) => encoder.decode(stem),
                None => stem.to_string(),
            });
        }
        ids.sort();
        Ok(ids)
    }
}

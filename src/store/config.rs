//! store::config
//!
//! A single JSON document at a fixed path in a GitHub repository.

use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::error::StoreError;
use super::traits::encode_record;
use crate::forge::wire::{encode_content, ContentWriteResponse, PutContentBody};
use crate::forge::GitHubClient;

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = ".gitrecords/config.json";

/// Reads and writes one configuration document.
///
/// Reads are fail-safe: a missing file and a file that does not parse both
/// read as `None`. Writes use the same hash precondition as
/// [`GitHubStore`](super::GitHubStore).
#[derive(Debug)]
pub struct GitHubConfigStore<T> {
    client: GitHubClient,
    branch: String,
    path: String,
    sha: Mutex<Option<String>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> GitHubConfigStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Store at [`DEFAULT_CONFIG_PATH`] on `branch`.
    pub fn new(client: GitHubClient, branch: impl Into<String>) -> Self {
        Self::with_path(client, branch, DEFAULT_CONFIG_PATH)
    }

    /// Store at a custom path.
    pub fn with_path(
        client: GitHubClient,
        branch: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            branch: branch.into(),
            path: path.into(),
            sha: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    /// Path of the document in the repository.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn sha(&self) -> MutexGuard<'_, Option<String>> {
        self.sha.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the configuration.
    ///
    /// # Errors
    ///
    /// Only transport failures; bad content is `Ok(None)`.
    pub async fn get(&self) -> Result<Option<T>, StoreError> {
        let Some(file) = self.client.read_file(&self.path, &self.branch).await? else {
            *self.sha() = None;
            return Ok(None);
        };
        // Keep the hash even for a bad document so the next put can replace it.
        *self.sha() = Some(file.sha);

        match serde_json::from_str(&file.content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(path = %self.path, error = %e, "ignoring unparseable config");
                Ok(None)
            }
        }
    }

    /// Write the configuration and return the new commit hash.
    pub async fn put(&self, value: &T, message: Option<&str>) -> Result<String, StoreError> {
        let doc = encode_record(&self.path, value)?;
        let precondition = self.sha().clone();

        let request = self
            .client
            .request(Method::PUT, &format!("contents/{}", self.path))?
            .json(&PutContentBody {
                message: message.unwrap_or("Update configuration"),
                content: encode_content(&doc),
                branch: &self.branch,
                sha: precondition.as_deref(),
            });
        let written: ContentWriteResponse = self.client.execute(request).await?;

        *self.sha() = written.content.map(|c| c.sha);
        Ok(written.commit.sha)
    }

    /// Whether a readable configuration exists.
    pub async fn exists(&self) -> Result<bool, StoreError> {
        Ok(self.get().await?.is_some())
    }
}

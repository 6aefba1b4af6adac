//! store::github
//!
//! Record store over the GitHub contents API.
//!
//! # Concurrency
//!
//! Every path remembers the blob hash seen on its last read or write. A
//! write sends that hash as its precondition, so GitHub rejects it if the
//! file changed in between ([`StoreError::is_conflict`]). A first write to
//! a path the store has never seen sends no hash and creates the file.
//!
//! Nothing is retried; the caller decides whether to re-read and try again.
//!
//! # Multi-record writes
//!
//! `put_many` needs a [`GitHubGit`]. It stages every record and commits
//! once through the git data API, so a batch lands as one commit or not at
//! all. The Git backend is switched to the store's branch first, so the
//! commit lands on the same branch single-record writes go to.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::error::StoreError;
use super::fs::DEFAULT_EXTENSION;
use super::id::{storage_name, IdEncoder};
use super::traits::{decode_record, encode_record, RecordStore};
use crate::forge::wire::{
    encode_content, ContentWriteResponse, Contents, DeleteContentBody, PutContentBody,
};
use crate::forge::{GitHubClient, RemoteError};
use crate::git::{AddOptions, GitHubGit, GitOperations};

/// What a GitHub write reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitHubWriteResult {
    /// Commit created by the write; `None` when nothing was written
    pub commit_sha: Option<String>,
}

/// Options for a GitHub write.
#[derive(Debug, Clone, Default)]
pub struct GitHubWriteOptions {
    /// Commit message; a default naming the record is used otherwise
    pub message: Option<String>,
}

impl GitHubWriteOptions {
    /// Options with an explicit commit message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    fn message_or(&self, default: impl FnOnce() -> String) -> String {
        self.message.clone().unwrap_or_else(default)
    }
}

/// Record store backed by files in a GitHub repository.
#[derive(Debug)]
pub struct GitHubStore<T> {
    client: GitHubClient,
    branch: String,
    base_path: String,
    extension: String,
    encoder: Option<Arc<dyn IdEncoder>>,
    git: Option<Arc<GitHubGit>>,
    shas: Mutex<HashMap<String, String>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> GitHubStore<T> {
    /// Store records under `base_path` on `branch`.
    pub fn new(
        client: GitHubClient,
        branch: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            branch: branch.into(),
            base_path: base_path.into().trim_matches('/').to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            encoder: None,
            git: None,
            shas: Mutex::new(HashMap::new()),
            _marker: PhantomData,
        }
    }

    /// Use a different file extension (without the dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Map IDs through `encoder` before using them as file names.
    pub fn with_encoder(mut self, encoder: impl IdEncoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Enable `put_many` through a Git backend.
    pub fn with_git(mut self, git: Arc<GitHubGit>) -> Self {
        self.git = Some(git);
        self
    }

    /// Branch that single-record reads and writes target.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Cached precondition hash for `id`, if any.
    pub fn cached_sha(&self, id: &str) -> Option<String> {
        let path = self.path_for(id).ok()?;
        self.shas().get(&path).cloned()
    }

    fn shas(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.shas.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn path_for(&self, id: &str) -> Result<String, StoreError> {
        let name = storage_name(id, self.encoder.as_deref())?;
        Ok(if self.base_path.is_empty() {
            format!("{name}.{}", self.extension)
        } else {
            format!("{}/{name}.{}", self.base_path, self.extension)
        })
    }
}

#[async_trait]
impl<T> RecordStore<T> for GitHubStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type WriteResult = GitHubWriteResult;
    type WriteOptions = GitHubWriteOptions;

    async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(id)?;
        match self.client.read_file(&path, &self.branch).await? {
            Some(file) => {
                self.shas().insert(path, file.sha);
                decode_record(id, &file.content).map(Some)
            }
            None => {
                self.shas().remove(&path);
                Ok(None)
            }
        }
    }

    async fn put(
        &self,
        id: &str,
        value: &T,
        opts: &GitHubWriteOptions,
    ) -> Result<GitHubWriteResult, StoreError> {
        let path = self.path_for(id)?;
        let doc = encode_record(id, value)?;
        let precondition = self.shas().get(&path).cloned();
        let message = opts.message_or(|| format!("Update {id}"));

        let request = self
            .client
            .request(Method::PUT, &format!("contents/{path}"))?
            .json(&PutContentBody {
                message: &message,
                content: encode_content(&doc),
                branch: &self.branch,
                sha: precondition.as_deref(),
            });
        let written: ContentWriteResponse = self.client.execute(request).await?;

        if let Some(content) = written.content {
            self.shas().insert(path.clone(), content.sha);
        }
        debug!(id, %path, commit = %written.commit.sha, "wrote record");
        Ok(GitHubWriteResult {
            commit_sha: Some(written.commit.sha),
        })
    }

    async fn put_many(
        &self,
        entries: &[(String, T)],
        opts: &GitHubWriteOptions,
    ) -> Result<GitHubWriteResult, StoreError> {
        if entries.is_empty() {
            return Ok(GitHubWriteResult::default());
        }
        let git = self.git.as_ref().ok_or(StoreError::MissingGitBackend)?;

        let mut staged = Vec::with_capacity(entries.len());
        for (id, value) in entries {
            staged.push((self.path_for(id)?, encode_record(id, value)?));
        }
        git.checkout_branch(&self.branch).await?;
        for (path, doc) in &staged {
            git.add(&[path.as_str()], AddOptions::with_content(doc.as_str()))
                .await?;
        }

        let message = opts.message_or(|| format!("Update {} records", entries.len()));
        let outcome = git.commit_staged(&message).await?;

        {
            let mut shas = self.shas();
            for (path, sha) in outcome.blob_shas {
                shas.insert(path, sha);
            }
        }
        info!(records = entries.len(), commit = %outcome.commit_sha, "wrote record batch");
        Ok(GitHubWriteResult {
            commit_sha: Some(outcome.commit_sha),
        })
    }

    async fn delete(
        &self,
        id: &str,
        opts: &GitHubWriteOptions,
    ) -> Result<GitHubWriteResult, StoreError> {
        let path = self.path_for(id)?;

        let cached = self.shas().get(&path).cloned();
        let sha = match cached {
            Some(sha) => sha,
            None => match self.client.read_file(&path, &self.branch).await? {
                Some(file) => file.sha,
                None => return Ok(GitHubWriteResult::default()),
            },
        };

        let message = opts.message_or(|| format!("Delete {id}"));
        let request = self
            .client
            .request(Method::DELETE, &format!("contents/{path}"))?
            .json(&DeleteContentBody {
                message: &message,
                sha: &sha,
                branch: &self.branch,
            });
        let deleted: Option<ContentWriteResponse> = self.client.execute_optional(request).await?;
        self.shas().remove(&path);

        Ok(GitHubWriteResult {
            commit_sha: deleted.map(|d| d.commit.sha),
        })
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let request = self
            .client
            .request(Method::GET, &format!("contents/{}", self.base_path))?
            .query(&[("ref", self.branch.as_str())]);

        let entries = match self.client.execute_optional::<Contents>(request).await? {
            None => return Ok(Vec::new()),
            Some(Contents::Directory(entries)) => entries,
            Some(Contents::File(_)) => {
                return Err(RemoteError::InvalidResponse(format!(
                    "{} is a file, expected a directory",
                    self.base_path
                ))
                .into())
            }
        };

        let suffix = format!(".{}", self.extension);
        let mut ids: Vec<String> = entries
            .into_iter()
            .filter(|e| e.kind == "file")
            .filter_map(|e| {
                let stem = e.name.strip_suffix(&suffix)?;
                Some(match &self.encoder {
                    Some(encoder) => encoder.decode(stem),
                    None => stem.to_string(),
                })
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}

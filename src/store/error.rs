//! store::error
//!
//! Errors from record stores.

use std::path::PathBuf;

use thiserror::Error;

use crate::forge::RemoteError;
use crate::git::GitError;

/// Errors from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record ID was rejected before any I/O.
    #[error("invalid record id '{id}': {reason}")]
    InvalidId {
        /// The rejected ID
        id: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// Filesystem failure other than a missing file.
    #[error("record store I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The value could not be serialized.
    #[error("cannot serialize record '{id}': {source}")]
    Serialize {
        /// Record ID
        id: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// The stored document is not a valid record.
    #[error("cannot parse record '{id}': {source}")]
    Deserialize {
        /// Record ID
        id: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// `put_many` was called on a remote store built without a Git backend.
    #[error("put_many requires a Git backend; construct the store with one")]
    MissingGitBackend,

    /// The remote provider rejected or failed a request.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The Git backend failed during a multi-record commit.
    #[error(transparent)]
    Git(#[from] GitError),
}

impl StoreError {
    /// Whether a write lost an optimistic-concurrency race.
    ///
    /// True for a stale per-file precondition and for a rejected ref update
    /// in a multi-record commit.
    pub fn is_conflict(&self) -> bool {
        match self {
            StoreError::Remote(e) => e.is_conflict(),
            StoreError::Git(e) => e.is_conflict(),
            _ => false,
        }
    }

    /// Whether the ID was rejected by validation.
    pub fn is_invalid_id(&self) -> bool {
        matches!(self, StoreError::InvalidId { .. })
    }
}

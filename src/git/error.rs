//! git::error
//!
//! The error taxonomy shared by every Git backend.

use std::path::PathBuf;

use thiserror::Error;

use crate::forge::RemoteError;

/// Errors from Git operations.
///
/// Every backend maps its native failure signals (process exit codes and
/// stderr text, in-memory state checks, HTTP statuses) into these variants,
/// so callers handle one set of kinds regardless of backend.
#[derive(Debug, Error)]
pub enum GitError {
    /// The named branch or ref does not exist.
    #[error("branch not found: {branch}")]
    BranchNotFound {
        /// The branch or ref expression that failed to resolve
        branch: String,
    },

    /// A branch with this name already exists.
    #[error("branch already exists: {branch}")]
    BranchExists {
        /// The branch name
        branch: String,
    },

    /// The file does not exist at the given commit.
    #[error("file not found: {path} at {commit}")]
    FileNotFound {
        /// Repository-relative path
        path: String,
        /// Commit or ref the lookup was made against
        commit: String,
    },

    /// `continue`/`abort` was requested with no rebase running.
    #[error("no rebase in progress")]
    RebaseNotInProgress,

    /// A merge stopped on conflicts.
    #[error("merge conflict in: {}", .files.join(", "))]
    MergeConflict {
        /// Paths in "both changed" state
        files: Vec<String>,
    },

    /// A rebase stopped on conflicts.
    #[error("rebase conflict in: {}", .files.join(", "))]
    RebaseConflict {
        /// Paths in "both changed" state
        files: Vec<String>,
    },

    /// The underlying command failed for a reason with no dedicated kind.
    #[error("{command} failed with exit code {exit_code}: {}", .stderr.trim())]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// Process exit code (-1 if terminated by a signal)
        exit_code: i32,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// HEAD does not point at a branch.
    #[error("HEAD is detached")]
    DetachedHead,

    /// A commit was requested with nothing staged.
    #[error("nothing to commit")]
    NothingToCommit,

    /// The backend cannot express this operation.
    #[error("{operation} is not supported by the {backend} backend")]
    NotSupported {
        /// Operation name
        operation: &'static str,
        /// Backend name
        backend: &'static str,
    },

    /// Filesystem or process-spawn failure.
    #[error("repository access error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The remote provider rejected or failed a request.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl GitError {
    /// Conflicted paths carried by a merge or rebase conflict.
    pub fn conflicted_files(&self) -> Option<&[String]> {
        match self {
            GitError::MergeConflict { files } | GitError::RebaseConflict { files } => Some(files),
            _ => None,
        }
    }

    /// Whether this error signals a lost compare-and-swap race on the remote.
    pub fn is_conflict(&self) -> bool {
        matches!(self, GitError::Remote(e) if e.is_conflict())
    }
}

//! git
//!
//! One interface for Git, three ways to reach a repository.
//!
//! # Architecture
//!
//! [`GitOperations`] is the contract every caller programs against. The
//! backends share no code and do not know about each other:
//!
//! - [`LocalGit`] drives the `git` executable through an injected
//!   [`CommandExecutor`] and maps its output and exit codes to [`GitError`]
//! - [`MemoryGit`] is a deterministic in-memory state machine for tests
//! - [`GitHubGit`] rebuilds the write path (blob, tree, commit, ref) from
//!   GitHub REST calls and keeps its own staging buffer
//!
//! # Invariants
//!
//! - `commit_hash` returns any 40-character hex input unchanged, without
//!   touching the backend
//! - A successful commit empties the staging area; a failed one leaves it
//!   as it was
//! - Every failure is a [`GitError`]; callers never inspect exit codes or
//!   HTTP statuses directly
//!
//! # Example
//!
//! ```
//! use gitrecords::git::{AddOptions, GitOperations, MemoryGit};
//!
//! async fn record(git: &dyn GitOperations) -> Result<String, gitrecords::git::GitError> {
//!     git.add(&["records/a.json"], AddOptions::with_content("{}")).await?;
//!     git.commit("Add record a").await
//! }
//!
//! # tokio_test::block_on(async {
//! let git = MemoryGit::new();
//! let head = record(&git).await.unwrap();
//! assert_eq!(git.commit_hash("HEAD").await.unwrap(), head);
//! # });
//! ```

mod error;
mod exec;
mod github;
mod local;
mod memory;
mod traits;

pub use error::GitError;
pub use exec::{CommandExecutor, ExecOptions, ExecOutput, TokioExecutor};
pub use github::{CommitOutcome, GitHubGit};
pub use local::LocalGit;
pub use memory::{MemoryGit, PLACEHOLDER_HEAD};
pub use traits::{
    is_full_hash, AddOptions, ChangeStatus, ChangedFile, CommitInfo, ConfigScope, GitOperations,
    HistoryOptions, PushOptions, DEFAULT_BRANCH, DEFAULT_REMOTE,
};

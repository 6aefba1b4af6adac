//! git::traits
//!
//! The `GitOperations` trait and the value types it exchanges.
//!
//! # Design
//!
//! The trait is async because every backend performs I/O (a child process,
//! an HTTP call) or must look as if it does. Receivers are `&self`; backends
//! keep their mutable cursor and staging buffer behind interior mutability.
//! That makes handles `Send + Sync`, but it does not make them safe for
//! concurrent logical use: two interleaved `add`/`commit` sequences on one
//! handle can still mix their changes. Use one handle per writer.
//!
//! # Example
//!
//! ```ignore
//! use gitrecords::git::{AddOptions, GitOperations};
//!
//! async fn save(git: &dyn GitOperations) -> Result<String, GitError> {
//!     git.add(&["notes/today.md"], AddOptions::with_content("# Today\n"))
//!         .await?;
//!     git.commit("Add today's notes").await
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::GitError;

/// Remote name assumed when none is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// Branch created by `init` when none is specified.
pub const DEFAULT_BRANCH: &str = "main";

/// Whether `s` is a full 40-character hex object id.
///
/// Such inputs are returned verbatim by
/// [`GitOperations::commit_hash`] on every backend, without a lookup.
///
/// # Example
///
/// ```
/// use gitrecords::git::is_full_hash;
///
/// assert!(is_full_hash("0123456789abcdef0123456789abcdef01234567"));
/// assert!(!is_full_hash("HEAD"));
/// assert!(!is_full_hash("0123456"));
/// ```
pub fn is_full_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Information about a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// The commit hash
    pub hash: String,
    /// Full commit message
    pub message: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author timestamp
    pub timestamp: DateTime<Utc>,
    /// Parent hashes, first parent first
    pub parents: Vec<String>,
}

impl CommitInfo {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Author in `name <email>` form.
    pub fn author(&self) -> String {
        format!("{} <{}>", self.author_name, self.author_email)
    }
}

/// How a file changed between two commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// File was created
    Added,
    /// File content or mode changed
    Modified,
    /// File was removed
    Deleted,
    /// File was moved (possibly with edits)
    Renamed,
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeStatus::Added => write!(f, "added"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Deleted => write!(f, "deleted"),
            ChangeStatus::Renamed => write!(f, "renamed"),
        }
    }
}

/// A file that differs between two commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// Path after the change
    pub path: String,
    /// Kind of change
    pub status: ChangeStatus,
    /// Path before a rename
    pub previous_path: Option<String>,
}

/// Filters for [`GitOperations::commit_history`].
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    /// Return at most this many commits
    pub max_count: Option<usize>,
    /// Only commits touching this path
    pub path_filter: Option<String>,
}

/// Options for [`GitOperations::add`].
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Content to write at every listed path before staging it.
    ///
    /// Required on backends without a working tree.
    pub content: Option<String>,
}

impl AddOptions {
    /// Stage `content` at the given paths.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }
}

/// Options for [`GitOperations::push`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PushOptions {
    /// Overwrite the remote branch if it diverged (with lease)
    pub force: bool,
}

/// Scope of a configuration write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigScope {
    /// Repository configuration
    #[default]
    Local,
    /// User configuration
    Global,
    /// Machine configuration
    System,
}

impl ConfigScope {
    /// The `git config` flag selecting this scope.
    pub fn flag(&self) -> &'static str {
        match self {
            ConfigScope::Local => "--local",
            ConfigScope::Global => "--global",
            ConfigScope::System => "--system",
        }
    }
}

/// The Git operations every backend provides.
///
/// Implemented by [`LocalGit`](super::LocalGit) (the `git` executable),
/// [`MemoryGit`](super::MemoryGit) (in-memory test double) and
/// [`GitHubGit`](super::GitHubGit) (GitHub REST API). Callers hold a
/// `&dyn GitOperations` and never learn which one they have.
///
/// Operations that omit a ref act on the handle's active branch.
#[async_trait]
pub trait GitOperations: Send + Sync {
    /// Short backend name used in errors and logs.
    fn backend_name(&self) -> &'static str;

    // =========================================================================
    // Init
    // =========================================================================

    /// Create an empty repository.
    async fn init(&self) -> Result<(), GitError>;

    // =========================================================================
    // Read
    // =========================================================================

    /// Repository root: a path for local repositories, `owner/repo` for remote.
    async fn repo_root(&self) -> Result<String, GitError>;

    /// Name of the active branch.
    ///
    /// # Errors
    ///
    /// - [`GitError::DetachedHead`] if HEAD does not name a branch
    async fn current_branch(&self) -> Result<String, GitError>;

    /// Resolve a ref expression to a commit hash.
    ///
    /// A 40-character hex string is returned unchanged without consulting
    /// the repository.
    async fn commit_hash(&self, reference: &str) -> Result<String, GitError>;

    /// Best common ancestor of two refs.
    async fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError>;

    /// Files that differ between two refs.
    async fn changed_files(&self, from: &str, to: &str) -> Result<Vec<ChangedFile>, GitError>;

    /// Paths currently staged for the next commit.
    async fn staged_files(&self) -> Result<Vec<String>, GitError>;

    /// Content of `path` as of `commit`.
    ///
    /// # Errors
    ///
    /// - [`GitError::FileNotFound`] if the path does not exist there
    async fn file_content(&self, commit: &str, path: &str) -> Result<String, GitError>;

    /// History of the active branch, newest first.
    async fn commit_history(&self, opts: &HistoryOptions) -> Result<Vec<CommitInfo>, GitError>;

    /// Commits reachable from `to` but not from `from`, newest first.
    async fn commit_history_range(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<CommitInfo>, GitError>;

    /// Full message of a commit.
    async fn commit_message(&self, hash: &str) -> Result<String, GitError>;

    /// Whether anything is staged or modified but not committed.
    async fn has_uncommitted_changes(&self) -> Result<bool, GitError>;

    /// Whether a rebase is stopped mid-way.
    async fn is_rebase_in_progress(&self) -> Result<bool, GitError>;

    /// Whether a local branch with this name exists.
    async fn branch_exists(&self, name: &str) -> Result<bool, GitError>;

    /// Branch names known on `remote`, without the remote prefix.
    async fn remote_branches(&self, remote: &str) -> Result<Vec<String>, GitError>;

    /// Whether a remote with this name is configured.
    async fn is_remote_configured(&self, remote: &str) -> Result<bool, GitError>;

    /// The remote `branch` tracks, if any.
    async fn tracking_remote(&self, branch: &str) -> Result<Option<String>, GitError>;

    /// Paths left in "both changed" state by a stopped merge or rebase.
    async fn conflicted_files(&self) -> Result<Vec<String>, GitError>;

    /// Read a configuration value.
    async fn config_value(&self, key: &str) -> Result<Option<String>, GitError>;

    // =========================================================================
    // Write
    // =========================================================================

    /// Make `name` the active branch.
    async fn checkout_branch(&self, name: &str) -> Result<(), GitError>;

    /// Start a new branch with no history.
    async fn checkout_orphan_branch(&self, name: &str) -> Result<(), GitError>;

    /// Update remote-tracking refs.
    async fn fetch(&self, remote: &str) -> Result<(), GitError>;

    /// Merge `remote/branch` into the active branch.
    ///
    /// # Errors
    ///
    /// - [`GitError::MergeConflict`] carrying the conflicted paths
    async fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Rebase the active branch onto `remote/branch`.
    ///
    /// # Errors
    ///
    /// - [`GitError::RebaseConflict`] carrying the conflicted paths
    async fn pull_rebase(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Move the active branch to `target`, discarding local changes.
    async fn reset_hard(&self, target: &str) -> Result<(), GitError>;

    /// Replace `paths` with their versions from `branch`.
    async fn checkout_files(&self, branch: &str, paths: &[&str]) -> Result<(), GitError>;

    /// Stage additions or updates.
    async fn add(&self, paths: &[&str], opts: AddOptions) -> Result<(), GitError>;

    /// Stage deletions.
    async fn rm(&self, paths: &[&str]) -> Result<(), GitError>;

    /// Commit staged changes and return the new commit hash.
    ///
    /// # Errors
    ///
    /// - [`GitError::NothingToCommit`] if nothing is staged
    async fn commit(&self, message: &str) -> Result<String, GitError>;

    /// Commit even if nothing is staged.
    async fn commit_allow_empty(&self, message: &str) -> Result<String, GitError>;

    /// Push `branch` to `remote`.
    async fn push(&self, remote: &str, branch: &str, opts: PushOptions) -> Result<(), GitError>;

    /// Push `branch` and record `remote` as its upstream.
    async fn push_with_upstream(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// Record `remote/branch` as the upstream of `branch`.
    async fn set_upstream(&self, branch: &str, remote: &str) -> Result<(), GitError>;

    /// Shelve uncommitted changes. Returns `false` if there was nothing to shelve.
    async fn stash(&self) -> Result<bool, GitError>;

    /// Restore the most recently shelved changes.
    async fn stash_pop(&self) -> Result<(), GitError>;

    /// Write a configuration value.
    async fn set_config(&self, key: &str, value: &str, scope: ConfigScope)
        -> Result<(), GitError>;

    // =========================================================================
    // Rebase
    // =========================================================================

    /// Resume a stopped rebase after conflicts were resolved.
    ///
    /// # Errors
    ///
    /// - [`GitError::RebaseNotInProgress`] if no rebase is stopped
    async fn rebase_continue(&self) -> Result<(), GitError>;

    /// Abandon a stopped rebase, restoring the pre-rebase HEAD.
    ///
    /// # Errors
    ///
    /// - [`GitError::RebaseNotInProgress`] if no rebase is stopped
    async fn rebase_abort(&self) -> Result<(), GitError>;

    /// Create `name` at `start` (default: the active branch) and make it active.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchExists`] if the name is taken
    async fn create_branch(&self, name: &str, start: Option<&str>) -> Result<(), GitError>;

    /// Replay the active branch on top of `onto`.
    ///
    /// # Errors
    ///
    /// - [`GitError::RebaseConflict`] carrying the conflicted paths
    async fn rebase(&self, onto: &str) -> Result<(), GitError>;

    /// Replay commits after `upstream` on top of `new_base`.
    async fn rebase_onto(&self, new_base: &str, upstream: &str) -> Result<(), GitError>;
}

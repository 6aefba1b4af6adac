//! git::memory
//!
//! In-memory Git backend for deterministic testing.
//!
//! # Design
//!
//! [`MemoryGit`] is a closed state machine: branches, a linear commit list
//! where every commit carries a full snapshot of the files, a global file
//! map standing in for the working tree, a staged path list, a stash, a
//! config map, and explicit rebase/conflict state. It implements
//! [`GitOperations`] with the same observable contract as the other
//! backends, plus `set_*` helpers for building fixtures.
//!
//! It does not compute real merges. `rebase` and `pull` stop on conflicts
//! only when conflicted files were seeded with
//! [`MemoryGit::set_conflicted_files`].
//!
//! # Example
//!
//! ```
//! use gitrecords::git::{AddOptions, GitOperations, MemoryGit};
//!
//! # tokio_test::block_on(async {
//! let git = MemoryGit::new();
//! git.add(&["a.json"], AddOptions::with_content("{}")).await.unwrap();
//! let head = git.commit("Add a").await.unwrap();
//!
//! assert_eq!(git.file_content(&head, "a.json").await.unwrap(), "{}");
//! assert!(git.staged_files().await.unwrap().is_empty());
//! # });
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use super::error::GitError;
use super::traits::{
    is_full_hash, AddOptions, ChangeStatus, ChangedFile, CommitInfo, ConfigScope, GitOperations,
    HistoryOptions, PushOptions, DEFAULT_BRANCH,
};

/// Hash reported for `HEAD` when the history is empty.
pub const PLACEHOLDER_HEAD: &str = "0000000000000000000000000000000000000000";

/// Repository root reported by a fresh memory backend.
const MEMORY_ROOT: &str = "/memory";

const DEFAULT_AUTHOR_NAME: &str = "Memory User";
const DEFAULT_AUTHOR_EMAIL: &str = "memory@localhost";

type Snapshot = BTreeMap<String, String>;

/// In-memory Git backend.
///
/// Clones share state, so a test can keep one handle for assertions while
/// passing another to the code under test.
#[derive(Debug, Clone)]
pub struct MemoryGit {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Clone)]
struct MemoryCommit {
    info: CommitInfo,
    /// Full file map at this commit
    files: Snapshot,
    /// Paths staged when the commit was made
    changed: Vec<String>,
}

#[derive(Debug, Clone)]
struct StashEntry {
    files: Snapshot,
    staged: Vec<String>,
}

#[derive(Debug)]
struct MemoryState {
    repo_root: String,
    current_branch: String,
    branches: BTreeSet<String>,
    /// Branch tips; a branch without an entry has no commits of its own
    heads: HashMap<String, String>,
    /// Orphan branches that have no commit yet
    orphans: BTreeSet<String>,
    commits: Vec<MemoryCommit>,
    files: Snapshot,
    staged: Vec<String>,
    rebase_in_progress: bool,
    conflicted: Vec<String>,
    remote_branches: BTreeMap<String, Vec<String>>,
    stash: Vec<StashEntry>,
    config: BTreeMap<String, String>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            repo_root: MEMORY_ROOT.to_string(),
            current_branch: DEFAULT_BRANCH.to_string(),
            branches: BTreeSet::from([DEFAULT_BRANCH.to_string()]),
            heads: HashMap::new(),
            orphans: BTreeSet::new(),
            commits: Vec::new(),
            files: Snapshot::new(),
            staged: Vec::new(),
            rebase_in_progress: false,
            conflicted: Vec::new(),
            remote_branches: BTreeMap::new(),
            stash: Vec::new(),
            config: BTreeMap::new(),
        }
    }
}

impl MemoryState {
    fn commit_index(&self, hash: &str) -> Option<usize> {
        self.commits.iter().position(|c| c.info.hash == hash)
    }

    /// Tip of a branch: its own head, else the latest commit overall.
    ///
    /// An orphan branch has no tip until its first commit.
    fn branch_tip(&self, branch: &str) -> Option<String> {
        if let Some(head) = self.heads.get(branch) {
            return Some(head.clone());
        }
        if self.orphans.contains(branch) {
            return None;
        }
        self.commits.last().map(|c| c.info.hash.clone())
    }

    /// Resolve a ref expression to a commit hash.
    ///
    /// `Ok(None)` means the ref is valid but has no commit yet.
    fn resolve(&self, reference: &str) -> Result<Option<String>, GitError> {
        if reference == "HEAD" {
            return Ok(self.branch_tip(&self.current_branch));
        }
        if self.branches.contains(reference) {
            return Ok(self.branch_tip(reference));
        }
        if self.commit_index(reference).is_some() {
            return Ok(Some(reference.to_string()));
        }
        // Abbreviated hash, if unambiguous.
        let mut matches = self
            .commits
            .iter()
            .filter(|c| reference.len() >= 4 && c.info.hash.starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some(c), None) => Ok(Some(c.info.hash.clone())),
            _ => Err(GitError::BranchNotFound {
                branch: reference.to_string(),
            }),
        }
    }

    fn snapshot(&self, hash: Option<&str>) -> Snapshot {
        hash.and_then(|h| self.commit_index(h))
            .map(|i| self.commits[i].files.clone())
            .unwrap_or_default()
    }

    /// Ancestors of `tip` (inclusive), newest first, stopping before `stop`.
    fn ancestry(&self, tip: Option<&str>, stop: Option<&str>) -> Vec<&MemoryCommit> {
        let mut out = Vec::new();
        let mut cursor = tip.map(str::to_string);
        while let Some(hash) = cursor {
            if stop == Some(hash.as_str()) {
                break;
            }
            let Some(i) = self.commit_index(&hash) else {
                break;
            };
            let commit = &self.commits[i];
            out.push(commit);
            cursor = commit.info.parents.first().cloned();
        }
        out
    }

    fn stage(&mut self, path: &str) {
        if !self.staged.iter().any(|p| p == path) {
            self.staged.push(path.to_string());
        }
    }

    fn record_commit(&mut self, message: &str) -> String {
        let parent = self.branch_tip(&self.current_branch);
        let files = self.files.clone();

        let mut hasher = Sha256::new();
        hasher.update(parent.as_deref().unwrap_or(PLACEHOLDER_HEAD));
        hasher.update(message);
        hasher.update(self.commits.len().to_le_bytes());
        for (path, content) in &files {
            hasher.update(path);
            hasher.update([0u8]);
            hasher.update(content);
            hasher.update([0u8]);
        }
        let hash = hex::encode(hasher.finalize())[..40].to_string();

        let info = CommitInfo {
            hash: hash.clone(),
            message: message.to_string(),
            author_name: self
                .config
                .get("user.name")
                .cloned()
                .unwrap_or_else(|| DEFAULT_AUTHOR_NAME.to_string()),
            author_email: self
                .config
                .get("user.email")
                .cloned()
                .unwrap_or_else(|| DEFAULT_AUTHOR_EMAIL.to_string()),
            timestamp: Utc::now(),
            parents: parent.into_iter().collect(),
        };

        self.commits.push(MemoryCommit {
            info,
            files,
            changed: std::mem::take(&mut self.staged),
        });
        self.orphans.remove(&self.current_branch);
        self.heads.insert(self.current_branch.clone(), hash.clone());
        hash
    }

    fn stop_on_seeded_conflicts(&mut self, rebase: bool) -> Result<(), GitError> {
        if self.conflicted.is_empty() {
            return Ok(());
        }
        let files = self.conflicted.clone();
        if rebase {
            self.rebase_in_progress = true;
            Err(GitError::RebaseConflict { files })
        } else {
            Err(GitError::MergeConflict { files })
        }
    }
}

impl MemoryGit {
    /// Create an empty repository on `main`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Test setup
    // =========================================================================

    /// Set the active branch, adding it to the branch set.
    pub fn set_branch(&self, name: &str) {
        let mut state = self.state();
        state.branches.insert(name.to_string());
        state.current_branch = name.to_string();
    }

    /// Replace the branch set.
    pub fn set_branches<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state();
        state.branches = names.into_iter().map(Into::into).collect();
        let branches = state.branches.clone();
        state.heads.retain(|b, _| branches.contains(b));
        state.orphans.retain(|b| branches.contains(b));
    }

    /// Replace the history with commits on the active branch.
    ///
    /// Commits are given oldest first and carry empty snapshots.
    pub fn set_commits(&self, commits: Vec<CommitInfo>) {
        let mut state = self.state();
        state.heads.clear();
        state.orphans.clear();
        if let Some(last) = commits.last() {
            let branch = state.current_branch.clone();
            state.heads.insert(branch, last.hash.clone());
        }
        state.commits = commits
            .into_iter()
            .map(|info| MemoryCommit {
                info,
                files: Snapshot::new(),
                changed: Vec::new(),
            })
            .collect();
    }

    /// Replace the working tree.
    pub fn set_files<I, P, C>(&self, files: I)
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        self.state().files = files
            .into_iter()
            .map(|(p, c)| (p.into(), c.into()))
            .collect();
    }

    /// Write one file in the working tree.
    pub fn set_file_content(&self, path: &str, content: &str) {
        self.state()
            .files
            .insert(path.to_string(), content.to_string());
    }

    /// Replace the staged path list.
    pub fn set_staged_files<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().staged = paths.into_iter().map(Into::into).collect();
    }

    /// Set the rebase-in-progress flag.
    pub fn set_rebase_in_progress(&self, in_progress: bool) {
        self.state().rebase_in_progress = in_progress;
    }

    /// Seed the paths the next `rebase`/`pull` will stop on.
    pub fn set_conflicted_files<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().conflicted = paths.into_iter().map(Into::into).collect();
    }

    /// Set the branches known on a remote (also configures the remote).
    pub fn set_remote_branches<I, S>(&self, remote: &str, branches: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().remote_branches.insert(
            remote.to_string(),
            branches.into_iter().map(Into::into).collect(),
        );
    }

    /// Reset to a fresh repository.
    pub fn clear(&self) {
        *self.state() = MemoryState::default();
    }

    /// Number of commits recorded (for test verification).
    pub fn commit_count(&self) -> usize {
        self.state().commits.len()
    }
}

impl Default for MemoryGit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitOperations for MemoryGit {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn init(&self) -> Result<(), GitError> {
        let mut state = self.state();
        let root = std::mem::take(&mut state.repo_root);
        *state = MemoryState {
            repo_root: root,
            ..MemoryState::default()
        };
        Ok(())
    }

    async fn repo_root(&self) -> Result<String, GitError> {
        Ok(self.state().repo_root.clone())
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        Ok(self.state().current_branch.clone())
    }

    async fn commit_hash(&self, reference: &str) -> Result<String, GitError> {
        if is_full_hash(reference) {
            return Ok(reference.to_string());
        }
        Ok(self
            .state()
            .resolve(reference)?
            .unwrap_or_else(|| PLACEHOLDER_HEAD.to_string()))
    }

    async fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError> {
        let state = self.state();
        let a = state.resolve(a)?;
        let b = state.resolve(b)?;
        let ancestors_of_b: BTreeSet<&str> = state
            .ancestry(b.as_deref(), None)
            .into_iter()
            .map(|c| c.info.hash.as_str())
            .collect();
        Ok(state
            .ancestry(a.as_deref(), None)
            .into_iter()
            .find(|c| ancestors_of_b.contains(c.info.hash.as_str()))
            .map(|c| c.info.hash.clone())
            .unwrap_or_else(|| PLACEHOLDER_HEAD.to_string()))
    }

    async fn changed_files(&self, from: &str, to: &str) -> Result<Vec<ChangedFile>, GitError> {
        let state = self.state();
        let before = state.snapshot(state.resolve(from)?.as_deref());
        let after = state.snapshot(state.resolve(to)?.as_deref());

        let paths: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
        Ok(paths
            .into_iter()
            .filter_map(|path| {
                let status = match (before.get(path), after.get(path)) {
                    (None, Some(_)) => ChangeStatus::Added,
                    (Some(_), None) => ChangeStatus::Deleted,
                    (Some(old), Some(new)) if old != new => ChangeStatus::Modified,
                    _ => return None,
                };
                Some(ChangedFile {
                    path: path.clone(),
                    status,
                    previous_path: None,
                })
            })
            .collect())
    }

    async fn staged_files(&self) -> Result<Vec<String>, GitError> {
        Ok(self.state().staged.clone())
    }

    async fn file_content(&self, commit: &str, path: &str) -> Result<String, GitError> {
        let state = self.state();
        let from_commit = state
            .resolve(commit)
            .ok()
            .flatten()
            .and_then(|h| state.commit_index(&h))
            .and_then(|i| state.commits[i].files.get(path).cloned());

        from_commit
            .or_else(|| state.files.get(path).cloned())
            .ok_or_else(|| GitError::FileNotFound {
                path: path.to_string(),
                commit: commit.to_string(),
            })
    }

    async fn commit_history(&self, opts: &HistoryOptions) -> Result<Vec<CommitInfo>, GitError> {
        let state = self.state();
        let tip = state.branch_tip(&state.current_branch);
        Ok(state
            .ancestry(tip.as_deref(), None)
            .into_iter()
            .filter(|c| match &opts.path_filter {
                Some(path) => c.changed.iter().any(|p| p == path),
                None => true,
            })
            .take(opts.max_count.unwrap_or(usize::MAX))
            .map(|c| c.info.clone())
            .collect())
    }

    async fn commit_history_range(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<CommitInfo>, GitError> {
        let state = self.state();
        let from = state.resolve(from)?;
        let to = state.resolve(to)?;
        Ok(state
            .ancestry(to.as_deref(), from.as_deref())
            .into_iter()
            .map(|c| c.info.clone())
            .collect())
    }

    async fn commit_message(&self, hash: &str) -> Result<String, GitError> {
        let state = self.state();
        let resolved = state.resolve(hash)?.ok_or_else(|| GitError::BranchNotFound {
            branch: hash.to_string(),
        })?;
        let index = state
            .commit_index(&resolved)
            .ok_or_else(|| GitError::BranchNotFound {
                branch: hash.to_string(),
            })?;
        Ok(state.commits[index].info.message.clone())
    }

    async fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        Ok(!self.state().staged.is_empty())
    }

    async fn is_rebase_in_progress(&self) -> Result<bool, GitError> {
        Ok(self.state().rebase_in_progress)
    }

    async fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        Ok(self.state().branches.contains(name))
    }

    async fn remote_branches(&self, remote: &str) -> Result<Vec<String>, GitError> {
        Ok(self
            .state()
            .remote_branches
            .get(remote)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_remote_configured(&self, remote: &str) -> Result<bool, GitError> {
        Ok(self.state().remote_branches.contains_key(remote))
    }

    async fn tracking_remote(&self, branch: &str) -> Result<Option<String>, GitError> {
        self.config_value(&format!("branch.{branch}.remote")).await
    }

    async fn conflicted_files(&self) -> Result<Vec<String>, GitError> {
        let state = self.state();
        if state.rebase_in_progress {
            Ok(state.conflicted.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn config_value(&self, key: &str) -> Result<Option<String>, GitError> {
        Ok(self.state().config.get(key).cloned())
    }

    async fn checkout_branch(&self, name: &str) -> Result<(), GitError> {
        let mut state = self.state();
        if !state.branches.contains(name) {
            return Err(GitError::BranchNotFound {
                branch: name.to_string(),
            });
        }
        state.current_branch = name.to_string();
        Ok(())
    }

    async fn checkout_orphan_branch(&self, name: &str) -> Result<(), GitError> {
        let mut state = self.state();
        if state.branches.contains(name) {
            return Err(GitError::BranchExists {
                branch: name.to_string(),
            });
        }
        state.branches.insert(name.to_string());
        state.orphans.insert(name.to_string());
        state.current_branch = name.to_string();
        Ok(())
    }

    async fn fetch(&self, _remote: &str) -> Result<(), GitError> {
        Ok(())
    }

    async fn pull(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
        self.state().stop_on_seeded_conflicts(false)
    }

    async fn pull_rebase(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
        self.state().stop_on_seeded_conflicts(true)
    }

    async fn reset_hard(&self, target: &str) -> Result<(), GitError> {
        let mut state = self.state();
        let hash = state.resolve(target)?;
        state.files = state.snapshot(hash.as_deref());
        state.staged.clear();
        let branch = state.current_branch.clone();
        match hash {
            Some(hash) => state.heads.insert(branch, hash),
            None => state.heads.remove(&branch),
        };
        Ok(())
    }

    async fn checkout_files(&self, branch: &str, paths: &[&str]) -> Result<(), GitError> {
        let mut state = self.state();
        let source = state.snapshot(state.resolve(branch)?.as_deref());
        for path in paths {
            let content = source.get(*path).ok_or_else(|| GitError::FileNotFound {
                path: path.to_string(),
                commit: branch.to_string(),
            })?;
            state.files.insert(path.to_string(), content.clone());
            state.stage(path);
        }
        Ok(())
    }

    async fn add(&self, paths: &[&str], opts: AddOptions) -> Result<(), GitError> {
        let mut state = self.state();
        for path in paths {
            match &opts.content {
                Some(content) => {
                    state.files.insert(path.to_string(), content.clone());
                }
                None if !state.files.contains_key(*path) => {
                    return Err(GitError::FileNotFound {
                        path: path.to_string(),
                        commit: "working tree".to_string(),
                    })
                }
                None => {}
            }
            state.stage(path);
        }
        Ok(())
    }

    async fn rm(&self, paths: &[&str]) -> Result<(), GitError> {
        let mut state = self.state();
        for path in paths {
            state.files.remove(*path);
            state.stage(path);
        }
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<String, GitError> {
        let mut state = self.state();
        if state.staged.is_empty() {
            return Err(GitError::NothingToCommit);
        }
        Ok(state.record_commit(message))
    }

    async fn commit_allow_empty(&self, message: &str) -> Result<String, GitError> {
        Ok(self.state().record_commit(message))
    }

    async fn push(&self, remote: &str, branch: &str, _opts: PushOptions) -> Result<(), GitError> {
        let mut state = self.state();
        let known = state.remote_branches.entry(remote.to_string()).or_default();
        if !known.iter().any(|b| b == branch) {
            known.push(branch.to_string());
        }
        Ok(())
    }

    async fn push_with_upstream(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.push(remote, branch, PushOptions::default()).await?;
        self.set_upstream(branch, remote).await
    }

    async fn set_upstream(&self, branch: &str, remote: &str) -> Result<(), GitError> {
        let mut state = self.state();
        state
            .config
            .insert(format!("branch.{branch}.remote"), remote.to_string());
        state
            .config
            .insert(format!("branch.{branch}.merge"), format!("refs/heads/{branch}"));
        Ok(())
    }

    async fn stash(&self) -> Result<bool, GitError> {
        let mut state = self.state();
        if state.staged.is_empty() {
            return Ok(false);
        }
        let tip = state.branch_tip(&state.current_branch);
        let clean = state.snapshot(tip.as_deref());
        let entry = StashEntry {
            files: std::mem::replace(&mut state.files, clean),
            staged: std::mem::take(&mut state.staged),
        };
        state.stash.push(entry);
        Ok(true)
    }

    async fn stash_pop(&self) -> Result<(), GitError> {
        let mut state = self.state();
        let entry = state.stash.pop().ok_or_else(|| GitError::CommandFailed {
            command: "git stash pop".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "No stash entries found.".to_string(),
        })?;
        state.files = entry.files;
        state.staged = entry.staged;
        Ok(())
    }

    async fn set_config(
        &self,
        key: &str,
        value: &str,
        _scope: ConfigScope,
    ) -> Result<(), GitError> {
        self.state()
            .config
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn rebase_continue(&self) -> Result<(), GitError> {
        let mut state = self.state();
        if !state.rebase_in_progress {
            return Err(GitError::RebaseNotInProgress);
        }
        state.rebase_in_progress = false;
        state.conflicted.clear();
        Ok(())
    }

    async fn rebase_abort(&self) -> Result<(), GitError> {
        self.rebase_continue().await
    }

    async fn create_branch(&self, name: &str, start: Option<&str>) -> Result<(), GitError> {
        let mut state = self.state();
        if state.branches.contains(name) {
            return Err(GitError::BranchExists {
                branch: name.to_string(),
            });
        }
        let start = start.unwrap_or("HEAD");
        let tip = state.resolve(start)?;
        state.branches.insert(name.to_string());
        if let Some(tip) = tip {
            state.heads.insert(name.to_string(), tip);
        }
        state.current_branch = name.to_string();
        Ok(())
    }

    async fn rebase(&self, onto: &str) -> Result<(), GitError> {
        let mut state = self.state();
        state.resolve(onto)?;
        state.stop_on_seeded_conflicts(true)
    }

    async fn rebase_onto(&self, new_base: &str, upstream: &str) -> Result<(), GitError> {
        let mut state = self.state();
        state.resolve(new_base)?;
        state.resolve(upstream)?;
        state.stop_on_seeded_conflicts(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixture_commit(hash: &str, message: &str, parents: Vec<String>) -> CommitInfo {
        CommitInfo {
            hash: hash.to_string(),
            message: message.to_string(),
            author_name: "Fixture".to_string(),
            author_email: "fixture@example.com".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            parents,
        }
    }

    mod commits {
        use super::*;

        #[tokio::test]
        async fn head_is_placeholder_when_empty() {
            let git = MemoryGit::new();
            assert_eq!(git.commit_hash("HEAD").await.unwrap(), PLACEHOLDER_HEAD);
        }

        #[tokio::test]
        async fn commit_snapshots_whole_tree_and_clears_stage() {
            let git = MemoryGit::new();
            git.set_file_content("untouched.txt", "kept");
            git.add(&["a.txt"], AddOptions::with_content("A"))
                .await
                .unwrap();
            let head = git.commit("first").await.unwrap();

            assert_eq!(git.commit_hash("HEAD").await.unwrap(), head);
            assert_eq!(git.file_content(&head, "untouched.txt").await.unwrap(), "kept");
            assert!(git.staged_files().await.unwrap().is_empty());
            assert!(!git.has_uncommitted_changes().await.unwrap());
        }

        #[tokio::test]
        async fn commit_with_nothing_staged_fails() {
            let git = MemoryGit::new();
            assert!(matches!(
                git.commit("nothing").await,
                Err(GitError::NothingToCommit)
            ));
            git.commit_allow_empty("empty").await.unwrap();
            assert_eq!(git.commit_count(), 1);
        }

        #[tokio::test]
        async fn file_content_prefers_commit_snapshot() {
            let git = MemoryGit::new();
            git.add(&["a.txt"], AddOptions::with_content("v1"))
                .await
                .unwrap();
            let first = git.commit("v1").await.unwrap();
            git.add(&["a.txt"], AddOptions::with_content("v2"))
                .await
                .unwrap();
            git.commit("v2").await.unwrap();

            assert_eq!(git.file_content(&first, "a.txt").await.unwrap(), "v1");
            assert_eq!(git.file_content("HEAD", "a.txt").await.unwrap(), "v2");
        }

        #[tokio::test]
        async fn file_content_falls_back_to_tree_then_errors() {
            let git = MemoryGit::new();
            git.set_file_content("loose.txt", "from tree");
            assert_eq!(
                git.file_content("HEAD", "loose.txt").await.unwrap(),
                "from tree"
            );
            assert!(matches!(
                git.file_content("HEAD", "missing.txt").await,
                Err(GitError::FileNotFound { .. })
            ));
        }

        #[tokio::test]
        async fn hashes_are_distinct_and_full_length() {
            let git = MemoryGit::new();
            let a = git.commit_allow_empty("same").await.unwrap();
            let b = git.commit_allow_empty("same").await.unwrap();
            assert_ne!(a, b);
            assert!(crate::git::is_full_hash(&a));
        }

        #[tokio::test]
        async fn history_filters_and_limits() {
            let git = MemoryGit::new();
            for (path, msg) in [("a", "one"), ("b", "two"), ("a", "three")] {
                git.add(&[path], AddOptions::with_content(msg)).await.unwrap();
                git.commit(msg).await.unwrap();
            }

            let all = git.commit_history(&HistoryOptions::default()).await.unwrap();
            let messages: Vec<&str> = all.iter().map(|c| c.message.as_str()).collect();
            assert_eq!(messages, vec!["three", "two", "one"]);

            let touching_a = git
                .commit_history(&HistoryOptions {
                    path_filter: Some("a".into()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(touching_a.len(), 2);

            let latest = git
                .commit_history(&HistoryOptions {
                    max_count: Some(1),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(latest[0].message, "three");

            let range = git
                .commit_history_range(&all[2].hash, &all[0].hash)
                .await
                .unwrap();
            assert_eq!(range.len(), 2);
        }

        #[tokio::test]
        async fn set_commits_seeds_history() {
            let git = MemoryGit::new();
            let h1 = "1".repeat(40);
            let h2 = "2".repeat(40);
            git.set_commits(vec![
                fixture_commit(&h1, "Initial", vec![]),
                fixture_commit(&h2, "Second", vec![h1.clone()]),
            ]);
            assert_eq!(git.commit_hash("HEAD").await.unwrap(), h2);
            assert_eq!(git.commit_message("2222").await.unwrap(), "Second");
            assert_eq!(git.merge_base(&h1, &h2).await.unwrap(), h1);
        }

        #[tokio::test]
        async fn changed_files_between_snapshots() {
            let git = MemoryGit::new();
            git.add(&["keep", "drop", "edit"], AddOptions::with_content("x"))
                .await
                .unwrap();
            let from = git.commit("base").await.unwrap();
            git.rm(&["drop"]).await.unwrap();
            git.add(&["edit"], AddOptions::with_content("y")).await.unwrap();
            git.add(&["new"], AddOptions::with_content("z")).await.unwrap();
            let to = git.commit("change").await.unwrap();

            let changed = git.changed_files(&from, &to).await.unwrap();
            let summary: Vec<(String, ChangeStatus)> =
                changed.into_iter().map(|c| (c.path, c.status)).collect();
            assert_eq!(
                summary,
                vec![
                    ("drop".to_string(), ChangeStatus::Deleted),
                    ("edit".to_string(), ChangeStatus::Modified),
                    ("new".to_string(), ChangeStatus::Added),
                ]
            );
        }
    }

    mod branches {
        use super::*;

        #[tokio::test]
        async fn create_checkout_and_exists() {
            let git = MemoryGit::new();
            git.commit_allow_empty("root").await.unwrap();
            git.create_branch("feature", None).await.unwrap();
            assert_eq!(git.current_branch().await.unwrap(), "feature");
            assert!(git.branch_exists("feature").await.unwrap());

            assert!(matches!(
                git.create_branch("feature", None).await,
                Err(GitError::BranchExists { .. })
            ));
            assert!(matches!(
                git.checkout_branch("nope").await,
                Err(GitError::BranchNotFound { .. })
            ));
            git.checkout_branch("main").await.unwrap();
            assert_eq!(git.current_branch().await.unwrap(), "main");
        }

        #[tokio::test]
        async fn branch_heads_are_independent() {
            let git = MemoryGit::new();
            let root = git.commit_allow_empty("root").await.unwrap();
            git.create_branch("feature", None).await.unwrap();
            let feature = git.commit_allow_empty("feature work").await.unwrap();
            git.checkout_branch("main").await.unwrap();

            assert_eq!(git.commit_hash("main").await.unwrap(), root);
            assert_eq!(git.commit_hash("feature").await.unwrap(), feature);
            assert_eq!(git.merge_base("main", "feature").await.unwrap(), root);
        }

        #[tokio::test]
        async fn orphan_branch_starts_without_parent() {
            let git = MemoryGit::new();
            let root = git.commit_allow_empty("root").await.unwrap();
            git.checkout_orphan_branch("pages").await.unwrap();
            assert_eq!(git.commit_hash("HEAD").await.unwrap(), PLACEHOLDER_HEAD);

            let first = git.commit_allow_empty("pages root").await.unwrap();
            let history = git.commit_history(&HistoryOptions::default()).await.unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].hash, first);
            assert!(history[0].parents.is_empty());

            assert_eq!(git.commit_hash("main").await.unwrap(), root);
            assert_eq!(git.merge_base("main", "pages").await.unwrap(), PLACEHOLDER_HEAD);
        }

        #[tokio::test]
        async fn unknown_ref_is_branch_not_found() {
            let git = MemoryGit::new();
            assert!(matches!(
                git.commit_hash("nope").await,
                Err(GitError::BranchNotFound { .. })
            ));
        }

        #[tokio::test]
        async fn push_records_remote_branch_and_upstream() {
            let git = MemoryGit::new();
            assert!(!git.is_remote_configured("origin").await.unwrap());
            git.push_with_upstream("origin", "main").await.unwrap();
            assert_eq!(git.remote_branches("origin").await.unwrap(), vec!["main"]);
            assert_eq!(
                git.tracking_remote("main").await.unwrap().as_deref(),
                Some("origin")
            );
        }
    }

    mod rebase {
        use super::*;

        #[tokio::test]
        async fn rebase_without_seeded_conflicts_succeeds() {
            let git = MemoryGit::new();
            git.set_branches(["main", "feature"]);
            git.rebase("feature").await.unwrap();
            assert!(!git.is_rebase_in_progress().await.unwrap());
        }

        #[tokio::test]
        async fn seeded_conflicts_stop_rebase() {
            let git = MemoryGit::new();
            git.set_branches(["main", "feature"]);
            git.set_conflicted_files(["data.json"]);

            let err = git.rebase("feature").await.unwrap_err();
            assert_eq!(err.conflicted_files().unwrap(), ["data.json".to_string()]);
            assert!(git.is_rebase_in_progress().await.unwrap());
            assert_eq!(git.conflicted_files().await.unwrap(), vec!["data.json"]);

            git.rebase_abort().await.unwrap();
            assert!(!git.is_rebase_in_progress().await.unwrap());
            assert!(matches!(
                git.rebase_continue().await,
                Err(GitError::RebaseNotInProgress)
            ));
        }
    }

    mod stash {
        use super::*;

        #[tokio::test]
        async fn stash_round_trip() {
            let git = MemoryGit::new();
            assert!(!git.stash().await.unwrap());

            git.add(&["wip.txt"], AddOptions::with_content("draft"))
                .await
                .unwrap();
            assert!(git.stash().await.unwrap());
            assert!(git.staged_files().await.unwrap().is_empty());
            assert!(git.file_content("HEAD", "wip.txt").await.is_err());

            git.stash_pop().await.unwrap();
            assert_eq!(git.staged_files().await.unwrap(), vec!["wip.txt"]);
            assert!(matches!(
                git.stash_pop().await,
                Err(GitError::CommandFailed { .. })
            ));
        }
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let git = MemoryGit::new();
        git.set_branch("other");
        git.set_staged_files(["x"]);
        git.set_rebase_in_progress(true);
        git.clear();
        assert_eq!(git.current_branch().await.unwrap(), "main");
        assert!(git.staged_files().await.unwrap().is_empty());
        assert!(!git.is_rebase_in_progress().await.unwrap());
    }
}

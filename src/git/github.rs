//! git::github
//!
//! Git backend over the GitHub REST API.
//!
//! # Design
//!
//! The API has no working tree or index, so [`GitHubGit`] keeps a staging
//! buffer of its own (path to new content or deletion) and an in-memory
//! cursor for the active branch. A commit is assembled from git data API
//! calls in a fixed order:
//!
//! 1. read the branch ref
//! 2. read the head commit to get its tree
//! 3. create one blob per staged upsert
//! 4. create a tree on top of the old one (deletions carry a null sha)
//! 5. create the commit with the old head as sole parent
//! 6. move the ref, without force
//!
//! Step 6 is a compare-and-swap: GitHub rejects it when the branch moved
//! after step 1, which surfaces as [`RemoteError::Conflict`]. Any failing
//! step aborts the rest and leaves the staging buffer untouched, so the
//! caller can retry.
//!
//! Operations that need local state (rebase, hard reset, orphan branches,
//! file checkout) return [`GitError::NotSupported`]; synchronisation
//! operations (push, fetch, pull, stash) are no-ops.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info};

use super::error::GitError;
use super::traits::{
    is_full_hash, AddOptions, ChangeStatus, ChangedFile, CommitInfo, ConfigScope, GitOperations,
    HistoryOptions, PushOptions, DEFAULT_REMOTE,
};
use crate::forge::wire::{
    Branch, CommitListItem, Comparison, CreateBlobBody, CreateCommitBody, CreateRefBody,
    CreateTreeBody, GitCommit, GitRef, ShaRef, Signature, TreeEntry, UpdateRefBody, FILE_MODE,
};
use crate::forge::{GitHubClient, RemoteError};

const BACKEND: &str = "github";

/// Largest page GitHub serves for list endpoints.
const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
enum StagedChange {
    Upsert(String),
    Delete,
}

/// Result of a successful commit transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Hash of the new commit, now the branch head
    pub commit_sha: String,
    /// Blob hash of every upserted path
    pub blob_shas: BTreeMap<String, String>,
}

#[derive(Debug)]
struct RemoteState {
    branch: String,
    staged: BTreeMap<String, StagedChange>,
    config: BTreeMap<String, String>,
}

/// Git backend for a GitHub repository.
#[derive(Debug)]
pub struct GitHubGit {
    client: GitHubClient,
    author: Option<Signature>,
    state: Mutex<RemoteState>,
}

impl GitHubGit {
    /// Create a backend with `branch` as the active branch.
    pub fn new(client: GitHubClient, branch: impl Into<String>) -> Self {
        Self {
            client,
            author: None,
            state: Mutex::new(RemoteState {
                branch: branch.into(),
                staged: BTreeMap::new(),
                config: BTreeMap::new(),
            }),
        }
    }

    /// Set the author recorded on commits.
    ///
    /// Without one, GitHub attributes commits to the token's user.
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author = Some(Signature {
            name: name.into(),
            email: email.into(),
            date: None,
        });
        self
    }

    /// The underlying API client.
    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unsupported(operation: &'static str) -> GitError {
        GitError::NotSupported {
            operation,
            backend: BACKEND,
        }
    }

    /// Current head of `branch`; a missing ref is `BranchNotFound`.
    async fn head_sha(&self, branch: &str) -> Result<String, GitError> {
        let request = self
            .client
            .request(Method::GET, &format!("git/ref/heads/{branch}"))?;
        match self.client.execute_optional::<GitRef>(request).await? {
            Some(found) => Ok(found.object.sha),
            None => Err(GitError::BranchNotFound {
                branch: branch.to_string(),
            }),
        }
    }

    /// Commit the staging buffer to the active branch.
    ///
    /// Returns the new commit hash together with the blob hash of every
    /// upserted path, which record stores use as fresh write preconditions.
    ///
    /// # Errors
    ///
    /// - [`GitError::NothingToCommit`] if nothing is staged (no request is made)
    /// - [`GitError::BranchNotFound`] if the active branch does not exist
    /// - [`GitError::Remote`] with [`RemoteError::Conflict`] if the branch
    ///   moved during the transaction
    pub async fn commit_staged(&self, message: &str) -> Result<CommitOutcome, GitError> {
        self.run_commit(message, false).await
    }

    async fn run_commit(&self, message: &str, allow_empty: bool) -> Result<CommitOutcome, GitError> {
        let (branch, staged) = {
            let state = self.state();
            (state.branch.clone(), state.staged.clone())
        };
        if staged.is_empty() && !allow_empty {
            return Err(GitError::NothingToCommit);
        }

        // 1. ref -> head commit
        let head = self.head_sha(&branch).await?;

        // 2. head commit -> base tree
        let request = self
            .client
            .request(Method::GET, &format!("git/commits/{head}"))?;
        let parent: GitCommit = self.client.execute(request).await?;

        // 3-4. blobs, then one tree on top of the base
        let mut blob_shas = BTreeMap::new();
        let tree_sha = if staged.is_empty() {
            parent.tree.sha.clone()
        } else {
            let mut entries = Vec::with_capacity(staged.len());
            for (path, change) in &staged {
                let sha = match change {
                    StagedChange::Upsert(content) => {
                        let request = self.client.request(Method::POST, "git/blobs")?.json(
                            &CreateBlobBody {
                                content,
                                encoding: "utf-8",
                            },
                        );
                        let blob: ShaRef = self.client.execute(request).await?;
                        blob_shas.insert(path.clone(), blob.sha.clone());
                        Some(blob.sha)
                    }
                    StagedChange::Delete => None,
                };
                entries.push(TreeEntry {
                    path: path.clone(),
                    mode: FILE_MODE,
                    kind: "blob",
                    sha,
                });
            }

            let request = self
                .client
                .request(Method::POST, "git/trees")?
                .json(&CreateTreeBody {
                    base_tree: &parent.tree.sha,
                    tree: entries,
                });
            let tree: ShaRef = self.client.execute(request).await?;
            tree.sha
        };

        // 5. commit
        let request = self
            .client
            .request(Method::POST, "git/commits")?
            .json(&CreateCommitBody {
                message,
                tree: &tree_sha,
                parents: vec![head.as_str()],
                author: self.author.clone(),
            });
        let commit: ShaRef = self.client.execute(request).await?;

        // 6. fast-forward the ref
        let request = self
            .client
            .request(Method::PATCH, &format!("git/refs/heads/{branch}"))?
            .json(&UpdateRefBody {
                sha: &commit.sha,
                force: false,
            });
        let _: GitRef = self.client.execute(request).await?;

        {
            let mut state = self.state();
            for (path, change) in &staged {
                if state.staged.get(path) == Some(change) {
                    state.staged.remove(path);
                }
            }
        }

        info!(
            branch = %branch,
            commit = %commit.sha,
            paths = staged.len(),
            "committed to github"
        );
        Ok(CommitOutcome {
            commit_sha: commit.sha,
            blob_shas,
        })
    }

    async fn compare(&self, from: &str, to: &str) -> Result<Comparison, GitError> {
        let request = self
            .client
            .request(Method::GET, &format!("compare/{from}...{to}"))?;
        self.client
            .execute_optional(request)
            .await?
            .ok_or_else(|| GitError::BranchNotFound {
                branch: format!("{from}...{to}"),
            })
    }
}

fn change_status(status: &str) -> Option<ChangeStatus> {
    match status {
        "added" | "copied" => Some(ChangeStatus::Added),
        "removed" => Some(ChangeStatus::Deleted),
        "renamed" => Some(ChangeStatus::Renamed),
        "unchanged" => None,
        _ => Some(ChangeStatus::Modified),
    }
}

fn to_commit_info(item: CommitListItem) -> CommitInfo {
    CommitInfo {
        hash: item.sha,
        message: item.commit.message,
        author_name: item.commit.author.name,
        author_email: item.commit.author.email,
        timestamp: item.commit.author.date.unwrap_or_default(),
        parents: item.parents.into_iter().map(|p| p.sha).collect(),
    }
}

#[async_trait]
impl GitOperations for GitHubGit {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn init(&self) -> Result<(), GitError> {
        Err(Self::unsupported("init"))
    }

    async fn repo_root(&self) -> Result<String, GitError> {
        Ok(format!("{}/{}", self.client.owner(), self.client.repo()))
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        Ok(self.state().branch.clone())
    }

    async fn commit_hash(&self, reference: &str) -> Result<String, GitError> {
        if is_full_hash(reference) {
            return Ok(reference.to_string());
        }
        if reference == "HEAD" {
            let branch = self.state().branch.clone();
            return self.head_sha(&branch).await;
        }

        let request = self
            .client
            .request(Method::GET, &format!("commits/{reference}"))?;
        match self.client.execute_optional::<CommitListItem>(request).await {
            Ok(Some(item)) => Ok(item.sha),
            // 422 is GitHub's answer for a malformed sha
            Ok(None) | Err(RemoteError::Conflict { status: 422, .. }) => {
                Err(GitError::BranchNotFound {
                    branch: reference.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn merge_base(&self, _a: &str, _b: &str) -> Result<String, GitError> {
        Err(Self::unsupported("merge_base"))
    }

    async fn changed_files(&self, from: &str, to: &str) -> Result<Vec<ChangedFile>, GitError> {
        let comparison = self.compare(from, to).await?;
        Ok(comparison
            .files
            .into_iter()
            .filter_map(|file| {
                let status = change_status(&file.status)?;
                Some(ChangedFile {
                    path: file.filename,
                    status,
                    previous_path: file.previous_filename,
                })
            })
            .collect())
    }

    async fn staged_files(&self) -> Result<Vec<String>, GitError> {
        Ok(self.state().staged.keys().cloned().collect())
    }

    async fn file_content(&self, commit: &str, path: &str) -> Result<String, GitError> {
        match self.client.read_file(path, commit).await? {
            Some(file) => Ok(file.content),
            None => Err(GitError::FileNotFound {
                path: path.to_string(),
                commit: commit.to_string(),
            }),
        }
    }

    async fn commit_history(&self, opts: &HistoryOptions) -> Result<Vec<CommitInfo>, GitError> {
        let branch = self.state().branch.clone();
        let limit = opts.max_count.unwrap_or(usize::MAX);
        let per_page = limit.min(PAGE_SIZE).to_string();

        let mut history = Vec::new();
        let mut page = 1usize;
        while history.len() < limit {
            let page_param = page.to_string();
            let mut query = vec![
                ("sha", branch.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page_param.as_str()),
            ];
            if let Some(path) = &opts.path_filter {
                query.push(("path", path.as_str()));
            }
            let request = self.client.request(Method::GET, "commits")?.query(&query);
            let items: Vec<CommitListItem> = match self.client.execute_optional(request).await? {
                Some(items) => items,
                None => {
                    return Err(GitError::BranchNotFound {
                        branch: branch.clone(),
                    })
                }
            };

            let last_page = items.len() < PAGE_SIZE.min(limit);
            history.extend(items.into_iter().map(to_commit_info));
            if last_page {
                break;
            }
            page += 1;
        }
        history.truncate(limit);
        Ok(history)
    }

    async fn commit_history_range(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<CommitInfo>, GitError> {
        let comparison = self.compare(from, to).await?;
        // compare lists oldest first
        Ok(comparison
            .commits
            .into_iter()
            .rev()
            .map(to_commit_info)
            .collect())
    }

    async fn commit_message(&self, hash: &str) -> Result<String, GitError> {
        let request = self
            .client
            .request(Method::GET, &format!("git/commits/{hash}"))?;
        match self.client.execute_optional::<GitCommit>(request).await? {
            Some(commit) => Ok(commit.message),
            None => Err(GitError::BranchNotFound {
                branch: hash.to_string(),
            }),
        }
    }

    async fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        Ok(!self.state().staged.is_empty())
    }

    async fn is_rebase_in_progress(&self) -> Result<bool, GitError> {
        Ok(false)
    }

    async fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        let request = self
            .client
            .request(Method::GET, &format!("branches/{name}"))?;
        Ok(self
            .client
            .execute_optional::<Branch>(request)
            .await?
            .is_some())
    }

    async fn remote_branches(&self, _remote: &str) -> Result<Vec<String>, GitError> {
        let per_page = PAGE_SIZE.to_string();
        let mut names = Vec::new();
        for page in 1.. {
            let page_param = page.to_string();
            let request = self
                .client
                .request(Method::GET, "branches")?
                .query(&[("per_page", per_page.as_str()), ("page", page_param.as_str())]);
            let branches: Vec<Branch> = self.client.execute(request).await?;
            let done = branches.len() < PAGE_SIZE;
            names.extend(branches.into_iter().map(|b| b.name));
            if done {
                break;
            }
        }
        Ok(names)
    }

    async fn is_remote_configured(&self, remote: &str) -> Result<bool, GitError> {
        Ok(remote == DEFAULT_REMOTE)
    }

    async fn tracking_remote(&self, _branch: &str) -> Result<Option<String>, GitError> {
        Ok(Some(DEFAULT_REMOTE.to_string()))
    }

    async fn conflicted_files(&self) -> Result<Vec<String>, GitError> {
        Ok(Vec::new())
    }

    async fn config_value(&self, key: &str) -> Result<Option<String>, GitError> {
        Ok(self.state().config.get(key).cloned())
    }

    async fn checkout_branch(&self, name: &str) -> Result<(), GitError> {
        debug!(branch = name, "moving github branch cursor");
        self.state().branch = name.to_string();
        Ok(())
    }

    async fn checkout_orphan_branch(&self, _name: &str) -> Result<(), GitError> {
        Err(Self::unsupported("checkout_orphan_branch"))
    }

    async fn fetch(&self, _remote: &str) -> Result<(), GitError> {
        Ok(())
    }

    async fn pull(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
        Ok(())
    }

    async fn pull_rebase(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
        Ok(())
    }

    async fn reset_hard(&self, _target: &str) -> Result<(), GitError> {
        Err(Self::unsupported("reset_hard"))
    }

    async fn checkout_files(&self, _branch: &str, _paths: &[&str]) -> Result<(), GitError> {
        Err(Self::unsupported("checkout_files"))
    }

    async fn add(&self, paths: &[&str], opts: AddOptions) -> Result<(), GitError> {
        let content = opts
            .content
            .ok_or_else(|| Self::unsupported("add without content"))?;
        let mut state = self.state();
        for path in paths {
            state
                .staged
                .insert(path.to_string(), StagedChange::Upsert(content.clone()));
        }
        Ok(())
    }

    async fn rm(&self, paths: &[&str]) -> Result<(), GitError> {
        let mut state = self.state();
        for path in paths {
            state.staged.insert(path.to_string(), StagedChange::Delete);
        }
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<String, GitError> {
        Ok(self.run_commit(message, false).await?.commit_sha)
    }

    async fn commit_allow_empty(&self, message: &str) -> Result<String, GitError> {
        Ok(self.run_commit(message, true).await?.commit_sha)
    }

    async fn push(&self, _remote: &str, _branch: &str, _opts: PushOptions) -> Result<(), GitError> {
        Ok(())
    }

    async fn push_with_upstream(&self, _remote: &str, _branch: &str) -> Result<(), GitError> {
        Ok(())
    }

    async fn set_upstream(&self, _branch: &str, _remote: &str) -> Result<(), GitError> {
        Ok(())
    }

    async fn stash(&self) -> Result<bool, GitError> {
        Ok(false)
    }

    async fn stash_pop(&self) -> Result<(), GitError> {
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
        Err(GitError::RebaseNotInProgress)
    }

    async fn rebase_abort(&self) -> Result<(), GitError> {
        Err(GitError::RebaseNotInProgress)
    }

    async fn create_branch(&self, name: &str, start: Option<&str>) -> Result<(), GitError> {
        if self.branch_exists(name).await? {
            return Err(GitError::BranchExists {
                branch: name.to_string(),
            });
        }
        let sha = self.commit_hash(start.unwrap_or("HEAD")).await?;

        let request = self
            .client
            .request(Method::POST, "git/refs")?
            .json(&CreateRefBody {
                ref_name: format!("refs/heads/{name}"),
                sha: &sha,
            });
        let _: GitRef = self.client.execute(request).await?;

        info!(branch = name, %sha, "created github branch");
        self.state().branch = name.to_string();
        Ok(())
    }

    async fn rebase(&self, _onto: &str) -> Result<(), GitError> {
        Err(Self::unsupported("rebase"))
    }

    async fn rebase_onto(&self, _new_base: &str, _upstream: &str) -> Result<(), GitError> {
        Err(Self::unsupported("rebase_onto"))
    }
}

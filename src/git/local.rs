//! git::local
//!
//! Git backend driving the `git` executable.
//!
//! # Design
//!
//! Every operation is translated into one or more `git` invocations through
//! the injected [`CommandExecutor`]. All invocations funnel through
//! [`LocalGit::run`], which always sets the working directory to the
//! repository root. Output is parsed as text and known failure patterns are
//! mapped into [`GitError`] kinds.
//!
//! # Conflict detection
//!
//! `git` offers no structured conflict signal for `pull` or `rebase`. When a
//! command fails and its combined output contains one of the
//! [`CONFLICT_MARKERS`], the conflicted paths are listed with
//! `git diff --name-only --diff-filter=U` and a merge or rebase conflict is
//! raised. Any other failure is [`GitError::CommandFailed`].
//!
//! # Example
//!
//! ```ignore
//! use gitrecords::git::{GitOperations, LocalGit};
//!
//! let git = LocalGit::with_system_git("/path/to/repo");
//! println!("on {}", git.current_branch().await?);
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::error::GitError;
use super::exec::{CommandExecutor, ExecOptions, ExecOutput, TokioExecutor};
use super::traits::{
    is_full_hash, AddOptions, ChangeStatus, ChangedFile, CommitInfo, ConfigScope, GitOperations,
    HistoryOptions, PushOptions, DEFAULT_BRANCH,
};

/// Substrings in `git` output that indicate a merge or rebase stopped on
/// conflicts.
pub const CONFLICT_MARKERS: [&str; 4] = [
    "CONFLICT",
    "Merge conflict",
    "could not apply",
    "Resolve all conflicts",
];

/// Field separator in `git log` output.
const FIELD_SEP: char = '\u{1f}';

/// Record separator in `git log` output.
const RECORD_SEP: char = '\u{1e}';

/// `git log` format producing one parseable record per commit.
const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%aI%x1f%P%x1f%B%x1e";

/// Git backend for a local working tree.
pub struct LocalGit {
    /// Runs the `git` executable
    executor: Arc<dyn CommandExecutor>,
    /// Directory the repository is discovered from
    work_dir: PathBuf,
    /// Repository root, detected on first use
    repo_root: Mutex<Option<PathBuf>>,
}

impl std::fmt::Debug for LocalGit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalGit")
            .field("work_dir", &self.work_dir)
            .field("repo_root", &self.cached_root())
            .finish()
    }
}

impl LocalGit {
    /// Create a backend that discovers its repository from `work_dir`.
    ///
    /// The root is resolved lazily with `git rev-parse --show-toplevel` and
    /// cached for the lifetime of the handle.
    pub fn new(executor: Arc<dyn CommandExecutor>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            work_dir: work_dir.into(),
            repo_root: Mutex::new(None),
        }
    }

    /// Create a backend for a repository whose root is already known.
    pub fn with_repo_root(executor: Arc<dyn CommandExecutor>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            executor,
            work_dir: root.clone(),
            repo_root: Mutex::new(Some(root)),
        }
    }

    /// Create a backend using [`TokioExecutor`].
    pub fn with_system_git(work_dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(TokioExecutor), work_dir)
    }

    fn cached_root(&self) -> Option<PathBuf> {
        self.repo_root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cache_root(&self, root: PathBuf) {
        *self.repo_root.lock().unwrap_or_else(PoisonError::into_inner) = Some(root);
    }

    /// Repository root, detecting and caching it on first use.
    async fn root(&self) -> Result<PathBuf, GitError> {
        if let Some(root) = self.cached_root() {
            return Ok(root);
        }

        let output = self
            .exec_in(&self.work_dir, &["rev-parse", "--show-toplevel"])
            .await?;
        if !output.success() {
            return Err(command_failed(&["rev-parse", "--show-toplevel"], output));
        }

        let root = PathBuf::from(output.stdout.trim());
        debug!(root = %root.display(), "detected repository root");
        self.cache_root(root.clone());
        Ok(root)
    }

    async fn exec_in(&self, dir: &Path, args: &[&str]) -> Result<ExecOutput, GitError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        debug!(cwd = %dir.display(), args = ?args, "git");
        let opts = ExecOptions {
            cwd: Some(dir.to_path_buf()),
            ..Default::default()
        };
        self.executor
            .exec("git", &args, &opts)
            .await
            .map_err(|source| GitError::Io {
                path: dir.to_path_buf(),
                source,
            })
    }

    /// Run `git` in the repository root, returning output regardless of exit code.
    async fn run(&self, args: &[&str]) -> Result<ExecOutput, GitError> {
        let root = self.root().await?;
        self.exec_in(&root, args).await
    }

    /// Run `git` and return stdout, mapping a non-zero exit to `CommandFailed`.
    async fn run_checked(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(command_failed(args, output))
        }
    }

    /// Map a failed pull/rebase to a conflict error when markers are present.
    async fn classify_failure(
        &self,
        args: &[&str],
        output: ExecOutput,
        rebase: bool,
    ) -> GitError {
        if !has_conflict_markers(&output) {
            return command_failed(args, output);
        }
        let files = match self.conflicted_files().await {
            Ok(files) => files,
            Err(e) => return e,
        };
        debug!(?files, rebase, "operation stopped on conflicts");
        if rebase {
            GitError::RebaseConflict { files }
        } else {
            GitError::MergeConflict { files }
        }
    }

    /// Run a command that may stop on conflicts.
    async fn run_conflicting(&self, args: &[&str], rebase: bool) -> Result<(), GitError> {
        let output = self.run(args).await?;
        if output.success() {
            Ok(())
        } else {
            Err(self.classify_failure(args, output, rebase).await)
        }
    }

    async fn log(&self, extra: &[&str]) -> Result<Vec<CommitInfo>, GitError> {
        let mut args = vec!["log", LOG_FORMAT];
        args.extend_from_slice(extra);
        let output = self.run(&args).await?;
        if !output.success() {
            // A branch with no commits yet has an empty history.
            if output.stderr.contains("does not have any commits") {
                return Ok(Vec::new());
            }
            return Err(command_failed(&args, output));
        }
        parse_log(&output.stdout)
    }

    async fn require_rebase(&self) -> Result<(), GitError> {
        if self.is_rebase_in_progress().await? {
            Ok(())
        } else {
            Err(GitError::RebaseNotInProgress)
        }
    }

    async fn write_worktree_file(&self, path: &str, content: &str) -> Result<(), GitError> {
        let full = self.root().await?.join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| GitError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&full, content)
            .await
            .map_err(|source| GitError::Io { path: full, source })
    }

    async fn commit_with(&self, message: &str, allow_empty: bool) -> Result<String, GitError> {
        let mut args = vec!["commit", "-m", message];
        if allow_empty {
            args.push("--allow-empty");
        }
        let output = self.run(&args).await?;
        if !output.success() {
            let combined = output.combined();
            if combined.contains("nothing to commit") || combined.contains("no changes added") {
                return Err(GitError::NothingToCommit);
            }
            return Err(command_failed(&args, output));
        }
        let hash = self.run_checked(&["rev-parse", "HEAD"]).await?.trim().to_string();
        info!(%hash, "committed");
        Ok(hash)
    }
}

#[async_trait]
impl GitOperations for LocalGit {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn init(&self) -> Result<(), GitError> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|source| GitError::Io {
                path: self.work_dir.clone(),
                source,
            })?;
        let branch_flag = format!("--initial-branch={DEFAULT_BRANCH}");
        let args = ["init", branch_flag.as_str()];
        let output = self.exec_in(&self.work_dir, &args).await?;
        if !output.success() {
            return Err(command_failed(&args, output));
        }
        self.cache_root(self.work_dir.clone());
        Ok(())
    }

    async fn repo_root(&self) -> Result<String, GitError> {
        Ok(self.root().await?.display().to_string())
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        let output = self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if output.success() {
            let name = output.stdout.trim();
            if name == "HEAD" {
                return Err(GitError::DetachedHead);
            }
            return Ok(name.to_string());
        }

        // Orphan branches have no commit for rev-parse to resolve, but HEAD
        // still names them symbolically.
        let output = self.run(&["symbolic-ref", "--short", "-q", "HEAD"]).await?;
        match output.stdout.trim() {
            name if output.success() && !name.is_empty() => Ok(name.to_string()),
            _ => Err(GitError::DetachedHead),
        }
    }

    async fn commit_hash(&self, reference: &str) -> Result<String, GitError> {
        if is_full_hash(reference) {
            return Ok(reference.to_string());
        }
        let spec = format!("{reference}^{{commit}}");
        let output = self.run(&["rev-parse", "--verify", "-q", &spec]).await?;
        if output.success() {
            Ok(output.stdout.trim().to_string())
        } else {
            Err(GitError::BranchNotFound {
                branch: reference.to_string(),
            })
        }
    }

    async fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError> {
        Ok(self.run_checked(&["merge-base", a, b]).await?.trim().to_string())
    }

    async fn changed_files(&self, from: &str, to: &str) -> Result<Vec<ChangedFile>, GitError> {
        let stdout = self.run_checked(&["diff", "--name-status", from, to]).await?;
        Ok(parse_name_status(&stdout))
    }

    async fn staged_files(&self) -> Result<Vec<String>, GitError> {
        let stdout = self.run_checked(&["diff", "--cached", "--name-only"]).await?;
        Ok(non_empty_lines(&stdout))
    }

    async fn file_content(&self, commit: &str, path: &str) -> Result<String, GitError> {
        let spec = format!("{commit}:{path}");
        let output = self.run(&["show", &spec]).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(GitError::FileNotFound {
                path: path.to_string(),
                commit: commit.to_string(),
            })
        }
    }

    async fn commit_history(&self, opts: &HistoryOptions) -> Result<Vec<CommitInfo>, GitError> {
        let max = opts.max_count.map(|n| format!("--max-count={n}"));
        let mut extra: Vec<&str> = Vec::new();
        if let Some(max) = &max {
            extra.push(max);
        }
        if let Some(path) = &opts.path_filter {
            extra.push("--");
            extra.push(path);
        }
        self.log(&extra).await
    }

    async fn commit_history_range(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<CommitInfo>, GitError> {
        let range = format!("{from}..{to}");
        self.log(&[range.as_str()]).await
    }

    async fn commit_message(&self, hash: &str) -> Result<String, GitError> {
        let stdout = self.run_checked(&["log", "-1", "--format=%B", hash]).await?;
        Ok(stdout.trim_end().to_string())
    }

    async fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        let stdout = self.run_checked(&["status", "--porcelain"]).await?;
        Ok(stdout.lines().any(|l| !l.trim().is_empty()))
    }

    async fn is_rebase_in_progress(&self) -> Result<bool, GitError> {
        let git_dir = self.root().await?.join(".git");
        for marker in ["rebase-merge", "rebase-apply"] {
            let path = git_dir.join(marker);
            let exists = tokio::fs::try_exists(&path)
                .await
                .map_err(|source| GitError::Io { path, source })?;
            if exists {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        let refname = format!("refs/heads/{name}");
        let output = self.run(&["show-ref", "--verify", "--quiet", &refname]).await?;
        Ok(output.success())
    }

    async fn remote_branches(&self, remote: &str) -> Result<Vec<String>, GitError> {
        let stdout = self
            .run_checked(&["branch", "-r", "--format=%(refname:short)"])
            .await?;
        let prefix = format!("{remote}/");
        Ok(stdout
            .lines()
            .filter_map(|l| l.trim().strip_prefix(&prefix))
            .filter(|b| *b != "HEAD")
            .map(str::to_string)
            .collect())
    }

    async fn is_remote_configured(&self, remote: &str) -> Result<bool, GitError> {
        let stdout = self.run_checked(&["remote"]).await?;
        Ok(stdout.lines().any(|l| l.trim() == remote))
    }

    async fn tracking_remote(&self, branch: &str) -> Result<Option<String>, GitError> {
        self.config_value(&format!("branch.{branch}.remote")).await
    }

    async fn conflicted_files(&self) -> Result<Vec<String>, GitError> {
        let stdout = self
            .run_checked(&["diff", "--name-only", "--diff-filter=U"])
            .await?;
        Ok(non_empty_lines(&stdout))
    }

    async fn config_value(&self, key: &str) -> Result<Option<String>, GitError> {
        let args = ["config", "--get", key];
        let output = self.run(&args).await?;
        match output.exit_code {
            0 => Ok(Some(output.stdout.trim_end().to_string())),
            // Exit code 1 means the key is unset.
            1 => Ok(None),
            _ => Err(command_failed(&args, output)),
        }
    }

    async fn checkout_branch(&self, name: &str) -> Result<(), GitError> {
        let args = ["checkout", name];
        let output = self.run(&args).await?;
        if output.success() {
            return Ok(());
        }
        if output.stderr.contains("did not match any") || output.stderr.contains("invalid reference")
        {
            return Err(GitError::BranchNotFound {
                branch: name.to_string(),
            });
        }
        Err(command_failed(&args, output))
    }

    async fn checkout_orphan_branch(&self, name: &str) -> Result<(), GitError> {
        self.run_checked(&["checkout", "--orphan", name]).await?;
        Ok(())
    }

    async fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.run_checked(&["fetch", remote]).await?;
        Ok(())
    }

    async fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_conflicting(&["pull", "--no-rebase", "--no-edit", remote, branch], false)
            .await
    }

    async fn pull_rebase(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_conflicting(&["pull", "--rebase", remote, branch], true)
            .await
    }

    async fn reset_hard(&self, target: &str) -> Result<(), GitError> {
        self.run_checked(&["reset", "--hard", target]).await?;
        Ok(())
    }

    async fn checkout_files(&self, branch: &str, paths: &[&str]) -> Result<(), GitError> {
        let mut args = vec!["checkout", branch, "--"];
        args.extend_from_slice(paths);
        self.run_checked(&args).await?;
        Ok(())
    }

    async fn add(&self, paths: &[&str], opts: AddOptions) -> Result<(), GitError> {
        if let Some(content) = &opts.content {
            for path in paths {
                self.write_worktree_file(path, content).await?;
            }
        }
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        self.run_checked(&args).await?;
        Ok(())
    }

    async fn rm(&self, paths: &[&str]) -> Result<(), GitError> {
        let mut args = vec!["rm", "-f", "--quiet", "--"];
        args.extend_from_slice(paths);
        self.run_checked(&args).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<String, GitError> {
        self.commit_with(message, false).await
    }

    async fn commit_allow_empty(&self, message: &str) -> Result<String, GitError> {
        self.commit_with(message, true).await
    }

    async fn push(&self, remote: &str, branch: &str, opts: PushOptions) -> Result<(), GitError> {
        let mut args = vec!["push"];
        if opts.force {
            args.push("--force-with-lease");
        }
        args.extend_from_slice(&[remote, branch]);
        self.run_checked(&args).await?;
        Ok(())
    }

    async fn push_with_upstream(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run_checked(&["push", "-u", remote, branch]).await?;
        Ok(())
    }

    async fn set_upstream(&self, branch: &str, remote: &str) -> Result<(), GitError> {
        let upstream = format!("--set-upstream-to={remote}/{branch}");
        self.run_checked(&["branch", &upstream, branch]).await?;
        Ok(())
    }

    async fn stash(&self) -> Result<bool, GitError> {
        let stdout = self.run_checked(&["stash", "push"]).await?;
        Ok(!stdout.contains("No local changes to save"))
    }

    async fn stash_pop(&self) -> Result<(), GitError> {
        self.run_checked(&["stash", "pop"]).await?;
        Ok(())
    }

    async fn set_config(
        &self,
        key: &str,
        value: &str,
        scope: ConfigScope,
    ) -> Result<(), GitError> {
        self.run_checked(&["config", scope.flag(), key, value]).await?;
        Ok(())
    }

    async fn rebase_continue(&self) -> Result<(), GitError> {
        self.require_rebase().await?;
        // core.editor=true accepts the existing message without prompting.
        self.run_conflicting(&["-c", "core.editor=true", "rebase", "--continue"], true)
            .await
    }

    async fn rebase_abort(&self) -> Result<(), GitError> {
        self.require_rebase().await?;
        self.run_checked(&["rebase", "--abort"]).await?;
        Ok(())
    }

    async fn create_branch(&self, name: &str, start: Option<&str>) -> Result<(), GitError> {
        if self.branch_exists(name).await? {
            return Err(GitError::BranchExists {
                branch: name.to_string(),
            });
        }
        let mut args = vec!["checkout", "-b", name];
        if let Some(start) = start {
            args.push(start);
        }
        self.run_checked(&args).await?;
        Ok(())
    }

    async fn rebase(&self, onto: &str) -> Result<(), GitError> {
        self.run_conflicting(&["rebase", onto], true).await
    }

    async fn rebase_onto(&self, new_base: &str, upstream: &str) -> Result<(), GitError> {
        self.run_conflicting(&["rebase", "--onto", new_base, upstream], true)
            .await
    }
}

fn command_failed(args: &[&str], output: ExecOutput) -> GitError {
    GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    }
}

fn has_conflict_markers(output: &ExecOutput) -> bool {
    let combined = output.combined();
    CONFLICT_MARKERS.iter().any(|m| combined.contains(m))
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `git diff --name-status` output.
fn parse_name_status(text: &str) -> Vec<ChangedFile> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let code = fields.next()?.trim();
            let first = fields.next()?.to_string();
            let second = fields.next().map(str::to_string);
            let file = match code.chars().next()? {
                'A' => ChangedFile {
                    path: first,
                    status: ChangeStatus::Added,
                    previous_path: None,
                },
                'D' => ChangedFile {
                    path: first,
                    status: ChangeStatus::Deleted,
                    previous_path: None,
                },
                'R' => ChangedFile {
                    path: second.unwrap_or_else(|| first.clone()),
                    status: ChangeStatus::Renamed,
                    previous_path: Some(first),
                },
                // Copies keep the source, so the destination is an addition.
                'C' => ChangedFile {
                    path: second.unwrap_or(first),
                    status: ChangeStatus::Added,
                    previous_path: None,
                },
                _ => ChangedFile {
                    path: first,
                    status: ChangeStatus::Modified,
                    previous_path: None,
                },
            };
            Some(file)
        })
        .collect()
}

/// Parse output produced with [`LOG_FORMAT`].
fn parse_log(text: &str) -> Result<Vec<CommitInfo>, GitError> {
    text.split(RECORD_SEP)
        .map(|record| record.trim_start_matches('\n'))
        .filter(|record| !record.trim().is_empty())
        .map(parse_log_record)
        .collect()
}

fn parse_log_record(record: &str) -> Result<CommitInfo, GitError> {
    let fields: Vec<&str> = record.splitn(6, FIELD_SEP).collect();
    let malformed = || GitError::CommandFailed {
        command: "git log".to_string(),
        exit_code: 0,
        stdout: record.to_string(),
        stderr: "unexpected log record format".to_string(),
    };
    if fields.len() != 6 {
        return Err(malformed());
    }

    let timestamp = DateTime::parse_from_rfc3339(fields[3])
        .map_err(|_| malformed())?
        .with_timezone(&Utc);

    Ok(CommitInfo {
        hash: fields[0].to_string(),
        author_name: fields[1].to_string(),
        author_email: fields[2].to_string(),
        timestamp,
        parents: fields[4].split_whitespace().map(str::to_string).collect(),
        message: fields[5].trim_end().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Executor that replays canned outputs and records every invocation.
    #[derive(Default)]
    struct ScriptedExecutor {
        replies: Mutex<VecDeque<ExecOutput>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedExecutor {
        fn reply(self, exit_code: i32, stdout: &str, stderr: &str) -> Self {
            self.replies.lock().unwrap().push_back(ExecOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            });
            self
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn exec(
            &self,
            _program: &str,
            args: &[String],
            _opts: &ExecOptions,
        ) -> std::io::Result<ExecOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }
    }

    fn git_with(exec: Arc<ScriptedExecutor>) -> LocalGit {
        LocalGit::with_repo_root(exec, "/repo")
    }

    mod parsing {
        use super::*;

        #[test]
        fn name_status_variants() {
            let files = parse_name_status(
                "A\tnew.txt\nM\tchanged.txt\nD\tgone.txt\nR087\told.txt\tmoved.txt\nT\tmode.sh\n",
            );
            assert_eq!(files.len(), 5);
            assert_eq!(files[0].status, ChangeStatus::Added);
            assert_eq!(files[1].status, ChangeStatus::Modified);
            assert_eq!(files[2].status, ChangeStatus::Deleted);
            assert_eq!(files[3].status, ChangeStatus::Renamed);
            assert_eq!(files[3].path, "moved.txt");
            assert_eq!(files[3].previous_path.as_deref(), Some("old.txt"));
            assert_eq!(files[4].status, ChangeStatus::Modified);
        }

        #[test]
        fn log_records() {
            let text = format!(
                "{h1}\u{1f}Ann\u{1f}ann@example.com\u{1f}2024-05-01T10:00:00+02:00\u{1f}{h2}\u{1f}Second\n\nbody\n\u{1e}\n\
                 {h2}\u{1f}Bob\u{1f}bob@example.com\u{1f}2024-04-30T08:00:00Z\u{1f}\u{1f}Initial\n\u{1e}\n",
                h1 = "1".repeat(40),
                h2 = "2".repeat(40),
            );
            let commits = parse_log(&text).unwrap();
            assert_eq!(commits.len(), 2);
            assert_eq!(commits[0].message, "Second\n\nbody");
            assert_eq!(commits[0].parents, vec!["2".repeat(40)]);
            assert_eq!(commits[0].timestamp.to_rfc3339(), "2024-05-01T08:00:00+00:00");
            assert!(commits[1].parents.is_empty());
            assert_eq!(commits[1].author(), "Bob <bob@example.com>");
        }

        #[test]
        fn log_rejects_truncated_record() {
            assert!(parse_log("abc\u{1f}only-two\u{1e}").is_err());
        }
    }

    mod commands {
        use super::*;

        #[tokio::test]
        async fn full_hash_short_circuits_without_exec() {
            let exec = Arc::new(ScriptedExecutor::default());
            let git = git_with(exec.clone());
            let hash = "abcdef0123456789abcdef0123456789abcdef01";
            assert_eq!(git.commit_hash(hash).await.unwrap(), hash);
            assert!(exec.calls().is_empty());
        }

        #[tokio::test]
        async fn root_is_detected_once() {
            let exec = Arc::new(
                ScriptedExecutor::default()
                    .reply(0, "/detected/root\n", "")
                    .reply(0, "main\n", "")
                    .reply(0, "main\n", ""),
            );
            let git = LocalGit::new(exec.clone(), "/detected/root/sub");
            assert_eq!(git.current_branch().await.unwrap(), "main");
            assert_eq!(git.current_branch().await.unwrap(), "main");
            assert_eq!(git.repo_root().await.unwrap(), "/detected/root");

            let calls = exec.calls();
            assert_eq!(calls.len(), 3);
            assert_eq!(calls[0], vec!["rev-parse", "--show-toplevel"]);
        }

        #[tokio::test]
        async fn current_branch_falls_back_to_symbolic_ref() {
            let exec = Arc::new(
                ScriptedExecutor::default()
                    .reply(128, "", "fatal: ambiguous argument 'HEAD'")
                    .reply(0, "orphan\n", ""),
            );
            let git = git_with(exec.clone());
            assert_eq!(git.current_branch().await.unwrap(), "orphan");
            assert_eq!(exec.calls()[1][0], "symbolic-ref");
        }

        #[tokio::test]
        async fn detached_head_is_an_error() {
            let exec = Arc::new(ScriptedExecutor::default().reply(0, "HEAD\n", ""));
            let git = git_with(exec);
            assert!(matches!(
                git.current_branch().await,
                Err(GitError::DetachedHead)
            ));
        }

        #[tokio::test]
        async fn create_existing_branch_fails_before_checkout() {
            let exec = Arc::new(ScriptedExecutor::default().reply(0, "", ""));
            let git = git_with(exec.clone());
            let err = git.create_branch("feature", None).await.unwrap_err();
            assert!(matches!(err, GitError::BranchExists { ref branch } if branch == "feature"));
            assert_eq!(exec.calls().len(), 1);
        }

        #[tokio::test]
        async fn pull_conflict_lists_files() {
            let exec = Arc::new(
                ScriptedExecutor::default()
                    .reply(
                        1,
                        "CONFLICT (content): Merge conflict in data.json\n",
                        "Automatic merge failed",
                    )
                    .reply(0, "data.json\n", ""),
            );
            let git = git_with(exec.clone());
            let err = git.pull("origin", "main").await.unwrap_err();
            assert!(
                matches!(err, GitError::MergeConflict { ref files } if files == &["data.json".to_string()])
            );
            assert_eq!(
                exec.calls()[1],
                vec!["diff", "--name-only", "--diff-filter=U"]
            );
        }

        #[tokio::test]
        async fn pull_failure_without_markers_is_command_failure() {
            let exec = Arc::new(ScriptedExecutor::default().reply(
                1,
                "",
                "fatal: couldn't find remote ref nope",
            ));
            let git = git_with(exec);
            assert!(matches!(
                git.pull("origin", "nope").await,
                Err(GitError::CommandFailed { exit_code: 1, .. })
            ));
        }

        #[tokio::test]
        async fn set_config_maps_scope() {
            let exec = Arc::new(ScriptedExecutor::default());
            let git = git_with(exec.clone());
            git.set_config("user.name", "Ann", ConfigScope::Global)
                .await
                .unwrap();
            assert_eq!(
                exec.calls()[0],
                vec!["config", "--global", "user.name", "Ann"]
            );
        }

        #[tokio::test]
        async fn unset_config_is_none() {
            let exec = Arc::new(ScriptedExecutor::default().reply(1, "", ""));
            let git = git_with(exec);
            assert_eq!(git.config_value("branch.main.remote").await.unwrap(), None);
        }

        #[tokio::test]
        async fn rebase_continue_requires_rebase() {
            let exec = Arc::new(ScriptedExecutor::default());
            let dir = tempfile::tempdir().unwrap();
            let git = LocalGit::with_repo_root(exec.clone(), dir.path());
            assert!(matches!(
                git.rebase_continue().await,
                Err(GitError::RebaseNotInProgress)
            ));
            assert!(exec.calls().is_empty());
        }

        #[tokio::test]
        async fn rebase_detection_reads_markers_only() {
            let exec = Arc::new(ScriptedExecutor::default());
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join(".git/rebase-merge")).unwrap();
            let git = LocalGit::with_repo_root(exec.clone(), dir.path());
            assert!(git.is_rebase_in_progress().await.unwrap());
            assert!(exec.calls().is_empty());
        }

        #[tokio::test]
        async fn nothing_to_commit_is_typed() {
            let exec = Arc::new(ScriptedExecutor::default().reply(
                1,
                "On branch main\nnothing to commit, working tree clean\n",
                "",
            ));
            let git = git_with(exec);
            assert!(matches!(
                git.commit("empty").await,
                Err(GitError::NothingToCommit)
            ));
        }

        #[tokio::test]
        async fn remote_branches_strip_prefix_and_head() {
            let exec = Arc::new(ScriptedExecutor::default().reply(
                0,
                "origin\norigin/main\norigin/feature/x\nupstream/main\n",
                "",
            ));
            let git = git_with(exec);
            assert_eq!(
                git.remote_branches("origin").await.unwrap(),
                vec!["main".to_string(), "feature/x".to_string()]
            );
        }
    }
}

//! Integration tests for the local Git backend.
//!
//! These tests use real git repositories created via tempfile to verify
//! that `LocalGit` maps actual git behaviour onto the shared interface.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use gitrecords::git::{
    AddOptions, ChangeStatus, ConfigScope, GitError, GitOperations, HistoryOptions, LocalGit,
};

/// Test fixture that creates a real git repository.
struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new test repository on `main` with an initial commit.
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");

        run_git(dir.path(), &["init", "--initial-branch=main"]);
        configure_identity(dir.path());

        std::fs::write(dir.path().join("file.txt"), "base\n").unwrap();
        run_git(dir.path(), &["add", "file.txt"]);
        run_git(dir.path(), &["commit", "-m", "Initial"]);

        Self { dir }
    }

    /// Get the path to the repository.
    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Open the backend on this repository.
    fn git(&self) -> LocalGit {
        LocalGit::with_system_git(self.path())
    }

    /// Get HEAD using git directly.
    fn head_raw(&self) -> String {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(self.path())
            .output()
            .expect("git rev-parse failed");
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }
}

fn configure_identity(dir: &Path) {
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
    run_git(dir, &["config", "commit.gpgsign", "false"]);
}

/// Run a git command in the given directory.
fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn detects_root_from_subdirectory() {
    let repo = TestRepo::new();
    let sub = repo.path().join("nested/deeper");
    std::fs::create_dir_all(&sub).unwrap();

    let git = LocalGit::with_system_git(&sub);
    let root = std::path::PathBuf::from(git.repo_root().await.unwrap());
    assert_eq!(
        root.canonicalize().unwrap(),
        repo.path().canonicalize().unwrap()
    );
}

#[tokio::test]
async fn current_branch_and_head() {
    let repo = TestRepo::new();
    let git = repo.git();

    assert_eq!(git.current_branch().await.unwrap(), "main");
    assert_eq!(git.commit_hash("HEAD").await.unwrap(), repo.head_raw());
    assert_eq!(git.commit_hash("main").await.unwrap(), repo.head_raw());
}

#[tokio::test]
async fn full_hash_is_returned_without_lookup() {
    let repo = TestRepo::new();
    let unknown = "0123456789abcdef0123456789abcdef01234567";
    assert_eq!(repo.git().commit_hash(unknown).await.unwrap(), unknown);
}

#[tokio::test]
async fn unknown_ref_is_branch_not_found() {
    let repo = TestRepo::new();
    assert!(matches!(
        repo.git().commit_hash("no-such-branch").await,
        Err(GitError::BranchNotFound { .. })
    ));
}

#[tokio::test]
async fn orphan_branch_reports_its_name() {
    let repo = TestRepo::new();
    let git = repo.git();
    git.checkout_orphan_branch("fresh").await.unwrap();
    assert_eq!(git.current_branch().await.unwrap(), "fresh");
}

#[tokio::test]
async fn detached_head_is_an_error() {
    let repo = TestRepo::new();
    run_git(repo.path(), &["checkout", "--detach", "HEAD"]);
    assert!(matches!(
        repo.git().current_branch().await,
        Err(GitError::DetachedHead)
    ));
}

#[tokio::test]
async fn missing_file_is_file_not_found() {
    let repo = TestRepo::new();
    assert!(matches!(
        repo.git().file_content("HEAD", "nope.txt").await,
        Err(GitError::FileNotFound { .. })
    ));
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn add_with_content_then_commit() {
    let repo = TestRepo::new();
    let git = repo.git();

    git.add(&["records/a.json"], AddOptions::with_content("{\"n\":1}\n"))
        .await
        .unwrap();
    assert_eq!(git.staged_files().await.unwrap(), vec!["records/a.json"]);
    assert!(git.has_uncommitted_changes().await.unwrap());

    let head = git.commit("Add a").await.unwrap();
    assert_eq!(head, repo.head_raw());
    assert_eq!(
        git.file_content(&head, "records/a.json").await.unwrap(),
        "{\"n\":1}\n"
    );
    assert!(git.staged_files().await.unwrap().is_empty());
    assert_eq!(git.commit_message(&head).await.unwrap().trim(), "Add a");
}

#[tokio::test]
async fn commit_with_nothing_staged() {
    let repo = TestRepo::new();
    let git = repo.git();
    assert!(matches!(
        git.commit("empty").await,
        Err(GitError::NothingToCommit)
    ));
    let head = git.commit_allow_empty("empty").await.unwrap();
    assert_eq!(head, repo.head_raw());
}

#[tokio::test]
async fn history_and_changed_files() {
    let repo = TestRepo::new();
    let git = repo.git();
    let base = git.commit_hash("HEAD").await.unwrap();

    git.add(&["a.txt"], AddOptions::with_content("a"))
        .await
        .unwrap();
    git.commit("Add a.txt").await.unwrap();
    git.rm(&["file.txt"]).await.unwrap();
    let head = git.commit("Remove file.txt").await.unwrap();

    let history = git
        .commit_history(&HistoryOptions::default())
        .await
        .unwrap();
    let summaries: Vec<&str> = history.iter().map(|c| c.summary()).collect();
    assert_eq!(summaries, vec!["Remove file.txt", "Add a.txt", "Initial"]);
    assert_eq!(history[0].author_name, "Test User");

    let only_a = git
        .commit_history(&HistoryOptions {
            path_filter: Some("a.txt".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(only_a.len(), 1);

    let range = git.commit_history_range(&base, &head).await.unwrap();
    assert_eq!(range.len(), 2);

    let mut changed = git.changed_files(&base, &head).await.unwrap();
    changed.sort_by(|a, b| a.path.cmp(&b.path));
    assert_eq!(changed[0].path, "a.txt");
    assert_eq!(changed[0].status, ChangeStatus::Added);
    assert_eq!(changed[1].path, "file.txt");
    assert_eq!(changed[1].status, ChangeStatus::Deleted);
}

#[tokio::test]
async fn branches_create_checkout_exists() {
    let repo = TestRepo::new();
    let git = repo.git();

    git.create_branch("feature", None).await.unwrap();
    assert_eq!(git.current_branch().await.unwrap(), "feature");
    assert!(git.branch_exists("feature").await.unwrap());
    assert!(matches!(
        git.create_branch("feature", None).await,
        Err(GitError::BranchExists { .. })
    ));
    assert!(matches!(
        git.checkout_branch("missing").await,
        Err(GitError::BranchNotFound { .. })
    ));

    git.checkout_branch("main").await.unwrap();
    assert_eq!(
        git.merge_base("main", "feature").await.unwrap(),
        repo.head_raw()
    );
}

#[tokio::test]
async fn stash_round_trip() {
    let repo = TestRepo::new();
    let git = repo.git();
    assert!(!git.stash().await.unwrap());

    git.add(&["file.txt"], AddOptions::with_content("changed\n"))
        .await
        .unwrap();
    assert!(git.stash().await.unwrap());
    assert!(!git.has_uncommitted_changes().await.unwrap());

    git.stash_pop().await.unwrap();
    let on_disk = std::fs::read_to_string(repo.path().join("file.txt")).unwrap();
    assert_eq!(on_disk, "changed\n");
}

#[tokio::test]
async fn config_set_and_get() {
    let repo = TestRepo::new();
    let git = repo.git();
    assert_eq!(git.config_value("records.kind").await.unwrap(), None);
    git.set_config("records.kind", "task", ConfigScope::Local)
        .await
        .unwrap();
    assert_eq!(
        git.config_value("records.kind").await.unwrap().as_deref(),
        Some("task")
    );
}

// =============================================================================
// Rebase
// =============================================================================

/// Diverge `main` and `feature` on the same line of `file.txt`.
async fn diverged(repo: &TestRepo) -> LocalGit {
    let git = repo.git();
    git.create_branch("feature", None).await.unwrap();
    git.add(&["file.txt"], AddOptions::with_content("feature\n"))
        .await
        .unwrap();
    git.commit("Feature change").await.unwrap();

    git.checkout_branch("main").await.unwrap();
    git.add(&["file.txt"], AddOptions::with_content("main\n"))
        .await
        .unwrap();
    git.commit("Main change").await.unwrap();
    git
}

#[tokio::test]
async fn rebase_conflict_then_abort_restores_head() {
    let repo = TestRepo::new();
    let git = diverged(&repo).await;
    let before = git.commit_hash("HEAD").await.unwrap();

    let err = git.rebase("feature").await.unwrap_err();
    match &err {
        GitError::RebaseConflict { files } => assert_eq!(files, &vec!["file.txt".to_string()]),
        other => panic!("expected rebase conflict, got {other:?}"),
    }
    assert!(git.is_rebase_in_progress().await.unwrap());
    assert_eq!(git.conflicted_files().await.unwrap(), vec!["file.txt"]);

    git.rebase_abort().await.unwrap();
    assert!(!git.is_rebase_in_progress().await.unwrap());
    assert_eq!(git.commit_hash("HEAD").await.unwrap(), before);
}

#[tokio::test]
async fn rebase_continue_after_resolution() {
    let repo = TestRepo::new();
    let git = diverged(&repo).await;
    assert!(git.rebase("feature").await.is_err());

    git.add(&["file.txt"], AddOptions::with_content("resolved\n"))
        .await
        .unwrap();
    git.rebase_continue().await.unwrap();

    assert!(!git.is_rebase_in_progress().await.unwrap());
    assert_eq!(
        git.file_content("HEAD", "file.txt").await.unwrap(),
        "resolved\n"
    );
}

#[tokio::test]
async fn abort_without_rebase() {
    let repo = TestRepo::new();
    assert!(matches!(
        repo.git().rebase_abort().await,
        Err(GitError::RebaseNotInProgress)
    ));
}

// =============================================================================
// Remotes
// =============================================================================

#[tokio::test]
async fn push_pull_through_bare_remote() {
    let repo = TestRepo::new();
    let remote = TempDir::new().unwrap();
    run_git(remote.path(), &["init", "--bare", "--initial-branch=main"]);
    let remote_url = remote.path().to_str().unwrap();
    run_git(repo.path(), &["remote", "add", "origin", remote_url]);

    let git = repo.git();
    assert!(git.is_remote_configured("origin").await.unwrap());
    assert!(!git.is_remote_configured("upstream").await.unwrap());

    git.push_with_upstream("origin", "main").await.unwrap();
    assert_eq!(git.remote_branches("origin").await.unwrap(), vec!["main"]);
    assert_eq!(
        git.tracking_remote("main").await.unwrap().as_deref(),
        Some("origin")
    );

    // A second clone advances the remote.
    let other = TempDir::new().unwrap();
    run_git(other.path(), &["clone", remote_url, "."]);
    configure_identity(other.path());
    std::fs::write(other.path().join("other.txt"), "x").unwrap();
    run_git(other.path(), &["add", "other.txt"]);
    run_git(other.path(), &["commit", "-m", "From other clone"]);
    run_git(other.path(), &["push", "origin", "main"]);

    git.pull("origin", "main").await.unwrap();
    assert_eq!(git.file_content("HEAD", "other.txt").await.unwrap(), "x");
}

#[tokio::test]
async fn pull_conflict_lists_files() {
    let repo = TestRepo::new();
    let remote = TempDir::new().unwrap();
    run_git(remote.path(), &["init", "--bare", "--initial-branch=main"]);
    let remote_url = remote.path().to_str().unwrap();
    run_git(repo.path(), &["remote", "add", "origin", remote_url]);
    let git = repo.git();
    git.push_with_upstream("origin", "main").await.unwrap();

    let other = TempDir::new().unwrap();
    run_git(other.path(), &["clone", remote_url, "."]);
    configure_identity(other.path());
    std::fs::write(other.path().join("file.txt"), "theirs\n").unwrap();
    run_git(other.path(), &["commit", "-am", "Theirs"]);
    run_git(other.path(), &["push", "origin", "main"]);

    git.add(&["file.txt"], AddOptions::with_content("ours\n"))
        .await
        .unwrap();
    git.commit("Ours").await.unwrap();

    let err = git.pull("origin", "main").await.unwrap_err();
    assert_eq!(err.conflicted_files().unwrap(), ["file.txt".to_string()]);
}

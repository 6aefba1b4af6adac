//! cli::commands::history
//!
//! `log`: commit history of the record store.
//!
//! With the fs backend the record directory must be inside a local Git
//! repository; with the github backend history comes from the API.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::Context;
use crate::cli::args::Backend;
use crate::git::{GitOperations, HistoryOptions, LocalGit};

/// Print one line per commit, newest first.
pub(super) async fn log(ctx: &Context, id: Option<&str>, max_count: usize) -> Result<()> {
    let git: Box<dyn GitOperations> = match ctx.backend {
        Backend::Fs => Box::new(LocalGit::with_system_git(ctx.base_path())),
        Backend::Github => Box::new(ctx.github_git()?),
    };

    let path_filter = match id {
        None => None,
        Some(id) => {
            let path = ctx.record_path(id)?;
            Some(match ctx.backend {
                Backend::Fs => relative_to_root(git.as_ref(), &ctx.base_path(), &path).await?,
                Backend::Github => path,
            })
        }
    };

    let opts = HistoryOptions {
        max_count: Some(max_count),
        path_filter,
    };
    for commit in git.commit_history(&opts).await? {
        let short = commit.hash.get(..7).unwrap_or(&commit.hash);
        println!(
            "{short} {} {} {}",
            commit.timestamp.format("%Y-%m-%d"),
            commit.author(),
            commit.summary()
        );
    }
    Ok(())
}

/// `file` in `base`, as a path relative to the repository root.
async fn relative_to_root(git: &dyn GitOperations, base: &Path, file: &str) -> Result<String> {
    let root = tokio::fs::canonicalize(git.repo_root().await?)
        .await
        .context("cannot resolve repository root")?;
    let base = tokio::fs::canonicalize(base)
        .await
        .with_context(|| format!("cannot resolve record directory {}", base.display()))?;
    let rel: PathBuf = base
        .strip_prefix(&root)
        .with_context(|| format!("{} is outside the repository", base.display()))?
        .join(file);
    Ok(rel.to_string_lossy().replace('\\', "/"))
}

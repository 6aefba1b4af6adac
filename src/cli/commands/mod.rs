//! cli::commands
//!
//! Command handlers.

mod history;
mod records;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::args::{Backend, Command};
use crate::config::Config;
use crate::forge::GitHubClient;
use crate::git::GitHubGit;
use crate::store::{storage_name, ColonEncoder, FsStore, GitHubStore, GitHubWriteOptions, IdEncoder};

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    /// Loaded configuration
    pub config: Config,
    /// Selected backend
    pub backend: Backend,
    /// `--dir` override
    pub dir: Option<PathBuf>,
    /// Suppress informational output
    pub quiet: bool,
}

impl Context {
    /// Record directory: `--dir`, else `store.base_path`.
    pub fn base_path(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| self.config.base_path())
    }

    /// Record directory as a path inside a GitHub repository.
    fn remote_base_path(&self) -> String {
        self.base_path().to_string_lossy().replace('\\', "/")
    }

    fn fs_store(&self) -> FsStore<serde_json::Value> {
        let store = FsStore::new(self.base_path())
            .with_extension(self.config.extension())
            .with_create_dirs(self.config.create_dirs());
        if self.config.encode_ids() {
            store.with_encoder(ColonEncoder)
        } else {
            store
        }
    }

    fn github_client(&self) -> Result<GitHubClient> {
        let token = self.config.github_token().with_context(|| {
            format!(
                "set {} to a GitHub token with contents access",
                self.config.github_token_env()
            )
        })?;
        let client = GitHubClient::with_api_base(
            token,
            self.config.github_owner()?,
            self.config.github_repo()?,
            self.config.github_api_base(),
        );
        Ok(client.with_timeout(self.config.github_timeout())?)
    }

    fn github_git(&self) -> Result<GitHubGit> {
        Ok(GitHubGit::new(
            self.github_client()?,
            self.config.github_branch(),
        ))
    }

    fn github_store(&self) -> Result<GitHubStore<serde_json::Value>> {
        let git = Arc::new(self.github_git()?);
        let store = GitHubStore::new(
            git.client().clone(),
            self.config.github_branch(),
            self.remote_base_path(),
        )
        .with_extension(self.config.extension())
        .with_git(git);
        Ok(if self.config.encode_ids() {
            store.with_encoder(ColonEncoder)
        } else {
            store
        })
    }

    /// Path of a record's file relative to the history root.
    fn record_path(&self, id: &str) -> Result<String> {
        let encoder = self.config.encode_ids().then_some(&ColonEncoder as &dyn IdEncoder);
        let name = storage_name(id, encoder)?;
        let file = format!("{name}.{}", self.config.extension());
        Ok(match self.backend {
            Backend::Fs => file,
            Backend::Github => {
                let base = self.remote_base_path();
                let base = base.trim_matches('/');
                if base.is_empty() {
                    file
                } else {
                    format!("{base}/{file}")
                }
            }
        })
    }
}

/// Dispatch a parsed command.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    if let Command::Log { id, max_count } = command {
        return history::log(ctx, id.as_deref(), max_count).await;
    }

    match ctx.backend {
        Backend::Fs => records::run(&ctx.fs_store(), ctx, command, |_| ()).await,
        Backend::Github => {
            let store = ctx.github_store()?;
            records::run(&store, ctx, command, |message| GitHubWriteOptions {
                message,
            })
            .await
        }
    }
}

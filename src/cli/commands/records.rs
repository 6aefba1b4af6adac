//! cli::commands::records
//!
//! `get`, `put`, `delete`, `list` and `exists`, for any record store.

use anyhow::{bail, Context as _, Result};
use serde_json::Value;
use tokio::io::AsyncReadExt;

use super::Context;
use crate::cli::args::Command;
use crate::store::{GitHubWriteResult, RecordStore};

/// Write results that may name a commit.
pub(super) trait CommitReport {
    fn commit(&self) -> Option<&str>;
}

impl CommitReport for () {
    fn commit(&self) -> Option<&str> {
        None
    }
}

impl CommitReport for GitHubWriteResult {
    fn commit(&self) -> Option<&str> {
        self.commit_sha.as_deref()
    }
}

/// Run a record command against `store`.
///
/// `options` builds the store's write options from a `--message` value.
pub(super) async fn run<S, F>(store: &S, ctx: &Context, command: Command, options: F) -> Result<()>
where
    S: RecordStore<Value>,
    S::WriteResult: CommitReport,
    F: Fn(Option<String>) -> S::WriteOptions,
{
    match command {
        Command::Get { id } => {
            let Some(value) = store.get(&id).await? else {
                bail!("record not found: {id}");
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Put { id, value, message } => {
            let text = match value {
                Some(text) => text,
                None => read_stdin().await?,
            };
            let value: Value = serde_json::from_str(&text)
                .with_context(|| format!("value for '{id}' is not valid JSON"))?;
            let result = store.put(&id, &value, &options(message)).await?;
            report(ctx, &result);
        }
        Command::Delete { id, message } => {
            let result = store.delete(&id, &options(message)).await?;
            report(ctx, &result);
        }
        Command::List => {
            for id in store.list().await? {
                println!("{id}");
            }
        }
        Command::Exists { id } => {
            println!("{}", store.exists(&id).await?);
        }
        Command::Log { .. } => bail!("log is not a record command"),
    }
    Ok(())
}

fn report(ctx: &Context, result: &impl CommitReport) {
    if let (false, Some(commit)) = (ctx.quiet, result.commit()) {
        println!("{commit}");
    }
}

async fn read_stdin() -> Result<String> {
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("failed to read value from stdin")?;
    Ok(text)
}

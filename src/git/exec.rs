//! git::exec
//!
//! Process execution seam for the local backend.
//!
//! [`LocalGit`](super::LocalGit) never spawns processes itself; it is handed
//! a [`CommandExecutor`]. Production code uses [`TokioExecutor`]; tests can
//! substitute a scripted executor to observe exactly which commands run.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

/// Options for a single command invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Kill the process if it runs longer than this
    pub timeout: Option<Duration>,
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code, or -1 if the process was terminated by a signal
    pub exit_code: i32,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl ExecOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Runs external commands on behalf of a backend.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args` and capture its output.
    ///
    /// A non-zero exit is not an error at this level; only failures to
    /// spawn or wait for the process are.
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        opts: &ExecOptions,
    ) -> std::io::Result<ExecOutput>;
}

/// Executor backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioExecutor;

#[async_trait]
impl CommandExecutor for TokioExecutor {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        opts: &ExecOptions,
    ) -> std::io::Result<ExecOutput> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &opts.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &opts.env {
            cmd.env(key, value);
        }

        let output = match opts.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| {
                    std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("{program} timed out after {limit:?}"),
                    )
                })??,
            None => cmd.output().await?,
        };

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

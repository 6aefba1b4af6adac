//! cli
//!
//! Command-line interface for the record stores.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging
//! - Load configuration and build the selected backend
//! - Delegate to command handlers
//!
//! The CLI is thin: every read and write goes through
//! [`RecordStore`](crate::store::RecordStore) or
//! [`GitOperations`](crate::git::GitOperations).

pub mod args;
pub mod commands;

pub use args::{Backend, Cli, Command};

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.log_level());

    let loaded = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let ctx = commands::Context {
        config: loaded.config,
        backend: cli.backend,
        dir: cli.dir.clone(),
        quiet: cli.quiet,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(commands::dispatch(cli.command, &ctx))
}

/// Install the stderr log subscriber.
///
/// `--debug`/`--quiet` take precedence over `RUST_LOG`; with neither, the
/// default is `warn`.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

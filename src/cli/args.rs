//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--config <path>`: Use this config file instead of searching
//! - `--backend fs|github`: Where records live (default `fs`)
//! - `--dir <path>`: Record directory, overriding `store.base_path`
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Errors only

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// grec - read and write JSON records kept in Git
#[derive(Parser, Debug)]
#[command(name = "grec")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Record backend
    #[arg(long, global = true, value_enum, default_value_t = Backend::Fs)]
    pub backend: Backend,

    /// Record directory (overrides store.base_path)
    #[arg(long, global = true, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Log filter implied by the verbosity flags, if any.
    pub fn log_level(&self) -> Option<&'static str> {
        if self.debug {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }
}

/// Where records are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// JSON files in a local directory
    Fs,
    /// JSON files in a GitHub repository
    Github,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a record as JSON
    Get {
        /// Record ID
        id: String,
    },

    /// Create or replace a record
    #[command(after_help = "\
EXAMPLES:
    grec put task:1 '{\"title\": \"write docs\"}'
    echo '{\"title\": \"x\"}' | grec put task:2")]
    Put {
        /// Record ID
        id: String,

        /// JSON value; read from stdin when omitted
        value: Option<String>,

        /// Commit message (github backend)
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Remove a record (succeeds if it does not exist)
    Delete {
        /// Record ID
        id: String,

        /// Commit message (github backend)
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List record IDs
    List,

    /// Print whether a record exists
    Exists {
        /// Record ID
        id: String,
    },

    /// Show commit history of the record store
    Log {
        /// Only commits touching this record
        id: Option<String>,

        /// Maximum number of commits
        #[arg(short = 'n', long, default_value_t = 20)]
        max_count: usize,
    },
}

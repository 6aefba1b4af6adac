//! config
//!
//! Configuration loading.
//!
//! # Locations
//!
//! An explicit path (the CLI's `--config`) must exist. Otherwise the first
//! existing file wins:
//! 1. `$GITRECORDS_CONFIG`
//! 2. `<config dir>/gitrecords/config.toml` (`$XDG_CONFIG_HOME` on Linux)
//! 3. `~/.gitrecords/config.toml`
//!
//! No file at all means defaults.
//!
//! # Secrets
//!
//! The GitHub token never lives in the file. `[github] token_env` names the
//! environment variable to read it from (`GITHUB_TOKEN` by default).
//!
//! # Example
//!
//! ```no_run
//! use gitrecords::config::Config;
//!
//! let loaded = Config::load(None).unwrap();
//! println!("records in {}", loaded.config.base_path().display());
//! ```

pub mod schema;

pub use schema::{ConfigFile, GitHubSection, StoreSection};

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::forge::DEFAULT_API_BASE;
use crate::git::DEFAULT_BRANCH;
use crate::store::DEFAULT_EXTENSION;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV: &str = "GITRECORDS_CONFIG";

/// Default environment variable holding the GitHub token.
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Default record directory.
pub const DEFAULT_BASE_PATH: &str = "records";

/// Default GitHub request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {message}", .path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("missing config value: {0}")]
    Missing(&'static str),
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// File it came from, if any.
    pub path: Option<PathBuf>,
}

/// Loaded configuration with defaults applied by accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Raw file contents
    pub file: ConfigFile,
}

impl Config {
    /// Load configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` is given and unreadable, or if the
    /// file found cannot be parsed or fails validation. A missing file in
    /// the search locations is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::search_paths().into_iter().find(|p| p.exists()),
        };

        let config = match &path {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                Self::read(path)?
            }
            None => Config::default(),
        };
        Ok(ConfigLoadResult { config, path })
    }

    /// Locations searched when no explicit path is given, in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("gitrecords/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".gitrecords/config.toml"));
        }
        paths
    }

    /// Read, parse and validate one file.
    pub fn read(path: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file = Self::parse(&contents).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(Config { file })
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> Result<ConfigFile, ConfigError> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(file)
    }

    // =========================================================================
    // Store
    // =========================================================================

    /// Record directory (default `records`).
    pub fn base_path(&self) -> PathBuf {
        self.file
            .store
            .base_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PATH))
    }

    /// Record file extension (default `json`).
    pub fn extension(&self) -> &str {
        self.file
            .store
            .extension
            .as_deref()
            .map(|e| e.trim_start_matches('.'))
            .unwrap_or(DEFAULT_EXTENSION)
    }

    /// Whether to create the record directory on write (default true).
    pub fn create_dirs(&self) -> bool {
        self.file.store.create_dirs.unwrap_or(true)
    }

    /// Whether to encode IDs in file names (default false).
    pub fn encode_ids(&self) -> bool {
        self.file.store.encode_ids.unwrap_or(false)
    }

    // =========================================================================
    // GitHub
    // =========================================================================

    fn github(&self) -> Option<&GitHubSection> {
        self.file.github.as_ref()
    }

    /// Repository owner.
    pub fn github_owner(&self) -> Result<&str, ConfigError> {
        self.github()
            .and_then(|g| g.owner.as_deref())
            .ok_or(ConfigError::Missing("github.owner"))
    }

    /// Repository name.
    pub fn github_repo(&self) -> Result<&str, ConfigError> {
        self.github()
            .and_then(|g| g.repo.as_deref())
            .ok_or(ConfigError::Missing("github.repo"))
    }

    /// Branch (default `main`).
    pub fn github_branch(&self) -> &str {
        self.github()
            .and_then(|g| g.branch.as_deref())
            .unwrap_or(DEFAULT_BRANCH)
    }

    /// API base URL (default github.com).
    pub fn github_api_base(&self) -> &str {
        self.github()
            .and_then(|g| g.api_base.as_deref())
            .unwrap_or(DEFAULT_API_BASE)
    }

    /// Name of the token environment variable (default `GITHUB_TOKEN`).
    pub fn github_token_env(&self) -> &str {
        self.github()
            .and_then(|g| g.token_env.as_deref())
            .unwrap_or(DEFAULT_TOKEN_ENV)
    }

    /// Request timeout (default 30 seconds).
    pub fn github_timeout(&self) -> Duration {
        self.github()
            .and_then(|g| g.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Read the token from the configured environment variable.
    pub fn github_token(&self) -> Result<String, ConfigError> {
        std::env::var(self.github_token_env())
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("GitHub token environment variable"))
    }
}

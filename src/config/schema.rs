//! config::schema
//!
//! Configuration file types.
//!
//! # Example
//!
//! ```toml
//! [store]
//! base_path = "records"
//! extension = "json"
//! create_dirs = true
//! encode_ids = true
//!
//! [github]
//! owner = "octocat"
//! repo = "records"
//! branch = "main"
//! token_env = "GITHUB_TOKEN"
//! timeout_secs = 30
//! ```
//!
//! Every field is optional; accessors on [`Config`](super::Config) apply
//! the defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Record store settings
    pub store: StoreSection,

    /// GitHub backend settings
    pub github: Option<GitHubSection>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        if let Some(github) = &self.github {
            github.validate()?;
        }
        Ok(())
    }
}

/// `[store]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Directory holding records; also the directory inside a GitHub repo
    pub base_path: Option<PathBuf>,

    /// Record file extension, without the dot
    pub extension: Option<String>,

    /// Create the base directory on first write
    pub create_dirs: Option<bool>,

    /// Encode `:` in IDs as `_` in file names
    pub encode_ids: Option<bool>,
}

impl StoreSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ext) = &self.extension {
            if ext.trim_start_matches('.').is_empty() || ext.contains('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid store.extension '{ext}'"
                )));
            }
        }
        Ok(())
    }
}

/// `[github]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSection {
    /// Repository owner
    pub owner: Option<String>,

    /// Repository name
    pub repo: Option<String>,

    /// Branch records are read from and written to
    pub branch: Option<String>,

    /// API base URL (GitHub Enterprise or a test server)
    pub api_base: Option<String>,

    /// Name of the environment variable holding the token
    pub token_env: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl GitHubSection {
    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("branch", &self.branch),
            ("token_env", &self.token_env),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!(
                    "github.{key} must not be empty"
                )));
            }
        }

        if let Some(base) = &self.api_base {
            reqwest::Url::parse(base).map_err(|e| {
                ConfigError::InvalidValue(format!("github.api_base '{base}': {e}"))
            })?;
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "github.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

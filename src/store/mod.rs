//! store
//!
//! Record persistence: serializable values keyed by ID.
//!
//! # Architecture
//!
//! [`RecordStore`] is the contract; each backend stands alone:
//!
//! - [`FsStore`]: one JSON file per record under a base directory
//! - [`MemoryStore`]: a map, for tests
//! - [`GitHubStore`]: one file per record in a GitHub repository, with
//!   hash preconditions on writes and single-commit batches through
//!   [`GitHubGit`](crate::git::GitHubGit)
//!
//! [`GitHubConfigStore`] applies the GitHub pattern to one fixed document.
//!
//! # Invariants
//!
//! - IDs are validated before any I/O ([`validate_id`])
//! - `list` returns decoded IDs, never storage names
//! - Missing records read as `None`; deleting one succeeds

mod config;
mod error;
mod fs;
mod github;
mod id;
mod memory;
mod traits;

pub use config::{GitHubConfigStore, DEFAULT_CONFIG_PATH};
pub use error::StoreError;
pub use fs::{FsStore, DEFAULT_EXTENSION};
pub use github::{GitHubStore, GitHubWriteOptions, GitHubWriteResult};
pub use id::{storage_name, validate_id, ColonEncoder, IdEncoder};
pub use memory::MemoryStore;
pub use traits::RecordStore;

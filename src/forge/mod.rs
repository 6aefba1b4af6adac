//! forge
//!
//! Access to the hosted Git provider (GitHub) over its REST API.
//!
//! # Architecture
//!
//! This module is the only place that speaks HTTP. The remote Git backend
//! ([`crate::git::GitHubGit`]) and the remote record stores
//! ([`crate::store::GitHubStore`], [`crate::store::GitHubConfigStore`]) are
//! built on [`GitHubClient`] and never construct requests themselves beyond
//! choosing an endpoint and a body.
//!
//! # Modules
//!
//! - `client`: [`GitHubClient`], request building and error mapping
//! - `error`: [`RemoteError`], the transport error taxonomy
//! - `wire`: request/response bodies (crate-private)

mod client;
mod error;
pub(crate) mod wire;

pub use client::{parse_github_url, GitHubClient, RemoteFile, DEFAULT_API_BASE};
pub use error::RemoteError;

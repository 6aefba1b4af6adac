//! gitrecords - version-controlled record storage
//!
//! Structured documents are stored as files in a Git history. The same
//! operations (read, write, list, delete, atomic multi-record commit) work
//! against a local working copy, an in-memory fake, or a GitHub repository
//! reachable only through its REST API.
//!
//! # Architecture
//!
//! - [`git`] - One Git interface with local, in-memory and GitHub backends
//! - [`store`] - Record stores built on the filesystem, memory or GitHub
//! - [`forge`] - GitHub REST client and transport errors
//! - [`config`] - TOML configuration
//! - [`cli`] - The `grec` command-line interface
//!
//! # Correctness Invariants
//!
//! 1. Callers never learn which backend they are using
//! 2. Record IDs are validated before any I/O
//! 3. Remote writes are compare-and-swap; a lost race is an error, never
//!    a silent overwrite
//! 4. A multi-record write to GitHub lands as one commit or not at all

pub mod cli;
pub mod config;
pub mod forge;
pub mod git;
pub mod store;

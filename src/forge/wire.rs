//! forge::wire
//!
//! Request and response bodies for the subset of the GitHub REST API we use:
//! git data (refs, commits, trees, blobs), branches, commits listing, compare,
//! and the contents API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RemoteError;

/// File mode for regular (non-executable) blobs.
pub(crate) const FILE_MODE: &str = "100644";

// =============================================================================
// Git data API
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GitRef {
    pub object: GitObject,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitObject {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRefBody<'a> {
    pub sha: &'a str,
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitCommit {
    pub message: String,
    pub tree: ShaRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShaRef {
    pub sha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Signature {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateCommitBody<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Signature>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateBlobBody<'a> {
    pub content: &'a str,
    pub encoding: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Blob {
    pub content: String,
    pub encoding: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateTreeBody<'a> {
    pub base_tree: &'a str,
    pub tree: Vec<TreeEntry>,
}

/// One entry of a tree-create call. `sha: None` serializes as `null`,
/// which deletes the path from the base tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct TreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: Option<String>,
}

// =============================================================================
// Branches, commits listing, compare
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct Branch {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitListItem {
    pub sha: String,
    pub commit: CommitDetail,
    #[serde(default)]
    pub parents: Vec<ShaRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitDetail {
    pub message: String,
    pub author: Signature,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Comparison {
    #[serde(default)]
    pub commits: Vec<CommitListItem>,
    #[serde(default)]
    pub files: Vec<ComparedFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComparedFile {
    pub filename: String,
    pub status: String,
    pub previous_filename: Option<String>,
}

// =============================================================================
// Contents API
// =============================================================================

/// Response of `GET contents/{path}`: a single file or a directory listing.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Contents {
    Directory(Vec<ContentEntry>),
    File(ContentEntry),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub sha: String,
    pub content: Option<String>,
    pub encoding: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PutContentBody<'a> {
    pub message: &'a str,
    pub content: String,
    pub branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteContentBody<'a> {
    pub message: &'a str,
    pub sha: &'a str,
    pub branch: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentWriteResponse {
    pub content: Option<ShaRef>,
    pub commit: ShaRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Encode UTF-8 text for the contents API.
pub(crate) fn encode_content(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode base64 content as returned by GitHub (wrapped at 60 columns).
pub(crate) fn decode_content(encoded: &str) -> Result<String, RemoteError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::InvalidResponse(format!("content is not valid base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| RemoteError::InvalidResponse("content is not valid UTF-8".into()))
}

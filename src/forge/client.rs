//! forge::client
//!
//! Typed HTTP client for the GitHub REST API.
//!
//! # Design
//!
//! [`GitHubClient`] owns the connection coordinates (API base, owner, repo)
//! and the bearer token. It knows nothing about commits or records; the
//! remote Git backend and the remote record stores compose its primitives.
//!
//! All failures are mapped to [`RemoteError`] here:
//! - transport failures before a response become [`RemoteError::Network`]
//! - unsuccessful statuses go through [`RemoteError::from_status`]
//! - bodies that do not deserialize become [`RemoteError::InvalidResponse`]
//!
//! No request is ever retried. Retry policy belongs to the caller.
//!
//! # Example
//!
//! ```ignore
//! use gitrecords::forge::GitHubClient;
//!
//! let client = GitHubClient::new(token, "octocat", "records");
//! if let Some(file) = client.read_file("records/a.json", "main").await? {
//!     println!("{} @ {}", file.content, file.sha);
//! }
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::RemoteError;
use super::wire::{decode_content, Blob, Contents, ErrorBody};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "gitrecords";

/// REST API version pinned in every request.
const API_VERSION: &str = "2022-11-28";

/// A file read through the contents API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Decoded UTF-8 content
    pub content: String,
    /// Blob hash, usable as a write precondition
    pub sha: String,
}

/// GitHub REST client bound to one repository.
#[derive(Clone)]
pub struct GitHubClient {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token
    token: String,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubClient {
    /// Create a client for `owner/repo` on github.com.
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self::with_api_base(token, owner, repo, DEFAULT_API_BASE)
    }

    /// Create a client with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise (`https://github.example.com/api/v3`)
    /// or for pointing at a mock server in tests.
    pub fn with_api_base(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into(),
        }
    }

    /// Create a client from a git remote URL.
    ///
    /// Returns `None` if the URL is not a github.com remote.
    ///
    /// # Example
    ///
    /// ```
    /// use gitrecords::forge::GitHubClient;
    ///
    /// let client = GitHubClient::from_remote_url("git@github.com:owner/repo.git", "token");
    /// assert_eq!(client.unwrap().repo(), "repo");
    /// ```
    pub fn from_remote_url(url: &str, token: impl Into<String>) -> Option<Self> {
        let (owner, repo) = parse_github_url(url)?;
        Some(Self::new(token, owner, repo))
    }

    /// Apply a per-request timeout enforced by the HTTP client.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, RemoteError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Network(format!("cannot build HTTP client: {e}")))?;
        Ok(self)
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|_| {
            RemoteError::PermissionDenied {
                status: 401,
                message: "token contains characters not allowed in a header".into(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    /// Build the URL for a repository endpoint.
    ///
    /// `path` is split on `/` and each segment is percent-encoded, so record
    /// names with spaces or `#` cannot escape their segment.
    pub fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| RemoteError::InvalidId(format!("invalid API base '{}': {e}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidId(format!("API base '{}' cannot hold a path", self.api_base)))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str()])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    /// Start a request against a repository endpoint with auth headers set.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RemoteError> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "github request");
        Ok(self.client.request(method, url).headers(self.headers()?))
    }

    /// Send a request and deserialize a successful JSON body.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Self::handle_response(response).await
    }

    /// Like [`execute`](Self::execute), but a 404 yields `Ok(None)`.
    pub async fn execute_optional<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, RemoteError> {
        match self.execute(request).await {
            Ok(value) => Ok(Some(value)),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read a file through the contents API.
    ///
    /// Returns `Ok(None)` when the path does not exist at `git_ref`. When the
    /// API withholds the content (files over 1 MB), the blob is fetched by
    /// hash instead.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::InvalidResponse`] if the path is a directory or the
    ///   content cannot be decoded
    pub async fn read_file(
        &self,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RemoteFile>, RemoteError> {
        let request = self
            .request(Method::GET, &format!("contents/{path}"))?
            .query(&[("ref", git_ref)]);

        let entry = match self.execute_optional::<Contents>(request).await? {
            None => return Ok(None),
            Some(Contents::Directory(_)) => {
                return Err(RemoteError::InvalidResponse(format!(
                    "{path} is a directory, expected a file"
                )))
            }
            Some(Contents::File(entry)) => entry,
        };

        if entry.kind != "file" {
            return Err(RemoteError::InvalidResponse(format!(
                "{path} is a {}, expected a file",
                entry.kind
            )));
        }

        let content = match (entry.content.as_deref(), entry.encoding.as_deref()) {
            (Some(encoded), Some("base64")) => decode_content(encoded)?,
            _ => {
                debug!(path, sha = %entry.sha, "content withheld, fetching blob");
                self.read_blob(&entry.sha).await?
            }
        };

        Ok(Some(RemoteFile {
            content,
            sha: entry.sha,
        }))
    }

    /// Read a blob by hash.
    pub async fn read_blob(&self, sha: &str) -> Result<String, RemoteError> {
        let request = self.request(Method::GET, &format!("git/blobs/{sha}"))?;
        let blob: Blob = self.execute(request).await?;
        match blob.encoding.as_str() {
            "base64" => decode_content(&blob.content),
            "utf-8" | "utf8" => Ok(blob.content),
            other => Err(RemoteError::InvalidResponse(format!(
                "blob {sha} has unsupported encoding '{other}'"
            ))),
        }
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                RemoteError::InvalidResponse(format!("failed to parse response: {e}"))
            })
        } else {
            Err(Self::handle_error_response(response).await)
        }
    }

    /// Turn an unsuccessful response into a [`RemoteError`].
    async fn handle_error_response(response: Response) -> RemoteError {
        let status = response.status().as_u16();

        // GitHub reports primary rate limits as 403 with no remaining quota.
        let exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");
        if status == 403 && exhausted {
            return RemoteError::RateLimited;
        }

        let required_permissions = response
            .headers()
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut message = match response.json::<ErrorBody>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };
        if let Some(perms) = required_permissions {
            message.push_str(&format!(" [required: {perms}]"));
        }

        RemoteError::from_status(status, message)
    }
}

/// Parse a GitHub remote URL into (owner, repo).
///
/// Supports both SSH and HTTPS formats:
/// - `git@github.com:owner/repo.git`
/// - `https://github.com/owner/repo.git`
/// - `https://github.com/owner/repo`
///
/// # Example
///
/// ```
/// use gitrecords::forge::parse_github_url;
///
/// let (owner, repo) = parse_github_url("git@github.com:octocat/hello-world.git").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// ```
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    let rest = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))?;
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let (owner, repo) = rest.split_once('/')?;

    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }

    Some((owner.to_string(), repo.to_string()))
}

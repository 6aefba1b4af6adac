//! forge::error
//!
//! Transport-level errors from the hosted Git provider.
//!
//! Every HTTP failure is mapped into one of these variants before it leaves
//! the [`forge`](crate::forge) module, so callers never branch on raw status
//! codes.

use thiserror::Error;

/// Errors from remote API operations.
///
/// Status codes map as follows:
///
/// | Status      | Variant                          |
/// |-------------|----------------------------------|
/// | 401, 403    | [`RemoteError::PermissionDenied`] |
/// | 404         | [`RemoteError::NotFound`]        |
/// | 409, 422    | [`RemoteError::Conflict`]        |
/// | 429         | [`RemoteError::RateLimited`]     |
/// | 5xx         | [`RemoteError::Server`]          |
/// | other       | [`RemoteError::Api`]             |
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Authentication failed or the token lacks permission.
    #[error("permission denied ({status}): {message}")]
    PermissionDenied {
        /// HTTP status code (401 or 403)
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write was rejected because the target changed underneath us.
    ///
    /// Raised for stale SHA preconditions on file writes and for
    /// non-fast-forward ref updates.
    #[error("conflict ({status}): {message}")]
    Conflict {
        /// HTTP status code (409 or 422)
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The provider failed to handle the request.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code (5xx)
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// A client-side identifier failed validation before any request was made.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// The provider answered with a shape we cannot interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Any other unsuccessful status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },
}

impl RemoteError {
    /// Map an unsuccessful HTTP status and message into a variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => RemoteError::PermissionDenied { status, message },
            404 => RemoteError::NotFound(message),
            409 | 422 => RemoteError::Conflict { status, message },
            429 => RemoteError::RateLimited,
            500..=599 => RemoteError::Server { status, message },
            _ => RemoteError::Api { status, message },
        }
    }

    /// Whether this error signals a lost compare-and-swap race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict { .. })
    }

    /// Whether this error is a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

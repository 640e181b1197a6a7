//! Error taxonomy for asset resolution, caching and push.
//!
//! # Design Decisions
//! - "No such asset" is not an error: lookups return `Ok(None)` and the
//!   request falls through to the downstream 404
//! - Every variant maps to exactly one HTTP status
//! - Failures are never cached; the next request retries from scratch

use std::io;
use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ServeError>;

/// Errors surfaced while serving or pushing a static asset.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Unexpected file system failure (permissions, EIO, ...).
    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Request path is syntactically unacceptable (absolute, NUL byte, bad escape).
    #[error("malicious path: {0}")]
    MaliciousPath(String),

    /// Request path escapes the configured root.
    #[error("path escapes root: {0}")]
    Forbidden(String),

    /// A configured push file does not resolve to a regular file.
    #[error("can not push file: {0}")]
    PushTargetMissing(String),

    /// The push transport rejected a promise.
    #[error(transparent)]
    Push(#[from] PushError),

    /// A derived header value is not valid HTTP.
    #[error("invalid {name} header value: {value:?}")]
    InvalidHeader { name: String, value: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ServeError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        ServeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::MaliciousPath(_) => StatusCode::BAD_REQUEST,
            ServeError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServeError::Push(err) => err.status,
            ServeError::Io { .. }
            | ServeError::PushTargetMissing(_)
            | ServeError::InvalidHeader { .. }
            | ServeError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Static asset request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Rejected static asset path");
        }
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}

/// Failure reported by a [`PushTransport`](crate::push::PushTransport).
#[derive(Debug, Error)]
#[error("push of {path} failed: {message}")]
pub struct PushError {
    /// Request path of the promise that failed.
    pub path: String,
    /// Status applied to the current exchange.
    pub status: StatusCode,
    pub message: String,
}

impl PushError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

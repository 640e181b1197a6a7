//! Push / preload header derivation for requests to `/`.
//!
//! # Data Flow
//! ```text
//! files + manifest.rs entries → Vec<PushTarget>
//!     → link.rs:    Link: </a.js>; rel=preload; as=script, ...
//!     → promise.rs: cache entry → PushPromise → PushTransport
//! ```
//!
//! # Design Decisions
//! - Promise headers come from the same `CacheEntry` helpers as the main
//!   response, so both paths carry identical validators and lengths
//! - Push mirrors whichever artifact exists; there is no client to
//!   negotiate with
//! - Stream framing belongs to the transport; this crate only describes
//!   what to push

use std::path::PathBuf;

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::error::PushError;

pub mod link;
pub mod manifest;
pub mod promise;

pub use link::{link_header, resource_type};
pub use manifest::load_manifest;
pub use promise::derive_promise;

/// A file advertised on root requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    /// Root-relative path, no leading `/`.
    pub file: String,
    /// Explicit request destination overriding the extension table.
    pub kind: Option<String>,
}

impl PushTarget {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            kind: None,
        }
    }
}

/// A server push ready to be written by the transport.
#[derive(Debug, Clone)]
pub struct PushPromise {
    /// Request path of the promised resource (`/` + file).
    pub path: String,
    /// File whose bytes make up the pushed body.
    pub filename: PathBuf,
    pub headers: HeaderMap,
    pub priority: Option<u8>,
}

/// Sink for push promises, typically an HTTP/2 connection handle.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn push(&self, promise: PushPromise) -> Result<(), PushError>;
}

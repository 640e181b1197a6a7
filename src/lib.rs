//! Static asset delivery cache for Axum.
//!
//! Serves files from a root directory as a middleware fallback: when the
//! downstream stack answers with an empty 404, the request is resolved
//! against the root and answered from a lazily built cache of ETags, content
//! types and gzip artifacts. Requests for `/` can additionally advertise
//! configured files through HTTP/2 push and preload `Link` headers.

pub mod cache;
pub mod compress;
pub mod config;
pub mod error;
pub mod etag;
pub mod http;
pub mod lifecycle;
pub mod mime;
pub mod negotiate;
pub mod observability;
pub mod push;
pub mod resolve;
pub mod send;

pub use config::ServeConfig;
pub use error::{PushError, ServeError};
pub use http::middleware::{static_files_middleware, StaticFiles};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use push::{PushPromise, PushTransport};

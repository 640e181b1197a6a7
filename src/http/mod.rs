//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace and timeout layers)
//!     → middleware/static_files.rs (push, Link, downstream, asset fallback)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;

pub use middleware::StaticFiles;
pub use server::HttpServer;

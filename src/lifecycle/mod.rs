//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Ctrl+C → trigger → every subscriber (HTTP server) drains and exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;

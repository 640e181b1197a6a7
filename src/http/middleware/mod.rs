//! Middleware layers.

pub mod static_files;

pub use static_files::{static_files_middleware, StaticFiles};

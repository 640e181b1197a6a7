//! Asset cache subsystem.
//!
//! # Data Flow
//! ```text
//! resolved path
//!     → store.rs lookup (entry present and artifact still on disk?)
//!         hit  → Arc<CacheEntry>
//!         miss → per-path gate → stat → etag → content type
//!                → compress (compressible types only) → insert
//!     → entry.rs derives headers and the representation to send
//! ```
//!
//! # Design Decisions
//! - Never caches misses, directories or failures
//! - A vanished `.gz` invalidates the whole entry, which is rebuilt and
//!   replaced rather than patched
//! - Concurrent first requests for one path populate once

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, Encoding, FileStats, Representation};
pub use store::AssetCache;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! cache / compress / middleware
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metrics are recorded unconditionally; without an installed recorder
//!   the macros are no-ops
//! - Log filtering follows `RUST_LOG` first, then the configured level

pub mod logging;
pub mod metrics;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServeConfig (validated, immutable)
//!     → StaticFiles built from it, shared via Arc
//!
//! On reload:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new StaticFiles (fresh asset cache) swapped in atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_config_with, parse_config, ConfigError};
pub use schema::{
    EtagAlgorithm, EtagConfig, EtagEncoding, ListenerConfig, ObservabilityConfig, PushOptions,
    ServeConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};

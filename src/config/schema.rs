//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the static
//! asset server. All types derive Serde traits for deserialization from
//! config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for static asset delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Base directory assets are served from (default: working directory).
    pub root: Option<PathBuf>,

    /// Max age in milliseconds; `<= 0` disables `Cache-Control`.
    pub maxage: i64,

    /// ETag derivation settings.
    pub etag: EtagConfig,

    /// Serve `index.html` for directory-style paths.
    pub index: bool,

    /// Serve dotfiles.
    pub hidden: bool,

    /// Attempt HTTP/2 push of `files` on requests for `/`.
    pub push: bool,

    /// Emit a preload `Link` header for `files` on requests for `/`.
    pub link: bool,

    /// Relative paths used by both push and link preload, in order.
    pub files: Vec<String>,

    /// Optional push manifest whose entries are appended to `files`.
    pub manifest: Option<PathBuf>,

    /// Options forwarded with every push promise.
    pub push_options: PushOptions,

    /// Gzip level used for `.gz` artifacts (0-9).
    pub gzip_level: u32,

    /// Listener configuration for the standalone server.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            root: None,
            maxage: 0,
            etag: EtagConfig::default(),
            index: false,
            hidden: false,
            push: false,
            link: false,
            files: Vec::new(),
            manifest: None,
            push_options: PushOptions::default(),
            gzip_level: 6,
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServeConfig {
    /// Configured root, falling back to the process working directory.
    pub fn root_dir(&self) -> std::io::Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir(),
        }
    }

    /// `Cache-Control` value, present only for a positive max age.
    pub fn cache_control(&self) -> Option<String> {
        if self.maxage > 0 {
            Some(format!("public, max-age={}", self.maxage / 1000))
        } else {
            None
        }
    }
}

/// Hash algorithm used for ETags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EtagAlgorithm {
    Sha1,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

/// Text encoding of the ETag digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EtagEncoding {
    #[default]
    Base64,
    Base64url,
    Hex,
}

/// ETag configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EtagConfig {
    pub algorithm: EtagAlgorithm,
    pub encoding: EtagEncoding,
}

/// Options attached to each push promise.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PushOptions {
    /// Stream priority weight hint for the transport.
    pub priority: Option<u8>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Cached per-file metadata and header derivation.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use axum::http::header::{
    CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED, VARY,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::compress::CompressedArtifact;
use crate::error::{Result, ServeError};

/// Stat results captured when the entry was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    pub size: u64,
    pub modified: SystemTime,
    pub is_file: bool,
}

/// Everything derived from one resolved file.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Resolved absolute path of the source file.
    pub path: PathBuf,
    pub stats: FileStats,
    /// Quoted content hash.
    pub etag: String,
    pub content_type: String,
    /// Present only when gzip made the file strictly smaller.
    pub compressed: Option<CompressedArtifact>,
}

/// Content coding of a selected representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Identity,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Identity => "identity",
        }
    }
}

/// The bytes a response (or push) will carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Representation<'a> {
    pub encoding: Encoding,
    pub length: u64,
    pub file: &'a Path,
}

impl CacheEntry {
    /// `Last-Modified` value in IMF-fixdate form.
    pub fn last_modified(&self) -> String {
        httpdate::fmt_http_date(self.stats.modified)
    }

    /// Pick the gzip artifact when one exists and gzip is wanted, else the source.
    pub fn representation(&self, want_gzip: bool) -> Representation<'_> {
        match &self.compressed {
            Some(artifact) if want_gzip => Representation {
                encoding: Encoding::Gzip,
                length: artifact.size,
                file: &artifact.path,
            },
            _ => Representation {
                encoding: Encoding::Identity,
                length: self.stats.size,
                file: &self.path,
            },
        }
    }

    /// Validator and caching headers shared by responses and push promises.
    pub fn entity_headers(&self, cache_control: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        insert(&mut headers, CONTENT_TYPE, &self.content_type)?;
        insert(&mut headers, ETAG, &self.etag)?;
        insert(&mut headers, LAST_MODIFIED, &self.last_modified())?;
        if let Some(value) = cache_control {
            insert(&mut headers, CACHE_CONTROL, value)?;
        }
        headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
        Ok(headers)
    }
}

impl Representation<'_> {
    /// Add `Content-Encoding` and `Content-Length` for this representation.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(self.encoding.as_str()));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.length));
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    let parsed = HeaderValue::from_str(value).map_err(|_| ServeError::InvalidHeader {
        name: name.as_str().to_string(),
        value: value.to_string(),
    })?;
    headers.insert(name, parsed);
    Ok(())
}

//! http2-push-manifest files.
//!
//! ```json
//! { "/css/app.css": { "type": "style", "weight": 1 } }
//! ```
//!
//! Entries are returned in key order. `weight` is accepted and ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, ServeError};
use crate::push::PushTarget;

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Read a manifest into push targets (leading `/` stripped).
pub fn load_manifest(path: &Path) -> Result<Vec<PushTarget>> {
    let content = fs::read_to_string(path).map_err(|e| ServeError::io(path, e))?;
    parse_manifest(&content)
        .map_err(|e| ServeError::Config(format!("push manifest {}: {}", path.display(), e)))
}

fn parse_manifest(content: &str) -> std::result::Result<Vec<PushTarget>, String> {
    let entries: BTreeMap<String, ManifestEntry> =
        serde_json::from_str(content).map_err(|e| e.to_string())?;

    entries
        .into_iter()
        .map(|(key, entry)| {
            let file = key.strip_prefix('/').unwrap_or(&key);
            if file.is_empty() {
                return Err(format!("entry {:?} does not name a file", key));
            }
            if file.starts_with('/') {
                return Err(format!("entry {:?} is not a site-relative path", key));
            }
            Ok(PushTarget {
                file: file.to_string(),
                kind: entry.kind,
            })
        })
        .collect()
}

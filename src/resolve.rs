//! Root-bound path resolution.
//!
//! # Responsibilities
//! - Apply index-file substitution for directory-style paths
//! - Percent-decode the request path
//! - Resolve a relative path against the root without ever escaping it
//!
//! # Design Decisions
//! - Purely lexical: no file system access, so rejection happens before
//!   any cache lookup
//! - Absolute paths and NUL bytes are malformed (400); climbing above the
//!   root is forbidden (403)
//! - `a/../b` is fine as long as it stays inside the root

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, ServeError};

const INDEX_FILE: &str = "index.html";

/// Turn a request path into a root-relative target.
///
/// Directory-style paths (empty or ending in `/`) get `index.html` appended
/// when `index` is enabled; then one leading `/` is dropped.
pub fn request_target(path: &str, index: bool) -> String {
    let mut target = path.to_string();
    if index && (target.is_empty() || target.ends_with('/')) {
        target.push_str(INDEX_FILE);
    }
    if target.starts_with('/') {
        target.remove(0);
    }
    target
}

/// Percent-decode a raw URI path.
pub fn decode_path(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ServeError::MaliciousPath(raw.to_string()))
}

/// Resolve `relative` against `root`, refusing anything outside it.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    if relative.contains('\0') {
        return Err(ServeError::MaliciousPath(relative.escape_default().to_string()));
    }

    let candidate = Path::new(relative);
    if candidate.is_absolute() {
        return Err(ServeError::MaliciousPath(relative.to_string()));
    }

    let mut normalized = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(ServeError::Forbidden(relative.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ServeError::MaliciousPath(relative.to_string()));
            }
        }
    }

    let mut resolved = root.join(normalized).into_os_string();
    // A trailing `/` only stats successfully for directories.
    if relative.ends_with('/') {
        resolved.push("/");
    }
    Ok(PathBuf::from(resolved))
}

/// Whether the final path segment is a dotfile.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

//! Content type lookup and the compressible-type policy.

use std::path::Path;

use mime_guess::mime;

/// Fallback for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Types outside `text/*` and the `+json`/`+xml`/`+text` suffixes that
/// still benefit from gzip.
const COMPRESSIBLE: &[&str] = &[
    "application/ecmascript",
    "application/javascript",
    "application/json",
    "application/wasm",
    "application/x-javascript",
    "application/x-sh",
    "application/xml",
    "application/vnd.ms-fontobject",
    "font/otf",
    "font/ttf",
    "image/bmp",
    "image/vnd.microsoft.icon",
    "image/x-icon",
];

/// Content type for a file, with a UTF-8 charset on textual types.
pub fn content_type(path: &Path) -> String {
    match mime_guess::from_path(path).first() {
        Some(guess) if needs_charset(&guess) => format!("{}; charset=utf-8", guess.essence_str()),
        Some(guess) => guess.essence_str().to_string(),
        None => OCTET_STREAM.to_string(),
    }
}

fn needs_charset(guess: &mime::Mime) -> bool {
    guess.type_() == mime::TEXT
        || matches!(guess.essence_str(), "application/javascript" | "application/json")
}

/// Whether a content type should get a `.gz` artifact.
pub fn is_compressible(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence.starts_with("text/")
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
        || essence.ends_with("+text")
        || COMPRESSIBLE.contains(&essence.as_str())
}

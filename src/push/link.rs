//! Preload `Link` header.

use std::path::Path;

use crate::push::PushTarget;

/// Request destination for a file extension.
pub fn resource_type(file: &str) -> Option<&'static str> {
    let ext = Path::new(file).extension()?.to_str()?;
    let kind = match ext {
        "css" => "style",
        "gif" | "png" | "jpg" | "svg" | "webp" => "image",
        "html" => "document",
        "js" | "json" => "script",
        "woff" | "woff2" => "font",
        _ => return None,
    };
    Some(kind)
}

/// One `Link` entry per target, comma-joined. `None` when there are no targets.
pub fn link_header(targets: &[PushTarget]) -> Option<String> {
    if targets.is_empty() {
        return None;
    }

    let entries: Vec<String> = targets
        .iter()
        .map(|target| {
            let kind = target.kind.as_deref().or_else(|| resource_type(&target.file));
            match kind {
                Some(kind) => format!("</{}>; rel=preload; as={}", target.file, kind),
                None => format!("</{}>; rel=preload", target.file),
            }
        })
        .collect();
    Some(entries.join(", "))
}

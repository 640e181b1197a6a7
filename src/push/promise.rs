//! Push promise derivation.

use crate::error::{Result, ServeError};
use crate::push::PushPromise;
use crate::send::Sender;

/// Build the promise for one configured file.
///
/// # Panics
/// If `file` is empty or starts with `/`. Configuration validation rejects
/// such entries before a `Sender` is built.
pub async fn derive_promise(sender: &Sender, file: &str, priority: Option<u8>) -> Result<PushPromise> {
    assert!(!file.is_empty(), "push path must not be empty");
    assert!(!file.starts_with('/'), "only relative paths can be pushed: {}", file);

    let path = sender.locate(file)?;
    let entry = sender
        .cache()
        .get(&path)
        .await?
        .ok_or_else(|| ServeError::PushTargetMissing(file.to_string()))?;

    let mut headers = entry.entity_headers(sender.cache_control())?;
    let representation = entry.representation(true);
    representation.apply(&mut headers);

    Ok(PushPromise {
        path: format!("/{}", file),
        filename: representation.file.to_path_buf(),
        headers,
        priority,
    })
}

//! Gzip artifact pipeline.
//!
//! # Responsibilities
//! - Produce the `<file>.gz` sibling of a compressible source
//! - Discard artifacts that do not shrink the source
//!
//! # Data Flow
//! ```text
//! unlink <file>.gz (best effort)
//!     → gzip stream into <file>.<suffix>.gz
//!     → stat temporary artifact
//!     → not smaller? unlink temp, Skipped
//!     → rename temp → <file>.gz, Compressed
//! ```
//!
//! # Design Decisions
//! - Readers never observe a partial artifact: bytes only reach the
//!   canonical name through rename
//! - Concurrent producers each write their own temporary; last rename wins
//! - Failure to unlink a stale artifact is ignored

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::fs;

use crate::error::{Result, ServeError};
use crate::observability::metrics;

const SUFFIX_LEN: usize = 12;

/// A gzip artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedArtifact {
    pub path: PathBuf,
    pub size: u64,
}

/// Result of running the pipeline on one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressOutcome {
    Compressed(CompressedArtifact),
    /// Gzip did not make the file smaller; no artifact was kept.
    Skipped { compressed_size: u64 },
}

/// Canonical artifact location for `source`.
pub fn artifact_path(source: &Path) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push(".gz");
    PathBuf::from(name)
}

fn temp_path(source: &Path) -> PathBuf {
    let suffix: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(SUFFIX_LEN)
        .collect();
    let mut name = OsString::from(source.as_os_str());
    name.push(format!(".{}.gz", suffix));
    PathBuf::from(name)
}

/// Build (or rebuild) the gzip artifact for `source`.
pub async fn compress_file(source: &Path, original_size: u64, level: u32) -> Result<CompressOutcome> {
    let target = artifact_path(source);

    if let Err(e) = fs::remove_file(&target).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::debug!(path = %target.display(), error = %e, "Ignoring failure to remove stale artifact");
        }
    }

    let temp = temp_path(source);
    if let Err(e) = gzip_into(source, &temp, level).await {
        discard(&temp).await;
        return Err(ServeError::io(source, e));
    }

    let compressed_size = match fs::metadata(&temp).await {
        Ok(meta) => meta.len(),
        Err(e) => {
            discard(&temp).await;
            return Err(ServeError::io(&temp, e));
        }
    };

    if compressed_size >= original_size {
        fs::remove_file(&temp)
            .await
            .map_err(|e| ServeError::io(&temp, e))?;
        tracing::debug!(
            path = %source.display(),
            original_size,
            compressed_size,
            "Gzip does not shrink file, serving identity"
        );
        metrics::record_compression("skipped");
        return Ok(CompressOutcome::Skipped { compressed_size });
    }

    if let Err(e) = fs::rename(&temp, &target).await {
        discard(&temp).await;
        return Err(ServeError::io(&target, e));
    }

    tracing::debug!(
        path = %target.display(),
        original_size,
        compressed_size,
        "Gzip artifact written"
    );
    metrics::record_compression("compressed");
    Ok(CompressOutcome::Compressed(CompressedArtifact {
        path: target,
        size: compressed_size,
    }))
}

async fn gzip_into(source: &Path, temp: &Path, level: u32) -> io::Result<()> {
    let source = source.to_path_buf();
    let temp = temp.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut input = std::fs::File::open(&source)?;
        let output = OpenOptions::new().write(true).create_new(true).open(&temp)?;
        let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::new(level));
        io::copy(&mut input, &mut encoder)?;
        let mut writer = encoder.finish()?;
        writer.flush()
    })
    .await
    .map_err(io::Error::other)?
}

async fn discard(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %temp.display(), error = %e, "Failed to remove temporary artifact");
        }
    }
}

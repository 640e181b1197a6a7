//! The asset cache: resolved path → derived metadata.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::fs;
use tokio::sync::Mutex;

use crate::cache::entry::{CacheEntry, FileStats};
use crate::compress::{compress_file, CompressOutcome};
use crate::config::EtagConfig;
use crate::error::{Result, ServeError};
use crate::etag::compute_etag;
use crate::mime::{content_type, is_compressible};
use crate::observability::metrics;

/// Lazily populated, self-healing cache of static asset metadata.
///
/// Keys are resolved absolute paths, so every request path that resolves to
/// the same file shares one entry. Only regular files are ever stored; misses
/// and failures are not cached.
///
/// The map is unbounded: it grows with the number of distinct files served
/// and is only cleared by dropping the cache (process restart or config
/// reload). Serve trees of bounded size.
pub struct AssetCache {
    entries: DashMap<PathBuf, Arc<CacheEntry>>,
    /// Per-path gates coalescing concurrent population.
    inflight: DashMap<PathBuf, Arc<Mutex<()>>>,
    etag: EtagConfig,
    gzip_level: u32,
}

impl AssetCache {
    pub fn new(etag: EtagConfig, gzip_level: u32) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            etag,
            gzip_level,
        }
    }

    /// Look up `path`, building its entry on a miss.
    ///
    /// Returns `Ok(None)` when the path does not exist or is not a regular
    /// file. Unexpected I/O failures are errors.
    pub async fn get(&self, path: &Path) -> Result<Option<Arc<CacheEntry>>> {
        if let Some(entry) = self.lookup(path).await {
            metrics::record_cache_lookup("hit");
            return Ok(Some(entry));
        }

        let gate = self
            .inflight
            .entry(path.to_path_buf())
            .or_default()
            .value()
            .clone();

        let result = {
            let _guard = gate.lock().await;
            // Another task may have populated while we waited.
            match self.lookup(path).await {
                Some(entry) => {
                    metrics::record_cache_lookup("coalesced");
                    Ok(Some(entry))
                }
                None => {
                    metrics::record_cache_lookup("miss");
                    self.populate(path).await
                }
            }
        };

        drop(gate);
        self.inflight.remove_if(path, |_, gate| Arc::strong_count(gate) == 1);
        result
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fast path: a cached entry whose artifact (if any) is still on disk.
    async fn lookup(&self, path: &Path) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.get(path).map(|r| r.value().clone())?;
        let artifact = match &entry.compressed {
            None => return Some(entry),
            Some(artifact) => &artifact.path,
        };

        if fs::try_exists(artifact).await.unwrap_or(false) {
            Some(entry)
        } else {
            tracing::debug!(path = %path.display(), "Gzip artifact missing, rebuilding entry");
            None
        }
    }

    async fn populate(&self, path: &Path) -> Result<Option<Arc<CacheEntry>>> {
        let meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(ServeError::io(path, e)),
        };
        if !meta.is_file() {
            return Ok(None);
        }

        let stats = FileStats {
            size: meta.len(),
            modified: meta.modified().map_err(|e| ServeError::io(path, e))?,
            is_file: true,
        };
        let etag = compute_etag(path, &self.etag)
            .await
            .map_err(|e| ServeError::io(path, e))?;
        let content_type = content_type(path);

        let compressed = if is_compressible(&content_type) {
            match compress_file(path, stats.size, self.gzip_level).await? {
                CompressOutcome::Compressed(artifact) => Some(artifact),
                CompressOutcome::Skipped { .. } => None,
            }
        } else {
            None
        };

        tracing::debug!(
            path = %path.display(),
            size = stats.size,
            content_type = %content_type,
            gzip = compressed.is_some(),
            "Cached static asset"
        );

        let entry = Arc::new(CacheEntry {
            path: path.to_path_buf(),
            stats,
            etag,
            content_type,
            compressed,
        });
        self.entries.insert(path.to_path_buf(), entry.clone());
        Ok(Some(entry))
    }
}

/// Stat failures that mean "no such asset" rather than a server fault.
fn is_not_found(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::InvalidFilename
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> AssetCache {
        AssetCache::new(EtagConfig::default(), 6)
    }

    fn big_js() -> String {
        "export const answer = 42;\n".repeat(300)
    }

    #[tokio::test]
    async fn test_populates_compressible_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, big_js()).unwrap();

        let cache = cache();
        let entry = cache.get(&path).await.unwrap().expect("entry");
        assert!(!entry.etag.is_empty());
        assert!(entry.etag.starts_with('"') && entry.etag.ends_with('"'));
        assert!(entry.content_type.contains("javascript"));
        let artifact = entry.compressed.as_ref().expect("artifact");
        assert!(artifact.size < entry.stats.size);
        assert!(artifact.path.exists());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_misses_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache();

        assert!(cache.get(&dir.path().join("missing.css")).await.unwrap().is_none());
        assert!(cache.get(dir.path()).await.unwrap().is_none());
        assert!(cache
            .get(&dir.path().join("missing/deeper.css"))
            .await
            .unwrap()
            .is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_file_as_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        let cache = cache();
        assert!(cache.get(&file.join("child.txt")).await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fatal_stat_error_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.css");
        std::os::unix::fs::symlink(&path, &path).unwrap();

        let cache = cache();
        for _ in 0..2 {
            let err = cache.get(&path).await.unwrap_err();
            assert!(matches!(err, ServeError::Io { .. }), "{:?}", err);
            assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert!(cache.is_empty());
        assert!(cache.inflight.is_empty());
    }

    #[tokio::test]
    async fn test_incompressible_type_has_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let entry = cache().get(&path).await.unwrap().unwrap();
        assert_eq!(entry.content_type, "application/octet-stream");
        assert!(entry.compressed.is_none());
        assert!(!dir.path().join("blob.bin.gz").exists());
    }

    #[tokio::test]
    async fn test_hit_returns_same_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, big_js()).unwrap();

        let cache = cache();
        let first = cache.get(&path).await.unwrap().unwrap();
        let second = cache.get(&path).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_missing_artifact_rebuilds_whole_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, big_js()).unwrap();

        let cache = cache();
        let first = cache.get(&path).await.unwrap().unwrap();
        std::fs::remove_file(dir.path().join("app.js.gz")).unwrap();

        let second = cache.get(&path).await.unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.etag, second.etag);
        assert!(second.compressed.as_ref().unwrap().path.exists());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_population_is_coalesced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, big_js()).unwrap();

        let cache = Arc::new(cache());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let path = path.clone();
            tasks.push(tokio::spawn(async move { cache.get(&path).await.unwrap().unwrap() }));
        }

        let mut entries = Vec::new();
        for task in tasks {
            entries.push(task.await.unwrap());
        }
        assert!(entries.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(cache.inflight.is_empty());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {:?}", names);
    }
}

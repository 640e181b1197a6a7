//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a sibling and renaming it over the original replace the
//! inode, and a file-level watch stops firing after the first such save.
//! Bursts of events from one save collapse into a single reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::loader::load_config_with;
use crate::config::schema::ServeConfig;

/// Quiet period after the last file event before the file is reloaded.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

type Overrides = Arc<dyn Fn(&mut ServeConfig) + Send + Sync>;

/// Watches a configuration file and sends every valid revision of it.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    overrides: Option<Overrides>,
    update_tx: mpsc::UnboundedSender<ServeConfig>,
}

/// Keeps the watch alive; dropping it stops reloads.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    reloader: JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.reloader.abort();
    }
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServeConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let watcher = Self {
            path: path.to_path_buf(),
            debounce: DEFAULT_DEBOUNCE,
            overrides: None,
            update_tx,
        };
        (watcher, update_rx)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Adjust every reloaded configuration before it is validated, e.g. to
    /// reapply command-line flags.
    pub fn with_overrides(
        mut self,
        overrides: impl Fn(&mut ServeConfig) + Send + Sync + 'static,
    ) -> Self {
        self.overrides = Some(Arc::new(overrides));
        self
    }

    /// Start watching. Must be called inside a Tokio runtime.
    ///
    /// Invalid revisions are logged and dropped; the running configuration
    /// stays in effect.
    pub fn run(self) -> Result<WatchHandle, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(OsString::from);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if touches_file && (event.kind.is_modify() || event.kind.is_create()) {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        let reloader = tokio::spawn(reload_loop(
            self.path,
            self.debounce,
            self.overrides,
            self.update_tx,
            event_rx,
        ));

        Ok(WatchHandle {
            _watcher: watcher,
            reloader,
        })
    }
}

async fn reload_loop(
    path: PathBuf,
    debounce: Duration,
    overrides: Option<Overrides>,
    update_tx: mpsc::UnboundedSender<ServeConfig>,
    mut events: mpsc::UnboundedReceiver<()>,
) {
    while events.recv().await.is_some() {
        tokio::time::sleep(debounce).await;
        while events.try_recv().is_ok() {}

        tracing::info!(path = %path.display(), "Config file change detected, reloading");
        let loaded = load_config_with(&path, |config| {
            if let Some(apply) = &overrides {
                apply(config);
            }
        });
        match loaded {
            Ok(config) => {
                if update_tx.send(config).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current configuration")
            }
        }
    }
}

//! static-serve
//!
//! Standalone server for the static asset middleware.
//!
//! ```text
//!     Client Request
//!     ──────▶ TraceLayer ─▶ TimeoutLayer ─▶ static files middleware ─▶ fallback 404
//!                                               │
//!                                               ├─ push / Link for `/`
//!                                               └─ empty 404? resolve → cache → send
//!
//!     config.toml ──notify──▶ ConfigWatcher ──▶ HttpServer::reload (arc-swap)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use static_serve::config::watcher::ConfigWatcher;
use static_serve::config::{load_config_with, validate_config, ServeConfig};
use static_serve::observability::{logging, metrics};
use static_serve::{HttpServer, Shutdown};

#[derive(Parser, Clone)]
#[command(name = "static-serve")]
#[command(about = "Serve a directory with cached ETags, gzip artifacts and preload hints", long_about = None)]
struct Cli {
    /// TOML configuration file (watched for changes)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve, overriding `root` from the configuration
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Listen address, overriding `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut ServeConfig) {
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_with(path, |config| cli.apply(config))?,
        None => {
            let mut config = ServeConfig::default();
            cli.apply(&mut config);
            if let Err(errors) = validate_config(&config) {
                for error in &errors {
                    eprintln!("invalid configuration: {}", error);
                }
                return Err(format!("{} configuration error(s)", errors.len()).into());
            }
            config
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!("static-serve v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated above.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, update_rx) = match &cli.config {
        Some(path) => {
            let overrides = cli.clone();
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher
                .with_overrides(move |config| overrides.apply(config))
                .run()?;
            (Some(handle), updates)
        }
        None => (None, mpsc::unbounded_channel::<ServeConfig>().1),
    };

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(&config)?;
    let receiver = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.trigger_on_ctrl_c().await }
    });

    server.run(listener, update_rx, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router hosting the static files middleware
//! - Wire up middleware (tracing, timeouts)
//! - Swap in a fresh middleware state when the configuration changes
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServeConfig;
use crate::error::Result;
use crate::http::middleware::StaticFiles;
use crate::push::PushTransport;

/// Middleware state that can be replaced while requests are in flight.
pub type SharedFiles = Arc<ArcSwap<StaticFiles>>;

/// Standalone HTTP server for static assets.
pub struct HttpServer {
    router: Router,
    files: SharedFiles,
    transport: Option<Arc<dyn PushTransport>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ServeConfig) -> Result<Self> {
        Ok(Self::from_files(StaticFiles::new(config)?, config))
    }

    /// Create a server around an already built middleware state.
    pub fn from_files(files: StaticFiles, config: &ServeConfig) -> Self {
        let files: SharedFiles = Arc::new(ArcSwap::from_pointee(files));
        let router = Self::build_router(config, files.clone());
        Self {
            router,
            files,
            transport: None,
        }
    }

    /// Install a push transport; kept across configuration reloads.
    pub fn with_push_transport(mut self, transport: Arc<dyn PushTransport>) -> Self {
        let current = self.files.load_full();
        self.files
            .store(Arc::new(current.as_ref().clone().with_push_transport(transport.clone())));
        self.transport = Some(transport);
        self
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServeConfig, files: SharedFiles) -> Router {
        Router::new().fallback(not_found).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                .layer(middleware::from_fn_with_state(files, serve_static)),
        )
    }

    /// The router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The middleware state currently serving requests.
    pub fn files(&self) -> Arc<StaticFiles> {
        self.files.load_full()
    }

    /// Replace the middleware state with one built from `config`.
    ///
    /// The old cache is dropped once in-flight requests release it. On
    /// error the current state keeps serving.
    pub fn reload(&self, config: &ServeConfig) -> Result<()> {
        reload_files(&self.files, self.transport.as_ref(), config)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> std::result::Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let files = self.files.clone();
        let transport = self.transport.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = reload_files(&files, transport.as_ref(), &config) {
                    tracing::error!(error = %e, "Rejected configuration update, keeping current state");
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn reload_files(
    files: &SharedFiles,
    transport: Option<&Arc<dyn PushTransport>>,
    config: &ServeConfig,
) -> Result<()> {
    let mut next = StaticFiles::new(config)?;
    if let Some(transport) = transport {
        next = next.with_push_transport(transport.clone());
    }
    files.store(Arc::new(next));
    tracing::info!("Static file configuration reloaded");
    Ok(())
}

async fn serve_static(State(files): State<SharedFiles>, req: Request<Body>, next: Next) -> Response {
    let files = files.load_full();
    files.handle(req, next).await
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

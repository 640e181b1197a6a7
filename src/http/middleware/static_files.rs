//! Static Files Middleware.
//! Serves assets for requests the downstream stack answered with an empty 404.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{header::LINK, HeaderValue, Request, StatusCode, Version},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::cache::AssetCache;
use crate::config::ServeConfig;
use crate::error::{Result, ServeError};
use crate::observability::metrics;
use crate::push::{derive_promise, link_header, load_manifest, PushTarget, PushTransport};
use crate::send::{RequestHead, Sender};

/// State shared by every request through the middleware.
#[derive(Clone)]
pub struct StaticFiles {
    sender: Sender,
    push: bool,
    link: Option<HeaderValue>,
    targets: Arc<[PushTarget]>,
    priority: Option<u8>,
    transport: Option<Arc<dyn PushTransport>>,
}

impl StaticFiles {
    /// Build from configuration, serving `config.root` (or the working directory).
    pub fn new(config: &ServeConfig) -> Result<Self> {
        let root = config
            .root_dir()
            .map_err(|e| ServeError::Config(format!("cannot determine root: {}", e)))?;
        Self::with_root(root, config)
    }

    /// Build from configuration with an explicit root taking priority over `config.root`.
    pub fn with_root(root: impl Into<PathBuf>, config: &ServeConfig) -> Result<Self> {
        let mut root = root.into();
        if root.is_relative() {
            let cwd = std::env::current_dir()
                .map_err(|e| ServeError::Config(format!("cannot determine root: {}", e)))?;
            root = cwd.join(root);
        }

        let mut targets: Vec<PushTarget> = config.files.iter().map(PushTarget::new).collect();
        if let Some(manifest) = &config.manifest {
            targets.extend(load_manifest(manifest)?);
        }

        let link = if config.link {
            link_header(&targets)
                .map(|value| {
                    HeaderValue::from_str(&value).map_err(|_| ServeError::InvalidHeader {
                        name: LINK.as_str().to_string(),
                        value,
                    })
                })
                .transpose()?
        } else {
            None
        };

        let cache = Arc::new(AssetCache::new(config.etag.clone(), config.gzip_level));
        tracing::info!(
            root = %root.display(),
            push = config.push,
            link = config.link,
            targets = targets.len(),
            "Static file middleware ready"
        );

        Ok(Self {
            sender: Sender::new(root, cache, config),
            push: config.push,
            link,
            targets: targets.into(),
            priority: config.push_options.priority,
            transport: None,
        })
    }

    /// Install the transport push promises are handed to.
    pub fn with_push_transport(mut self, transport: Arc<dyn PushTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn cache(&self) -> &AssetCache {
        self.sender.cache()
    }

    /// Run the middleware for one request.
    pub async fn handle(&self, req: Request<Body>, next: Next) -> Response {
        let head = RequestHead::from_request(&req);
        let is_root = head.path == "/";

        // Push must be initiated before the downstream stack builds its response.
        let push_status = if is_root && self.push {
            self.push_all(&head).await
        } else {
            None
        };

        let mut response = next.run(req).await;

        if is_unhandled(&response) {
            match push_status {
                Some(status) => *response.status_mut() = status,
                None => match self.sender.send(&head).await {
                    Ok(Some(served)) => response = served,
                    Ok(None) => {}
                    Err(e) => response = e.into_response(),
                },
            }
        }

        if is_root {
            if let Some(link) = &self.link {
                response.headers_mut().insert(LINK, link.clone());
            }
        }

        metrics::record_response(response.status().as_u16());
        response
    }

    /// Push every target, returning the status of the last failure.
    ///
    /// A failure status takes the place of the empty downstream 404 and the
    /// asset fallback is skipped. A response the downstream stack rendered
    /// itself keeps its own status.
    async fn push_all(&self, head: &RequestHead) -> Option<StatusCode> {
        let transport = self.transport.as_ref()?;
        if head.version != Version::HTTP_2 {
            return None;
        }

        let mut failure = None;
        for target in self.targets.iter() {
            let result = match derive_promise(&self.sender, &target.file, self.priority).await {
                Ok(promise) => transport.push(promise).await.map_err(ServeError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    metrics::record_push("pushed");
                    tracing::debug!(file = %target.file, "Pushed asset");
                }
                Err(e) => {
                    metrics::record_push("failed");
                    tracing::warn!(file = %target.file, error = %e, "Push failed");
                    failure = Some(e.status());
                }
            }
        }
        failure
    }
}

/// Nothing downstream claimed the request.
fn is_unhandled(response: &Response) -> bool {
    response.status() == StatusCode::NOT_FOUND && response.body().size_hint().exact() == Some(0)
}

pub async fn static_files_middleware(
    State(files): State<StaticFiles>,
    req: Request<Body>,
    next: Next,
) -> Response {
    files.handle(req, next).await
}

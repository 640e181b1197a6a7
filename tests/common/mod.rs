//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use tempfile::TempDir;
use tokio::sync::mpsc;

use static_serve::config::ServeConfig;
use static_serve::{HttpServer, Shutdown};

/// Repetitive enough for gzip to shrink it.
pub fn app_js() -> String {
    "export function greet(name) { return `hello ${name}`; }\n".repeat(100)
}

/// A document root with one file of every interesting kind.
pub fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::write(root.join("app.js"), app_js()).unwrap();
    std::fs::write(root.join("style.css"), "body { margin: 0; }\n".repeat(80)).unwrap();
    std::fs::write(root.join("index.html"), "<!doctype html><p>home</p>\n".repeat(40)).unwrap();
    std::fs::write(root.join("tiny.txt"), "hi").unwrap();
    std::fs::write(root.join("logo.png"), noise(2048)).unwrap();
    std::fs::write(root.join(".secret"), "token").unwrap();
    std::fs::create_dir(root.join("docs")).unwrap();
    std::fs::write(root.join("docs/index.html"), "<h1>docs</h1>").unwrap();

    dir
}

/// Bytes gzip cannot shrink.
pub fn noise(len: usize) -> Vec<u8> {
    let mut rng = fastrand::Rng::with_seed(7);
    (0..len).map(|_| rng.u8(..)).collect()
}

/// Defaults rooted at `root`.
pub fn config(root: &Path) -> ServeConfig {
    ServeConfig {
        root: Some(root.to_path_buf()),
        ..ServeConfig::default()
    }
}

#[allow(dead_code)]
pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// A running server plus the handles needed to drive it.
#[allow(dead_code)]
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<ServeConfig>,
}

/// Start the server on an ephemeral port.
#[allow(dead_code)]
pub async fn start_server(config: ServeConfig) -> RunningServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(&config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    RunningServer {
        addr,
        shutdown,
        config_updates,
    }
}

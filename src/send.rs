//! Conditional response engine.
//!
//! # Data Flow
//! ```text
//! RequestHead
//!     → index substitution → percent-decode → root-bound resolve
//!     → hidden-file policy
//!     → AssetCache::get (None → not handled)
//!     → method dispatch (OPTIONS 204, others 405)
//!     → entity headers → freshness (304)
//!     → representation (gzip or identity) → streamed body (GET only)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::ALLOW;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Version};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use crate::cache::AssetCache;
use crate::config::ServeConfig;
use crate::error::{Result, ServeError};
use crate::negotiate::{is_fresh, prefers_gzip};
use crate::resolve::{decode_path, is_hidden, request_target, resolve};

/// Value of the `Allow` header.
pub const ALLOWED_METHODS: &str = "HEAD,GET,OPTIONS";

/// The methods the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetMethod {
    Get,
    Head,
    Options,
    Other,
}

impl From<&Method> for AssetMethod {
    fn from(method: &Method) -> Self {
        match *method {
            Method::GET => AssetMethod::Get,
            Method::HEAD => AssetMethod::Head,
            Method::OPTIONS => AssetMethod::Options,
            _ => AssetMethod::Other,
        }
    }
}

/// The parts of a request the engine reads.
///
/// Captured before the request is handed downstream.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    /// Raw (still percent-encoded) URI path.
    pub path: String,
    pub headers: HeaderMap,
    pub version: Version,
}

impl RequestHead {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            headers: req.headers().clone(),
            version: req.version(),
        }
    }
}

/// Renders static asset responses out of the shared cache.
#[derive(Clone)]
pub struct Sender {
    root: PathBuf,
    cache: Arc<AssetCache>,
    index: bool,
    hidden: bool,
    cache_control: Option<String>,
}

impl Sender {
    pub fn new(root: PathBuf, cache: Arc<AssetCache>, config: &ServeConfig) -> Self {
        Self {
            root,
            cache,
            index: config.index,
            hidden: config.hidden,
            cache_control: config.cache_control(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn cache_control(&self) -> Option<&str> {
        self.cache_control.as_deref()
    }

    /// Map a request path (or configured push file) to a file under the root.
    pub fn locate(&self, path: &str) -> Result<PathBuf> {
        let target = request_target(path, self.index);
        let decoded = decode_path(&target)?;
        resolve(&self.root, &decoded)
    }

    /// Produce the response for `head`, or `None` when the request is not
    /// for an existing, servable file.
    pub async fn send(&self, head: &RequestHead) -> Result<Option<Response>> {
        let path = self.locate(&head.path)?;

        if !self.hidden && is_hidden(&path) {
            tracing::debug!(path = %path.display(), "Refusing hidden file");
            return Ok(None);
        }

        let entry = match self.cache.get(&path).await? {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let method = AssetMethod::from(&head.method);
        match method {
            AssetMethod::Get | AssetMethod::Head => {}
            AssetMethod::Options => return Ok(Some(allow_response(StatusCode::NO_CONTENT))),
            AssetMethod::Other => return Ok(Some(allow_response(StatusCode::METHOD_NOT_ALLOWED))),
        }

        let mut headers = entry.entity_headers(self.cache_control())?;

        if is_fresh(&head.method, &head.headers, &entry.etag, entry.stats.modified) {
            return Ok(Some(build(StatusCode::NOT_MODIFIED, headers, Body::empty())));
        }

        let representation = entry.representation(prefers_gzip(&head.headers));
        representation.apply(&mut headers);

        let body = if method == AssetMethod::Head {
            Body::empty()
        } else {
            let file = tokio::fs::File::open(representation.file)
                .await
                .map_err(|e| ServeError::io(representation.file, e))?;
            Body::from_stream(ReaderStream::new(file))
        };

        tracing::debug!(
            path = %path.display(),
            encoding = representation.encoding.as_str(),
            length = representation.length,
            "Serving static asset"
        );
        Ok(Some(build(StatusCode::OK, headers, body)))
    }
}

fn allow_response(status: StatusCode) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    build(status, headers, Body::empty())
}

fn build(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{
        ACCEPT_ENCODING, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, ETAG, IF_NONE_MATCH,
        VARY,
    };
    use crate::config::EtagConfig;

    struct Fixture {
        dir: tempfile::TempDir,
        sender: Sender,
    }

    fn fixture(config: ServeConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "let x = 1;\n".repeat(200)).unwrap();
        std::fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();

        let cache = Arc::new(AssetCache::new(EtagConfig::default(), 6));
        let sender = Sender::new(dir.path().to_path_buf(), cache, &config);
        Fixture { dir, sender }
    }

    fn head(method: Method, path: &str) -> RequestHead {
        RequestHead {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            version: Version::HTTP_11,
        }
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(AssetMethod::from(&Method::GET), AssetMethod::Get);
        assert_eq!(AssetMethod::from(&Method::HEAD), AssetMethod::Head);
        assert_eq!(AssetMethod::from(&Method::OPTIONS), AssetMethod::Options);
        assert_eq!(AssetMethod::from(&Method::DELETE), AssetMethod::Other);
    }

    #[tokio::test]
    async fn test_get_identity() {
        let fx = fixture(ServeConfig::default());
        let response = fx.sender.send(&head(Method::GET, "/app.js")).await.unwrap().unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_ENCODING], "identity");
        assert_eq!(response.headers()[CONTENT_LENGTH], "2200");
        assert_eq!(response.headers()[VARY], "Accept-Encoding");
        assert!(!response.headers().contains_key(CACHE_CONTROL));
        assert_eq!(body_bytes(response).await.len(), 2200);
    }

    #[tokio::test]
    async fn test_get_gzip_when_accepted() {
        let fx = fixture(ServeConfig::default());
        let mut request = head(Method::GET, "/app.js");
        request.headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));

        let response = fx.sender.send(&request).await.unwrap().unwrap();
        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
        let gz_len = std::fs::metadata(fx.dir.path().join("app.js.gz")).unwrap().len();
        assert_eq!(response.headers()[CONTENT_LENGTH], gz_len.to_string().as_str());
        assert_eq!(body_bytes(response).await.len() as u64, gz_len);
    }

    #[tokio::test]
    async fn test_head_has_headers_but_no_body() {
        let fx = fixture(ServeConfig::default());
        let response = fx.sender.send(&head(Method::HEAD, "/app.js")).await.unwrap().unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_LENGTH], "2200");
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_not_modified() {
        let fx = fixture(ServeConfig::default());
        let first = fx.sender.send(&head(Method::GET, "/app.js")).await.unwrap().unwrap();
        let etag = first.headers()[ETAG].clone();

        let mut request = head(Method::GET, "/app.js");
        request.headers.insert(IF_NONE_MATCH, etag.clone());
        let response = fx.sender.send(&request).await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[ETAG], etag);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_options_and_unsupported_methods() {
        let fx = fixture(ServeConfig::default());

        let options = fx.sender.send(&head(Method::OPTIONS, "/app.js")).await.unwrap().unwrap();
        assert_eq!(options.status(), StatusCode::NO_CONTENT);
        assert_eq!(options.headers()[ALLOW], ALLOWED_METHODS);

        let post = fx.sender.send(&head(Method::POST, "/app.js")).await.unwrap().unwrap();
        assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(post.headers()[ALLOW], ALLOWED_METHODS);
    }

    #[tokio::test]
    async fn test_unhandled_paths() {
        let fx = fixture(ServeConfig::default());
        assert!(fx.sender.send(&head(Method::GET, "/missing.js")).await.unwrap().is_none());
        assert!(fx.sender.send(&head(Method::GET, "/docs/")).await.unwrap().is_none());
        assert!(fx.sender.send(&head(Method::GET, "/.env")).await.unwrap().is_none());
        assert!(fx.sender.send(&head(Method::POST, "/missing.js")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_index_and_hidden_options() {
        let config = ServeConfig {
            index: true,
            hidden: true,
            maxage: 60_000,
            ..ServeConfig::default()
        };
        let fx = fixture(config);

        let docs = fx.sender.send(&head(Method::GET, "/docs/")).await.unwrap().unwrap();
        assert_eq!(docs.status(), StatusCode::OK);
        assert_eq!(docs.headers()[CACHE_CONTROL], "public, max-age=60");
        assert_eq!(body_bytes(docs).await, b"<h1>docs</h1>");

        let env = fx.sender.send(&head(Method::GET, "/.env")).await.unwrap().unwrap();
        assert_eq!(env.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_escaping_paths_are_rejected() {
        let fx = fixture(ServeConfig::default());
        let err = fx.sender.send(&head(Method::GET, "/../etc/passwd")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = fx.sender.send(&head(Method::GET, "/%2e%2e/secret")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = fx.sender.send(&head(Method::GET, "/a%00b")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(fx.sender.cache().is_empty());
    }
}

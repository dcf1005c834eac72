//! Intercepted requests, responses and the network seam.
//!
//! ### Network contract
//! - Any HTTP status is a response; only transport failures are errors.
//! - No retries and no timeout unless one is configured.
//! - Redirects are followed (max 20, like a browser).

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
pub use reqwest::Method;
use reqwest::Client;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, resolve};

use aquanev_core::{Error, RequestKey, ResponseSnapshot};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 20;

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: ::url::Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, url: ::url::Url) -> Self {
        Self { method, url, headers: Vec::new(), body: None }
    }

    pub fn get(url: ::url::Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Only `GET` requests are read from or written to partitions.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    /// Partition key for this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.as_str(), self.url.as_str())
    }
}

/// A response, either live from the network or rebuilt from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL; empty for synthesized responses.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    /// Whether the status is in the 200-299 range.
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Immutable copy for storage.
    pub fn snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            url: self.url.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body: self.body.to_vec(),
        }
    }
}

impl From<ResponseSnapshot> for Response {
    fn from(snapshot: ResponseSnapshot) -> Self {
        Self {
            url: snapshot.url,
            status: snapshot.status,
            status_text: snapshot.status_text,
            headers: snapshot.headers,
            body: Bytes::from(snapshot.body),
        }
    }
}

/// The network as seen by the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. Errors mean no response was received.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// User agent string (default: "aquanev-sw/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { user_agent: "aquanev-sw/0.1".to_string(), timeout: None }
    }
}

impl From<&aquanev_core::WorkerConfig> for NetworkConfig {
    fn from(config: &aquanev_core::WorkerConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout() }
    }
}

/// reqwest-backed network.
pub struct HttpNetwork {
    http: Client,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: NetworkConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let mut builder = self.http.request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{} {}: {}", request.method, request.url, e)))?;

        let status = response.status();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "network fetch complete"
        );

        Ok(Response {
            url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> ::url::Url {
        ::url::Url::parse(s).unwrap()
    }

    #[test]
    fn test_network_config_default() {
        let config = NetworkConfig::default();
        assert_eq!(config.user_agent, "aquanev-sw/0.1");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_network_config_from_worker_config() {
        let worker = aquanev_core::WorkerConfig { timeout_ms: Some(1500), ..Default::default() };
        let config = NetworkConfig::from(&worker);
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_only_get_is_cacheable() {
        assert!(Request::get(url("http://localhost:8080/")).is_cacheable());
        assert!(!Request::new(Method::POST, url("http://localhost:8080/")).is_cacheable());
        assert!(!Request::new(Method::HEAD, url("http://localhost:8080/")).is_cacheable());
    }

    #[test]
    fn test_request_key() {
        let key = Request::get(url("http://localhost:8080/index.html")).key();
        assert_eq!(key.method, "GET");
        assert_eq!(key.url, "http://localhost:8080/index.html");
    }

    #[test]
    fn test_snapshot_round_trip_keeps_headers() {
        let response = Response {
            url: "http://localhost:8080/".into(),
            status: 200,
            status_text: "OK".into(),
            headers: vec![("Content-Type".into(), "text/html".into())],
            body: Bytes::from_static(b"<html></html>"),
        };
        let restored = Response::from(response.snapshot());
        assert_eq!(restored, response);
        assert_eq!(restored.content_type(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_http_network_new() {
        let network = HttpNetwork::new(NetworkConfig::default());
        assert!(network.is_ok());
    }

    #[tokio::test]
    async fn test_http_network_unreachable_is_error() {
        let network = HttpNetwork::new(NetworkConfig {
            timeout: Some(Duration::from_millis(500)),
            ..Default::default()
        })
        .unwrap();
        let result = network.fetch(&Request::get(url("http://127.0.0.1:9/"))).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}

//! Fixtures for tool tests: a fixed-page network and a ready worker.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;

use aquanev_core::{CacheDb, Error, WorkerConfig};
use aquanev_worker::{Network, PageHost, Request, Response, ServiceWorker};

/// Network serving a fixed set of pages. Other URLs fail.
pub struct StaticNetwork {
    pages: HashMap<String, (u16, String)>,
}

#[async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let (status, body) = self
            .pages
            .get(request.url.as_str())
            .ok_or_else(|| Error::Network(format!("{}: unreachable", request.url)))?;
        Ok(Response {
            url: request.url.to_string(),
            status: *status,
            status_text: String::new(),
            headers: vec![("content-type".into(), "text/plain".into())],
            body: Bytes::from(body.clone()),
        })
    }
}

pub const ORIGIN: &str = "http://localhost:8080/";
pub const INDEX: &str = "http://localhost:8080/index.html";

/// Worker `v1` with a two-asset shell served by `pages`.
pub async fn fixture(pages: &[(&str, u16, &str)]) -> (ServiceWorker, Arc<PageHost>) {
    let config = Arc::new(WorkerConfig {
        shell_assets: vec!["./".into(), "./index.html".into()],
        ..WorkerConfig::default()
    });
    let network = StaticNetwork {
        pages: pages
            .iter()
            .map(|(url, status, body)| (url.to_string(), (*status, body.to_string())))
            .collect(),
    };
    let db = CacheDb::open_in_memory().await.unwrap();
    let host = Arc::new(PageHost::new());
    let worker = ServiceWorker::new(config, Arc::new(db), Arc::new(network), host.clone(), host.clone()).unwrap();
    (worker, host)
}

/// Decode the JSON text content of a tool result.
pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}

//! sw_fetch tool implementation.
//!
//! Intercepts one request as a page under the worker's scope would issue it.

use aquanev_core::Error;
use aquanev_worker::{Method, Request, Route, ServiceWorker, Source};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::to_result;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Request URL, absolute or relative to the worker scope.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests use the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Wait for background revalidation to finish before returning.
    #[serde(default)]
    pub settle: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwFetchOutput {
    pub url: String,
    pub method: String,
    /// Routing class chosen for the request.
    pub route: Route,
    /// Where the response came from.
    pub source: Source,
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    /// Response body as text (invalid UTF-8 replaced).
    pub body: String,
    /// Background revalidations still in flight after this call.
    pub pending: usize,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method = Method::from_bytes(params.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;
    let url = worker.resolve(&params.url)?;

    let fetched = worker.fetch(Request::new(method.clone(), url.clone())).await?;
    if params.settle {
        worker.settle().await;
    }

    let response = fetched.served.response;
    let output = SwFetchOutput {
        url: url.to_string(),
        method: method.to_string(),
        route: fetched.route,
        source: fetched.served.source,
        status: response.status,
        status_text: response.status_text.clone(),
        content_type: response.content_type().map(String::from),
        body: response.text(),
        pending: worker.pending().await,
    };

    to_result(&output)
}

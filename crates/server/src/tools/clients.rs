//! clients_open tool implementation.
//!
//! Registers a page context with the simulated host so later events have
//! clients to message, focus or claim.

use aquanev_worker::{ClientInfo, ClientKind, PageHost, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::to_result;
use crate::error::HostError;

/// Parameters for the clients_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientsOpenParams {
    /// Page URL, absolute or relative to the worker scope.
    pub url: String,

    /// "window" (default) or "worker".
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Whether the page is already controlled by this worker.
    #[serde(default)]
    pub controlled: bool,
}

fn default_kind() -> String {
    "window".into()
}

/// Output structure for the clients_open tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsOpenOutput {
    pub client: ClientInfo,
    /// Every open client after the call.
    pub clients: Vec<ClientInfo>,
}

fn parse_kind(kind: &str) -> Result<ClientKind, HostError> {
    match kind.to_ascii_lowercase().as_str() {
        "window" => Ok(ClientKind::Window),
        "worker" => Ok(ClientKind::Worker),
        other => Err(HostError::InvalidInput(format!("unknown client kind: {other}"))),
    }
}

/// Implementation of the clients_open tool.
pub async fn open_impl(
    worker: &ServiceWorker, host: &PageHost, params: ClientsOpenParams,
) -> Result<CallToolResult, McpError> {
    let kind = parse_kind(&params.kind)?;
    let url = worker.resolve(&params.url)?;

    let client = host.connect(url.as_str(), kind, params.controlled).await;
    tracing::info!(client = %client.id, url = %client.url, "client connected");

    let output = ClientsOpenOutput { client, clients: host.clients().await };
    to_result(&output)
}

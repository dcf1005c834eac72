//! MCP tool implementations.
//!
//! Each tool drives one worker event and reports the host effects it caused
//! (client messages, focused or opened windows, notifications).

pub mod cache;
pub mod clients;
pub mod events;
pub mod fetch;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod testing;

use aquanev_core::Error;
use aquanev_worker::{HostEffect, PageHost};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::{Deserialize, Serialize};

/// Tool output: the event result and the effects drained from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply<T> {
    pub result: T,
    #[serde(default)]
    pub effects: Vec<HostEffect>,
}

/// Wrap `result` with the host effects recorded since the last call.
pub async fn reply<T: Serialize>(host: &PageHost, result: T) -> Result<CallToolResult, McpError> {
    let effects = host.drain_effects().await;
    to_result(&Reply { result, effects })
}

pub fn to_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

//! Out-of-band event tools: sw_message, sw_push, sw_notification_click and
//! sw_sync.
//!
//! None of these touch cache partitions.

use aquanev_worker::{ClickOutcome, MessageOutcome, Notification, NotificationClick, PageHost, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::reply;
use crate::error::HostError;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message posted by a page, e.g. `{"type": "SKIP_WAITING"}`.
    pub data: Value,
}

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push payload. Usually a JSON object; anything else yields defaults.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Tag of the displayed notification that was clicked.
    pub tag: String,

    /// Chosen action ("open" or "close"). Omit for a click on the body.
    #[serde(default)]
    pub action: Option<String>,
}

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Background sync tag.
    pub tag: String,
}

/// Output structure for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwSyncOutput {
    pub tag: String,
    /// Clients told about the sync; `None` if the tag is not handled.
    pub notified: Option<usize>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(
    worker: &ServiceWorker, host: &PageHost, params: SwMessageParams,
) -> Result<CallToolResult, McpError> {
    let outcome: MessageOutcome = worker.message(&params.data).await?;
    reply(host, outcome).await
}

/// Implementation of the sw_push tool.
pub async fn push_impl(worker: &ServiceWorker, host: &PageHost, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification: Notification = worker.push(params.payload.as_deref().map(str::as_bytes)).await?;
    reply(host, notification).await
}

/// Implementation of the sw_notification_click tool.
pub async fn notification_click_impl(
    worker: &ServiceWorker, host: &PageHost, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let notification = host
        .tray()
        .await
        .into_iter()
        .find(|n| n.tag == params.tag)
        .ok_or_else(|| HostError::UnknownNotification(params.tag.clone()))?;

    let click = NotificationClick { notification, action: params.action.unwrap_or_default() };
    let outcome: ClickOutcome = worker.notification_click(click).await?;
    reply(host, outcome).await
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(worker: &ServiceWorker, host: &PageHost, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let notified = worker.sync(&params.tag).await?;
    reply(host, SwSyncOutput { tag: params.tag, notified }).await
}

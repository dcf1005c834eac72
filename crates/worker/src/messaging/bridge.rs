//! Notification and client-message handling.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use aquanev_core::{Error, WorkerConfig};

use super::host::{ClientQuery, Clients, Notifications};
use super::protocol::{
    ACTION_CLOSE, ACTION_OPEN, Notification, NotificationAction, NotificationClick, NotificationData, NotifyRequest,
    OutboundMessage, PushPayload,
};
use crate::fetch::resolve;

/// Default body of push notifications.
const PUSH_BODY: &str = "New notification";
/// Default tag of page-requested notifications.
const NOTIFY_TAG: &str = "aquanev";
/// Default tag of push notifications.
const PUSH_TAG: &str = "aquanev-push";

/// Result of a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// The close action was chosen.
    Dismissed,
    /// An open application window was focused and told to navigate.
    Focused { client_id: String, tab: String },
    /// No application window was open; a new one was opened.
    Opened { client_id: String, url: String },
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Bridge between the worker and open pages.
#[derive(Clone)]
pub struct Bridge {
    config: Arc<WorkerConfig>,
    scope: Url,
    clients: Arc<dyn Clients>,
    notifications: Arc<dyn Notifications>,
}

impl Bridge {
    pub fn new(
        config: Arc<WorkerConfig>, scope: Url, clients: Arc<dyn Clients>, notifications: Arc<dyn Notifications>,
    ) -> Self {
        Self { config, scope, clients, notifications }
    }

    pub fn clients(&self) -> &Arc<dyn Clients> {
        &self.clients
    }

    fn base_notification(
        &self, title: Option<String>, body: String, tag: String, tab: Option<String>, require_interaction: bool,
    ) -> Notification {
        Notification {
            title: non_empty(title).unwrap_or_else(|| self.config.app_name.clone()),
            body,
            icon: self.config.notification_icon.clone(),
            badge: self.config.notification_icon.clone(),
            tag,
            require_interaction,
            data: NotificationData { tab: non_empty(tab).unwrap_or_else(|| self.config.default_tab.clone()) },
            actions: Vec::new(),
        }
    }

    /// Notification for a page's `AQUANEV_NOTIFY` request.
    pub fn requested_notification(&self, request: NotifyRequest) -> Notification {
        self.base_notification(
            request.title,
            non_empty(request.body).unwrap_or_default(),
            non_empty(request.tag).unwrap_or_else(|| NOTIFY_TAG.to_string()),
            request.tab,
            request.require_interaction.unwrap_or(false),
        )
    }

    /// Notification for a push payload, with open/close actions.
    pub fn push_notification(&self, payload: PushPayload) -> Notification {
        let mut notification = self.base_notification(
            payload.title,
            non_empty(payload.body).unwrap_or_else(|| PUSH_BODY.to_string()),
            non_empty(payload.tag).unwrap_or_else(|| PUSH_TAG.to_string()),
            payload.tab,
            payload.require_interaction.unwrap_or(false),
        );
        notification.actions = vec![
            NotificationAction { action: ACTION_OPEN.to_string(), title: "Open".to_string() },
            NotificationAction { action: ACTION_CLOSE.to_string(), title: "Close".to_string() },
        ];
        notification
    }

    /// Show a page-requested notification.
    pub async fn notify(&self, request: NotifyRequest) -> Result<Notification, Error> {
        let notification = self.requested_notification(request);
        self.notifications.show(&notification).await?;
        Ok(notification)
    }

    /// Show a notification for an incoming push.
    pub async fn push(&self, data: Option<&[u8]>) -> Result<Notification, Error> {
        let notification = self.push_notification(PushPayload::parse(data));
        tracing::info!(tag = %notification.tag, "push received");
        self.notifications.show(&notification).await?;
        Ok(notification)
    }

    /// Close the clicked notification and bring the application forward.
    pub async fn notification_click(&self, click: NotificationClick) -> Result<ClickOutcome, Error> {
        self.notifications.close(&click.notification.tag).await?;

        if click.action == ACTION_CLOSE {
            return Ok(ClickOutcome::Dismissed);
        }

        let tab = non_empty(Some(click.notification.data.tab)).unwrap_or_else(|| self.config.default_tab.clone());
        let windows = self
            .clients
            .match_all(ClientQuery::all_windows())
            .await?;

        let app_window = windows.into_iter().find(|c| {
            self.config
                .client_url_markers
                .iter()
                .any(|marker| c.url.contains(marker.as_str()))
        });

        if let Some(window) = app_window {
            self.clients.focus(&window.id).await?;
            self.clients
                .post_message(&window.id, &OutboundMessage::Navigate { tab: tab.clone() })
                .await?;
            return Ok(ClickOutcome::Focused { client_id: window.id, tab });
        }

        let url = resolve(&self.scope, &format!("./?tab={tab}"))?;
        let opened = self.clients.open_window(&url).await?;
        Ok(ClickOutcome::Opened { client_id: opened.id, url: url.to_string() })
    }

    /// Broadcast a background sync to every client when `tag` matches.
    ///
    /// A client that cannot be reached is logged and skipped. Returns how
    /// many clients were told, or `None` for other tags.
    pub async fn sync(&self, tag: &str) -> Result<Option<usize>, Error> {
        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring sync tag");
            return Ok(None);
        }

        tracing::info!(tag, "background sync, notifying clients");
        let clients = self.clients.match_all(ClientQuery::everything()).await?;
        let mut told = 0;
        for client in &clients {
            match self
                .clients
                .post_message(&client.id, &OutboundMessage::BackgroundSync)
                .await
            {
                Ok(()) => told += 1,
                Err(e) => tracing::warn!(client = %client.id, error = %e, "failed to post background sync"),
            }
        }
        Ok(Some(told))
    }
}

//! Client message protocol and notification shapes.
//!
//! Inbound page messages decode into [`ClientMessage`] at the boundary;
//! anything that does not decode is ignored by the worker.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Messages a page can post to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Activate the waiting version now.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    /// Display a system notification.
    #[serde(rename = "AQUANEV_NOTIFY")]
    Notify(NotifyRequest),
}

impl ClientMessage {
    /// Decode a posted value. `None` for unknown or malformed messages.
    pub fn decode(data: &Value) -> Option<Self> {
        match serde_json::from_value(data.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring undecodable client message");
                None
            }
        }
    }
}

/// Fields of a page-requested notification. Every field is optional.
///
/// Decoding is lenient: wrong-typed or empty fields count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tag: Option<String>,
    pub tab: Option<String>,
    pub require_interaction: Option<bool>,
}

impl<'de> Deserialize<'de> for NotifyRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        let fields = Fields(&object);
        Ok(Self {
            title: fields.text("title"),
            body: fields.text("body"),
            tag: fields.text("tag"),
            tab: fields.text("tab"),
            require_interaction: fields.flag("requireInteraction"),
        })
    }
}

/// Typed view over a loosely shaped JSON object.
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn text(&self, field: &str) -> Option<String> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    fn flag(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }
}

/// Messages the worker posts to pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "AQUANEV_BACKGROUND_SYNC")]
    BackgroundSync,
    #[serde(rename = "AQUANEV_NAV")]
    Navigate { tab: String },
}

/// Push payload. Absent or unparseable data is an empty payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tag: Option<String>,
    pub tab: Option<String>,
    pub require_interaction: Option<bool>,
}

impl PushPayload {
    /// Parse raw push data leniently: wrong-typed fields count as absent.
    pub fn parse(data: Option<&[u8]>) -> Self {
        let Some(bytes) = data else {
            return Self::default();
        };

        let value: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "push payload is not JSON, using defaults");
                return Self::default();
            }
        };

        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let fields = Fields(object);
        Self {
            title: fields.text("title"),
            body: fields.text("body"),
            tag: fields.text("tag"),
            tab: fields.text("tab"),
            require_interaction: fields.flag("requireInteraction"),
        }
    }
}

/// A user action attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Action id that opens the application.
pub const ACTION_OPEN: &str = "open";
/// Action id that only dismisses the notification.
pub const ACTION_CLOSE: &str = "close";

/// Data carried by a notification for click handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub tab: String,
}

/// A notification as displayed by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub data: NotificationData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
}

/// A click on a displayed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationClick {
    pub notification: Notification,
    /// Chosen action id; empty when the notification body was clicked.
    #[serde(default)]
    pub action: String,
}

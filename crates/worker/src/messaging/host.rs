//! Host seams: open page clients and the notification surface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use aquanev_core::Error;

use super::protocol::{Notification, OutboundMessage};

/// Kind of page context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Window,
    Worker,
}

/// An open page context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    pub kind: ClientKind,
    /// Whether this worker version intercepts the client's requests.
    pub controlled: bool,
    pub focused: bool,
}

/// Filter for [`Clients::match_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientQuery {
    pub include_uncontrolled: bool,
    /// `None` matches every kind.
    pub kind: Option<ClientKind>,
}

impl ClientQuery {
    /// Every window, controlled or not.
    pub fn all_windows() -> Self {
        Self { include_uncontrolled: true, kind: Some(ClientKind::Window) }
    }

    /// Every client of any kind, controlled or not.
    pub fn everything() -> Self {
        Self { include_uncontrolled: true, kind: None }
    }

    pub fn accepts(&self, client: &ClientInfo) -> bool {
        (self.include_uncontrolled || client.controlled) && self.kind.is_none_or(|kind| kind == client.kind)
    }
}

/// Open page contexts the worker can reach.
#[async_trait]
pub trait Clients: Send + Sync {
    async fn match_all(&self, query: ClientQuery) -> Result<Vec<ClientInfo>, Error>;

    /// Take control of uncontrolled clients. Returns how many were claimed.
    async fn claim(&self) -> Result<usize, Error>;

    async fn focus(&self, id: &str) -> Result<(), Error>;

    async fn post_message(&self, id: &str, message: &OutboundMessage) -> Result<(), Error>;

    async fn open_window(&self, url: &Url) -> Result<ClientInfo, Error>;
}

/// System notification surface.
#[async_trait]
pub trait Notifications: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;

    /// Close displayed notifications with this tag.
    async fn close(&self, tag: &str) -> Result<(), Error>;
}

//! In-memory host: a page registry and notification tray.
//!
//! Records every effect the worker causes so an embedding host (or a test)
//! can report it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use aquanev_core::Error;

use super::host::{ClientInfo, ClientKind, ClientQuery, Clients, Notifications};
use super::protocol::{Notification, OutboundMessage};

/// Something the worker did to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum HostEffect {
    Posted { client_id: String, message: OutboundMessage },
    Focused { client_id: String },
    Opened { client_id: String, url: String },
    Shown { notification: Notification },
    Closed { tag: String },
    Claimed { clients: usize },
}

#[derive(Debug, Default)]
struct PageState {
    clients: Vec<ClientInfo>,
    next_id: u64,
    tray: Vec<Notification>,
    effects: Vec<HostEffect>,
}

impl PageState {
    fn add(&mut self, url: &str, kind: ClientKind, controlled: bool) -> ClientInfo {
        self.next_id += 1;
        let client =
            ClientInfo { id: format!("client-{}", self.next_id), url: url.to_string(), kind, controlled, focused: false };
        self.clients.push(client.clone());
        client
    }

    fn client_mut(&mut self, id: &str) -> Result<&mut ClientInfo, Error> {
        self.clients
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::Host(format!("unknown client: {id}")))
    }
}

/// In-memory implementation of [`Clients`] and [`Notifications`].
#[derive(Debug, Default)]
pub struct PageHost {
    state: Mutex<PageState>,
}

impl PageHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an open page.
    pub async fn connect(&self, url: &str, kind: ClientKind, controlled: bool) -> ClientInfo {
        self.state.lock().await.add(url, kind, controlled)
    }

    pub async fn clients(&self) -> Vec<ClientInfo> {
        self.state.lock().await.clients.clone()
    }

    /// Notifications currently displayed.
    pub async fn tray(&self) -> Vec<Notification> {
        self.state.lock().await.tray.clone()
    }

    /// Take all effects recorded since the last drain.
    pub async fn drain_effects(&self) -> Vec<HostEffect> {
        std::mem::take(&mut self.state.lock().await.effects)
    }
}

#[async_trait]
impl Clients for PageHost {
    async fn match_all(&self, query: ClientQuery) -> Result<Vec<ClientInfo>, Error> {
        let state = self.state.lock().await;
        Ok(state.clients.iter().filter(|c| query.accepts(c)).cloned().collect())
    }

    async fn claim(&self) -> Result<usize, Error> {
        let mut state = self.state.lock().await;
        let mut claimed = 0;
        for client in state.clients.iter_mut().filter(|c| !c.controlled) {
            client.controlled = true;
            claimed += 1;
        }
        state.effects.push(HostEffect::Claimed { clients: claimed });
        Ok(claimed)
    }

    async fn focus(&self, id: &str) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.client_mut(id)?;
        for client in state.clients.iter_mut() {
            client.focused = client.id == id;
        }
        state.effects.push(HostEffect::Focused { client_id: id.to_string() });
        Ok(())
    }

    async fn post_message(&self, id: &str, message: &OutboundMessage) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.client_mut(id)?;
        state
            .effects
            .push(HostEffect::Posted { client_id: id.to_string(), message: message.clone() });
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<ClientInfo, Error> {
        let mut state = self.state.lock().await;
        let mut client = state.add(url.as_str(), ClientKind::Window, true);
        client.focused = true;
        let id = client.id.clone();
        for existing in state.clients.iter_mut() {
            existing.focused = existing.id == id;
        }
        state.effects.push(HostEffect::Opened { client_id: id, url: url.to_string() });
        Ok(client)
    }
}

#[async_trait]
impl Notifications for PageHost {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.tray.retain(|n| n.tag != notification.tag);
        state.tray.push(notification.clone());
        state.effects.push(HostEffect::Shown { notification: notification.clone() });
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.tray.retain(|n| n.tag != tag);
        state.effects.push(HostEffect::Closed { tag: tag.to_string() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_match_all_filters() {
        let host = PageHost::new();
        host.connect("http://localhost:8080/index.html", ClientKind::Window, true).await;
        host.connect("http://localhost:8080/", ClientKind::Window, false).await;
        host.connect("http://localhost:8080/worker.js", ClientKind::Worker, false).await;

        let controlled = host
            .match_all(ClientQuery { include_uncontrolled: false, kind: None })
            .await
            .unwrap();
        assert_eq!(controlled.len(), 1);

        let windows = host.match_all(ClientQuery::all_windows()).await.unwrap();
        assert_eq!(windows.len(), 2);

        let everything = host
            .match_all(ClientQuery { include_uncontrolled: true, kind: None })
            .await
            .unwrap();
        assert_eq!(everything.len(), 3);
    }

    #[tokio::test]
    async fn test_claim_marks_uncontrolled() {
        let host = PageHost::new();
        host.connect("http://localhost:8080/", ClientKind::Window, false).await;
        host.connect("http://localhost:8080/index.html", ClientKind::Window, true).await;

        assert_eq!(host.claim().await.unwrap(), 1);
        assert!(host.clients().await.iter().all(|c| c.controlled));
        assert_eq!(host.drain_effects().await, vec![HostEffect::Claimed { clients: 1 }]);
    }

    #[tokio::test]
    async fn test_post_to_unknown_client_fails() {
        let host = PageHost::new();
        let result = host.post_message("client-9", &OutboundMessage::BackgroundSync).await;
        assert!(matches!(result, Err(Error::Host(_))));
    }

    #[tokio::test]
    async fn test_show_replaces_same_tag() {
        let host = PageHost::new();
        let mut notification = Notification {
            title: "AQUANEV".into(),
            body: "first".into(),
            icon: "./icon-192.png".into(),
            badge: "./icon-192.png".into(),
            tag: "aquanev".into(),
            require_interaction: false,
            data: super::super::protocol::NotificationData { tab: "dashboard".into() },
            actions: Vec::new(),
        };
        host.show(&notification).await.unwrap();
        notification.body = "second".into();
        host.show(&notification).await.unwrap();

        let tray = host.tray().await;
        assert_eq!(tray.len(), 1);
        assert_eq!(tray[0].body, "second");

        host.close("aquanev").await.unwrap();
        assert!(host.tray().await.is_empty());
    }
}

//! The worker: one version of the interception layer and its event handlers.
//!
//! Each inbound event is an async function awaited by the host. Work that
//! outlives an event's result is tracked by [`KeepAlive`]; hosts call
//! [`ServiceWorker::settle`] before tearing the worker down.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::Instrument;
use url::Url;

use aquanev_core::{CacheStorage, Error, PartitionRegistry, WorkerConfig};

use crate::fetch::{Network, Request, resolve};
use crate::keepalive::KeepAlive;
use crate::lifecycle::{ActivateReport, InstallReport, Lifecycle, WorkerState};
use crate::messaging::{Bridge, ClickOutcome, ClientMessage, Clients, Notification, NotificationClick, Notifications};
use crate::route::{Route, RouteTable};
use crate::strategy::{self, Served};

/// Result of the install event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installed {
    #[serde(flatten)]
    pub report: InstallReport,
    /// Set when a pending skip-waiting request activated the worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<ActivateReport>,
}

/// A routed and served request.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub route: Route,
    pub served: Served,
}

/// Result of a page message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "handled", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// Skip waiting was requested; `activated` is set if it took effect now.
    SkipWaiting { state: WorkerState, activated: bool },
    Notified { notification: Notification },
    Ignored,
}

/// An inbound event.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Message(Value),
    Push(Option<Bytes>),
    NotificationClick(NotificationClick),
    Sync(String),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Install => "install",
            Event::Activate => "activate",
            Event::Fetch(_) => "fetch",
            Event::Message(_) => "message",
            Event::Push(_) => "push",
            Event::NotificationClick(_) => "notificationclick",
            Event::Sync(_) => "sync",
        }
    }
}

/// Result of [`ServiceWorker::dispatch`].
#[derive(Debug, Clone)]
pub enum Outcome {
    Installed(Installed),
    Activated(ActivateReport),
    Fetched(Fetched),
    Message(MessageOutcome),
    Pushed(Notification),
    Clicked(ClickOutcome),
    /// Number of clients told, `None` for unrelated sync tags.
    Synced(Option<usize>),
}

/// One worker version bound to its host seams.
pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    scope: Url,
    routes: RouteTable,
    registry: PartitionRegistry,
    network: Arc<dyn Network>,
    lifecycle: Lifecycle,
    bridge: Bridge,
    keep_alive: KeepAlive,
    offline: crate::fetch::Response,
    activation: Mutex<()>,
}

impl ServiceWorker {
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the configured scope is not a URL.
    pub fn new(
        config: Arc<WorkerConfig>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
        clients: Arc<dyn Clients>, notifications: Arc<dyn Notifications>,
    ) -> Result<Self, Error> {
        let scope = config.scope_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let registry = PartitionRegistry::new(storage, config.partition_names());
        let routes = RouteTable::new(&scope, &config);
        let bridge = Bridge::new(Arc::clone(&config), scope.clone(), clients, notifications);
        let offline = strategy::offline::response(&config.app_name);

        Ok(Self {
            config,
            scope,
            routes,
            registry,
            network,
            lifecycle: Lifecycle::new(),
            bridge,
            keep_alive: KeepAlive::new(),
            offline,
            activation: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn registry(&self) -> &PartitionRegistry {
        &self.registry
    }

    pub fn clients(&self) -> &Arc<dyn Clients> {
        self.bridge.clients()
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.state().await
    }

    /// Resolve a page-relative URL against the scope.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        Ok(resolve(&self.scope, input)?)
    }

    /// Route and handle one event.
    pub async fn dispatch(&self, event: Event) -> Result<Outcome, Error> {
        let span = tracing::info_span!("event", kind = event.kind(), version = %self.config.version);
        async move {
            match event {
                Event::Install => self.install().await.map(Outcome::Installed),
                Event::Activate => self.activate().await.map(Outcome::Activated),
                Event::Fetch(request) => self.fetch(request).await.map(Outcome::Fetched),
                Event::Message(data) => self.message(&data).await.map(Outcome::Message),
                Event::Push(data) => self.push(data.as_deref()).await.map(Outcome::Pushed),
                Event::NotificationClick(click) => self.notification_click(click).await.map(Outcome::Clicked),
                Event::Sync(tag) => self.sync(&tag).await.map(Outcome::Synced),
            }
        }
        .instrument(span)
        .await
    }

    /// Pre-cache the shell. Activates right away if skip waiting was requested.
    pub async fn install(&self) -> Result<Installed, Error> {
        let assets = self
            .config
            .shell_assets
            .iter()
            .map(|asset| self.resolve(asset))
            .collect::<Result<Vec<_>, _>>()?;

        let report = self
            .lifecycle
            .install(&self.registry, self.network.as_ref(), &assets)
            .await?;

        let activated = if self.lifecycle.skip_waiting_requested() { self.activate_if_waiting().await? } else { None };
        Ok(Installed { report, activated })
    }

    /// Delete partitions of other versions and claim clients.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let _guard = self.activation.lock().await;
        self.lifecycle.activate(&self.registry, self.clients().as_ref()).await
    }

    async fn activate_if_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        let _guard = self.activation.lock().await;
        if self.lifecycle.state().await != WorkerState::Installed {
            return Ok(None);
        }
        tracing::info!("skipping wait");
        self.lifecycle
            .activate(&self.registry, self.clients().as_ref())
            .await
            .map(Some)
    }

    /// Activate now if waiting; otherwise activate once install completes.
    pub async fn skip_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        self.lifecycle.request_skip_waiting();
        self.activate_if_waiting().await
    }

    /// Intercept a request and serve it with the strategy for its origin.
    pub async fn fetch(&self, request: Request) -> Result<Fetched, Error> {
        let route = self.routes.classify(&request.url);
        tracing::debug!(url = %request.url, method = %request.method, ?route, "routing request");

        let served = match route {
            Route::NetworkOnly => strategy::network_only(self.network.as_ref(), &request).await?,
            Route::StaleWhileRevalidate => {
                strategy::stale_while_revalidate(
                    &self.registry.external(),
                    Arc::clone(&self.network),
                    &request,
                    &self.keep_alive,
                )
                .await?
            }
            Route::CacheFirst => {
                strategy::cache_first(&self.registry.shell(), self.network.as_ref(), &request, &self.offline).await?
            }
            Route::NetworkFirst => strategy::network_first(&self.registry, self.network.as_ref(), &request).await?,
        };

        Ok(Fetched { route, served })
    }

    /// Handle a message posted by a page.
    pub async fn message(&self, data: &Value) -> Result<MessageOutcome, Error> {
        match ClientMessage::decode(data) {
            Some(ClientMessage::SkipWaiting) => {
                let activated = self.skip_waiting().await?.is_some();
                Ok(MessageOutcome::SkipWaiting { state: self.state().await, activated })
            }
            Some(ClientMessage::Notify(request)) => {
                let notification = self.bridge.notify(request).await?;
                Ok(MessageOutcome::Notified { notification })
            }
            None => Ok(MessageOutcome::Ignored),
        }
    }

    pub async fn push(&self, data: Option<&[u8]>) -> Result<Notification, Error> {
        self.bridge.push(data).await
    }

    pub async fn notification_click(&self, click: NotificationClick) -> Result<ClickOutcome, Error> {
        self.bridge.notification_click(click).await
    }

    pub async fn sync(&self, tag: &str) -> Result<Option<usize>, Error> {
        self.bridge.sync(tag).await
    }

    /// Number of background obligations still running.
    pub async fn pending(&self) -> usize {
        self.keep_alive.pending().await
    }

    /// Await every outstanding background obligation.
    pub async fn settle(&self) {
        self.keep_alive.settle().await;
    }
}

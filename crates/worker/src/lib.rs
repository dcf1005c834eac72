//! Request interception engine for the AQUANEV offline worker.
//!
//! This crate provides the request model and HTTP network, origin routing,
//! retrieval strategies, the install/activate lifecycle and the client
//! messaging bridge. The server crate hosts it.

pub mod fetch;
pub mod keepalive;
pub mod lifecycle;
pub mod messaging;
pub mod route;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{HttpNetwork, Method, Network, NetworkConfig, Request, Response, UrlError, resolve};
pub use keepalive::KeepAlive;
pub use lifecycle::{ActivateReport, FailedAsset, InstallReport, Lifecycle, WorkerState};
pub use messaging::{
    Bridge, ClickOutcome, ClientInfo, ClientKind, ClientMessage, ClientQuery, Clients, HostEffect, Notification,
    NotificationClick, Notifications, NotifyRequest, OutboundMessage, PageHost, PushPayload,
};
pub use route::{Route, RouteTable};
pub use strategy::{Served, Source};
pub use worker::{Event, Fetched, Installed, MessageOutcome, Outcome, ServiceWorker};

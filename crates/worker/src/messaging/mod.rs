//! Client messaging bridge.
//!
//! Handles out-of-band events that never touch cache partitions: page
//! messages, push, notification clicks and background sync.

pub mod bridge;
pub mod host;
pub mod memory;
pub mod protocol;

pub use bridge::{Bridge, ClickOutcome};
pub use host::{ClientInfo, ClientKind, ClientQuery, Clients, Notifications};
pub use memory::{HostEffect, PageHost};
pub use protocol::{ClientMessage, Notification, NotificationClick, NotifyRequest, OutboundMessage, PushPayload};

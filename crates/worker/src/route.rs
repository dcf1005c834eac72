//! Strategy selection by request origin.
//!
//! Classification is a total, side-effect-free function of the URL. Rules are
//! checked in a fixed order and the first match wins:
//!
//! 1. hostname matches a network-only marker → [`Route::NetworkOnly`]
//! 2. hostname matches an external marker → [`Route::StaleWhileRevalidate`]
//! 3. same origin as the application scope → [`Route::CacheFirst`]
//! 4. anything else → [`Route::NetworkFirst`]

use aquanev_core::{HostMatch, WorkerConfig};
use serde::{Deserialize, Serialize};
use url::{Origin, Url};

/// Routing class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Mandatory live sync endpoints; never cached.
    NetworkOnly,
    /// Third-party resources in the external partition.
    StaleWhileRevalidate,
    /// First-party assets in the shell partition.
    CacheFirst,
    /// Uncategorized cross-origin requests.
    NetworkFirst,
}

/// Origin lists compiled from the configuration.
#[derive(Debug, Clone)]
pub struct RouteTable {
    origin: Origin,
    network_only: Vec<String>,
    external: Vec<String>,
    host_match: HostMatch,
}

impl RouteTable {
    pub fn new(scope: &Url, config: &WorkerConfig) -> Self {
        Self {
            origin: scope.origin(),
            network_only: config.network_only_origins.clone(),
            external: config.external_origins.clone(),
            host_match: config.host_match,
        }
    }

    pub fn classify(&self, url: &Url) -> Route {
        let hostname = url.host_str().unwrap_or_default();

        if self.host_match.matches_any(hostname, &self.network_only) {
            Route::NetworkOnly
        } else if self.host_match.matches_any(hostname, &self.external) {
            Route::StaleWhileRevalidate
        } else if url.origin() == self.origin {
            Route::CacheFirst
        } else {
            Route::NetworkFirst
        }
    }
}

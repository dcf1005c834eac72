//! Install and activate.
//!
//! ### Lifecycle
//! 1. **Install**: pre-cache the shell, tolerating individual asset failures.
//!    The new version then waits; it does not activate by itself.
//! 2. **Activate**: delete partitions of other versions and claim open clients.
//!
//! `parsed → installing → installed → activating → activated`. A failed install
//! ends in `redundant`.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use aquanev_core::{Error, Partition, PartitionRegistry};

use crate::fetch::{Network, Request};
use crate::messaging::Clients;

/// Worker version state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// A shell asset that could not be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAsset {
    pub url: String,
    pub reason: String,
}

/// Outcome of the install step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallReport {
    pub partition: String,
    pub cached: Vec<String>,
    pub failed: Vec<FailedAsset>,
}

/// Outcome of the activate step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub claimed: usize,
}

/// Lifecycle manager for one worker version.
#[derive(Debug)]
pub struct Lifecycle {
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { state: RwLock::new(WorkerState::Parsed), skip_waiting: AtomicBool::new(false) }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Ask to activate as soon as install completes.
    pub fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<WorkerState, Error> {
        let mut state = self.state.write().await;
        let current = *state;
        if !from.contains(&current) {
            return Err(Error::InvalidState(format!("cannot move from {current:?} to {to:?}")));
        }
        *state = to;
        Ok(current)
    }

    async fn set(&self, state: WorkerState) {
        *self.state.write().await = state;
    }

    /// Open the shell partition and add every asset, all-settled.
    pub async fn install(
        &self, registry: &PartitionRegistry, network: &dyn Network, assets: &[Url],
    ) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed], WorkerState::Installing).await?;
        tracing::info!(partition = %registry.names().shell, "installing");

        let shell = match registry.open_or_create(&registry.names().shell).await {
            Ok(shell) => shell,
            Err(e) => {
                self.set(WorkerState::Redundant).await;
                return Err(e);
            }
        };

        let results = join_all(assets.iter().map(|url| add(&shell, network, url))).await;

        let mut report = InstallReport { partition: shell.name().to_string(), ..Default::default() };
        for (url, result) in assets.iter().zip(results) {
            match result {
                Ok(()) => report.cached.push(url.to_string()),
                Err(reason) => {
                    tracing::warn!(url = %url, %reason, "shell asset not cached");
                    report.failed.push(FailedAsset { url: url.to_string(), reason });
                }
            }
        }

        self.set(WorkerState::Installed).await;
        tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "installed, waiting");
        Ok(report)
    }

    /// Delete partitions of other versions, then claim clients.
    pub async fn activate(&self, registry: &PartitionRegistry, clients: &dyn Clients) -> Result<ActivateReport, Error> {
        let previous = self
            .transition(&[WorkerState::Installed, WorkerState::Activated], WorkerState::Activating)
            .await?;
        tracing::info!(version = %registry.names().shell, "activating");

        match cleanup(registry, clients).await {
            Ok(report) => {
                self.set(WorkerState::Activated).await;
                Ok(report)
            }
            Err(e) => {
                self.set(previous).await;
                Err(e)
            }
        }
    }
}

/// Fetch an asset and store it; any failure is reported, not raised.
async fn add(shell: &Partition, network: &dyn Network, url: &Url) -> Result<(), String> {
    let request = Request::get(url.clone());
    let response = network.fetch(&request).await.map_err(|e| e.to_string())?;
    if !response.is_ok() {
        return Err(format!("status {}", response.status));
    }
    shell
        .put(&request.key(), &response.snapshot())
        .await
        .map_err(|e| e.to_string())
}

async fn cleanup(registry: &PartitionRegistry, clients: &dyn Clients) -> Result<ActivateReport, Error> {
    let names = registry.names();
    let stale: Vec<String> = registry
        .list_all()
        .await?
        .into_iter()
        .filter(|name| !names.contains(name))
        .collect();

    try_join_all(stale.iter().map(|name| async move {
        tracing::info!(partition = %name, "deleting stale partition");
        registry.delete(name).await
    }))
    .await?;

    let claimed = clients.claim().await?;
    Ok(ActivateReport { deleted: stale, claimed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{ClientKind, PageHost};
    use crate::testing::ScriptedNetwork;
    use aquanev_core::{CacheDb, CacheStorage, PartitionNames};
    use std::sync::Arc;

    async fn registry(version: &str) -> (CacheDb, PartitionRegistry) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let registry = PartitionRegistry::new(Arc::new(db.clone()), PartitionNames::derive("aquanev", version));
        (db, registry)
    }

    fn assets() -> Vec<Url> {
        ["http://localhost:8080/", "http://localhost:8080/index.html", "http://localhost:8080/icon-512.png"]
            .iter()
            .map(|s| Url::parse(s).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_install_tolerates_failed_assets() {
        let (_db, registry) = registry("v1").await;
        let network = ScriptedNetwork::new();
        network.respond("http://localhost:8080/", 200, "root");
        network.respond("http://localhost:8080/index.html", 200, "index");
        network.respond("http://localhost:8080/icon-512.png", 404, "");

        let lifecycle = Lifecycle::new();
        let report = lifecycle.install(&registry, network.as_ref(), &assets()).await.unwrap();

        assert_eq!(report.partition, "aquanev-app-v1");
        assert_eq!(report.cached.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].reason, "status 404");
        assert_eq!(registry.shell().entry_count().await.unwrap(), 2);
        assert_eq!(lifecycle.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_install_offline_still_succeeds() {
        let (_db, registry) = registry("v1").await;
        let network = ScriptedNetwork::new();

        let lifecycle = Lifecycle::new();
        let report = lifecycle.install(&registry, network.as_ref(), &assets()).await.unwrap();
        assert!(report.cached.is_empty());
        assert_eq!(report.failed.len(), 3);
        assert_eq!(registry.list_all().await.unwrap(), vec!["aquanev-app-v1"]);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let (_db, registry) = registry("v1").await;
        let network = ScriptedNetwork::new();
        let lifecycle = Lifecycle::new();
        lifecycle.install(&registry, network.as_ref(), &[]).await.unwrap();

        let again = lifecycle.install(&registry, network.as_ref(), &[]).await;
        assert!(matches!(again, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let (_db, registry) = registry("v1").await;
        let host = PageHost::new();
        let result = Lifecycle::new().activate(&registry, &host).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_deletes_only_stale_partitions() {
        let (db, registry) = registry("v2").await;
        for name in ["aquanev-app-v1", "aquanev-ext-v1", "aquanev-app-v2", "aquanev-ext-v2", "unrelated"] {
            db.open(name).await.unwrap();
        }
        let host = PageHost::new();
        host.connect("http://localhost:8080/", ClientKind::Window, false).await;

        let lifecycle = Lifecycle::new();
        lifecycle.install(&registry, ScriptedNetwork::new().as_ref(), &[]).await.unwrap();
        let report = lifecycle.activate(&registry, &host).await.unwrap();

        assert_eq!(report.deleted, vec!["aquanev-app-v1", "aquanev-ext-v1", "unrelated"]);
        assert_eq!(report.claimed, 1);
        assert_eq!(registry.list_all().await.unwrap(), vec!["aquanev-app-v2", "aquanev-ext-v2"]);
        assert_eq!(lifecycle.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_is_repeatable() {
        let (_db, registry) = registry("v1").await;
        let host = PageHost::new();
        let lifecycle = Lifecycle::new();
        lifecycle.install(&registry, ScriptedNetwork::new().as_ref(), &[]).await.unwrap();

        lifecycle.activate(&registry, &host).await.unwrap();
        let again = lifecycle.activate(&registry, &host).await.unwrap();
        assert!(again.deleted.is_empty());
    }

    #[test]
    fn test_skip_waiting_flag() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.skip_waiting_requested());
        lifecycle.request_skip_waiting();
        assert!(lifecycle.skip_waiting_requested());
    }
}

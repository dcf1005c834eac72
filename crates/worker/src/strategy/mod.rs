//! Retrieval strategies.
//!
//! Resilience is always "fall back to the other source" (cache or network);
//! no strategy retries the same source.

pub mod offline;

use std::sync::Arc;

use aquanev_core::{Error, Partition, PartitionRegistry, ResponseSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::fetch::{Network, Request, Response};
use crate::keepalive::KeepAlive;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Network,
    Cache,
    OfflineFallback,
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    fn network(response: Response) -> Self {
        Self { response, source: Source::Network }
    }

    fn cache(snapshot: ResponseSnapshot) -> Self {
        Self { response: snapshot.into(), source: Source::Cache }
    }
}

/// Cache-first with network fallback, then the offline page.
///
/// Only ok responses are stored. A failed store is logged; the network
/// response is still returned.
pub async fn cache_first(
    partition: &Partition, network: &dyn Network, request: &Request, offline: &Response,
) -> Result<Served, Error> {
    let key = request.key();

    if request.is_cacheable()
        && let Some(snapshot) = partition.lookup(&key).await?
    {
        tracing::debug!(url = %request.url, partition = partition.name(), "cache hit");
        return Ok(Served::cache(snapshot));
    }

    match network.fetch(request).await {
        Ok(response) => {
            if request.is_cacheable() && response.is_ok() {
                if let Err(e) = partition.put(&key, &response.snapshot()).await {
                    tracing::warn!(url = %request.url, partition = partition.name(), error = %e, "failed to store response");
                }
            }
            Ok(Served::network(response))
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "network unavailable, serving offline page");
            Ok(Served { response: offline.clone(), source: Source::OfflineFallback })
        }
    }
}

/// Stale-while-revalidate.
///
/// The refresh is registered with `keep_alive` and may finish after this
/// returns. With nothing cached, a network failure yields `NoResponse`.
pub async fn stale_while_revalidate(
    partition: &Partition, network: Arc<dyn Network>, request: &Request, keep_alive: &KeepAlive,
) -> Result<Served, Error> {
    if !request.is_cacheable() {
        return network
            .fetch(request)
            .await
            .map(Served::network)
            .map_err(|e| Error::NoResponse(format!("{}: {e}", request.url)));
    }

    let key = request.key();
    let cached = partition.lookup(&key).await?;

    let (tx, rx) = oneshot::channel();
    let refresh_partition = partition.clone();
    let refresh_request = request.clone();
    keep_alive
        .spawn(async move {
            let fresh = match network.fetch(&refresh_request).await {
                Ok(response) => {
                    if response.is_ok()
                        && let Err(e) = refresh_partition.put(&key, &response.snapshot()).await
                    {
                        tracing::warn!(url = %refresh_request.url, error = %e, "failed to store refreshed response");
                    }
                    Some(response)
                }
                Err(e) => {
                    tracing::debug!(url = %refresh_request.url, error = %e, "revalidation failed");
                    None
                }
            };
            let _ = tx.send(fresh);
        })
        .await;

    if let Some(snapshot) = cached {
        tracing::debug!(url = %request.url, partition = partition.name(), "serving stale entry");
        return Ok(Served::cache(snapshot));
    }

    match rx.await {
        Ok(Some(response)) => Ok(Served::network(response)),
        _ => Err(Error::NoResponse(request.url.to_string())),
    }
}

/// Network only. Never touches partitions; failures propagate unchanged.
pub async fn network_only(network: &dyn Network, request: &Request) -> Result<Served, Error> {
    network.fetch(request).await.map(Served::network)
}

/// Network first, then any partition. No writes.
pub async fn network_first(
    registry: &PartitionRegistry, network: &dyn Network, request: &Request,
) -> Result<Served, Error> {
    match network.fetch(request).await {
        Ok(response) => Ok(Served::network(response)),
        Err(e) => {
            if request.is_cacheable()
                && let Some(snapshot) = registry.lookup(&request.key()).await?
            {
                tracing::debug!(url = %request.url, "network failed, serving cached copy");
                return Ok(Served::cache(snapshot));
            }
            Err(e)
        }
    }
}

//! cache_list tool implementation.
//!
//! Lists every partition in cache storage, including ones left by other
//! versions that activation has not yet removed.

use aquanev_core::PartitionSummary;
use aquanev_worker::{ServiceWorker, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::{Deserialize, Serialize};

use super::to_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheListOutput {
    pub version: String,
    pub state: WorkerState,
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let partitions = worker.registry().summaries().await?;
    let output = CacheListOutput { version: worker.config().version.clone(), state: worker.state().await, partitions };
    to_result(&output)
}

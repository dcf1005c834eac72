//! sw_install and sw_activate tool implementations.

use aquanev_worker::{ActivateReport, Installed, PageHost, ServiceWorker, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::{Deserialize, Serialize};

use super::reply;

/// Output structure for the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwInstallOutput {
    pub version: String,
    /// State after install; `installed` means waiting for activation.
    pub state: WorkerState,
    pub installed: Installed,
}

/// Output structure for the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwActivateOutput {
    pub version: String,
    pub state: WorkerState,
    pub activated: ActivateReport,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &ServiceWorker, host: &PageHost) -> Result<CallToolResult, McpError> {
    let installed = worker.install().await?;
    let output = SwInstallOutput { version: worker.config().version.clone(), state: worker.state().await, installed };
    reply(host, output).await
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &ServiceWorker, host: &PageHost) -> Result<CallToolResult, McpError> {
    let activated = worker.activate().await?;
    let output = SwActivateOutput { version: worker.config().version.clone(), state: worker.state().await, activated };
    reply(host, output).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Reply;
    use crate::tools::testing::{INDEX, ORIGIN, fixture, output};
    use aquanev_worker::{ClientKind, HostEffect};

    #[tokio::test]
    async fn test_install_reports_failed_assets() {
        let (worker, host) = fixture(&[(INDEX, 200, "index")]).await;

        let result = install_impl(&worker, &host).await.unwrap();
        let reply: Reply<SwInstallOutput> = output(&result);
        assert_eq!(reply.result.state, WorkerState::Installed);
        assert_eq!(reply.result.installed.report.cached, vec![INDEX]);
        assert_eq!(reply.result.installed.report.failed.len(), 1);
        assert_eq!(reply.result.installed.report.failed[0].url, ORIGIN);
        assert!(reply.result.installed.activated.is_none());
    }

    #[tokio::test]
    async fn test_activate_claims_clients() {
        let (worker, host) = fixture(&[(ORIGIN, 200, "root"), (INDEX, 200, "index")]).await;
        host.connect(INDEX, ClientKind::Window, false).await;
        install_impl(&worker, &host).await.unwrap();

        let result = activate_impl(&worker, &host).await.unwrap();
        let reply: Reply<SwActivateOutput> = output(&result);
        assert_eq!(reply.result.state, WorkerState::Activated);
        assert_eq!(reply.result.activated.claimed, 1);
        assert_eq!(reply.effects, vec![HostEffect::Claimed { clients: 1 }]);
    }

    #[tokio::test]
    async fn test_activate_before_install_fails() {
        let (worker, host) = fixture(&[]).await;
        assert!(activate_impl(&worker, &host).await.is_err());
    }
}

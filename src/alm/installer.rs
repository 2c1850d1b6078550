use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::ReconcileError;

/// Applies deployment manifests to a namespace.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeploymentInstaller: Send + Sync + 'static {
    async fn install(
        &self,
        namespace: &str,
        deployments: &[Value],
    ) -> Result<(), ReconcileError>;
}

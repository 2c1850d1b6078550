use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;

use super::DeploymentInstaller;
use super::InstallStrategy;
use super::OperatorVersion;
use crate::ReconcileError;
use crate::Reconciler;
use crate::Resource;
use crate::ResourceKey;
use crate::RuntimeConfig;
use crate::UnsupportedStrategyPolicy;

/// Installs each cached [`OperatorVersion`] with its declared strategy.
pub struct OperatorVersionReconciler {
    installer: Arc<dyn DeploymentInstaller>,
    unsupported: UnsupportedStrategyPolicy,
}

impl OperatorVersionReconciler {
    pub fn new(
        installer: Arc<dyn DeploymentInstaller>,
        unsupported: UnsupportedStrategyPolicy,
    ) -> Self {
        Self {
            installer,
            unsupported,
        }
    }

    pub fn from_config(
        installer: Arc<dyn DeploymentInstaller>,
        config: &RuntimeConfig,
    ) -> Self {
        Self::new(installer, config.unsupported_strategy)
    }
}

#[async_trait]
impl Reconciler<OperatorVersion> for OperatorVersionReconciler {
    async fn reconcile(
        &self,
        key: &ResourceKey,
        obj: Arc<OperatorVersion>,
    ) -> Result<(), ReconcileError> {
        info!(%key, "sync OperatorVersion");

        match InstallStrategy::from_unstructured(&obj.spec.install_strategy)? {
            InstallStrategy::Deployment(strategy) => {
                let namespace = obj
                    .namespace()
                    .ok_or_else(|| ReconcileError::cast("OperatorVersion", "cluster-scoped object has no install namespace"))?;
                debug!(%key, namespace, deployments = strategy.deployments.len(), "installing deployments");
                self.installer.install(namespace, &strategy.deployments).await
            }
            InstallStrategy::Unsupported(name) => match self.unsupported {
                UnsupportedStrategyPolicy::Reject => Err(ReconcileError::UnsupportedStrategy(name)),
                UnsupportedStrategyPolicy::Ignore => {
                    debug!(%key, strategy = %name, "ignoring unsupported install strategy");
                    Ok(())
                }
            },
        }
    }

    async fn cleanup(
        &self,
        key: &ResourceKey,
    ) -> Result<(), ReconcileError> {
        info!(%key, "OperatorVersion removed, nothing to uninstall");
        Ok(())
    }
}

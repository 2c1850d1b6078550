use serde_json::Value;

use crate::constants::DEPLOYMENTS_FIELD;
use crate::constants::DEPLOYMENT_STRATEGY;
use crate::constants::STRATEGY_FIELD;
use crate::ReconcileError;

/// Decoded `spec.installStrategy`.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallStrategy {
    Deployment(DeploymentStrategy),
    /// Any other discriminator, kept verbatim
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeploymentStrategy {
    /// Deployment manifests, handed to the installer untouched
    pub deployments: Vec<Value>,
}

impl InstallStrategy {
    /// Decodes `{"strategy": "<name>", ...}`.
    ///
    /// The payload has to be an object with a string `strategy`; for the
    /// deployment strategy `deployments` has to be an array.
    pub fn from_unstructured(install: &Value) -> Result<Self, ReconcileError> {
        let fields = install
            .as_object()
            .ok_or_else(|| ReconcileError::cast("install strategy", format!("expected an object, got {install}")))?;

        let strategy = match fields.get(STRATEGY_FIELD) {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => return Err(ReconcileError::cast("strategy", format!("expected a string, got {other}"))),
            None => return Err(ReconcileError::cast("strategy", "field is missing")),
        };

        if strategy != DEPLOYMENT_STRATEGY {
            return Ok(Self::Unsupported(strategy.to_string()));
        }

        match fields.get(DEPLOYMENTS_FIELD) {
            Some(Value::Array(deployments)) => Ok(Self::Deployment(DeploymentStrategy {
                deployments: deployments.clone(),
            })),
            Some(other) => Err(ReconcileError::cast("deployments", format!("expected an array, got {other}"))),
            None => Err(ReconcileError::cast("deployments", "field is missing")),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Deployment(_) => DEPLOYMENT_STRATEGY,
            Self::Unsupported(name) => name,
        }
    }
}

use std::sync::Arc;

use serde_json::json;
use serde_json::Value;

use super::MockDeploymentInstaller;
use super::OperatorVersion;
use super::OperatorVersionReconciler;
use crate::test_utils::enable_logger;
use crate::ObjectMeta;
use crate::ReconcileError;
use crate::Reconciler;
use crate::Resource;
use crate::ResourceKey;
use crate::RuntimeConfig;
use crate::UnsupportedStrategyPolicy;

fn operator_version(
    namespace: &str,
    name: &str,
    install: Value,
) -> Arc<OperatorVersion> {
    Arc::new(OperatorVersion::new(ObjectMeta::namespaced(namespace, name), install))
}

fn key(s: &str) -> ResourceKey {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_deployment_strategy_installs_into_object_namespace() {
    enable_logger();
    let deployments = vec![json!({"name": "etcd-operator"})];
    let mut installer = MockDeploymentInstaller::new();
    installer
        .expect_install()
        .withf(|namespace, deployments| namespace == "ns1" && deployments.len() == 1)
        .times(1)
        .returning(|_, _| Ok(()));

    let reconciler = OperatorVersionReconciler::new(Arc::new(installer), UnsupportedStrategyPolicy::Reject);
    let obj = operator_version("ns1", "foo", json!({"strategy": "deployment", "deployments": deployments}));

    reconciler.reconcile(&key("ns1/foo"), obj).await.unwrap();
}

#[tokio::test]
async fn test_install_failure_is_propagated() {
    let mut installer = MockDeploymentInstaller::new();
    installer
        .expect_install()
        .times(1)
        .returning(|namespace, _| Err(ReconcileError::install(namespace, "quota exceeded")));

    let reconciler = OperatorVersionReconciler::new(Arc::new(installer), UnsupportedStrategyPolicy::Reject);
    let obj = operator_version("ns1", "foo", json!({"strategy": "deployment", "deployments": []}));

    let err = reconciler.reconcile(&key("ns1/foo"), obj).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Install { ref namespace, .. } if namespace == "ns1"));
}

#[tokio::test]
async fn test_unsupported_strategy_is_rejected_by_default() {
    let mut installer = MockDeploymentInstaller::new();
    installer.expect_install().never();

    let reconciler = OperatorVersionReconciler::from_config(Arc::new(installer), &RuntimeConfig::default());
    let obj = operator_version("ns1", "foo", json!({"strategy": "helm"}));

    let err = reconciler.reconcile(&key("ns1/foo"), obj).await.unwrap_err();
    assert!(matches!(err, ReconcileError::UnsupportedStrategy(ref name) if name == "helm"));
}

#[tokio::test]
async fn test_unsupported_strategy_succeeds_when_ignored() {
    let mut installer = MockDeploymentInstaller::new();
    installer.expect_install().never();

    let reconciler = OperatorVersionReconciler::new(Arc::new(installer), UnsupportedStrategyPolicy::Ignore);
    let obj = operator_version("ns1", "foo", json!({"strategy": "helm"}));

    reconciler.reconcile(&key("ns1/foo"), obj).await.unwrap();
}

#[tokio::test]
async fn test_malformed_payload_is_a_cast_error() {
    let mut installer = MockDeploymentInstaller::new();
    installer.expect_install().never();

    let reconciler = OperatorVersionReconciler::new(Arc::new(installer), UnsupportedStrategyPolicy::Ignore);
    let obj = operator_version("ns1", "foo", json!({"strategy": 7}));

    let err = reconciler.reconcile(&key("ns1/foo"), obj).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Cast { what: "strategy", .. }));
}

#[tokio::test]
async fn test_cluster_scoped_object_cannot_be_installed() {
    let mut installer = MockDeploymentInstaller::new();
    installer.expect_install().never();

    let reconciler = OperatorVersionReconciler::new(Arc::new(installer), UnsupportedStrategyPolicy::Reject);
    let obj = Arc::new(OperatorVersion::new(
        ObjectMeta::cluster_scoped("global"),
        json!({"strategy": "deployment", "deployments": []}),
    ));

    let err = reconciler.reconcile(&key("global"), obj).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Cast { what: "OperatorVersion", .. }));
}

#[tokio::test]
async fn test_empty_namespace_is_treated_as_cluster_scoped() {
    let mut installer = MockDeploymentInstaller::new();
    installer.expect_install().never();

    let reconciler = OperatorVersionReconciler::new(Arc::new(installer), UnsupportedStrategyPolicy::Reject);
    let obj = OperatorVersion::new(
        ObjectMeta::namespaced("", "foo"),
        json!({"strategy": "deployment", "deployments": [{"name": "op"}]}),
    );
    let obj_key = obj.key().unwrap();
    assert_eq!(obj_key.to_string(), "foo");

    let err = reconciler.reconcile(&obj_key, Arc::new(obj)).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Cast { what: "OperatorVersion", .. }));
}

#[tokio::test]
async fn test_cleanup_succeeds_without_installer_calls() {
    let mut installer = MockDeploymentInstaller::new();
    installer.expect_install().never();

    let reconciler = OperatorVersionReconciler::new(Arc::new(installer), UnsupportedStrategyPolicy::Reject);

    Reconciler::<OperatorVersion>::cleanup(&reconciler, &key("ns1/foo")).await.unwrap();
}

#[test]
fn test_operator_version_deserializes_from_camel_case() {
    let obj: OperatorVersion = serde_json::from_value(json!({
        "metadata": {"name": "foo", "namespace": "ns1", "resourceVersion": "12"},
        "spec": {"installStrategy": {"strategy": "deployment", "deployments": []}},
    }))
    .unwrap();

    assert_eq!(obj.metadata.resource_version, "12");
    assert_eq!(obj.spec.install_strategy["strategy"], json!("deployment"));
}


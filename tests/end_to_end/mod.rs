use std::sync::Arc;
use std::time::Duration;

use alm_controller::ControllerBuilder;
use alm_controller::ControllerConfig;
use alm_controller::ControllerState;
use alm_controller::InMemoryWatchSource;
use alm_controller::OperatorVersion;
use alm_controller::OperatorVersionReconciler;
use alm_controller::RateLimitedSource;
use alm_controller::Resource;
use alm_controller::UnsupportedStrategyPolicy;
use serde_json::json;
use tokio::sync::watch;

use crate::common::deployment_operator_version;
use crate::common::key;
use crate::common::operator_version_with_strategy;
use crate::common::wait_until;
use crate::common::RecordingInstaller;
use crate::common::RecordingRateLimiter;
use crate::enable_logger;

type Source = InMemoryWatchSource<OperatorVersion>;

fn config(policy: UnsupportedStrategyPolicy) -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.controller.name = "alm-e2e".to_string();
    config.controller.workers = 2;
    config.controller.unsupported_strategy = policy;
    config
}

#[tokio::test(start_paused = true)]
async fn test_added_operator_version_is_installed_and_forgotten() {
    enable_logger();
    let source = Arc::new(Source::new());
    let installer = Arc::new(RecordingInstaller::default());
    let config = config(UnsupportedStrategyPolicy::Reject);
    let reconciler = Arc::new(OperatorVersionReconciler::from_config(installer.clone(), &config.controller));
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let controller = ControllerBuilder::<OperatorVersion, _>::new(config, source.clone(), reconciler, shutdown_rx)
        .build()
        .unwrap();
    let queue = controller.queue();
    let state = controller.state();
    let store = controller.store();
    let handle = tokio::spawn(controller.run());

    wait_until("running", || *state.borrow() == ControllerState::Running).await;
    source.apply(deployment_operator_version("ns1", "foo")).unwrap();

    wait_until("install", || installer.calls().len() == 1).await;
    let (namespace, deployments) = installer.calls().remove(0);
    assert_eq!(namespace, "ns1");
    assert_eq!(deployments, vec![json!({"name": "foo-operator", "replicas": 1})]);

    let foo = key("ns1/foo");
    wait_until("done", || !queue.is_processing(&foo)).await;
    assert_eq!(queue.num_requeues(&foo), 0);
    assert!(!queue.is_pending(&foo));
    assert_eq!(store.get_by_key("ns1/foo").unwrap().unwrap().name(), "foo");

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(*state.borrow(), ControllerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_failing_install_is_retried_with_increasing_delays() {
    enable_logger();
    let source = Arc::new(Source::new());
    source.apply(deployment_operator_version("ns1", "foo")).unwrap();
    let installer = Arc::new(RecordingInstaller::failing(2));
    let limiter = Arc::new(RecordingRateLimiter::new(Duration::from_millis(5), Duration::from_secs(1000)));
    let config = config(UnsupportedStrategyPolicy::Reject);
    let reconciler = Arc::new(OperatorVersionReconciler::from_config(installer.clone(), &config.controller));
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let controller = ControllerBuilder::<OperatorVersion, _>::new(config, source, reconciler, shutdown_rx)
        .rate_limiter(limiter.clone())
        .build()
        .unwrap();
    let queue = controller.queue();
    let handle = tokio::spawn(controller.run());

    wait_until("third install", || installer.calls().len() == 3).await;
    let foo = key("ns1/foo");
    wait_until("forgotten", || queue.num_requeues(&foo) == 0 && !queue.is_processing(&foo)).await;

    let delays = limiter.delays();
    assert_eq!(delays, vec![Duration::from_millis(5), Duration::from_millis(10)]);
    assert!(delays[0] < delays[1]);

    // Quiescent: nothing scheduled, nothing pending, no further installs
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(installer.calls().len(), 3);
    assert_eq!(queue.waiting_len(), 0);
    assert!(queue.is_empty());

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_strategy_policies() {
    enable_logger();
    for (policy, expect_retry) in [
        (UnsupportedStrategyPolicy::Ignore, false),
        (UnsupportedStrategyPolicy::Reject, true),
    ] {
        let source = Arc::new(Source::new());
        source.apply(operator_version_with_strategy("ns1", "helm-based", "helm")).unwrap();
        let installer = Arc::new(RecordingInstaller::default());
        let config = config(policy);
        let reconciler = Arc::new(OperatorVersionReconciler::from_config(installer.clone(), &config.controller));
        let limiter = Arc::new(RecordingRateLimiter::new(Duration::from_millis(5), Duration::from_secs(1)));
        let (shutdown_tx, shutdown_rx) = watch::channel(());

        let controller = ControllerBuilder::<OperatorVersion, _>::new(config, source, reconciler, shutdown_rx)
            .rate_limiter(limiter.clone())
            .build()
            .unwrap();
        let handle = tokio::spawn(controller.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(installer.calls().is_empty(), "{policy:?}");
        assert_eq!(!limiter.delays().is_empty(), expect_retry, "{policy:?}");

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_source_drives_controller() {
    enable_logger();
    let inner = Arc::new(Source::new());
    inner.apply(deployment_operator_version("ns1", "foo")).unwrap();
    inner.apply(deployment_operator_version("ns2", "bar")).unwrap();
    let config = config(UnsupportedStrategyPolicy::Reject);
    let source = Arc::new(RateLimitedSource::new(inner.clone(), &config.watch));
    let installer = Arc::new(RecordingInstaller::default());
    let reconciler = Arc::new(OperatorVersionReconciler::from_config(installer.clone(), &config.controller));
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let controller = ControllerBuilder::<OperatorVersion, _>::new(config, source, reconciler, shutdown_rx)
        .build()
        .unwrap();
    let handle = tokio::spawn(controller.run());

    wait_until("both installed", || installer.calls().len() == 2).await;
    let mut namespaces: Vec<String> = installer.calls().into_iter().map(|(ns, _)| ns).collect();
    namespaces.sort();
    assert_eq!(namespaces, vec!["ns1", "ns2"]);

    inner.delete(&key("ns1/foo")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(installer.calls().len(), 2);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

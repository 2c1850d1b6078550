use std::time::Duration;

use alm_controller::DeploymentInstaller;
use alm_controller::ItemExponentialFailureRateLimiter;
use alm_controller::ObjectMeta;
use alm_controller::OperatorVersion;
use alm_controller::RateLimiter;
use alm_controller::ReconcileError;
use alm_controller::ResourceKey;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use serde_json::Value;

pub fn deployment_operator_version(
    namespace: &str,
    name: &str,
) -> OperatorVersion {
    OperatorVersion::new(
        ObjectMeta::namespaced(namespace, name),
        json!({
            "strategy": "deployment",
            "deployments": [{"name": format!("{name}-operator"), "replicas": 1}],
        }),
    )
}

pub fn operator_version_with_strategy(
    namespace: &str,
    name: &str,
    strategy: &str,
) -> OperatorVersion {
    OperatorVersion::new(ObjectMeta::namespaced(namespace, name), json!({ "strategy": strategy }))
}

/// Installer that records calls and fails the first `failures` of them.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    failures: Mutex<u32>,
}

impl RecordingInstaller {
    pub fn failing(failures: u32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(failures),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl DeploymentInstaller for RecordingInstaller {
    async fn install(
        &self,
        namespace: &str,
        deployments: &[Value],
    ) -> Result<(), ReconcileError> {
        self.calls.lock().push((namespace.to_string(), deployments.to_vec()));

        let mut failures = self.failures.lock();
        if *failures > 0 {
            *failures -= 1;
            return Err(ReconcileError::install(namespace, "injected install failure"));
        }
        Ok(())
    }
}

/// Exponential per-key backoff that remembers every delay it handed out.
pub struct RecordingRateLimiter {
    inner: ItemExponentialFailureRateLimiter<ResourceKey>,
    delays: Mutex<Vec<Duration>>,
}

impl RecordingRateLimiter {
    pub fn new(
        base: Duration,
        max: Duration,
    ) -> Self {
        Self {
            inner: ItemExponentialFailureRateLimiter::new(base, max),
            delays: Mutex::new(Vec::new()),
        }
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

impl RateLimiter<ResourceKey> for RecordingRateLimiter {
    fn when(
        &self,
        item: &ResourceKey,
    ) -> Duration {
        let delay = self.inner.when(item);
        self.delays.lock().push(delay);
        delay
    }

    fn forget(
        &self,
        item: &ResourceKey,
    ) {
        self.inner.forget(item);
    }

    fn num_requeues(
        &self,
        item: &ResourceKey,
    ) -> u32 {
        self.inner.num_requeues(item)
    }
}

/// Polls `condition` until it holds. Panics after ten (virtual) seconds.
pub async fn wait_until<F>(
    what: &str,
    condition: F,
) where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn key(s: &str) -> ResourceKey {
    s.parse().expect("valid key")
}

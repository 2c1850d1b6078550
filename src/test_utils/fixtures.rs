use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::DeletedObject;
use crate::ObjectMeta;
use crate::ReconcileError;
use crate::Reconciler;
use crate::Resource;
use crate::ResourceEventHandler;
use crate::ResourceKey;

/// Minimal watched object.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPod {
    pub metadata: ObjectMeta,
    pub image: String,
}

impl Resource for TestPod {
    const KIND: &'static str = "TestPod";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

pub fn pod(
    namespace: &str,
    name: &str,
) -> TestPod {
    TestPod {
        metadata: ObjectMeta::namespaced(namespace, name),
        image: "busybox:1".to_string(),
    }
}

pub fn cluster_pod(name: &str) -> TestPod {
    TestPod {
        metadata: ObjectMeta::cluster_scoped(name),
        image: "busybox:1".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Add(String),
    /// key, old version, new version
    Update(String, String, String),
    Delete { key: String, tombstone: bool },
}

/// Event handler that remembers every notification.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

fn key_of<K: Resource>(obj: &K) -> String {
    obj.key().map(|k| k.to_string()).unwrap_or_default()
}

impl<K: Resource> ResourceEventHandler<K> for RecordingHandler {
    fn on_add(
        &self,
        obj: &Arc<K>,
    ) {
        self.events.lock().push(Recorded::Add(key_of(obj.as_ref())));
    }

    fn on_update(
        &self,
        old: &Arc<K>,
        new: &Arc<K>,
    ) {
        self.events.lock().push(Recorded::Update(
            key_of(new.as_ref()),
            old.resource_version().to_string(),
            new.resource_version().to_string(),
        ));
    }

    fn on_delete(
        &self,
        obj: &DeletedObject<K>,
    ) {
        let key = obj.key().map(|k| k.to_string()).unwrap_or_default();
        let tombstone = matches!(obj, DeletedObject::FinalStateUnknown { .. });
        self.events.lock().push(Recorded::Delete { key, tombstone });
    }
}

/// Reconciler that records calls and fails selected keys a number of times.
#[derive(Debug, Default)]
pub struct RecordingReconciler {
    reconciled: Mutex<Vec<String>>,
    cleaned: Mutex<Vec<String>>,
    failures_left: Mutex<HashMap<String, u32>>,
    delay: Option<Duration>,
    in_flight: Mutex<HashSet<String>>,
    overlap: AtomicBool,
}

impl RecordingReconciler {
    pub fn failing(
        key: &str,
        times: u32,
    ) -> Self {
        let reconciler = Self::default();
        reconciler.failures_left.lock().insert(key.to_string(), times);
        reconciler
    }

    /// Every reconcile sleeps for `delay` before returning.
    pub fn with_delay(
        mut self,
        delay: Duration,
    ) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reconciled(&self) -> Vec<String> {
        self.reconciled.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.reconciled.lock().len()
    }

    pub fn cleaned(&self) -> Vec<String> {
        self.cleaned.lock().clone()
    }

    /// True if two reconciles of the same key ever ran concurrently.
    pub fn saw_overlap(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<K: Resource> Reconciler<K> for RecordingReconciler {
    async fn reconcile(
        &self,
        key: &ResourceKey,
        _obj: Arc<K>,
    ) -> Result<(), ReconcileError> {
        let key = key.to_string();
        let fresh = self.in_flight.lock().insert(key.clone());
        if !fresh {
            self.overlap.store(true, Ordering::SeqCst);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.lock().remove(&key);
        self.reconciled.lock().push(key.clone());

        let mut failures = self.failures_left.lock();
        match failures.get_mut(&key) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(ReconcileError::Handler(format!("injected failure for {key}")))
            }
            _ => Ok(()),
        }
    }

    async fn cleanup(
        &self,
        key: &ResourceKey,
    ) -> Result<(), ReconcileError> {
        self.cleaned.lock().push(key.to_string());
        Ok(())
    }
}

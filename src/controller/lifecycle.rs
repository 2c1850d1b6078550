//! Startup handshake, worker supervision and coordinated shutdown.
//!
//! ```text
//! Initializing -> Connecting -> Running -> ShuttingDown -> Stopped
//!                     |                                      ^
//!                     +------ stop signal / probe failure ---+
//! ```

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ErrorReporter;
use super::Reconciler;
use super::Worker;
use crate::utils::async_task::spawn_task;
use crate::ConnectivityError;
use crate::ControllerConfig;
use crate::Informer;
use crate::RateLimitingQueue;
use crate::Resource;
use crate::ResourceKey;
use crate::Result;
use crate::Store;
use crate::WatchSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Initializing,
    Connecting,
    Running,
    ShuttingDown,
    Stopped,
}

/// Owns the informer, the queue and the worker pool of one object kind.
///
/// Built by [`crate::ControllerBuilder`]; consumed by [`Controller::run`].
pub struct Controller<K: Resource, S: WatchSource<K>> {
    pub(super) config: ControllerConfig,
    pub(super) source: Arc<S>,
    pub(super) informer: Arc<Informer<K, S>>,
    pub(super) queue: Arc<RateLimitingQueue<ResourceKey>>,
    pub(super) reconciler: Arc<dyn Reconciler<K>>,
    pub(super) reporter: Arc<dyn ErrorReporter>,
    pub(super) state_tx: watch::Sender<ControllerState>,
    pub(super) shutdown_signal: watch::Receiver<()>,
}

impl<K: Resource, S: WatchSource<K>> Controller<K, S> {
    /// Subscribes to state transitions.
    pub fn state(&self) -> watch::Receiver<ControllerState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> ControllerState {
        *self.state_tx.borrow()
    }

    pub fn queue(&self) -> Arc<RateLimitingQueue<ResourceKey>> {
        self.queue.clone()
    }

    pub fn store(&self) -> Arc<Store<K>> {
        self.informer.store()
    }

    pub fn has_synced(&self) -> bool {
        self.informer.has_synced()
    }

    /// Runs the controller until the stop signal fires.
    ///
    /// Only a failed startup handshake is returned as an error; reconcile
    /// failures are retried and reported. The queue is shut down on every
    /// exit path.
    pub async fn run(self) -> Result<()> {
        let mut shutdown = self.shutdown_signal.clone();
        let result = self.run_phases(&mut shutdown).await;

        self.queue.shut_down();
        self.set_state(ControllerState::Stopped);
        match &result {
            Ok(()) => info!(controller = %self.config.controller.name, "controller stopped"),
            Err(e) => warn!(controller = %self.config.controller.name, %e, "controller stopped with error"),
        }
        result
    }

    async fn run_phases(
        &self,
        shutdown: &mut watch::Receiver<()>,
    ) -> Result<()> {
        let name = self.config.controller.name.as_str();

        // Phase 1: Connecting
        self.set_state(ControllerState::Connecting);
        let probe_timeout = self.config.controller.probe_timeout();
        let version = tokio::select! {
            biased;
            _ = shutdown.changed() => {
                info!(controller = %name, "stop signal before connecting");
                return Ok(());
            }
            probe = timeout(probe_timeout, self.source.server_version()) => match probe {
                Ok(Ok(version)) => version,
                Ok(Err(source)) => return Err(ConnectivityError::Handshake { source }.into()),
                Err(_) => return Err(ConnectivityError::ProbeTimeout(probe_timeout).into()),
            },
        };
        info!(controller = %name, %version, "connected to watch source");

        // Phase 2: Running
        self.set_state(ControllerState::Running);
        let informer_handle = spawn_task("informer", self.informer.clone().run(shutdown.clone()));

        let cancel = CancellationToken::new();
        let mut workers = Vec::new();
        let synced = tokio::select! {
            _ = shutdown.changed() => false,
            _ = self.informer.wait_for_sync() => true,
        };
        if synced {
            let handler_timeout = self.config.controller.handler_timeout();
            info!(controller = %name, workers = self.config.controller.workers, "cache synced, starting workers");
            for id in 0..self.config.controller.workers {
                let worker = Worker::new(
                    id,
                    self.queue.clone(),
                    self.informer.store(),
                    self.reconciler.clone(),
                    self.reporter.clone(),
                    handler_timeout,
                    cancel.clone(),
                );
                workers.push(spawn_task(&format!("worker-{id}"), worker.run()));
            }

            // Blocks until the stop signal, or the sender going away
            let _ = shutdown.changed().await;
        } else {
            info!(controller = %name, "stop signal before initial sync");
        }

        // Phase 3: ShuttingDown
        self.set_state(ControllerState::ShuttingDown);
        self.queue.shut_down();

        let grace = self.config.controller.shutdown_grace_period();
        let joined = join_all(workers);
        tokio::pin!(joined);
        let results = match timeout(grace, &mut joined).await {
            Ok(results) => results,
            Err(_) => {
                warn!(controller = %name, ?grace, "grace period expired, cancelling in-flight handlers");
                cancel.cancel();
                joined.await
            }
        };
        for result in results {
            result?;
        }
        debug!(controller = %name, "workers joined");

        informer_handle.await?;
        Ok(())
    }

    fn set_state(
        &self,
        state: ControllerState,
    ) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(controller = %self.config.controller.name, ?previous, ?state, "state transition");
        }
    }
}

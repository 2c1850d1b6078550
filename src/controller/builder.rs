//! A builder pattern implementation for constructing a [`Controller`].
//!
//! The [`ControllerBuilder`] wires the components of one controller:
//! watch source, informer with its store, rate-limited queue, event
//! dispatcher, reconciler and error reporter.
//!
//! ## Key Design Points
//! - **Default Components**: [`default_controller_rate_limiter`] tuned by
//!   [`crate::QueueConfig`] and a [`TracingErrorReporter`].
//! - **Customization**: `rate_limiter()`, `error_reporter()` and
//!   `event_handler()` override or extend the defaults.
//! - **Validation**: `build()` validates the configuration before anything
//!   is spawned.
//!
//! ## Example
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let controller = ControllerBuilder::new(config, source, reconciler, shutdown_rx)
//!     .error_reporter(my_reporter) // Optional override
//!     .build()?;
//! tokio::spawn(controller.run());
//! ```
//!
//! `build()` must be called inside a Tokio runtime: the queue starts its
//! delay timer immediately.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::Controller;
use super::ControllerState;
use super::ErrorReporter;
use super::EventDispatcher;
use super::Reconciler;
use super::TracingErrorReporter;
use crate::default_controller_rate_limiter;
use crate::metrics;
use crate::ControllerConfig;
use crate::Informer;
use crate::RateLimiter;
use crate::RateLimitingQueue;
use crate::Resource;
use crate::ResourceEventHandler;
use crate::ResourceKey;
use crate::Result;
use crate::WatchSource;

pub struct ControllerBuilder<K: Resource, S: WatchSource<K>> {
    config: ControllerConfig,
    source: Arc<S>,
    reconciler: Arc<dyn Reconciler<K>>,
    shutdown_signal: watch::Receiver<()>,
    rate_limiter: Option<Arc<dyn RateLimiter<ResourceKey>>>,
    error_reporter: Option<Arc<dyn ErrorReporter>>,
    event_handlers: Vec<Arc<dyn ResourceEventHandler<K>>>,
}

impl<K: Resource, S: WatchSource<K>> ControllerBuilder<K, S> {
    /// # Arguments
    /// * `config` - Validated by `build()`
    /// * `source` - Shared with the informer and the startup probe
    /// * `shutdown_signal` - Sending on (or dropping) the paired sender stops the controller
    pub fn new(
        config: ControllerConfig,
        source: Arc<S>,
        reconciler: Arc<dyn Reconciler<K>>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            source,
            reconciler,
            shutdown_signal,
            rate_limiter: None,
            error_reporter: None,
            event_handlers: Vec::new(),
        }
    }

    /// Replaces the default per-key retry policy.
    pub fn rate_limiter(
        mut self,
        rate_limiter: Arc<dyn RateLimiter<ResourceKey>>,
    ) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn error_reporter(
        mut self,
        error_reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        self.error_reporter = Some(error_reporter);
        self
    }

    /// Registers an additional cache observer next to the dispatcher.
    pub fn event_handler(
        mut self,
        handler: Arc<dyn ResourceEventHandler<K>>,
    ) -> Self {
        self.event_handlers.push(handler);
        self
    }

    pub fn build(self) -> Result<Controller<K, S>> {
        let config = self.config.validate()?;
        metrics::register_custom_metrics();

        let name = config.controller.name.clone();
        let rate_limiter: Arc<dyn RateLimiter<ResourceKey>> = match self.rate_limiter {
            Some(rate_limiter) => rate_limiter,
            None => Arc::new(default_controller_rate_limiter(&config.queue)),
        };
        let queue = Arc::new(RateLimitingQueue::new(name.clone(), rate_limiter));

        let mut informer = Informer::new(self.source.clone(), &config.watch);
        informer.add_event_handler(Arc::new(EventDispatcher::new(queue.clone())));
        for handler in self.event_handlers {
            informer.add_event_handler(handler);
        }

        let error_reporter: Arc<dyn ErrorReporter> = match self.error_reporter {
            Some(error_reporter) => error_reporter,
            None => Arc::new(TracingErrorReporter::new(name.clone())),
        };

        let (state_tx, _) = watch::channel(ControllerState::Initializing);
        debug!(controller = %name, kind = K::KIND, workers = config.controller.workers, "controller built");

        Ok(Controller {
            config,
            source: self.source,
            informer: Arc::new(informer),
            queue,
            reconciler: self.reconciler,
            reporter: error_reporter,
            state_tx,
            shutdown_signal: self.shutdown_signal,
        })
    }
}

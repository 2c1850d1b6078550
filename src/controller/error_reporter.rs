use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

#[cfg(test)]
use mockall::automock;
use tracing::error;

use crate::metrics::RECONCILE_ERRORS_METRIC;
use crate::Error;

/// Sink for every non-fatal error of a controller.
#[cfg_attr(test, automock)]
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(
        &self,
        context: &str,
        err: &Error,
    );
}

/// Logs with `tracing::error!` and counts per controller.
#[derive(Debug)]
pub struct TracingErrorReporter {
    name: String,
    reported: AtomicU64,
}

impl TracingErrorReporter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reported: AtomicU64::new(0),
        }
    }

    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }
}

impl ErrorReporter for TracingErrorReporter {
    fn report(
        &self,
        context: &str,
        err: &Error,
    ) {
        self.reported.fetch_add(1, Ordering::Relaxed);
        RECONCILE_ERRORS_METRIC.with_label_values(&[self.name.as_str()]).inc();
        error!(controller = %self.name, context, %err, "reconcile error");
    }
}

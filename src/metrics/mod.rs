use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::warn;

lazy_static! {
    pub static ref QUEUE_DEPTH_METRIC: IntGaugeVec = IntGaugeVec::new(
        Opts::new("workqueue_depth", "Current number of keys waiting in the queue"),
        &["name"]
    )
    .expect("metric can not be created");

    pub static ref QUEUE_ADDS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("workqueue_adds_total", "Keys admitted to the queue"),
        &["name"]
    )
    .expect("metric can not be created");

    pub static ref QUEUE_RETRIES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("workqueue_retries_total", "Rate limited re-insertions"),
        &["name"]
    )
    .expect("metric can not be created");

    pub static ref WORK_DURATION_METRIC: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "workqueue_work_duration_seconds",
            "Time between get and done of a key"
        )
        .buckets(exponential_buckets(0.001, 2.0, 16).expect("valid buckets")),
        &["name"]
    )
    .expect("metric can not be created");

    pub static ref RECONCILE_ERRORS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("reconcile_errors_total", "Non-fatal errors funnelled through the reporter"),
        &["name"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

/// Registers all controller collectors with [`REGISTRY`]. Idempotent.
pub fn register_custom_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(QUEUE_DEPTH_METRIC.clone()),
            Box::new(QUEUE_ADDS_METRIC.clone()),
            Box::new(QUEUE_RETRIES_METRIC.clone()),
            Box::new(WORK_DURATION_METRIC.clone()),
            Box::new(RECONCILE_ERRORS_METRIC.clone()),
        ];
        for c in collectors {
            if let Err(e) = REGISTRY.register(c) {
                warn!("collector can not be registered: {}", e);
            }
        }
    });
}

/// Export metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;

    register_custom_metrics();
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("could not encode custom metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

//! Prometheus metrics backend for hashgraph intake.
//!
//! Implements [`hashgraph_metrics::MetricsRecorder`] using native Prometheus
//! counters and gauges.
//!
//! # Usage
//!
//! Call [`install()`] once at startup before any metrics are recorded:
//! ```ignore
//! hashgraph_metrics_prometheus::install();
//! ```

use hashgraph_metrics::MetricsRecorder;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter,
    CounterVec, Gauge, GaugeVec,
};

/// Domain-specific Prometheus metrics.
pub struct Metrics {
    // === Orphan buffer ===
    pub orphan_count: Gauge,
    pub events_unorphaned: Counter,
    pub ancient_events_discarded: Counter,
    pub duplicate_events: Counter,
    pub window_regressions: Counter,
    pub ancient_threshold: Gauge,

    // === Scheduler ===
    pub scheduler_unprocessed_tasks: GaugeVec,
    pub scheduler_tasks_squelched: CounterVec,
    pub scheduler_offers_rejected: CounterVec,
}

impl Metrics {
    fn new() -> Self {
        Self {
            // Orphan buffer
            orphan_count: register_gauge!(
                "hashgraph_orphan_count",
                "Events buffered waiting for parents"
            )
            .unwrap(),

            events_unorphaned: register_counter!(
                "hashgraph_events_unorphaned_total",
                "Events released by the orphan buffer"
            )
            .unwrap(),

            ancient_events_discarded: register_counter!(
                "hashgraph_ancient_events_discarded_total",
                "Events discarded because they were ancient on arrival"
            )
            .unwrap(),

            duplicate_events: register_counter!(
                "hashgraph_duplicate_events_total",
                "Events rejected because the buffer had already seen them"
            )
            .unwrap(),

            window_regressions: register_counter!(
                "hashgraph_window_regressions_total",
                "Event windows rejected because the ancient threshold moved backwards"
            )
            .unwrap(),

            ancient_threshold: register_gauge!(
                "hashgraph_ancient_threshold",
                "Current ancient threshold"
            )
            .unwrap(),

            // Scheduler
            scheduler_unprocessed_tasks: register_gauge_vec!(
                "hashgraph_scheduler_unprocessed_tasks",
                "Tasks submitted to a scheduler and not yet handled",
                &["scheduler"]
            )
            .unwrap(),

            scheduler_tasks_squelched: register_counter_vec!(
                "hashgraph_scheduler_tasks_squelched_total",
                "Tasks discarded while the scheduler was squelching",
                &["scheduler"]
            )
            .unwrap(),

            scheduler_offers_rejected: register_counter_vec!(
                "hashgraph_scheduler_offers_rejected_total",
                "Offers refused because the scheduler was at capacity",
                &["scheduler"]
            )
            .unwrap(),
        }
    }
}

/// Prometheus-backed recorder.
pub struct PrometheusRecorder {
    metrics: Metrics,
}

impl PrometheusRecorder {
    fn new() -> Self {
        Self {
            metrics: Metrics::new(),
        }
    }
}

impl MetricsRecorder for PrometheusRecorder {
    // ── Orphan buffer ────────────────────────────────────────────────

    fn set_orphan_count(&self, count: usize) {
        self.metrics.orphan_count.set(count as f64);
    }

    fn record_events_unorphaned(&self, count: usize) {
        self.metrics.events_unorphaned.inc_by(count as f64);
    }

    fn record_ancient_event_discarded(&self) {
        self.metrics.ancient_events_discarded.inc();
    }

    fn record_duplicate_event(&self) {
        self.metrics.duplicate_events.inc();
    }

    fn record_window_regression(&self) {
        self.metrics.window_regressions.inc();
    }

    fn set_ancient_threshold(&self, threshold: u64) {
        self.metrics.ancient_threshold.set(threshold as f64);
    }

    // ── Scheduler ────────────────────────────────────────────────────

    fn set_scheduler_unprocessed_tasks(&self, scheduler: &str, count: usize) {
        self.metrics
            .scheduler_unprocessed_tasks
            .with_label_values(&[scheduler])
            .set(count as f64);
    }

    fn record_scheduler_task_squelched(&self, scheduler: &str) {
        self.metrics
            .scheduler_tasks_squelched
            .with_label_values(&[scheduler])
            .inc();
    }

    fn record_scheduler_offer_rejected(&self, scheduler: &str) {
        self.metrics
            .scheduler_offers_rejected
            .with_label_values(&[scheduler])
            .inc();
    }
}

/// Install the Prometheus metrics recorder as the global backend.
///
/// Idempotent: only the first call creates and registers the metrics.
pub fn install() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        hashgraph_metrics::set_global_recorder(Box::new(PrometheusRecorder::new()));
    });
}

/// Gather and encode all registered Prometheus metrics as text format.
///
/// Returns `(content_type, encoded_body)` suitable for an HTTP response.
pub fn encode_metrics() -> Result<(String, Vec<u8>), String> {
    use prometheus::{Encoder, TextEncoder};
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let content_type = encoder.format_type().to_string();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("{e}"))?;
    Ok((content_type, buffer))
}

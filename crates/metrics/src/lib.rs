//! Metrics facade for hashgraph intake.
//!
//! Provides a [`MetricsRecorder`] trait with domain-specific methods and default
//! no-op implementations. A global singleton recorder is accessed via `recorder()`,
//! and convenience free functions delegate to it.
//!
//! # Usage
//!
//! Callers record metrics via free functions:
//! ```ignore
//! hashgraph_metrics::set_orphan_count(buffer.current_orphan_count());
//! hashgraph_metrics::record_events_unorphaned(released.len());
//! ```
//!
//! At startup, install a backend:
//! ```ignore
//! hashgraph_metrics_prometheus::install();
//! ```
//!
//! Without a backend every call is a no-op.

use std::sync::OnceLock;

// ═══════════════════════════════════════════════════════════════════════
// Trait
// ═══════════════════════════════════════════════════════════════════════

/// Domain-specific metrics recording trait.
///
/// All methods have default no-op implementations so backends only need
/// to override the metrics they care about.
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync + 'static {
    // ── Orphan buffer ────────────────────────────────────────────────

    /// Set the number of events currently buffered waiting for parents.
    fn set_orphan_count(&self, count: usize) {}

    /// Record events released by the buffer (directly or by cascade).
    fn record_events_unorphaned(&self, count: usize) {}

    /// Record an event discarded because it was already ancient on arrival.
    fn record_ancient_event_discarded(&self) {}

    /// Record a rejected duplicate event.
    fn record_duplicate_event(&self) {}

    /// Record a rejected event window that would have moved backwards.
    fn record_window_regression(&self) {}

    /// Set the current ancient threshold gauge.
    fn set_ancient_threshold(&self, threshold: u64) {}

    // ── Scheduler ────────────────────────────────────────────────────

    /// Set the number of tasks submitted to a scheduler and not yet handled.
    fn set_scheduler_unprocessed_tasks(&self, scheduler: &str, count: usize) {}

    /// Record a task dropped because the scheduler was squelching.
    fn record_scheduler_task_squelched(&self, scheduler: &str) {}

    /// Record a rejected `offer` on a full scheduler.
    fn record_scheduler_offer_rejected(&self, scheduler: &str) {}
}

// ═══════════════════════════════════════════════════════════════════════
// Global singleton
// ═══════════════════════════════════════════════════════════════════════

struct NoopRecorder;
impl MetricsRecorder for NoopRecorder {}

static RECORDER: OnceLock<Box<dyn MetricsRecorder>> = OnceLock::new();

/// Install a global metrics recorder.
///
/// Can only be called once. Subsequent calls are silently ignored.
pub fn set_global_recorder(recorder: Box<dyn MetricsRecorder>) {
    let _ = RECORDER.set(recorder);
}

/// Get the global metrics recorder.
///
/// Returns a no-op recorder if none has been installed.
#[inline]
fn recorder() -> &'static dyn MetricsRecorder {
    RECORDER.get().map(|r| r.as_ref()).unwrap_or(&NoopRecorder)
}

// ═══════════════════════════════════════════════════════════════════════
// Convenience free functions
// ═══════════════════════════════════════════════════════════════════════

// ── Orphan buffer ────────────────────────────────────────────────────

/// Set the number of events currently buffered waiting for parents.
#[inline]
pub fn set_orphan_count(count: usize) {
    recorder().set_orphan_count(count);
}

/// Record events released by the buffer.
#[inline]
pub fn record_events_unorphaned(count: usize) {
    recorder().record_events_unorphaned(count);
}

/// Record an event discarded as ancient on arrival.
#[inline]
pub fn record_ancient_event_discarded() {
    recorder().record_ancient_event_discarded();
}

/// Record a rejected duplicate event.
#[inline]
pub fn record_duplicate_event() {
    recorder().record_duplicate_event();
}

/// Record a rejected event window regression.
#[inline]
pub fn record_window_regression() {
    recorder().record_window_regression();
}

/// Set the current ancient threshold gauge.
#[inline]
pub fn set_ancient_threshold(threshold: u64) {
    recorder().set_ancient_threshold(threshold);
}

// ── Scheduler ────────────────────────────────────────────────────────

/// Set a scheduler's unprocessed task gauge.
#[inline]
pub fn set_scheduler_unprocessed_tasks(scheduler: &str, count: usize) {
    recorder().set_scheduler_unprocessed_tasks(scheduler, count);
}

/// Record a task dropped while squelching.
#[inline]
pub fn record_scheduler_task_squelched(scheduler: &str) {
    recorder().record_scheduler_task_squelched(scheduler);
}

/// Record a rejected `offer`.
#[inline]
pub fn record_scheduler_offer_rejected(scheduler: &str) {
    recorder().record_scheduler_offer_rejected(scheduler);
}

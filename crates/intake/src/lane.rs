//! Orphan buffer lane.

use crossbeam::channel::Sender;
use hashgraph_orphan::{OrphanBuffer, OrphanBufferStats};
use hashgraph_scheduler::{SchedulerConfig, SchedulerError, SequentialScheduler};
use hashgraph_types::{EventWindow, PlatformEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Work accepted by an [`OrphanBufferLane`].
#[derive(Debug, Clone)]
pub enum IntakeInput {
    /// An event from gossip.
    Event(Arc<PlatformEvent>),
    /// A new ancient window from consensus.
    Window(EventWindow),
    /// Drop all buffered state, e.g. before a reconnect.
    Clear,
}

/// Values the worker publishes after every task.
#[derive(Debug, Default)]
struct LaneStatus {
    orphan_count: AtomicUsize,
    stats: Mutex<OrphanBufferStats>,
}

/// An [`OrphanBuffer`] running on its own [`SequentialScheduler`].
///
/// Released events go to `output` in the order the buffer returns them, so a
/// consumer of the channel sees parents before children across every call.
/// Rejections from the buffer are logged and dropped.
pub struct OrphanBufferLane {
    scheduler: SequentialScheduler<IntakeInput>,
    status: Arc<LaneStatus>,
}

impl std::fmt::Debug for OrphanBufferLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrphanBufferLane")
            .field("scheduler", &self.scheduler)
            .field("orphan_count", &self.orphan_count())
            .finish()
    }
}

impl OrphanBufferLane {
    /// Move `buffer` onto a new scheduler thread.
    pub fn spawn(
        mut buffer: OrphanBuffer,
        config: SchedulerConfig,
        output: Sender<Arc<PlatformEvent>>,
    ) -> Result<Self, SchedulerError> {
        let status = Arc::new(LaneStatus::default());
        let name = config.name.clone();

        let scheduler = {
            let status = Arc::clone(&status);
            let mut output_closed = false;
            SequentialScheduler::spawn(config, move |input: IntakeInput| {
                let result = match input {
                    IntakeInput::Event(event) => buffer.handle_event(event),
                    IntakeInput::Window(window) => buffer.set_event_window(window),
                    IntakeInput::Clear => {
                        buffer.clear();
                        Ok(Vec::new())
                    }
                };

                match result {
                    Ok(released) => {
                        for event in released {
                            if output.send(event).is_err() && !output_closed {
                                warn!(lane = %name, "Output channel closed, dropping released events");
                                output_closed = true;
                            }
                        }
                    }
                    Err(e) => debug!(lane = %name, error = %e, "Orphan buffer rejected input"),
                }

                status
                    .orphan_count
                    .store(buffer.current_orphan_count(), Ordering::Release);
                *status.stats.lock().unwrap_or_else(PoisonError::into_inner) = buffer.stats();
            })?
        };

        info!(lane = %scheduler.name(), "Orphan buffer lane started");
        Ok(Self { scheduler, status })
    }

    // ── Events ───────────────────────────────────────────────────────────

    /// Submit an event, waiting while the lane is at capacity.
    pub fn put_event(&self, event: Arc<PlatformEvent>) -> Result<(), SchedulerError> {
        self.scheduler.put(IntakeInput::Event(event))
    }

    /// Submit an event only if the lane has room.
    pub fn offer_event(&self, event: Arc<PlatformEvent>) -> bool {
        self.scheduler.offer(IntakeInput::Event(event))
    }

    /// Submit an event regardless of capacity.
    pub fn inject_event(&self, event: Arc<PlatformEvent>) -> Result<(), SchedulerError> {
        self.scheduler.inject(IntakeInput::Event(event))
    }

    // ── Windows ──────────────────────────────────────────────────────────

    /// Submit a window, waiting while the lane is at capacity.
    pub fn put_window(&self, window: EventWindow) -> Result<(), SchedulerError> {
        self.scheduler.put(IntakeInput::Window(window))
    }

    /// Submit a window regardless of capacity.
    ///
    /// Windows free buffer space, so consensus should not wait behind gossip
    /// to deliver one.
    pub fn inject_window(&self, window: EventWindow) -> Result<(), SchedulerError> {
        self.scheduler.inject(IntakeInput::Window(window))
    }

    /// Queue a reset of the buffer behind everything already submitted.
    pub fn clear(&self) -> Result<(), SchedulerError> {
        self.scheduler.inject(IntakeInput::Clear)
    }

    // ── Control ──────────────────────────────────────────────────────────

    /// Wait until everything submitted so far has been handled.
    pub fn flush(&self) -> Result<(), SchedulerError> {
        self.scheduler.flush()
    }

    /// Discard submitted work until [`stop_squelching`](Self::stop_squelching).
    pub fn start_squelching(&self) -> Result<(), SchedulerError> {
        self.scheduler.start_squelching()
    }

    /// Resume handling submitted work.
    pub fn stop_squelching(&self) -> Result<(), SchedulerError> {
        self.scheduler.stop_squelching()
    }

    /// Inputs submitted and not yet handled.
    pub fn unprocessed_task_count(&self) -> usize {
        self.scheduler.unprocessed_task_count()
    }

    /// Orphan count as of the last handled input.
    pub fn orphan_count(&self) -> usize {
        self.status.orphan_count.load(Ordering::Acquire)
    }

    /// Buffer statistics as of the last handled input.
    pub fn stats(&self) -> OrphanBufferStats {
        *self
            .status
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Drain the lane, stop its thread and return the final statistics.
    pub fn shutdown(self) -> OrphanBufferStats {
        let Self { scheduler, status } = self;
        let name = scheduler.name().to_string();
        scheduler.shutdown();
        let stats = *status.stats.lock().unwrap_or_else(PoisonError::into_inner);
        info!(
            lane = %name,
            emitted = stats.events_emitted,
            discarded = stats.ancient_discarded,
            "Orphan buffer lane stopped"
        );
        stats
    }
}

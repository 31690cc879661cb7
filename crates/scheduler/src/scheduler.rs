//! Sequential task scheduler.
//!
//! One dedicated thread receives tasks over a crossbeam channel and hands
//! them to a handler strictly in submission order. Submitters choose how to
//! react to a full queue:
//!
//! | Method   | At capacity              |
//! |----------|--------------------------|
//! | `put`    | waits until there is room |
//! | `offer`  | returns `false`          |
//! | `inject` | enqueues anyway          |
//!
//! The unhandled count covers queued tasks plus the one being handled, so
//! capacity bounds the total work outstanding, not just the channel length.

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crossbeam::channel::{self, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, trace, warn};

enum Task<T> {
    Run(T),
    /// Acknowledged once every task submitted before it has been handled.
    Flush(Sender<()>),
}

/// State shared between submitters and the worker thread.
#[derive(Debug, Default)]
struct Shared {
    unhandled: AtomicUsize,
    squelching: AtomicBool,
}

/// Runs a handler over submitted tasks on a single dedicated thread.
///
/// Dropping the scheduler (or calling [`shutdown`](Self::shutdown)) lets the
/// worker drain whatever is queued and then joins it.
pub struct SequentialScheduler<T: Send + 'static> {
    config: SchedulerConfig,
    sender: Option<Sender<Task<T>>>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> std::fmt::Debug for SequentialScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialScheduler")
            .field("name", &self.config.name)
            .field("unhandled", &self.unprocessed_task_count())
            .field("squelching", &self.is_squelching())
            .finish()
    }
}

impl<T: Send + 'static> SequentialScheduler<T> {
    /// Start the worker thread.
    pub fn spawn<F>(config: SchedulerConfig, handler: F) -> Result<Self, SchedulerError>
    where
        F: FnMut(T) + Send + 'static,
    {
        let (sender, receiver) = channel::unbounded();
        let shared = Arc::new(Shared::default());

        let worker = {
            let name = config.name.clone();
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name(config.name.clone())
                .spawn(move || run_worker(name, receiver, shared, handler))?
        };

        info!(
            scheduler = %config.name,
            capacity = config.unhandled_task_capacity,
            "Scheduler started"
        );

        Ok(Self {
            config,
            sender: Some(sender),
            shared,
            worker: Some(worker),
        })
    }

    /// Scheduler name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Submission
    // ═══════════════════════════════════════════════════════════════════════

    /// Submit a task, waiting while the scheduler is at capacity.
    pub fn put(&self, task: T) -> Result<(), SchedulerError> {
        self.wait_for_slot()?;
        self.send(Task::Run(task))
    }

    /// Submit a task only if the scheduler is below capacity.
    ///
    /// Never blocks. Returns `false` if the task was not accepted, either
    /// because the scheduler is full or because it has shut down.
    pub fn offer(&self, task: T) -> bool {
        if !self.try_acquire_slot() {
            hashgraph_metrics::record_scheduler_offer_rejected(&self.config.name);
            trace!(scheduler = %self.config.name, "Offer rejected at capacity");
            return false;
        }
        self.send(Task::Run(task)).is_ok()
    }

    /// Submit a task regardless of capacity. Never blocks.
    pub fn inject(&self, task: T) -> Result<(), SchedulerError> {
        self.shared.unhandled.fetch_add(1, Ordering::AcqRel);
        self.send(Task::Run(task))
    }

    /// Wait until every task submitted before this call has been handled.
    ///
    /// The flush marker counts against capacity like a task. Must not be
    /// called from inside the handler: the worker would wait on itself.
    pub fn flush(&self) -> Result<(), SchedulerError> {
        self.wait_for_slot()?;
        let (ack_tx, ack_rx) = channel::bounded(1);
        self.send(Task::Flush(ack_tx))?;
        ack_rx
            .recv()
            .map_err(|_| SchedulerError::Shutdown(self.config.name.clone()))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Squelching
    // ═══════════════════════════════════════════════════════════════════════

    /// Discard tasks instead of handling them until [`stop_squelching`].
    ///
    /// Applies to tasks already queued as well as new ones. Flushes still
    /// complete.
    ///
    /// [`stop_squelching`]: Self::stop_squelching
    pub fn start_squelching(&self) -> Result<(), SchedulerError> {
        self.shared
            .squelching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SchedulerError::AlreadySquelching(self.config.name.clone()))?;
        debug!(scheduler = %self.config.name, "Squelching started");
        Ok(())
    }

    /// Resume handling tasks.
    pub fn stop_squelching(&self) -> Result<(), SchedulerError> {
        self.shared
            .squelching
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SchedulerError::NotSquelching(self.config.name.clone()))?;
        debug!(scheduler = %self.config.name, "Squelching stopped");
        Ok(())
    }

    /// Whether tasks are currently being discarded.
    pub fn is_squelching(&self) -> bool {
        self.shared.squelching.load(Ordering::Acquire)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Status and lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Tasks submitted and not yet handled or discarded, including the one
    /// in progress.
    pub fn unprocessed_task_count(&self) -> usize {
        self.shared.unhandled.load(Ordering::Acquire)
    }

    /// Drain queued tasks and join the worker thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Closing the channel ends the worker loop once the queue is empty.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(scheduler = %self.config.name, "Scheduler thread panicked");
            }
        }
    }

    fn worker_alive(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    fn try_acquire_slot(&self) -> bool {
        let capacity = self.config.unhandled_task_capacity;
        if capacity == 0 {
            self.shared.unhandled.fetch_add(1, Ordering::AcqRel);
            return true;
        }
        self.shared
            .unhandled
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .is_ok()
    }

    fn wait_for_slot(&self) -> Result<(), SchedulerError> {
        while !self.try_acquire_slot() {
            if !self.worker_alive() {
                return Err(SchedulerError::Shutdown(self.config.name.clone()));
            }
            std::thread::sleep(self.config.sleep_duration);
        }
        Ok(())
    }

    /// Send a task whose slot has already been counted.
    fn send(&self, task: Task<T>) -> Result<(), SchedulerError> {
        let sent = match &self.sender {
            Some(sender) => sender.send(task).is_ok(),
            None => false,
        };
        if sent {
            Ok(())
        } else {
            self.shared.unhandled.fetch_sub(1, Ordering::AcqRel);
            Err(SchedulerError::Shutdown(self.config.name.clone()))
        }
    }
}

impl<T: Send + 'static> Drop for SequentialScheduler<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<T, F>(name: String, receiver: Receiver<Task<T>>, shared: Arc<Shared>, mut handler: F)
where
    F: FnMut(T),
{
    for task in receiver.iter() {
        match task {
            Task::Run(task) => {
                if shared.squelching.load(Ordering::Acquire) {
                    drop(task);
                    hashgraph_metrics::record_scheduler_task_squelched(&name);
                } else {
                    handler(task);
                }
                let remaining = shared.unhandled.fetch_sub(1, Ordering::AcqRel) - 1;
                hashgraph_metrics::set_scheduler_unprocessed_tasks(&name, remaining);
            }
            Task::Flush(ack) => {
                let remaining = shared.unhandled.fetch_sub(1, Ordering::AcqRel) - 1;
                hashgraph_metrics::set_scheduler_unprocessed_tasks(&name, remaining);
                // The flusher may have given up waiting.
                let _ = ack.send(());
            }
        }
    }
    info!(scheduler = %name, "Scheduler stopped");
}

//! Scheduler errors.

use thiserror::Error;

/// Errors from [`SequentialScheduler`](crate::SequentialScheduler).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler {0} is already squelching")]
    AlreadySquelching(String),

    #[error("Scheduler {0} is not squelching")]
    NotSquelching(String),

    /// The worker thread has exited, normally because the handler panicked.
    #[error("Scheduler {0} has shut down")]
    Shutdown(String),

    #[error("Failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

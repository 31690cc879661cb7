//! Sequential task scheduler for intake lanes.
//!
//! Each pipeline stage that owns mutable state (the orphan buffer, for one)
//! runs on its own [`SequentialScheduler`]: a dedicated thread that handles
//! tasks one at a time in submission order. The scheduler supplies what the
//! stage itself does not:
//!
//! - **Backpressure**: `put` waits at capacity, `offer` refuses, `inject`
//!   ignores the limit.
//! - **Flush**: wait until everything submitted so far has been handled.
//! - **Squelch**: discard tasks while the pipeline is being reset.
//!
//! # Example
//!
//! ```no_run
//! use hashgraph_scheduler::{SchedulerConfig, SequentialScheduler};
//!
//! let scheduler = SequentialScheduler::spawn(SchedulerConfig::new("printer"), |line: String| {
//!     println!("{line}");
//! })
//! .unwrap();
//!
//! scheduler.put("hello".to_string()).unwrap();
//! scheduler.flush().unwrap();
//! ```

mod config;
mod error;
mod scheduler;

pub use config::{SchedulerConfig, DEFAULT_SLEEP_DURATION, DEFAULT_UNHANDLED_TASK_CAPACITY};
pub use error::SchedulerError;
pub use scheduler::SequentialScheduler;

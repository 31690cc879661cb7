//! Threaded intake lanes.
//!
//! An [`OrphanBufferLane`] puts an [`OrphanBuffer`](hashgraph_orphan::OrphanBuffer)
//! behind a [`SequentialScheduler`](hashgraph_scheduler::SequentialScheduler).
//! Gossip threads submit events, consensus submits windows, and a single
//! worker owns the buffer and forwards everything it releases to a channel
//! in topological order.
//!
//! ```text
//! gossip ──────put_event──────┐
//!                             ├──► lane thread ──► OrphanBuffer ──► Sender<Arc<PlatformEvent>>
//! consensus ──inject_window───┘
//! ```

mod lane;

pub use lane::{IntakeInput, OrphanBufferLane};

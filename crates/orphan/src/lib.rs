//! Orphan buffer for hashgraph event intake.
//!
//! Gossip delivers events in whatever order peers send them. Consensus needs
//! every event after its parents. The [`OrphanBuffer`] sits between the two:
//! it holds back events whose parents have not been seen, releases them (and
//! everything they unblock) the moment the last parent resolves, and drops
//! events that are already too old to matter.
//!
//! # Architecture
//!
//! The buffer is a synchronous state machine with no I/O:
//!
//! ```text
//! PlatformEvent ──► handle_event ──┐
//!                                   ├──► Vec<Arc<PlatformEvent>> (topological order)
//! EventWindow ───► set_event_window ┘
//! ```
//!
//! Serialising calls onto one thread is the host's job; see the
//! `hashgraph-intake` crate for the lane that does it.

mod buffer;
mod config;
mod error;
mod intake_counter;
mod sequence_map;

pub use buffer::{OrphanBuffer, OrphanBufferStats};
pub use config::{OrphanBufferConfig, DEFAULT_ORPHAN_WARN_THRESHOLD};
pub use error::OrphanBufferError;
pub use intake_counter::{DefaultIntakeEventCounter, IntakeEventCounter, NoOpIntakeEventCounter};
pub use sequence_map::{SequenceMap, ShiftError};

//! Orphan buffer error types.

use crate::sequence_map::ShiftError;
use hashgraph_types::{AncientMode, Hash};

/// Errors returned by [`OrphanBuffer`](crate::OrphanBuffer) operations.
///
/// None of these leave the buffer in a modified state: a rejected call is a
/// no-op apart from logging and statistics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrphanBufferError {
    /// The event is already buffered, or was emitted and is not yet ancient.
    #[error("Duplicate event {hash}")]
    DuplicateEvent { hash: Hash },

    /// The proposed window would lower the ancient threshold.
    #[error("Event window regression: ancient threshold {proposed} is below current {current}")]
    WindowRegression { current: u64, proposed: u64 },

    /// The proposed window uses a different ancient mode.
    #[error("Ancient mode mismatch: buffer uses {current}, window uses {proposed}")]
    AncientModeMismatch {
        current: AncientMode,
        proposed: AncientMode,
    },

    /// Internal index could not follow the window.
    #[error(transparent)]
    Shift(#[from] ShiftError),
}

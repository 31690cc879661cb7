//! Ancient-event policy snapshots.
//!
//! An [`EventWindow`] is produced each time consensus advances and tells
//! intake which events are too old to matter. The [`AncientMode`] picks
//! whether an event's generation or its birth round is compared against the
//! thresholds.

use crate::{EventDescriptor, FIRST_GENERATION, ROUND_FIRST};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which event scalar is compared against the ancient threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncientMode {
    /// Ancientness is decided by generation.
    GenerationThreshold,
    /// Ancientness is decided by birth round.
    BirthRoundThreshold,
}

impl AncientMode {
    /// Lowest indicator an event can carry in this mode.
    pub const fn genesis_indicator(self) -> u64 {
        match self {
            AncientMode::GenerationThreshold => FIRST_GENERATION,
            AncientMode::BirthRoundThreshold => ROUND_FIRST,
        }
    }
}

impl fmt::Display for AncientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AncientMode::GenerationThreshold => write!(f, "generation"),
            AncientMode::BirthRoundThreshold => write!(f, "birth_round"),
        }
    }
}

/// Errors from [`EventWindow::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventWindowError {
    /// A threshold is below the first indicator any event can have.
    #[error("{name} threshold {value} is below the {mode} genesis indicator {minimum}")]
    InvalidThreshold {
        name: &'static str,
        value: u64,
        minimum: u64,
        mode: AncientMode,
    },

    /// Events cannot expire before they become ancient.
    #[error("expired threshold {expired} is above ancient threshold {ancient}")]
    ExpiredAboveAncient { expired: u64, ancient: u64 },
}

/// Immutable snapshot of the ancient-event policy.
///
/// An event is ancient when its indicator is strictly below
/// `ancient_threshold`. The expired threshold trails the ancient one and marks
/// events that may be dropped from storage entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    latest_consensus_round: u64,
    ancient_threshold: u64,
    expired_threshold: u64,
    ancient_mode: AncientMode,
}

impl EventWindow {
    /// Create a window, validating the thresholds against `ancient_mode`.
    pub fn new(
        latest_consensus_round: u64,
        ancient_threshold: u64,
        expired_threshold: u64,
        ancient_mode: AncientMode,
    ) -> Result<Self, EventWindowError> {
        let minimum = ancient_mode.genesis_indicator();
        for (name, value) in [
            ("ancient", ancient_threshold),
            ("expired", expired_threshold),
        ] {
            if value < minimum {
                return Err(EventWindowError::InvalidThreshold {
                    name,
                    value,
                    minimum,
                    mode: ancient_mode,
                });
            }
        }
        if expired_threshold > ancient_threshold {
            return Err(EventWindowError::ExpiredAboveAncient {
                expired: expired_threshold,
                ancient: ancient_threshold,
            });
        }

        Ok(Self {
            latest_consensus_round,
            ancient_threshold,
            expired_threshold,
            ancient_mode,
        })
    }

    /// The window in force before any round has reached consensus.
    ///
    /// Nothing is ancient under it.
    pub const fn genesis(ancient_mode: AncientMode) -> Self {
        let threshold = ancient_mode.genesis_indicator();
        Self {
            latest_consensus_round: 0,
            ancient_threshold: threshold,
            expired_threshold: threshold,
            ancient_mode,
        }
    }

    /// Latest round to have reached consensus.
    pub fn latest_consensus_round(&self) -> u64 {
        self.latest_consensus_round
    }

    /// Indicators below this value are ancient.
    pub fn ancient_threshold(&self) -> u64 {
        self.ancient_threshold
    }

    /// Indicators below this value are expired.
    pub fn expired_threshold(&self) -> u64 {
        self.expired_threshold
    }

    /// Which scalar is compared against the thresholds.
    pub fn ancient_mode(&self) -> AncientMode {
        self.ancient_mode
    }

    /// Whether the described event is ancient under this window.
    #[inline]
    pub fn is_ancient(&self, descriptor: &EventDescriptor) -> bool {
        self.is_ancient_indicator(descriptor.indicator(self.ancient_mode))
    }

    /// Whether a raw indicator value is ancient under this window.
    #[inline]
    pub fn is_ancient_indicator(&self, indicator: u64) -> bool {
        indicator < self.ancient_threshold
    }

    /// Whether the described event is expired under this window.
    #[inline]
    pub fn is_expired(&self, descriptor: &EventDescriptor) -> bool {
        descriptor.indicator(self.ancient_mode) < self.expired_threshold
    }
}

impl fmt::Display for EventWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventWindow(round={}, ancient<{}, expired<{}, mode={})",
            self.latest_consensus_round,
            self.ancient_threshold,
            self.expired_threshold,
            self.ancient_mode
        )
    }
}

//! Orphan buffer configuration.

use serde::Deserialize;

/// Default orphan count at which a warning is logged.
///
/// Orphans accumulate without bound while a peer withholds a parent, until
/// the ancient window catches up with them. Crossing this count is usually
/// a sign that admission control upstream should be looking at that peer.
pub const DEFAULT_ORPHAN_WARN_THRESHOLD: usize = 10_000;

/// Orphan buffer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrphanBufferConfig {
    /// Log a warning each time the orphan count rises to this value.
    ///
    /// Zero disables the warning.
    #[serde(default = "default_orphan_warn_threshold")]
    pub orphan_warn_threshold: usize,
}

fn default_orphan_warn_threshold() -> usize {
    DEFAULT_ORPHAN_WARN_THRESHOLD
}

impl Default for OrphanBufferConfig {
    fn default() -> Self {
        Self {
            orphan_warn_threshold: DEFAULT_ORPHAN_WARN_THRESHOLD,
        }
    }
}

impl OrphanBufferConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the orphan warning threshold.
    pub fn with_orphan_warn_threshold(mut self, threshold: usize) -> Self {
        self.orphan_warn_threshold = threshold;
        self
    }
}

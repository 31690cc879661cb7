//! Per-creator accounting of events inside the intake pipeline.
//!
//! Gossip uses the counts to avoid re-requesting events from a peer while
//! earlier events from the same creator are still being processed. Every
//! stage that drops an event without passing it downstream must report the
//! exit, otherwise the creator's count never returns to zero.

use dashmap::DashMap;
use hashgraph_types::{EventDescriptor, NodeId};

/// Observer of events entering and leaving the intake pipeline.
pub trait IntakeEventCounter: Send + Sync {
    /// An event entered the pipeline.
    fn event_entered_intake_pipeline(&self, _descriptor: &EventDescriptor) {}

    /// An event left the pipeline, either discarded or fully processed.
    fn event_exited_intake_pipeline(&self, descriptor: &EventDescriptor);
}

/// Counter that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpIntakeEventCounter;

impl IntakeEventCounter for NoOpIntakeEventCounter {
    fn event_exited_intake_pipeline(&self, _descriptor: &EventDescriptor) {}
}

/// Counter keyed by event creator.
///
/// Safe to share between the gossip threads that record entries and the
/// intake lane that records exits.
#[derive(Debug, Default)]
pub struct DefaultIntakeEventCounter {
    unprocessed: DashMap<NodeId, usize>,
}

impl DefaultIntakeEventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any event from `creator` is still in the pipeline.
    pub fn has_unprocessed_events(&self, creator: NodeId) -> bool {
        self.unprocessed_events(creator) > 0
    }

    /// Number of events from `creator` still in the pipeline.
    pub fn unprocessed_events(&self, creator: NodeId) -> usize {
        self.unprocessed.get(&creator).map(|count| *count).unwrap_or(0)
    }

    /// Forget every count, e.g. after a reconnect discards the pipeline.
    pub fn reset(&self) {
        self.unprocessed.clear();
    }
}

impl IntakeEventCounter for DefaultIntakeEventCounter {
    fn event_entered_intake_pipeline(&self, descriptor: &EventDescriptor) {
        *self.unprocessed.entry(descriptor.creator).or_insert(0) += 1;
    }

    fn event_exited_intake_pipeline(&self, descriptor: &EventDescriptor) {
        if let Some(mut count) = self.unprocessed.get_mut(&descriptor.creator) {
            *count = count.saturating_sub(1);
        }
    }
}

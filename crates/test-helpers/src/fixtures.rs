//! Small event builders, a recording intake counter, and release-order
//! checks.

use hashgraph_orphan::IntakeEventCounter;
use hashgraph_types::{AncientMode, EventDescriptor, EventWindow, Hash, NodeId, PlatformEvent};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A parentless event from `creator`, born in round 1.
///
/// `nonce` distinguishes otherwise identical genesis events.
pub fn genesis(creator: u64, nonce: u64) -> Arc<PlatformEvent> {
    Arc::new(PlatformEvent::new(NodeId(creator), None, vec![], 1, nonce))
}

/// An event from `creator` with the given parents, born in round 1.
pub fn child(
    creator: u64,
    self_parent: &PlatformEvent,
    other_parents: &[&Arc<PlatformEvent>],
) -> Arc<PlatformEvent> {
    Arc::new(PlatformEvent::new(
        NodeId(creator),
        Some(*self_parent.descriptor()),
        other_parents.iter().map(|e| *e.descriptor()).collect(),
        1,
        0,
    ))
}

/// A generation-mode window with everything below `ancient` ancient.
///
/// # Panics
///
/// Panics on a threshold the window rejects (never, for generation mode).
pub fn generation_window(ancient: u64) -> EventWindow {
    EventWindow::new(ancient, ancient, 0, AncientMode::GenerationThreshold)
        .expect("generation thresholds start at zero")
}

/// A birth-round-mode window with everything born before `ancient` ancient.
///
/// # Panics
///
/// Panics if `ancient` is zero.
pub fn birth_round_window(ancient: u64) -> EventWindow {
    EventWindow::new(ancient, ancient, 1, AncientMode::BirthRoundThreshold)
        .expect("birth round thresholds start at one")
}

// ═══════════════════════════════════════════════════════════════════════
// Intake counter
// ═══════════════════════════════════════════════════════════════════════

/// Intake counter that records every notification.
#[derive(Debug, Default)]
pub struct RecordingIntakeCounter {
    entered: Mutex<Vec<Hash>>,
    exited: Mutex<Vec<Hash>>,
}

impl RecordingIntakeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes reported as entered, in call order.
    pub fn entered(&self) -> Vec<Hash> {
        self.entered.lock().unwrap().clone()
    }

    /// Hashes reported as exited, in call order.
    pub fn exited(&self) -> Vec<Hash> {
        self.exited.lock().unwrap().clone()
    }

    /// Number of exit notifications.
    pub fn exited_count(&self) -> usize {
        self.exited.lock().unwrap().len()
    }

    /// Whether `hash` was reported as exited at least once.
    pub fn was_exited(&self, hash: &Hash) -> bool {
        self.exited.lock().unwrap().contains(hash)
    }
}

impl IntakeEventCounter for RecordingIntakeCounter {
    fn event_entered_intake_pipeline(&self, descriptor: &EventDescriptor) {
        self.entered.lock().unwrap().push(descriptor.hash);
    }

    fn event_exited_intake_pipeline(&self, descriptor: &EventDescriptor) {
        self.exited.lock().unwrap().push(descriptor.hash);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Release order
// ═══════════════════════════════════════════════════════════════════════

/// Incrementally checks a stream of released events.
///
/// Feed it each call's output together with the window in force after
/// the call. It panics as soon as an event is released twice, before one
/// of its non-ancient parents, or after a child that named it as a parent.
/// An ancient parent may be skipped, but only if it is never released.
#[derive(Debug, Default)]
pub struct TopologyChecker {
    released: HashSet<Hash>,
    /// Ancient parents not yet released, mapped to the first child that
    /// named them.
    skipped: HashMap<Hash, Hash>,
}

impl TopologyChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check one call's output.
    pub fn observe(&mut self, window: &EventWindow, released: &[Arc<PlatformEvent>]) {
        for event in released {
            let hash = event.hash();
            if let Some(child) = self.skipped.remove(&hash) {
                panic!("event {hash} released after its child {child}");
            }
            assert!(self.released.insert(hash), "event {hash} released twice");

            for parent in event.all_parents() {
                if self.released.contains(&parent.hash) {
                    continue;
                }
                assert!(
                    window.is_ancient(parent),
                    "event {} released before its parent {} (window {})",
                    hash,
                    parent.hash,
                    window
                );
                self.skipped.entry(parent.hash).or_insert(hash);
            }
        }
    }

    /// Number of events observed.
    pub fn released_count(&self) -> usize {
        self.released.len()
    }

    /// Whether `hash` was observed.
    pub fn is_released(&self, hash: &Hash) -> bool {
        self.released.contains(hash)
    }
}

/// Check a whole history of outputs at once.
///
/// Each entry pairs the window in force after a call with that call's
/// output.
pub fn assert_topological(history: &[(EventWindow, Vec<Arc<PlatformEvent>>)]) {
    let mut checker = TopologyChecker::new();
    for (window, released) in history {
        checker.observe(window, released);
    }
}

//! Orphan buffer state machine.
//!
//! Events arrive from gossip in arbitrary order. An event is released only
//! once every parent has either been released by this buffer already or is
//! ancient under the current [`EventWindow`]. Events that are ancient on
//! arrival are dropped and reported to the [`IntakeEventCounter`].
//!
//! # Bookkeeping
//!
//! - `emitted`: descriptors released and not yet ancient. A parent found here
//!   is satisfied.
//! - `missing_parents`: unresolved parent hash -> dependents blocked on it.
//! - `waiting_on_buffered`: ancient parent that is itself still buffered ->
//!   dependents blocked on it.
//! - `orphans`: buffered event -> number of distinct parents still missing.
//!
//! Both hash-keyed indexes are [`SequenceMap`]s bounded below by the ancient
//! threshold, so advancing the window forgets everything that just became
//! ancient in one sweep. A parent that turns ancient while still buffered is
//! not resolved by the sweep: its dependents move to `waiting_on_buffered`
//! and are released right after the parent itself. Release uses an explicit
//! worklist: a chain of any depth is resolved without recursion.

use crate::config::OrphanBufferConfig;
use crate::error::OrphanBufferError;
use crate::intake_counter::IntakeEventCounter;
use crate::sequence_map::SequenceMap;
use hashgraph_types::{EventDescriptor, EventWindow, Hash, PlatformEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn, Level};

/// Orphan buffer statistics for monitoring.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrphanBufferStats {
    /// Calls to `handle_event`, including rejected ones.
    pub events_received: u64,
    /// Events released downstream.
    pub events_emitted: u64,
    /// Events dropped because they were ancient on arrival.
    pub ancient_discarded: u64,
    /// Events rejected as duplicates.
    pub duplicates_rejected: u64,
    /// Windows accepted.
    pub window_updates: u64,
    /// Windows rejected because the ancient threshold moved backwards.
    pub window_regressions_rejected: u64,
}

/// A parent nobody has released yet, with the events waiting on it.
#[derive(Debug)]
struct MissingParent {
    descriptor: EventDescriptor,
    /// Blocked events, in arrival order.
    dependents: Vec<Hash>,
}

/// An event held back until its parents resolve.
#[derive(Debug)]
struct BufferedEvent {
    event: Arc<PlatformEvent>,
    /// Distinct parents still unresolved. Always > 0 while buffered.
    missing: usize,
}

/// Releases events in topological order as their parents resolve.
///
/// Single-threaded: every method takes `&mut self` and runs to completion
/// without blocking. Callers needing concurrency serialise access through
/// one lane (see the intake crate).
pub struct OrphanBuffer {
    config: OrphanBufferConfig,
    intake_counter: Arc<dyn IntakeEventCounter>,
    window: EventWindow,

    emitted: SequenceMap<()>,
    missing_parents: SequenceMap<MissingParent>,
    waiting_on_buffered: HashMap<Hash, Vec<Hash>>,
    orphans: HashMap<Hash, BufferedEvent>,

    stats: OrphanBufferStats,
    /// Set while the orphan count is at or above the warn threshold.
    above_warn_threshold: bool,
}

impl std::fmt::Debug for OrphanBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrphanBuffer")
            .field("window", &self.window)
            .field("orphans", &self.orphans.len())
            .field("missing_parents", &self.missing_parents.len())
            .field("waiting_on_buffered", &self.waiting_on_buffered.len())
            .field("emitted", &self.emitted.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl OrphanBuffer {
    /// Create an empty buffer starting at `initial_window`.
    pub fn new(
        config: OrphanBufferConfig,
        initial_window: EventWindow,
        intake_counter: Arc<dyn IntakeEventCounter>,
    ) -> Self {
        let threshold = initial_window.ancient_threshold();
        Self {
            config,
            intake_counter,
            window: initial_window,
            emitted: SequenceMap::new(threshold),
            missing_parents: SequenceMap::new(threshold),
            waiting_on_buffered: HashMap::new(),
            orphans: HashMap::new(),
            stats: OrphanBufferStats::default(),
            above_warn_threshold: false,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Event handling
    // ═══════════════════════════════════════════════════════════════════════

    /// Accept one event and return every event it makes ready.
    ///
    /// The returned events are in topological order: a parent always
    /// precedes its children. Returns an empty vector if the event is
    /// ancient (it is dropped) or still waiting on a parent (it is
    /// buffered).
    ///
    /// An event already buffered, or released and not yet ancient, is
    /// rejected with [`OrphanBufferError::DuplicateEvent`] and leaves the
    /// buffer untouched. Like an ancient drop, the rejection is reported to
    /// the intake counter.
    #[instrument(level = Level::TRACE, skip_all, fields(hash = %event.hash()))]
    pub fn handle_event(
        &mut self,
        event: Arc<PlatformEvent>,
    ) -> Result<Vec<Arc<PlatformEvent>>, OrphanBufferError> {
        self.stats.events_received += 1;
        let descriptor = *event.descriptor();

        if self.window.is_ancient(&descriptor) {
            trace!(
                indicator = descriptor.indicator(self.window.ancient_mode()),
                threshold = self.window.ancient_threshold(),
                "Discarding ancient event"
            );
            self.stats.ancient_discarded += 1;
            hashgraph_metrics::record_ancient_event_discarded();
            self.intake_counter.event_exited_intake_pipeline(&descriptor);
            return Ok(Vec::new());
        }

        if self.orphans.contains_key(&descriptor.hash) || self.emitted.contains(&descriptor.hash) {
            warn!(
                hash = %descriptor.hash,
                creator = %descriptor.creator,
                "Rejecting duplicate event"
            );
            self.stats.duplicates_rejected += 1;
            hashgraph_metrics::record_duplicate_event();
            self.intake_counter.event_exited_intake_pipeline(&descriptor);
            return Err(OrphanBufferError::DuplicateEvent {
                hash: descriptor.hash,
            });
        }

        let mut missing: Vec<EventDescriptor> = Vec::new();
        for parent in event.all_parents() {
            // A buffered parent is unresolved even once it is ancient.
            let resolved = !self.orphans.contains_key(&parent.hash)
                && (self.window.is_ancient(parent) || self.emitted.contains(&parent.hash));
            if resolved || missing.contains(parent) {
                continue;
            }
            missing.push(*parent);
        }

        let mut released = Vec::new();
        let hash = descriptor.hash;
        let mut registered = 0;
        for parent in &missing {
            if self.register_dependent(parent, hash) {
                registered += 1;
            }
        }
        debug_assert_eq!(registered, missing.len(), "unregistered missing parent");

        if registered == 0 {
            self.release(vec![event], &mut released);
        } else {
            trace!(missing = registered, "Buffering orphan");
            self.orphans.insert(
                hash,
                BufferedEvent {
                    event,
                    missing: registered,
                },
            );
        }

        self.after_release(&released);
        Ok(released)
    }

    /// Advance the ancient window and return every event it makes ready.
    ///
    /// Each unresolved parent that is now ancient counts as resolved, unless
    /// it is itself still buffered: then its dependents keep waiting until
    /// it is released, whether by this advance or a later call. Released
    /// events are returned in topological order, including any that are
    /// ancient by now.
    ///
    /// A window that lowers the ancient threshold or switches the ancient
    /// mode is rejected and leaves the buffer untouched.
    #[instrument(level = Level::DEBUG, skip_all, fields(
        threshold = window.ancient_threshold(),
        round = window.latest_consensus_round(),
    ))]
    pub fn set_event_window(
        &mut self,
        window: EventWindow,
    ) -> Result<Vec<Arc<PlatformEvent>>, OrphanBufferError> {
        if window.ancient_mode() != self.window.ancient_mode() {
            warn!(
                current = %self.window.ancient_mode(),
                proposed = %window.ancient_mode(),
                "Rejecting event window with a different ancient mode"
            );
            return Err(OrphanBufferError::AncientModeMismatch {
                current: self.window.ancient_mode(),
                proposed: window.ancient_mode(),
            });
        }

        let current = self.window.ancient_threshold();
        let proposed = window.ancient_threshold();
        if proposed < current {
            warn!(current, proposed, "Rejecting event window regression");
            self.stats.window_regressions_rejected += 1;
            hashgraph_metrics::record_window_regression();
            return Err(OrphanBufferError::WindowRegression { current, proposed });
        }

        self.emitted.shift_window(proposed)?;
        let purged = self.missing_parents.shift_window(proposed)?;
        self.window = window;
        self.stats.window_updates += 1;
        hashgraph_metrics::set_ancient_threshold(proposed);

        let mut released = Vec::new();
        for (hash, parent) in purged {
            let mut ready = Vec::new();
            if self.orphans.contains_key(&hash) {
                trace!(parent = %hash, "Buffered parent became ancient");
                // A self-reference is not a real dependency.
                let (own, others): (Vec<Hash>, Vec<Hash>) =
                    parent.dependents.into_iter().partition(|d| *d == hash);
                self.waiting_on_buffered
                    .entry(hash)
                    .or_default()
                    .extend(others);
                self.resolve_dependents(own, &mut ready);
            } else {
                trace!(parent = %parent.descriptor.hash, "Parent became ancient");
                self.resolve_dependents(parent.dependents, &mut ready);
            }
            self.release(ready, &mut released);
        }

        debug!(
            released = released.len(),
            orphan_count = self.orphans.len(),
            "Event window advanced"
        );
        self.after_release(&released);
        Ok(released)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Release cascade
    // ═══════════════════════════════════════════════════════════════════════

    /// Record that `dependent` waits on `parent`. Returns false if the parent
    /// could not be indexed.
    fn register_dependent(&mut self, parent: &EventDescriptor, dependent: Hash) -> bool {
        if self.window.is_ancient(parent) {
            self.waiting_on_buffered
                .entry(parent.hash)
                .or_default()
                .push(dependent);
            return true;
        }
        let entry = self.missing_parents.get_or_insert_with(
            parent.hash,
            parent.indicator(self.window.ancient_mode()),
            || MissingParent {
                descriptor: *parent,
                dependents: Vec::new(),
            },
        );
        match entry {
            Some(entry) => {
                entry.dependents.push(dependent);
                true
            }
            None => false,
        }
    }

    /// Release `worklist` and everything it unblocks, appending to `released`.
    fn release(
        &mut self,
        mut worklist: Vec<Arc<PlatformEvent>>,
        released: &mut Vec<Arc<PlatformEvent>>,
    ) {
        let mode = self.window.ancient_mode();
        while let Some(event) = worklist.pop() {
            let descriptor = *event.descriptor();
            // No-op for events that became ancient while buffered.
            self.emitted
                .insert(descriptor.hash, descriptor.indicator(mode), ());
            released.push(event);

            if let Some(parent) = self.missing_parents.remove(&descriptor.hash) {
                self.resolve_dependents(parent.dependents, &mut worklist);
            }
            if let Some(dependents) = self.waiting_on_buffered.remove(&descriptor.hash) {
                self.resolve_dependents(dependents, &mut worklist);
            }
        }
    }

    /// Mark one parent resolved for each dependent, queueing those now ready.
    fn resolve_dependents(&mut self, dependents: Vec<Hash>, ready: &mut Vec<Arc<PlatformEvent>>) {
        // Reversed so the worklist pops dependents in arrival order.
        for hash in dependents.into_iter().rev() {
            let Some(buffered) = self.orphans.get_mut(&hash) else {
                continue;
            };
            buffered.missing -= 1;
            if buffered.missing == 0 {
                if let Some(buffered) = self.orphans.remove(&hash) {
                    ready.push(buffered.event);
                }
            }
        }
    }

    fn after_release(&mut self, released: &[Arc<PlatformEvent>]) {
        if !released.is_empty() {
            self.stats.events_emitted += released.len() as u64;
            hashgraph_metrics::record_events_unorphaned(released.len());
            if released.len() > 1 {
                debug!(released = released.len(), "Orphans released");
            }
        }
        self.update_orphan_gauge();
    }

    fn update_orphan_gauge(&mut self) {
        let count = self.orphans.len();
        hashgraph_metrics::set_orphan_count(count);

        let threshold = self.config.orphan_warn_threshold;
        if threshold == 0 {
            return;
        }
        if count >= threshold {
            if !self.above_warn_threshold {
                warn!(
                    orphan_count = count,
                    threshold,
                    missing_parents = self.missing_parents.len(),
                    "Orphan count reached warning threshold"
                );
                self.above_warn_threshold = true;
            }
        } else {
            self.above_warn_threshold = false;
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Number of events currently buffered.
    pub fn current_orphan_count(&self) -> usize {
        self.orphans.len()
    }

    /// The window in force.
    pub fn event_window(&self) -> &EventWindow {
        &self.window
    }

    /// Running statistics.
    pub fn stats(&self) -> OrphanBufferStats {
        self.stats
    }

    /// Whether the event with `hash` is buffered.
    pub fn is_orphan(&self, hash: &Hash) -> bool {
        self.orphans.contains_key(hash)
    }

    /// Parents a buffered event is still waiting on, in declared order.
    ///
    /// Empty if the event is not buffered.
    pub fn missing_parents(&self, hash: &Hash) -> Vec<EventDescriptor> {
        let Some(buffered) = self.orphans.get(hash) else {
            return Vec::new();
        };
        let mut missing: Vec<EventDescriptor> = Vec::new();
        for parent in buffered.event.all_parents() {
            let blocked = self
                .missing_parents
                .get(&parent.hash)
                .is_some_and(|entry| entry.dependents.contains(hash))
                || self
                    .waiting_on_buffered
                    .get(&parent.hash)
                    .is_some_and(|dependents| dependents.contains(hash));
            if blocked && !missing.contains(parent) {
                missing.push(*parent);
            }
        }
        missing
    }

    /// Drop every buffered event and forget what was released.
    ///
    /// Buffered events are reported to the intake counter as exited. The
    /// window is kept.
    pub fn clear(&mut self) {
        let dropped = self.orphans.len();
        for buffered in self.orphans.values() {
            self.intake_counter
                .event_exited_intake_pipeline(buffered.event.descriptor());
        }
        self.orphans.clear();
        self.missing_parents.clear();
        self.waiting_on_buffered.clear();
        self.emitted.clear();
        debug!(dropped, "Orphan buffer cleared");
        self.update_orphan_gauge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoOpIntakeEventCounter;
    use hashgraph_types::{AncientMode, NodeId};
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct ExitLog(Mutex<Vec<Hash>>);

    impl ExitLog {
        fn exited(&self) -> Vec<Hash> {
            self.0.lock().unwrap().clone()
        }
    }

    impl IntakeEventCounter for ExitLog {
        fn event_exited_intake_pipeline(&self, descriptor: &EventDescriptor) {
            self.0.lock().unwrap().push(descriptor.hash);
        }
    }

    fn make_buffer(mode: AncientMode) -> (OrphanBuffer, Arc<ExitLog>) {
        let log = Arc::new(ExitLog::default());
        let buffer = OrphanBuffer::new(
            OrphanBufferConfig::default(),
            EventWindow::genesis(mode),
            log.clone(),
        );
        (buffer, log)
    }

    fn genesis(creator: u64) -> Arc<PlatformEvent> {
        Arc::new(PlatformEvent::new(NodeId(creator), None, vec![], 1, 0))
    }

    fn child(
        creator: u64,
        self_parent: &PlatformEvent,
        others: &[&Arc<PlatformEvent>],
    ) -> Arc<PlatformEvent> {
        Arc::new(PlatformEvent::new(
            NodeId(creator),
            Some(*self_parent.descriptor()),
            others.iter().map(|e| *e.descriptor()).collect(),
            1,
            0,
        ))
    }

    fn generation_window(ancient: u64) -> EventWindow {
        EventWindow::new(ancient, ancient, 0, AncientMode::GenerationThreshold).unwrap()
    }

    fn hashes(events: &[Arc<PlatformEvent>]) -> Vec<Hash> {
        events.iter().map(|e| e.hash()).collect()
    }

    #[test]
    fn test_genesis_released_immediately() {
        let (mut buffer, log) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);

        let out = buffer.handle_event(a.clone()).unwrap();

        assert_eq!(hashes(&out), vec![a.hash()]);
        assert_eq!(buffer.current_orphan_count(), 0);
        assert!(log.exited().is_empty());
    }

    #[test]
    fn test_child_waits_for_parent() {
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let b = child(1, &a, &[]);

        assert!(buffer.handle_event(b.clone()).unwrap().is_empty());
        assert_eq!(buffer.current_orphan_count(), 1);
        assert!(buffer.is_orphan(&b.hash()));
        assert_eq!(buffer.missing_parents(&b.hash()), vec![*a.descriptor()]);

        let out = buffer.handle_event(a.clone()).unwrap();
        assert_eq!(hashes(&out), vec![a.hash(), b.hash()]);
        assert_eq!(buffer.current_orphan_count(), 0);
        assert!(!buffer.is_orphan(&b.hash()));
    }

    #[test]
    fn test_parent_released_earlier_satisfies_child() {
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let b = child(1, &a, &[]);

        buffer.handle_event(a).unwrap();
        let out = buffer.handle_event(b.clone()).unwrap();
        assert_eq!(hashes(&out), vec![b.hash()]);
    }

    #[test]
    fn test_all_parents_required() {
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let x = genesis(2);
        let b = child(1, &a, &[&x]);

        buffer.handle_event(b.clone()).unwrap();
        assert_eq!(buffer.handle_event(a.clone()).unwrap().len(), 1);
        assert!(buffer.is_orphan(&b.hash()));
        assert_eq!(buffer.missing_parents(&b.hash()), vec![*x.descriptor()]);

        let out = buffer.handle_event(x.clone()).unwrap();
        assert_eq!(hashes(&out), vec![x.hash(), b.hash()]);
    }

    #[test]
    fn test_repeated_parent_counted_once() {
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let b = child(2, &a, &[&a, &a]);

        buffer.handle_event(b.clone()).unwrap();
        assert_eq!(buffer.missing_parents(&b.hash()).len(), 1);

        let out = buffer.handle_event(a.clone()).unwrap();
        assert_eq!(hashes(&out), vec![a.hash(), b.hash()]);
        assert_eq!(buffer.current_orphan_count(), 0);
    }

    #[test]
    fn test_cascade_releases_in_topological_order() {
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let x = genesis(2);
        let b = child(1, &a, &[]);
        let y = child(2, &x, &[&b]);
        let c = child(1, &b, &[&y]);

        for event in [&c, &y, &b] {
            assert!(buffer.handle_event((*event).clone()).unwrap().is_empty());
        }
        assert_eq!(hashes(&buffer.handle_event(x.clone()).unwrap()), vec![x.hash()]);
        assert_eq!(buffer.current_orphan_count(), 3);

        let out = buffer.handle_event(a.clone()).unwrap();
        assert_eq!(hashes(&out), vec![a.hash(), b.hash(), y.hash(), c.hash()]);
        assert_eq!(buffer.current_orphan_count(), 0);
        assert_eq!(buffer.stats().events_emitted, 5);
    }

    #[test]
    fn test_ancient_arrival_discarded() {
        let (mut buffer, log) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let b = child(1, &a, &[]);
        buffer.set_event_window(generation_window(2)).unwrap();

        assert!(buffer.handle_event(b.clone()).unwrap().is_empty());
        assert_eq!(buffer.current_orphan_count(), 0);
        assert_eq!(log.exited(), vec![b.hash()]);
        assert_eq!(buffer.stats().ancient_discarded, 1);
    }

    #[test]
    fn test_window_advance_releases_orphan_of_undelivered_parent() {
        let (mut buffer, log) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let c = child(1, &a, &[]);

        assert!(buffer.handle_event(c.clone()).unwrap().is_empty());
        assert!(buffer.set_event_window(generation_window(0)).unwrap().is_empty());

        let out = buffer.set_event_window(generation_window(1)).unwrap();
        assert_eq!(hashes(&out), vec![c.hash()]);
        assert_eq!(buffer.current_orphan_count(), 0);
        assert!(log.exited().is_empty());
    }

    #[test]
    fn test_ancient_parent_satisfied_on_arrival() {
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let b = child(1, &a, &[]);
        let c = child(1, &b, &[]);
        buffer.set_event_window(generation_window(2)).unwrap();

        let out = buffer.handle_event(c.clone()).unwrap();
        assert_eq!(hashes(&out), vec![c.hash()]);
    }

    #[test]
    fn test_window_advance_releases_buffered_parent_before_child() {
        // a (never delivered) <- b <- c <- d, plus x <- d. Advancing past a
        // releases b and c while d keeps waiting on x.
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let x0 = genesis(2);
        let x = child(2, &x0, &[]);
        let b = child(1, &a, &[]);
        let c = child(1, &b, &[]);
        let d = child(2, &x, &[&c]);

        for event in [&d, &c, &b] {
            buffer.handle_event((*event).clone()).unwrap();
        }
        let out = buffer.set_event_window(generation_window(1)).unwrap();
        assert_eq!(hashes(&out), vec![b.hash(), c.hash()]);
        assert!(buffer.is_orphan(&d.hash()));

        let out = buffer.handle_event(x.clone()).unwrap();
        assert_eq!(hashes(&out), vec![x.hash(), d.hash()]);
    }

    #[test]
    fn test_window_advance_over_buffered_parents_keeps_order() {
        // Both b and its child c have become ancient-keyed parents; b must
        // still come out first.
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let b = child(1, &a, &[]);
        let c = child(1, &b, &[]);
        let d = child(1, &c, &[]);

        for event in [&d, &c, &b] {
            buffer.handle_event((*event).clone()).unwrap();
        }
        let out = buffer.set_event_window(generation_window(3)).unwrap();
        assert_eq!(hashes(&out), vec![b.hash(), c.hash(), d.hash()]);
        assert_eq!(buffer.current_orphan_count(), 0);
    }

    #[test]
    fn test_birth_round_mode() {
        let (mut buffer, log) = make_buffer(AncientMode::BirthRoundThreshold);
        let old = Arc::new(PlatformEvent::new(NodeId(1), None, vec![], 3, 0));
        let young = Arc::new(PlatformEvent::new(
            NodeId(1),
            Some(*old.descriptor()),
            vec![],
            5,
            0,
        ));

        assert!(buffer.handle_event(young.clone()).unwrap().is_empty());
        let window = EventWindow::new(6, 4, 1, AncientMode::BirthRoundThreshold).unwrap();
        let out = buffer.set_event_window(window).unwrap();
        assert_eq!(hashes(&out), vec![young.hash()]);

        assert!(buffer.handle_event(old).unwrap().is_empty());
        assert_eq!(log.exited().len(), 1);
    }

    fn born(
        creator: u64,
        self_parent: Option<&Arc<PlatformEvent>>,
        birth_round: u64,
    ) -> Arc<PlatformEvent> {
        Arc::new(PlatformEvent::new(
            NodeId(creator),
            self_parent.map(|p| *p.descriptor()),
            vec![],
            birth_round,
            0,
        ))
    }

    fn birth_round_window(ancient: u64) -> EventWindow {
        EventWindow::new(ancient, ancient, 1, AncientMode::BirthRoundThreshold).unwrap()
    }

    #[test]
    fn test_same_round_chain_released_in_order_by_window() {
        // p (never delivered) <- b1 <- b2 in round 5, b2 <- c in round 6.
        // Delivered child first, so the round-5 keys are indexed b2, b1, p.
        let (mut buffer, _) = make_buffer(AncientMode::BirthRoundThreshold);
        let p = born(1, None, 5);
        let b1 = born(1, Some(&p), 5);
        let b2 = born(1, Some(&b1), 5);
        let c = born(1, Some(&b2), 6);

        for event in [&c, &b2, &b1] {
            assert!(buffer.handle_event((*event).clone()).unwrap().is_empty());
        }
        let out = buffer.set_event_window(birth_round_window(6)).unwrap();

        assert_eq!(hashes(&out), vec![b1.hash(), b2.hash(), c.hash()]);
        assert_eq!(buffer.current_orphan_count(), 0);
    }

    #[test]
    fn test_ancient_buffered_parent_still_blocks_children() {
        // b is born in round 5 but names a round-7 parent q, so it stays
        // buffered after round 5 turns ancient.
        let (mut buffer, _) = make_buffer(AncientMode::BirthRoundThreshold);
        let q = born(2, None, 7);
        let b = Arc::new(PlatformEvent::new(
            NodeId(1),
            None,
            vec![*q.descriptor()],
            5,
            0,
        ));
        let c = born(1, Some(&b), 6);
        let d = born(3, Some(&c), 6);

        assert!(buffer.handle_event(d.clone()).unwrap().is_empty());
        assert!(buffer.handle_event(c.clone()).unwrap().is_empty());
        assert!(buffer.handle_event(b.clone()).unwrap().is_empty());
        assert!(buffer.set_event_window(birth_round_window(6)).unwrap().is_empty());
        assert!(buffer.is_orphan(&b.hash()));
        assert!(buffer.is_orphan(&c.hash()));
        assert_eq!(buffer.missing_parents(&c.hash()), vec![*b.descriptor()]);

        // A late child of the ancient, buffered b must wait too.
        let e = born(4, Some(&b), 6);
        assert!(buffer.handle_event(e.clone()).unwrap().is_empty());
        assert_eq!(buffer.missing_parents(&e.hash()), vec![*b.descriptor()]);

        let out = buffer.handle_event(q.clone()).unwrap();
        assert_eq!(
            hashes(&out),
            vec![q.hash(), b.hash(), c.hash(), d.hash(), e.hash()]
        );
        assert_eq!(buffer.current_orphan_count(), 0);
    }

    #[test]
    fn test_every_missing_parent_is_tracked() {
        let (mut buffer, _) = make_buffer(AncientMode::BirthRoundThreshold);
        let q = born(2, None, 7);
        let a = born(3, None, 6);
        let b = Arc::new(PlatformEvent::new(
            NodeId(1),
            None,
            vec![*q.descriptor()],
            5,
            0,
        ));
        buffer.handle_event(b.clone()).unwrap();
        buffer.set_event_window(birth_round_window(6)).unwrap();

        // One parent ancient and buffered, one not yet delivered.
        let c = Arc::new(PlatformEvent::new(
            NodeId(1),
            Some(*b.descriptor()),
            vec![*a.descriptor()],
            6,
            0,
        ));
        assert!(buffer.handle_event(c.clone()).unwrap().is_empty());
        assert_eq!(
            buffer.missing_parents(&c.hash()),
            vec![*b.descriptor(), *a.descriptor()]
        );

        assert_eq!(hashes(&buffer.handle_event(a.clone()).unwrap()), vec![a.hash()]);
        assert_eq!(buffer.missing_parents(&c.hash()), vec![*b.descriptor()]);
        let out = buffer.handle_event(q.clone()).unwrap();
        assert_eq!(hashes(&out), vec![q.hash(), b.hash(), c.hash()]);
    }

    #[test]
    fn test_duplicate_orphan_rejected() {
        let (mut buffer, log) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let b = child(1, &a, &[]);

        buffer.handle_event(b.clone()).unwrap();
        let err = buffer.handle_event(b.clone()).unwrap_err();
        assert_eq!(err, OrphanBufferError::DuplicateEvent { hash: b.hash() });
        assert_eq!(buffer.current_orphan_count(), 1);
        assert_eq!(buffer.stats().duplicates_rejected, 1);
        assert_eq!(log.exited(), vec![b.hash()]);

        // The original still resolves exactly once.
        let out = buffer.handle_event(a.clone()).unwrap();
        assert_eq!(hashes(&out), vec![a.hash(), b.hash()]);
    }

    #[test]
    fn test_duplicate_emitted_rejected() {
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);

        buffer.handle_event(a.clone()).unwrap();
        assert!(matches!(
            buffer.handle_event(a.clone()),
            Err(OrphanBufferError::DuplicateEvent { .. })
        ));
        assert_eq!(buffer.stats().events_emitted, 1);
        assert_eq!(buffer.current_orphan_count(), 0);
    }

    #[test]
    fn test_duplicate_after_ancient_is_discarded() {
        let (mut buffer, log) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);

        buffer.handle_event(a.clone()).unwrap();
        buffer.set_event_window(generation_window(1)).unwrap();

        assert!(buffer.handle_event(a.clone()).unwrap().is_empty());
        assert_eq!(buffer.stats().ancient_discarded, 1);
        assert_eq!(log.exited(), vec![a.hash()]);
    }

    #[test]
    #[traced_test]
    fn test_window_regression_rejected() {
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let b = child(1, &a, &[]);
        let c = child(1, &b, &[]);
        buffer.handle_event(c.clone()).unwrap();
        buffer.set_event_window(generation_window(1)).unwrap();

        let err = buffer.set_event_window(generation_window(0)).unwrap_err();
        assert_eq!(
            err,
            OrphanBufferError::WindowRegression {
                current: 1,
                proposed: 0
            }
        );
        assert_eq!(buffer.event_window().ancient_threshold(), 1);
        assert_eq!(buffer.stats().window_regressions_rejected, 1);
        assert_eq!(buffer.stats().window_updates, 1);
        assert!(buffer.is_orphan(&c.hash()));
        assert!(logs_contain("Rejecting event window regression"));
    }

    #[test]
    fn test_ancient_mode_mismatch_rejected() {
        let (mut buffer, _) = make_buffer(AncientMode::GenerationThreshold);
        let window = EventWindow::genesis(AncientMode::BirthRoundThreshold);
        assert_eq!(
            buffer.set_event_window(window).unwrap_err(),
            OrphanBufferError::AncientModeMismatch {
                current: AncientMode::GenerationThreshold,
                proposed: AncientMode::BirthRoundThreshold,
            }
        );
        assert_eq!(
            buffer.event_window().ancient_mode(),
            AncientMode::GenerationThreshold
        );
    }

    #[test]
    fn test_deep_chain_released_without_recursion() {
        const DEPTH: usize = 50_000;

        let root = genesis(1);
        let mut chain = vec![root.clone()];
        for _ in 1..DEPTH {
            let next = child(1, chain.last().unwrap(), &[]);
            chain.push(next);
        }

        // In birth-round mode the whole chain shares one round, so every
        // missing-parent key lands under the same indicator.
        for mode in [AncientMode::GenerationThreshold, AncientMode::BirthRoundThreshold] {
            let (mut buffer, _) = make_buffer(mode);
            for event in chain.iter().skip(1).rev() {
                assert!(buffer.handle_event(event.clone()).unwrap().is_empty());
            }
            assert_eq!(buffer.current_orphan_count(), DEPTH - 1);

            let out = buffer.handle_event(root.clone()).unwrap();
            assert_eq!(out.len(), DEPTH);
            assert_eq!(hashes(&out), hashes(&chain));
            assert_eq!(buffer.current_orphan_count(), 0);
        }
    }

    #[test]
    #[traced_test]
    fn test_orphan_warn_threshold() {
        let mut buffer = OrphanBuffer::new(
            OrphanBufferConfig::new().with_orphan_warn_threshold(2),
            EventWindow::genesis(AncientMode::GenerationThreshold),
            Arc::new(NoOpIntakeEventCounter),
        );
        let a = genesis(1);
        let x = genesis(2);
        buffer.handle_event(child(1, &a, &[])).unwrap();
        assert!(!logs_contain("Orphan count reached warning threshold"));

        buffer.handle_event(child(2, &x, &[])).unwrap();
        assert!(logs_contain("Orphan count reached warning threshold"));
    }

    #[test]
    fn test_clear_reports_orphans() {
        let (mut buffer, log) = make_buffer(AncientMode::GenerationThreshold);
        let a = genesis(1);
        let b = child(1, &a, &[]);
        buffer.handle_event(b.clone()).unwrap();

        buffer.clear();

        assert_eq!(buffer.current_orphan_count(), 0);
        assert_eq!(log.exited(), vec![b.hash()]);
        // Nothing is waiting on `a` any more.
        assert_eq!(hashes(&buffer.handle_event(a.clone()).unwrap()), vec![a.hash()]);
    }
}

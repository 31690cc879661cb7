//! Test helpers for hashgraph intake - deterministic event DAGs and checkers.
//!
//! This crate builds realistic event DAGs from a seed, so tests can deliver
//! thousands of events in a shuffled order and still reproduce a failure
//! exactly.
//!
//! # Example
//!
//! ```rust
//! use hashgraph_test_helpers::EventGenerator;
//!
//! // Four creators, up to two other-parents per event
//! let mut generator = EventGenerator::new(4, 42).with_max_other_parents(2);
//! let mut events = generator.generate(100);
//!
//! // Generated in topological order; shuffle to simulate gossip
//! generator.shuffle(&mut events);
//! assert_eq!(events.len(), 100);
//! ```

pub mod byzantine;
pub mod fixtures;

pub use fixtures::{assert_topological, RecordingIntakeCounter, TopologyChecker};

use hashgraph_types::{EventDescriptor, NodeId, PlatformEvent, FIRST_GENERATION, ROUND_FIRST};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Generations per birth round in generated DAGs.
pub const GENERATIONS_PER_ROUND: u64 = 4;

/// Birth round assigned to a generated event of `generation`.
///
/// Non-decreasing in generation, so a child is never born before its
/// parents.
pub fn birth_round_for(generation: u64) -> u64 {
    ROUND_FIRST + (generation - FIRST_GENERATION) / GENERATIONS_PER_ROUND
}

/// Seeded generator of a hashgraph-shaped event DAG.
///
/// Each event picks a random creator, takes that creator's previous event
/// as self-parent and up to `max_other_parents` other-parents from the
/// latest events of other creators.
pub struct EventGenerator {
    rng: ChaCha8Rng,
    max_other_parents: usize,
    /// Latest event per creator, indexed by creator id.
    latest: Vec<Option<EventDescriptor>>,
    clock: u64,
}

impl std::fmt::Debug for EventGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventGenerator")
            .field("creators", &self.latest.len())
            .field("max_other_parents", &self.max_other_parents)
            .field("clock", &self.clock)
            .finish()
    }
}

impl EventGenerator {
    /// Create a generator for `creators` nodes.
    ///
    /// # Panics
    ///
    /// Panics if `creators` is zero.
    pub fn new(creators: usize, seed: u64) -> Self {
        assert!(creators > 0, "need at least one creator");
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            max_other_parents: 1,
            latest: vec![None; creators],
            clock: 0,
        }
    }

    /// Set the maximum number of other-parents per event.
    pub fn with_max_other_parents(mut self, max_other_parents: usize) -> Self {
        self.max_other_parents = max_other_parents;
        self
    }

    /// Number of creators.
    pub fn creators(&self) -> usize {
        self.latest.len()
    }

    /// Build the next event. Its parents have all been generated before it.
    pub fn next_event(&mut self) -> Arc<PlatformEvent> {
        let creator = self.rng.gen_range(0..self.latest.len());
        let self_parent = self.latest[creator];

        let candidates: Vec<EventDescriptor> = self
            .latest
            .iter()
            .enumerate()
            .filter(|(id, _)| *id != creator)
            .filter_map(|(_, latest)| *latest)
            .collect();
        let count = self
            .rng
            .gen_range(0..=self.max_other_parents)
            .min(candidates.len());
        let other_parents: Vec<EventDescriptor> = candidates
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();

        let generation = self_parent
            .iter()
            .chain(other_parents.iter())
            .map(|p| p.generation + 1)
            .max()
            .unwrap_or(FIRST_GENERATION);

        self.clock += 1;
        let event = Arc::new(PlatformEvent::new(
            NodeId(creator as u64),
            self_parent,
            other_parents,
            birth_round_for(generation),
            self.clock,
        ));
        self.latest[creator] = Some(*event.descriptor());
        event
    }

    /// Build `count` events in generation order.
    pub fn generate(&mut self, count: usize) -> Vec<Arc<PlatformEvent>> {
        (0..count).map(|_| self.next_event()).collect()
    }

    /// Shuffle `items` with the generator's RNG.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// The generator's RNG, for tests that need more randomness from the
    /// same seed.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

//! Adversarial delivery helpers.
//!
//! A faulty or malicious peer can withhold parents, reference events that do
//! not exist, or send malformed DAG links. These helpers build such inputs
//! so tests can check the buffer neither loses nor invents events.

use hashgraph_types::{EventDescriptor, Hash, NodeId, PlatformEvent};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;

/// Descriptor of an event that will never be delivered.
pub fn phantom_parent(creator: u64, generation: u64, birth_round: u64) -> EventDescriptor {
    let hash = Hash::from_parts(&[
        &b"phantom"[..],
        &creator.to_le_bytes()[..],
        &generation.to_le_bytes()[..],
        &birth_round.to_le_bytes()[..],
    ]);
    EventDescriptor::new(hash, NodeId(creator), generation, birth_round)
}

/// An event whose self-parent is `phantom`.
pub fn orphan_of(creator: u64, phantom: &EventDescriptor) -> Arc<PlatformEvent> {
    Arc::new(PlatformEvent::new(
        NodeId(creator),
        Some(*phantom),
        vec![],
        phantom.birth_round,
        0,
    ))
}

/// An event that lists itself as its own self-parent.
pub fn self_referential_event(creator: u64, generation: u64, birth_round: u64) -> Arc<PlatformEvent> {
    let descriptor = phantom_parent(creator, generation, birth_round);
    Arc::new(PlatformEvent::from_parts(descriptor, Some(descriptor), vec![]))
}

/// Split `events` into those delivered and `count` withheld at random.
///
/// Delivered events keep their relative order.
pub fn withhold<R: Rng>(
    events: &[Arc<PlatformEvent>],
    count: usize,
    rng: &mut R,
) -> (Vec<Arc<PlatformEvent>>, Vec<Arc<PlatformEvent>>) {
    let withheld: HashSet<Hash> = events
        .choose_multiple(rng, count)
        .map(|e| e.hash())
        .collect();
    events
        .iter()
        .cloned()
        .partition(|e| !withheld.contains(&e.hash()))
}

/// Every event in `events` that transitively descends from one in `roots`.
pub fn descendants_of(
    events: &[Arc<PlatformEvent>],
    roots: &[Arc<PlatformEvent>],
) -> HashSet<Hash> {
    let mut tainted: HashSet<Hash> = roots.iter().map(|e| e.hash()).collect();
    let mut descendants = HashSet::new();
    // Parents have lower generations, so one sorted pass suffices.
    let mut ordered: Vec<&Arc<PlatformEvent>> = events.iter().collect();
    ordered.sort_by_key(|e| e.generation());
    for event in ordered {
        if event.all_parents().any(|p| tainted.contains(&p.hash)) {
            tainted.insert(event.hash());
            descendants.insert(event.hash());
        }
    }
    descendants
}

//! Events and their compact descriptors.

use crate::{AncientMode, Hash, NodeId, FIRST_GENERATION};
use serde::{Deserialize, Serialize};
use std::hash::Hasher;

/// Compact identity of an event.
///
/// Carries just enough to reference an event without its payload: the hash,
/// the creator, and both scalars an [`AncientMode`] may select as the
/// event's ancient indicator.
///
/// Equality and hashing use `hash` only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Hash of the event.
    pub hash: Hash,
    /// Node that created the event.
    pub creator: NodeId,
    /// Generation (one more than the highest parent generation).
    pub generation: u64,
    /// Round in which the creator believed the event was born.
    pub birth_round: u64,
}

impl EventDescriptor {
    /// Create a descriptor.
    pub fn new(hash: Hash, creator: NodeId, generation: u64, birth_round: u64) -> Self {
        Self {
            hash,
            creator,
            generation,
            birth_round,
        }
    }

    /// The scalar compared against the ancient threshold under `mode`.
    #[inline]
    pub fn indicator(&self, mode: AncientMode) -> u64 {
        match mode {
            AncientMode::GenerationThreshold => self.generation,
            AncientMode::BirthRoundThreshold => self.birth_round,
        }
    }
}

impl PartialEq for EventDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for EventDescriptor {}

impl std::hash::Hash for EventDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.hash, state);
    }
}

/// An immutable node of the event DAG.
///
/// Created by the validation stage upstream of intake and never mutated
/// afterwards. Parents are referenced by descriptor: an optional self-parent
/// (the creator's previous event) followed by zero or more other-parents in
/// the order the creator declared them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEvent {
    descriptor: EventDescriptor,
    self_parent: Option<EventDescriptor>,
    other_parents: Vec<EventDescriptor>,
    time_created_nanos: u64,
}

impl PlatformEvent {
    /// Build a new event, deriving its generation and hash.
    ///
    /// Generation is one more than the highest parent generation, or
    /// [`FIRST_GENERATION`] for a parentless event. The hash covers the
    /// creator, every parent hash in declared order, the generation, the
    /// birth round and the creation time.
    pub fn new(
        creator: NodeId,
        self_parent: Option<EventDescriptor>,
        other_parents: Vec<EventDescriptor>,
        birth_round: u64,
        time_created_nanos: u64,
    ) -> Self {
        let generation = self_parent
            .iter()
            .chain(other_parents.iter())
            .map(|p| p.generation + 1)
            .max()
            .unwrap_or(FIRST_GENERATION);

        let creator_bytes = creator.to_le_bytes();
        let generation_bytes = generation.to_le_bytes();
        let birth_round_bytes = birth_round.to_le_bytes();
        let time_bytes = time_created_nanos.to_le_bytes();

        let mut parts: Vec<&[u8]> = Vec::with_capacity(5 + other_parents.len());
        parts.push(&creator_bytes);
        match &self_parent {
            Some(parent) => parts.push(parent.hash.as_bytes()),
            None => parts.push(Hash::ZERO.as_bytes()),
        }
        for parent in &other_parents {
            parts.push(parent.hash.as_bytes());
        }
        parts.push(&generation_bytes);
        parts.push(&birth_round_bytes);
        parts.push(&time_bytes);

        let hash = Hash::from_parts(&parts);

        Self {
            descriptor: EventDescriptor::new(hash, creator, generation, birth_round),
            self_parent,
            other_parents,
            time_created_nanos,
        }
    }

    /// Assemble an event around an identity computed elsewhere.
    ///
    /// No consistency check is made between `descriptor` and the parents.
    pub fn from_parts(
        descriptor: EventDescriptor,
        self_parent: Option<EventDescriptor>,
        other_parents: Vec<EventDescriptor>,
    ) -> Self {
        Self {
            descriptor,
            self_parent,
            other_parents,
            time_created_nanos: 0,
        }
    }

    /// The event's own descriptor.
    pub fn descriptor(&self) -> &EventDescriptor {
        &self.descriptor
    }

    /// The event hash.
    pub fn hash(&self) -> Hash {
        self.descriptor.hash
    }

    /// The creating node.
    pub fn creator(&self) -> NodeId {
        self.descriptor.creator
    }

    /// The event's generation.
    pub fn generation(&self) -> u64 {
        self.descriptor.generation
    }

    /// The event's birth round.
    pub fn birth_round(&self) -> u64 {
        self.descriptor.birth_round
    }

    /// Creation time claimed by the creator, in nanoseconds since the epoch.
    pub fn time_created_nanos(&self) -> u64 {
        self.time_created_nanos
    }

    /// The self-parent, if any.
    pub fn self_parent(&self) -> Option<&EventDescriptor> {
        self.self_parent.as_ref()
    }

    /// Other-parents in declared order.
    pub fn other_parents(&self) -> &[EventDescriptor] {
        &self.other_parents
    }

    /// All parents: self-parent first, then other-parents in declared order.
    ///
    /// Each call returns a fresh iterator.
    pub fn all_parents(&self) -> impl Iterator<Item = &EventDescriptor> + Clone + '_ {
        self.self_parent.iter().chain(self.other_parents.iter())
    }

    /// Whether the event has no parents at all.
    pub fn is_genesis(&self) -> bool {
        self.self_parent.is_none() && self.other_parents.is_empty()
    }
}

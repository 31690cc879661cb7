//! Hash-keyed map with a moving lower bound on sequence numbers.
//!
//! Every entry carries a sequence number (an event's ancient indicator).
//! Shifting the window purges every entry whose sequence number falls below
//! the new lower bound in one sweep, oldest first, which is how the orphan
//! buffer forgets ancient descriptors without scanning the whole map.

use hashgraph_types::Hash;
use std::collections::{BTreeMap, HashMap};

/// Stale slots a bucket may hold beyond twice its live count before it is
/// compacted.
const COMPACT_SLACK: usize = 32;

/// Errors from [`SequenceMap::shift_window`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShiftError {
    /// The lower bound may only move forwards.
    #[error("Cannot shift window backwards from {current} to {requested}")]
    Backwards { current: u64, requested: u64 },
}

/// Map from [`Hash`] to a value tagged with a sequence number.
///
/// Entries with a sequence number below [`lower_bound`](Self::lower_bound)
/// are never stored. Within one sequence number, purge order follows
/// insertion order.
///
/// Removal is constant time: the reverse index keeps a stale slot until its
/// bucket is purged or emptied, and each slot carries the stamp of the
/// insertion that created it so a re-inserted key is not purged through an
/// old slot.
#[derive(Debug)]
pub struct SequenceMap<V> {
    entries: HashMap<Hash, Entry<V>>,
    /// Reverse index: sequence -> slots, in insertion order
    by_sequence: BTreeMap<u64, Bucket>,
    lower_bound: u64,
    next_stamp: u64,
}

#[derive(Debug)]
struct Entry<V> {
    sequence: u64,
    stamp: u64,
    value: V,
}

#[derive(Debug, Default)]
struct Bucket {
    slots: Vec<(Hash, u64)>,
    /// Slots whose entry is still present.
    live: usize,
}

impl<V> SequenceMap<V> {
    /// Create an empty map that accepts sequence numbers `>= lower_bound`.
    pub fn new(lower_bound: u64) -> Self {
        Self {
            entries: HashMap::new(),
            by_sequence: BTreeMap::new(),
            lower_bound,
            next_stamp: 0,
        }
    }

    /// Smallest sequence number the map accepts.
    pub fn lower_bound(&self) -> u64 {
        self.lower_bound
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &Hash) -> bool {
        self.entries.contains_key(key)
    }

    /// Value stored for `key`.
    pub fn get(&self, key: &Hash) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Mutable value stored for `key`.
    pub fn get_mut(&mut self, key: &Hash) -> Option<&mut V> {
        self.entries.get_mut(key).map(|entry| &mut entry.value)
    }

    /// Sequence number stored for `key`.
    pub fn sequence_of(&self, key: &Hash) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.sequence)
    }

    /// Insert a value, replacing any existing value for `key`.
    ///
    /// Returns false (and stores nothing) if `sequence` is below the lower
    /// bound. A replaced entry keeps its original sequence number.
    pub fn insert(&mut self, key: Hash, sequence: u64, value: V) -> bool {
        if sequence < self.lower_bound {
            return false;
        }
        if let Some(existing) = self.entries.get_mut(&key) {
            existing.value = value;
            return true;
        }
        self.insert_new(key, sequence, value);
        true
    }

    fn insert_new(&mut self, key: Hash, sequence: u64, value: V) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        let bucket = self.by_sequence.entry(sequence).or_default();
        bucket.slots.push((key, stamp));
        bucket.live += 1;
        self.entries.insert(
            key,
            Entry {
                sequence,
                stamp,
                value,
            },
        );
    }

    /// Get the value for `key`, inserting `make()` under `sequence` if absent.
    ///
    /// Returns `None` if the key is absent and `sequence` is below the lower
    /// bound.
    pub fn get_or_insert_with(
        &mut self,
        key: Hash,
        sequence: u64,
        make: impl FnOnce() -> V,
    ) -> Option<&mut V> {
        if !self.entries.contains_key(&key) {
            if sequence < self.lower_bound {
                return None;
            }
            self.insert_new(key, sequence, make());
        }
        self.entries.get_mut(&key).map(|entry| &mut entry.value)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &Hash) -> Option<V> {
        let entry = self.entries.remove(key)?;
        if let Some(bucket) = self.by_sequence.get_mut(&entry.sequence) {
            bucket.live -= 1;
            if bucket.live == 0 {
                self.by_sequence.remove(&entry.sequence);
            } else if bucket.slots.len() > 2 * bucket.live + COMPACT_SLACK {
                let entries = &self.entries;
                bucket.slots.retain(|(key, stamp)| {
                    entries.get(key).is_some_and(|entry| entry.stamp == *stamp)
                });
            }
        }
        Some(entry.value)
    }

    /// Raise the lower bound, removing and returning every entry below it.
    ///
    /// Purged entries come back in ascending sequence order. Shifting to
    /// the current bound is a no-op.
    pub fn shift_window(&mut self, new_lower_bound: u64) -> Result<Vec<(Hash, V)>, ShiftError> {
        if new_lower_bound < self.lower_bound {
            return Err(ShiftError::Backwards {
                current: self.lower_bound,
                requested: new_lower_bound,
            });
        }
        self.lower_bound = new_lower_bound;

        let retained = self.by_sequence.split_off(&new_lower_bound);
        let purged = std::mem::replace(&mut self.by_sequence, retained);

        let mut removed = Vec::new();
        for (key, stamp) in purged.into_values().flat_map(|bucket| bucket.slots) {
            let current = self
                .entries
                .get(&key)
                .is_some_and(|entry| entry.stamp == stamp);
            if current {
                if let Some(entry) = self.entries.remove(&key) {
                    removed.push((key, entry.value));
                }
            }
        }
        Ok(removed)
    }

    /// Iterate over keys and values in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Hash, &V)> {
        self.entries.iter().map(|(key, entry)| (key, &entry.value))
    }

    /// Remove every entry. The lower bound is unchanged.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_sequence.clear();
    }
}

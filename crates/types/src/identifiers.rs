//! Identifier newtypes and well-known indicator values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generation of a parentless (genesis) event.
pub const FIRST_GENERATION: u64 = 0;

/// First consensus round. Birth rounds start here.
pub const ROUND_FIRST: u64 = 1;

/// Identifier of the node that created an event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Little-endian bytes, used when hashing event contents.
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

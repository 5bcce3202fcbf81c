//! Routing table types for ring-partitioned quorums
//!
//! A quorum's routing table is an ordered sequence of finger-table slots.
//! Entry order is significant (slot j covers ring offset 2^j), so the table
//! is a concrete record sequence with a deterministic binary encoding rather
//! than an unordered map: encode/decode round-trips are byte-reproducible.

use crate::error::{CodecError, Result, RingDhtError};
use serde::{Deserialize, Serialize};

/// Identifier of a quorum on the ring (a point in the 2^m identifier space)
pub type QuorumId = u64;

/// One finger-table slot: a routed edge between two quorums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEntry {
    /// Quorum that owns the table
    pub source: QuorumId,
    /// Successor quorum this slot points at
    pub target: QuorumId,
}

impl RoutingEntry {
    /// Create a new routing entry
    pub fn new(source: QuorumId, target: QuorumId) -> Self {
        Self { source, target }
    }
}

impl std::fmt::Display for RoutingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{} -> Q{}", self.source, self.target)
    }
}

/// Ordered finger table for one quorum
///
/// Length equals the bit width m of the identifier space.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutingTable {
    entries: Vec<RoutingEntry>,
}

impl RoutingTable {
    /// Create a table from ordered entries
    pub fn new(entries: Vec<RoutingEntry>) -> Self {
        Self { entries }
    }

    /// Entries in finger-slot order
    pub fn entries(&self) -> &[RoutingEntry] {
        &self.entries
    }

    /// Number of finger slots
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no slots
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the canonical byte representation
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.entries).map_err(RingDhtError::from)
    }

    /// Deserialize from the canonical byte representation
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, CodecError> {
        let entries = bincode::deserialize(bytes)
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;
        Ok(Self { entries })
    }
}

impl std::fmt::Display for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

//! Modular identifier ring and finger-table construction

use rand::Rng;
use ringdht_common::error::TopologyError;
use ringdht_common::types::routing::{QuorumId, RoutingEntry, RoutingTable};
use serde::{Deserialize, Serialize};

/// A modular identifier space of size 2^m
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingSpace {
    bits: u32,
}

impl RingSpace {
    /// Create an identifier space of size 2^bits
    ///
    /// `bits` must be in 1..=63 so the ring size fits a u64.
    pub fn new(bits: u32) -> Self {
        assert!((1..=63).contains(&bits), "ring bits must be in 1..=63");
        Self { bits }
    }

    /// Bit width m of the space; also the finger-table length
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of identifiers in the space, 2^m
    pub fn size(&self) -> u64 {
        1u64 << self.bits
    }

    /// Reduce a value into the space
    pub fn wrap(&self, value: u64) -> QuorumId {
        value & (self.size() - 1)
    }
}

/// Successor within an already-sorted, non-empty identifier list
fn successor_of_sorted(sorted: &[QuorumId], target: QuorumId) -> QuorumId {
    match sorted.iter().find(|&&id| id >= target) {
        Some(&id) => id,
        // Wrap around to the smallest identifier
        None => sorted[0],
    }
}

/// Find the successor of `target`: the smallest identifier >= target,
/// wrapping to the smallest identifier overall when none qualifies
pub fn successor(ids: &[QuorumId], target: QuorumId) -> Result<QuorumId, TopologyError> {
    if ids.is_empty() {
        return Err(TopologyError::EmptyRing);
    }

    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    Ok(successor_of_sorted(&sorted, target))
}

/// Build the finger table for quorum `id` over the current identifier set
///
/// Slot j targets the successor of `(id + 2^j) mod 2^m`, for j in 0..m.
pub fn finger_table(
    space: RingSpace,
    id: QuorumId,
    ids: &[QuorumId],
) -> Result<RoutingTable, TopologyError> {
    if ids.is_empty() {
        return Err(TopologyError::EmptyRing);
    }

    let mut sorted = ids.to_vec();
    sorted.sort_unstable();

    let mut entries = Vec::with_capacity(space.bits() as usize);
    for j in 0..space.bits() {
        let start = space.wrap(id.wrapping_add(1u64 << j));
        entries.push(RoutingEntry::new(id, successor_of_sorted(&sorted, start)));
    }

    Ok(RoutingTable::new(entries))
}

/// Generate `count` distinct random quorum identifiers, sorted ascending
///
/// `count` must not exceed the ring size.
pub fn random_quorum_ids(space: RingSpace, count: usize) -> Vec<QuorumId> {
    assert!(
        count as u64 <= space.size(),
        "cannot place {} quorums on a ring of size {}",
        count,
        space.size()
    );

    let mut rng = rand::thread_rng();
    let mut ids = Vec::with_capacity(count);
    while ids.len() < count {
        let id = rng.gen_range(0..space.size());
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_basic_and_wraparound() {
        let ids = vec![2, 5, 9, 13];

        assert_eq!(successor(&ids, 6).unwrap(), 9);
        assert_eq!(successor(&ids, 9).unwrap(), 9);
        // Nothing at or above 14 on a ring of size 16: wrap to 2
        assert_eq!(successor(&ids, 14).unwrap(), 2);
        assert_eq!(successor(&ids, 0).unwrap(), 2);
    }

    #[test]
    fn test_successor_unsorted_input() {
        let ids = vec![13, 2, 9, 5];
        assert_eq!(successor(&ids, 6).unwrap(), 9);
        assert_eq!(successor(&ids, 14).unwrap(), 2);
    }

    #[test]
    fn test_successor_empty_ring() {
        assert_eq!(successor(&[], 3).unwrap_err(), TopologyError::EmptyRing);
    }

    #[test]
    fn test_finger_table_entries() {
        let space = RingSpace::new(4);
        let ids = vec![2, 5, 9, 13];

        // Targets for Q=2: 3, 4, 6, 10 -> successors 5, 5, 9, 13
        let table = finger_table(space, 2, &ids).unwrap();
        let targets: Vec<_> = table.entries().iter().map(|e| e.target).collect();
        assert_eq!(targets, vec![5, 5, 9, 13]);
        assert!(table.entries().iter().all(|e| e.source == 2));

        // Targets for Q=13: 14, 15, 1, 5 -> successors 2, 2, 2, 5
        let table = finger_table(space, 13, &ids).unwrap();
        let targets: Vec<_> = table.entries().iter().map(|e| e.target).collect();
        assert_eq!(targets, vec![2, 2, 2, 5]);
    }

    #[test]
    fn test_finger_table_length_is_ring_bits() {
        let space = RingSpace::new(6);
        let table = finger_table(space, 0, &[0, 31]).unwrap();
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_finger_table_empty_ring() {
        let space = RingSpace::new(4);
        assert_eq!(
            finger_table(space, 2, &[]).unwrap_err(),
            TopologyError::EmptyRing
        );
    }

    #[test]
    fn test_single_quorum_points_at_itself() {
        let space = RingSpace::new(4);
        let table = finger_table(space, 6, &[6]).unwrap();
        assert!(table.entries().iter().all(|e| e.target == 6));
    }

    #[test]
    fn test_random_ids_distinct_and_sorted() {
        let space = RingSpace::new(4);
        let ids = random_quorum_ids(space, 8);
        assert_eq!(ids.len(), 8);
        for window in ids.windows(2) {
            assert!(window[0] < window[1]);
        }
        assert!(ids.iter().all(|&id| id < space.size()));
    }

    #[test]
    fn test_wrap() {
        let space = RingSpace::new(4);
        assert_eq!(space.wrap(16), 0);
        assert_eq!(space.wrap(17), 1);
        assert_eq!(space.wrap(15), 15);
    }
}

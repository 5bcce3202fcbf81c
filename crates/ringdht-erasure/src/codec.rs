//! Routing-table shard encode/decode

use reed_solomon_erasure::galois_8::ReedSolomon;
use reed_solomon_erasure::Error as RsError;
use ringdht_common::error::CodecError;
use ringdht_common::types::routing::RoutingTable;
use serde::{Deserialize, Serialize};

/// Maximum D+P for an 8-bit symbol field
pub const MAX_TOTAL_SHARDS: usize = 256;

/// Shard-set parameters required for decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardMetadata {
    /// Number of data shards D
    pub data_shards: usize,
    /// Number of parity shards P
    pub parity_shards: usize,
    /// Serialized table length before padding
    pub original_size: usize,
}

impl ShardMetadata {
    /// Total shard count D+P
    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Per-shard byte length: D shards hold `original_size` bytes with
    /// right-padding
    pub fn shard_size(&self) -> usize {
        let size = (self.original_size + self.data_shards - 1) / self.data_shards;
        size.max(1)
    }
}

/// An erasure-coded routing table: D+P shards plus decode metadata
///
/// `None` marks a lost shard — distinct from a present all-zero buffer. A
/// detector that finds a corrupted shard can set its slot to `None` and
/// retry the decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedTable {
    /// Decode parameters
    pub metadata: ShardMetadata,
    /// Ordered shards; data shards first, then parity
    pub shards: Vec<Option<Vec<u8>>>,
}

impl EncodedTable {
    /// Number of shards still present
    pub fn present_shards(&self) -> usize {
        self.shards.iter().filter(|s| s.is_some()).count()
    }

    /// Drop a shard, marking it as lost
    pub fn mark_missing(&mut self, index: usize) {
        if index < self.shards.len() {
            self.shards[index] = None;
        }
    }
}

/// Encode a routing table into D data shards plus P parity shards
///
/// All shards share one fixed length. With P = 0 the table is split without
/// parity and decoding requires every data shard.
pub fn encode(
    table: &RoutingTable,
    data_shards: usize,
    parity_shards: usize,
) -> Result<EncodedTable, CodecError> {
    if data_shards < 1 {
        return Err(CodecError::Encode(
            "data shard count must be at least 1".to_string(),
        ));
    }
    let total_shards = data_shards + parity_shards;
    if total_shards > MAX_TOTAL_SHARDS {
        return Err(CodecError::Encode(format!(
            "{} total shards exceed the {}-symbol field limit",
            total_shards, MAX_TOTAL_SHARDS
        )));
    }

    let bytes = table
        .to_bytes()
        .map_err(|e| CodecError::Encode(format!("failed to serialize table: {}", e)))?;

    let metadata = ShardMetadata {
        data_shards,
        parity_shards,
        original_size: bytes.len(),
    };
    let shard_size = metadata.shard_size();

    // Split into right-padded data shards
    let mut shards: Vec<Vec<u8>> = Vec::with_capacity(total_shards);
    for i in 0..data_shards {
        let start = (i * shard_size).min(bytes.len());
        let end = ((i + 1) * shard_size).min(bytes.len());
        let mut shard = bytes[start..end].to_vec();
        shard.resize(shard_size, 0);
        shards.push(shard);
    }
    for _ in 0..parity_shards {
        shards.push(vec![0u8; shard_size]);
    }

    if parity_shards > 0 {
        let rs = ReedSolomon::new(data_shards, parity_shards)
            .map_err(|e| CodecError::Encode(format!("failed to create encoder: {}", e)))?;
        rs.encode(&mut shards)
            .map_err(|e| CodecError::Encode(format!("failed to compute parity: {}", e)))?;
    }

    Ok(EncodedTable {
        metadata,
        shards: shards.into_iter().map(Some).collect(),
    })
}

/// Reconstruct and verify a routing table from a possibly-damaged shard set
///
/// Tolerates up to P shards lost or corrupted-then-dropped; a corrupted
/// shard that is still present fails parity verification rather than
/// producing wrong data.
pub fn decode(encoded: &EncodedTable) -> Result<RoutingTable, CodecError> {
    let metadata = encoded.metadata;
    if metadata.data_shards < 1 {
        return Err(CodecError::Encode(
            "data shard count must be at least 1".to_string(),
        ));
    }

    let total_shards = metadata.total_shards();
    if encoded.shards.len() != total_shards {
        return Err(CodecError::ShardCountMismatch {
            expected: total_shards,
            actual: encoded.shards.len(),
        });
    }

    // Normalize unusable shards to missing: zero-length buffers stand for
    // shards a corruption detector has already discarded, and a wrongly
    // sized buffer cannot take part in reconstruction either.
    let shard_size = metadata.shard_size();
    let mut working: Vec<Option<Vec<u8>>> = encoded
        .shards
        .iter()
        .map(|slot| match slot {
            Some(buf) if buf.len() == shard_size => Some(buf.clone()),
            _ => None,
        })
        .collect();

    let present = working.iter().filter(|s| s.is_some()).count();
    if present < metadata.data_shards {
        return Err(CodecError::InsufficientShards {
            present,
            required: metadata.data_shards,
        });
    }

    let data: Vec<Vec<u8>> = if metadata.parity_shards > 0 {
        let rs = ReedSolomon::new(metadata.data_shards, metadata.parity_shards)
            .map_err(|e| CodecError::Encode(format!("failed to create decoder: {}", e)))?;

        rs.reconstruct(&mut working).map_err(|e| match e {
            RsError::TooFewShardsPresent => CodecError::InsufficientShards {
                present,
                required: metadata.data_shards,
            },
            other => CodecError::Encode(format!("reconstruction failed: {}", other)),
        })?;

        // All shards are present after reconstruction; recompute parity from
        // the data shards and compare against the stored parity shards
        let full: Vec<Vec<u8>> = working.into_iter().flatten().collect();
        let ok = rs
            .verify(&full)
            .map_err(|e| CodecError::Encode(format!("verification error: {}", e)))?;
        if !ok {
            return Err(CodecError::VerificationFailed);
        }

        full
    } else {
        // No parity: the presence check above guarantees every data shard
        working.into_iter().flatten().collect()
    };

    let mut bytes = Vec::with_capacity(metadata.data_shards * shard_size);
    for shard in data.iter().take(metadata.data_shards) {
        bytes.extend_from_slice(shard);
    }
    bytes.truncate(metadata.original_size);

    RoutingTable::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringdht_common::types::routing::RoutingEntry;

    fn sample_table() -> RoutingTable {
        RoutingTable::new(vec![
            RoutingEntry::new(2, 5),
            RoutingEntry::new(2, 5),
            RoutingEntry::new(2, 9),
            RoutingEntry::new(2, 13),
        ])
    }

    #[test]
    fn test_encode_shape() {
        let encoded = encode(&sample_table(), 3, 2).unwrap();
        assert_eq!(encoded.metadata.data_shards, 3);
        assert_eq!(encoded.metadata.parity_shards, 2);
        assert_eq!(encoded.shards.len(), 5);

        let shard_size = encoded.metadata.shard_size();
        for shard in encoded.shards.iter().flatten() {
            assert_eq!(shard.len(), shard_size);
        }
    }

    #[test]
    fn test_round_trip_intact() {
        let table = sample_table();
        let encoded = encode(&table, 3, 2).unwrap();
        assert_eq!(decode(&encoded).unwrap(), table);
    }

    #[test]
    fn test_round_trip_without_parity() {
        let table = sample_table();
        let encoded = encode(&table, 4, 0).unwrap();
        assert_eq!(decode(&encoded).unwrap(), table);
    }

    #[test]
    fn test_missing_data_shard_without_parity_fails() {
        let mut encoded = encode(&sample_table(), 4, 0).unwrap();
        encoded.mark_missing(1);
        assert!(matches!(
            decode(&encoded).unwrap_err(),
            CodecError::InsufficientShards {
                present: 3,
                required: 4
            }
        ));
    }

    #[test]
    fn test_recovers_up_to_parity_losses() {
        let table = sample_table();
        let mut encoded = encode(&table, 3, 2).unwrap();
        encoded.mark_missing(0);
        encoded.mark_missing(4);
        assert_eq!(encoded.present_shards(), 3);
        assert_eq!(decode(&encoded).unwrap(), table);
    }

    #[test]
    fn test_zero_length_buffer_counts_as_missing() {
        let table = sample_table();
        let mut encoded = encode(&table, 3, 2).unwrap();
        // A detector blanks a corrupted shard instead of dropping the slot
        encoded.shards[1] = Some(Vec::new());
        assert_eq!(decode(&encoded).unwrap(), table);
    }

    #[test]
    fn test_corrupted_shard_fails_verification() {
        let table = sample_table();
        let mut encoded = encode(&table, 3, 2).unwrap();
        if let Some(shard) = encoded.shards[1].as_mut() {
            shard[0] ^= 0x01;
        }
        assert_eq!(decode(&encoded).unwrap_err(), CodecError::VerificationFailed);

        // Dropping the corrupted shard makes it recoverable again
        encoded.mark_missing(1);
        assert_eq!(decode(&encoded).unwrap(), table);
    }

    #[test]
    fn test_shard_count_mismatch() {
        let mut encoded = encode(&sample_table(), 3, 2).unwrap();
        encoded.shards.pop();
        assert!(matches!(
            decode(&encoded).unwrap_err(),
            CodecError::ShardCountMismatch {
                expected: 5,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_invalid_shard_counts_rejected() {
        assert!(matches!(
            encode(&sample_table(), 0, 2).unwrap_err(),
            CodecError::Encode(_)
        ));
        assert!(matches!(
            encode(&sample_table(), 200, 100).unwrap_err(),
            CodecError::Encode(_)
        ));
    }

    #[test]
    fn test_empty_table_round_trip() {
        let table = RoutingTable::new(Vec::new());
        let encoded = encode(&table, 2, 1).unwrap();
        assert_eq!(decode(&encoded).unwrap(), table);
    }
}

//! Error types for the RingDHT system
//!
//! Provides a unified error type and domain-specific error variants

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using RingDhtError
pub type Result<T> = std::result::Result<T, RingDhtError>;

/// Unified error type for RingDHT operations
#[derive(Debug, Error)]
pub enum RingDhtError {
    // Ring topology errors
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    // Shard codec errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    // Crypto errors
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    // Lookup exchange errors
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Ring-topology errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Ring contains no quorum identifiers")]
    EmptyRing,
}

/// Shard encode/decode errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Shard count mismatch: expected {expected}, got {actual}")]
    ShardCountMismatch { expected: usize, actual: usize },

    #[error("Insufficient shards for reconstruction: {present} present, {required} required")]
    InsufficientShards { present: usize, required: usize },

    #[error("Parity verification failed: shard data is corrupted")]
    VerificationFailed,

    #[error("Deserialization of reconstructed bytes failed: {0}")]
    Deserialization(String),
}

/// Threshold-signature errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Threshold not met: {shares} distinct shares, {required} required")]
    ThresholdNotMet { shares: usize, required: usize },

    #[error("Duplicate signature share from peer {peer}")]
    DuplicateShare { peer: String },

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Invalid public key")]
    InvalidPublicKey,
}

/// Authenticated-lookup exchange errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Exchange not found: {0}")]
    ExchangeNotFound(Uuid),

    #[error("Exchange {0} already reached a terminal state")]
    ExchangeClosed(Uuid),

    #[error("Exchange timed out after {elapsed_ms}ms (limit: {limit_ms}ms)")]
    Timeout { elapsed_ms: u64, limit_ms: u64 },
}

// Implement From for common external error types
impl From<bincode::Error> for RingDhtError {
    fn from(err: bincode::Error) -> Self {
        RingDhtError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RingDhtError {
    fn from(err: std::io::Error) -> Self {
        RingDhtError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RingDhtError::Codec(CodecError::InsufficientShards {
            present: 1,
            required: 2,
        });
        assert!(err.to_string().contains("1 present"));
    }

    #[test]
    fn test_threshold_error() {
        let err = CryptoError::ThresholdNotMet {
            shares: 3,
            required: 4,
        };
        assert!(err.to_string().contains("3 distinct shares"));
    }

    #[test]
    fn test_empty_ring_display() {
        let err = TopologyError::EmptyRing;
        assert!(err.to_string().contains("no quorum identifiers"));
    }
}

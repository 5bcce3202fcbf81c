//! Cryptographic primitives for RingDHT
//!
//! This module provides:
//! - FROST threshold signatures (T+1-of-N Schnorr) for quorum authentication
//! - Dealer-based quorum key generation

pub mod threshold;

// Re-export commonly used items
pub use threshold::{
    generate_quorum_keys, verify_signature, QuorumKeyMaterial, QuorumKeyShare, QuorumSignature,
    QuorumSigner, SignatureCombiner, SignatureShare, SigningCommitment,
};

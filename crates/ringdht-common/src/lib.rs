//! # RingDHT Common
//!
//! Shared types, errors, and threshold-signature primitives for RingDHT.
//!
//! ## Core Types
//!
//! - [`Quorum`]/[`Peer`]: authentication and routing groups on the ring
//! - [`RoutingEntry`]/[`RoutingTable`]: ordered finger-table records with a
//!   deterministic byte encoding
//!
//! ## Crypto
//!
//! - [`crypto::threshold`]: FROST threshold signatures (T+1-of-N Schnorr) —
//!   dealer-based key generation, two-round signing, Lagrange-weighted
//!   aggregation, verification

pub mod crypto;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{CodecError, CryptoError, LookupError, Result, RingDhtError, TopologyError};
pub use types::{
    quorum::{Peer, Quorum},
    routing::{QuorumId, RoutingEntry, RoutingTable},
};

/// RingDHT version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default quorum size N
pub const DEFAULT_QUORUM_SIZE: u16 = 5;

/// Default signing threshold T (T+1 members sign)
pub const DEFAULT_THRESHOLD: u16 = 3;

/// Default bit width m of the ring identifier space
pub const DEFAULT_RING_BITS: u32 = 4;

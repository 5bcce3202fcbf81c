//! # RingDHT Erasure
//!
//! Shard codec for quorum routing tables. A table is serialized, split
//! across D fixed-size data shards, and extended with P parity shards via
//! systematic Reed-Solomon over GF(2^8), so that any D of the D+P shards
//! recover the original bytes exactly. Decoding normalizes detectably-bad
//! shards to missing, reconstructs, then re-verifies parity so a silently
//! corrupted shard cannot slip through.
//!
//! Encode and decode are synchronous and CPU-bound with no shared state;
//! independent shard sets can be processed fully in parallel.

pub mod codec;

pub use codec::{decode, encode, EncodedTable, ShardMetadata, MAX_TOTAL_SHARDS};

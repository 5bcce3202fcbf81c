//! # RingDHT Topology
//!
//! Successor-based routing over a modular identifier ring of size 2^m,
//! after Chord. Each quorum's finger table holds m slots; slot j points at
//! the successor of `(Q + 2^j) mod 2^m`. Everything here is a pure function
//! of the current sorted identifier set — no internal state, and the only
//! failure mode is an empty ring.

pub mod ring;

pub use ring::{finger_table, random_quorum_ids, successor, RingSpace};

//! # RingDHT Lookup
//!
//! Authenticated-lookup exchange coordination. When a quorum must vouch for
//! a lookup result, its members each produce a partial signature over the
//! request's canonical bytes; threshold+1 distinct shares are combined into
//! one quorum signature and verified under the shared public key before the
//! message is trusted downstream.
//!
//! ## Components
//!
//! - [`LookupRequest`]: the message being authenticated, with a canonical
//!   byte encoding
//! - [`LookupAuthenticator`]: collects shares first-to-answer, combines at
//!   threshold+1, verifies, and enforces the collection timeout
//! - [`ExchangeStatus`]: `Collecting` → `Combining` → `Verified`/`Rejected`

pub mod exchange;
pub mod request;

pub use exchange::{ExchangeConfig, ExchangeStatus, LookupAuthenticator};
pub use request::LookupRequest;

//! Lookup request type and canonical message encoding

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A lookup request one quorum asks another to vouch for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Requesting peer identifier
    pub peer_id: String,
    /// Requesting peer address
    pub address: String,
    /// Requested operation, e.g. "LOOKUP"
    pub operation: String,
    /// Submission timestamp (Unix seconds)
    pub timestamp: i64,
}

impl LookupRequest {
    /// Create a request stamped with the current time
    pub fn new(
        peer_id: impl Into<String>,
        address: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            peer_id: peer_id.into(),
            address: address.into(),
            operation: operation.into(),
            timestamp: Utc::now().timestamp(),
        }
    }

    /// Canonical byte encoding; this is the message quorum members sign
    pub fn canonical_bytes(&self) -> Vec<u8> {
        format!(
            "{}|{}|{}|{}",
            self.peer_id, self.address, self.operation, self.timestamp
        )
        .into_bytes()
    }

    /// BLAKE3 digest of the canonical encoding, for logging and dedup
    pub fn digest(&self) -> [u8; 32] {
        *blake3::hash(&self.canonical_bytes()).as_bytes()
    }
}

impl std::fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}@{}", self.operation, self.peer_id, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_bytes_layout() {
        let request = LookupRequest {
            peer_id: "peerP".to_string(),
            address: "10.0.0.1".to_string(),
            operation: "LOOKUP".to_string(),
            timestamp: 1700000000,
        };
        assert_eq!(
            request.canonical_bytes(),
            b"peerP|10.0.0.1|LOOKUP|1700000000".to_vec()
        );
    }

    #[test]
    fn test_digest_tracks_content() {
        let a = LookupRequest {
            peer_id: "peerP".to_string(),
            address: "10.0.0.1".to_string(),
            operation: "LOOKUP".to_string(),
            timestamp: 1,
        };
        let mut b = a.clone();
        assert_eq!(a.digest(), b.digest());

        b.timestamp = 2;
        assert_ne!(a.digest(), b.digest());
    }
}

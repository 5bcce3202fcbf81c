//! Quorum and peer types
//!
//! A quorum is a fixed-size authentication and routing group on the
//! identifier ring. It owns its peers exclusively; each peer owns its secret
//! key share, which never crosses the peer boundary — callers get a
//! [`QuorumSigner`] instead.

use crate::crypto::threshold::{
    generate_quorum_keys, QuorumKeyShare, QuorumSigner, SignatureCombiner,
};
use crate::error::CryptoError;
use crate::types::routing::QuorumId;
use frost_ed25519 as frost;

/// A node inside a quorum, holding one share of the quorum key
pub struct Peer {
    /// Position of this peer within the quorum (0-based)
    index: u16,
    /// Secret key share; exposed only through [`Peer::signer`]
    key_share: QuorumKeyShare,
}

impl Peer {
    fn new(index: u16, key_share: QuorumKeyShare) -> Self {
        Self { index, key_share }
    }

    /// Position of this peer within the quorum
    pub fn index(&self) -> u16 {
        self.index
    }

    /// This peer's participant identifier as bytes
    pub fn identifier_bytes(&self) -> [u8; 32] {
        self.key_share.identifier_bytes()
    }

    /// Public key share, derivable from the secret share by anyone
    pub fn public_key_share(&self) -> Vec<u8> {
        self.key_share.public_key_share()
    }

    /// Build a threshold signer backed by this peer's secret share
    pub fn signer(&self) -> QuorumSigner {
        QuorumSigner::new(self.key_share.clone())
    }
}

/// A fixed-size authentication and routing group on the identifier ring
///
/// Invariant: `1 <= threshold < size`, enforced at generation.
pub struct Quorum {
    /// Quorum identifier on the ring
    pub id: QuorumId,
    /// Member peers, in evaluation-point order
    peers: Vec<Peer>,
    /// Signing threshold T; T+1 members can jointly sign
    threshold: u16,
    /// Public key package shared by all members
    public_key_package: frost::keys::PublicKeyPackage,
}

impl Quorum {
    /// Form a quorum of `size` peers with signing threshold `threshold`
    pub fn generate(id: QuorumId, size: u16, threshold: u16) -> Result<Self, CryptoError> {
        let material = generate_quorum_keys(size, threshold)?;

        let peers = material
            .key_shares
            .into_iter()
            .enumerate()
            .map(|(i, share)| Peer::new(i as u16, share))
            .collect();

        Ok(Self {
            id,
            peers,
            threshold,
            public_key_package: material.public_key_package,
        })
    }

    /// Member peers in evaluation-point order
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Number of members N
    pub fn size(&self) -> u16 {
        self.peers.len() as u16
    }

    /// Signing threshold T
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// The quorum's shared public key
    pub fn group_public_key(&self) -> [u8; 32] {
        self.public_key_package
            .verifying_key()
            .serialize()
            .as_ref()
            .try_into()
            .unwrap_or([0u8; 32])
    }

    /// Build a combiner for signatures produced by this quorum's members
    pub fn combiner(&self) -> SignatureCombiner {
        SignatureCombiner::new(self.public_key_package.clone(), self.threshold)
    }
}

//! FROST threshold signatures for quorum authentication (RFC 9591)
//!
//! A quorum of N peers holds shares of one signing key: a random degree-T
//! polynomial over the ed25519 scalar field whose constant term is the
//! quorum's master secret. The master secret is never materialized; only its
//! public commitment (the group verifying key) and the N per-peer shares
//! exist. Any T+1 peers can jointly produce a 64-byte Schnorr signature via
//! Lagrange-weighted aggregation of partial signatures, verifiable under the
//! group key. T or fewer shares reveal nothing.
//!
//! Reference: RFC 9591 - https://www.rfc-editor.org/rfc/rfc9591.html

use crate::error::CryptoError;
use frost_ed25519 as frost;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Minimum signing threshold T; quorums require 1 <= T < N
pub const MIN_THRESHOLD: u16 = 1;

/// Maximum supported quorum size
pub const MAX_QUORUM_SIZE: u16 = 100;

/// FROST participant identifier for a quorum peer
pub type PeerId = frost::Identifier;

/// Key share held by a single quorum peer
///
/// The secret share never leaves this struct; signing goes through
/// [`QuorumSigner`].
#[derive(Clone)]
pub struct QuorumKeyShare {
    /// Peer's participant identifier
    pub identifier: PeerId,
    /// Secret key share
    key_package: frost::keys::KeyPackage,
    /// Public key package shared by the whole quorum
    pub public_key_package: frost::keys::PublicKeyPackage,
}

impl QuorumKeyShare {
    fn new(
        identifier: PeerId,
        key_package: frost::keys::KeyPackage,
        public_key_package: frost::keys::PublicKeyPackage,
    ) -> Self {
        Self {
            identifier,
            key_package,
            public_key_package,
        }
    }

    /// Get the quorum's group public key (verifying key)
    pub fn group_public_key(&self) -> [u8; 32] {
        self.public_key_package
            .verifying_key()
            .serialize()
            .as_ref()
            .try_into()
            .unwrap_or([0u8; 32])
    }

    /// Get this peer's identifier as bytes
    pub fn identifier_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        let id_bytes = self.identifier.serialize();
        bytes[..id_bytes.len().min(32)].copy_from_slice(&id_bytes[..id_bytes.len().min(32)]);
        bytes
    }

    /// Get this peer's public key share, derivable from the secret share
    pub fn public_key_share(&self) -> Vec<u8> {
        self.key_package.verifying_share().serialize().to_vec()
    }
}

/// Signing commitment from round 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningCommitment {
    /// Peer identifier (serialized)
    pub peer: Vec<u8>,
    /// Hiding commitment
    pub hiding: Vec<u8>,
    /// Binding commitment
    pub binding: Vec<u8>,
}

impl SigningCommitment {
    /// Convert to FROST SigningCommitments
    pub fn to_frost(&self) -> Result<(PeerId, frost::round1::SigningCommitments), CryptoError> {
        let id_bytes: [u8; 32] = self
            .peer
            .clone()
            .try_into()
            .map_err(|_| CryptoError::Signing("Invalid peer identifier length".to_string()))?;
        let peer = PeerId::deserialize(&id_bytes)
            .map_err(|e| CryptoError::Signing(format!("Invalid peer identifier: {}", e)))?;

        let hiding_bytes: [u8; 32] = self
            .hiding
            .clone()
            .try_into()
            .map_err(|_| CryptoError::Signing("Invalid hiding commitment length".to_string()))?;
        let hiding = frost::round1::NonceCommitment::deserialize(hiding_bytes)
            .map_err(|e| CryptoError::Signing(format!("Invalid hiding commitment: {}", e)))?;

        let binding_bytes: [u8; 32] = self
            .binding
            .clone()
            .try_into()
            .map_err(|_| CryptoError::Signing("Invalid binding commitment length".to_string()))?;
        let binding = frost::round1::NonceCommitment::deserialize(binding_bytes)
            .map_err(|e| CryptoError::Signing(format!("Invalid binding commitment: {}", e)))?;

        let commitments = frost::round1::SigningCommitments::new(hiding, binding);
        Ok((peer, commitments))
    }
}

/// Partial signature from round 2, tied to one peer and one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureShare {
    /// Peer identifier (serialized)
    pub peer: Vec<u8>,
    /// Signature share bytes
    pub share: Vec<u8>,
}

impl SignatureShare {
    /// Convert to FROST SignatureShare
    pub fn to_frost(&self) -> Result<(PeerId, frost::round2::SignatureShare), CryptoError> {
        let id_bytes: [u8; 32] = self
            .peer
            .clone()
            .try_into()
            .map_err(|_| CryptoError::Signing("Invalid peer identifier length".to_string()))?;
        let peer = PeerId::deserialize(&id_bytes)
            .map_err(|e| CryptoError::Signing(format!("Invalid peer identifier: {}", e)))?;

        let share_bytes: [u8; 32] = self
            .share
            .clone()
            .try_into()
            .map_err(|_| CryptoError::Signing("Invalid signature share length".to_string()))?;
        let share = frost::round2::SignatureShare::deserialize(share_bytes)
            .map_err(|e| CryptoError::Signing(format!("Invalid signature share: {}", e)))?;

        Ok((peer, share))
    }

    /// Hex rendering of the peer identifier, for diagnostics
    pub fn peer_hex(&self) -> String {
        hex::encode(&self.peer)
    }
}

/// Combined quorum signature (64 bytes), verifiable under the group key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumSignature {
    /// R component (32 bytes)
    pub r: [u8; 32],
    /// s component (32 bytes)
    pub s: [u8; 32],
}

impl QuorumSignature {
    /// Create from FROST Signature
    pub fn from_frost(sig: &frost::Signature) -> Self {
        let bytes = sig.serialize();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Self { r, s }
    }

    /// Convert to bytes
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        bytes
    }

    /// Convert to FROST Signature
    pub fn to_frost(&self) -> Result<frost::Signature, CryptoError> {
        let bytes = self.to_bytes();
        frost::Signature::deserialize(bytes)
            .map_err(|e| CryptoError::Signing(format!("Invalid signature: {}", e)))
    }
}

impl std::fmt::Display for QuorumSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// Signing session state for a single peer
struct SigningSession {
    /// Message being signed
    message: Vec<u8>,
    /// Our signing nonces
    nonces: frost::round1::SigningNonces,
    /// Our commitment
    commitment: frost::round1::SigningCommitments,
    /// Collected commitments from other participants
    commitments: BTreeMap<PeerId, frost::round1::SigningCommitments>,
    /// Key package reference
    key_package: frost::keys::KeyPackage,
}

/// Per-peer threshold signer
///
/// Runs the two-round FROST protocol: `start_session` emits this peer's
/// round-1 commitment, `sign` produces the round-2 partial signature once
/// the participating peers' commitments have been added.
pub struct QuorumSigner {
    /// This peer's key share
    key_share: QuorumKeyShare,
    /// Active signing sessions
    sessions: Arc<RwLock<HashMap<String, SigningSession>>>,
}

impl QuorumSigner {
    /// Create a new signer from this peer's key share
    pub fn new(key_share: QuorumKeyShare) -> Self {
        Self {
            key_share,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a signing session (round 1)
    ///
    /// Returns our commitment to share with the other participants.
    pub async fn start_session(
        &self,
        session_id: &str,
        message: &[u8],
    ) -> Result<SigningCommitment, CryptoError> {
        let mut rng = OsRng;

        let (nonces, commitments) =
            frost::round1::commit(self.key_share.key_package.signing_share(), &mut rng);

        let session = SigningSession {
            message: message.to_vec(),
            nonces,
            commitment: commitments,
            commitments: BTreeMap::new(),
            key_package: self.key_share.key_package.clone(),
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), session);

        Ok(SigningCommitment {
            peer: self.key_share.identifier.serialize().to_vec(),
            hiding: commitments.hiding().serialize().to_vec(),
            binding: commitments.binding().serialize().to_vec(),
        })
    }

    /// Add a commitment from another participant
    pub async fn add_commitment(
        &self,
        session_id: &str,
        commitment: SigningCommitment,
    ) -> Result<(), CryptoError> {
        let (peer, frost_commitment) = commitment.to_frost()?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| CryptoError::Signing(format!("Session not found: {}", session_id)))?;

        session.commitments.insert(peer, frost_commitment);
        Ok(())
    }

    /// Produce this peer's partial signature (round 2)
    ///
    /// Call after collecting commitments from every participating peer.
    /// Consumes the session.
    pub async fn sign(&self, session_id: &str) -> Result<SignatureShare, CryptoError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .remove(session_id)
            .ok_or_else(|| CryptoError::Signing(format!("Session not found: {}", session_id)))?;

        // Our own commitment participates too
        let mut commitments = session.commitments;
        commitments.insert(self.key_share.identifier, session.commitment);

        let signing_package = frost::SigningPackage::new(commitments, &session.message);

        let signature_share =
            frost::round2::sign(&signing_package, &session.nonces, &session.key_package)
                .map_err(|e| CryptoError::Signing(format!("Signing failed: {}", e)))?;

        Ok(SignatureShare {
            peer: self.key_share.identifier.serialize().to_vec(),
            share: signature_share.serialize().to_vec(),
        })
    }

    /// Discard a session without signing
    pub async fn abort_session(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
    }

    /// Get the quorum's group public key
    pub fn group_public_key(&self) -> [u8; 32] {
        self.key_share.group_public_key()
    }

    /// Get this peer's identifier
    pub fn identifier(&self) -> PeerId {
        self.key_share.identifier
    }
}

/// Combines partial signatures into one quorum signature
///
/// Aggregation is Lagrange-weighted over the contributing peers' evaluation
/// points and never reconstructs the master secret.
pub struct SignatureCombiner {
    /// Public key package
    public_key_package: frost::keys::PublicKeyPackage,
    /// Signing threshold T; combination needs T+1 distinct shares
    threshold: u16,
}

impl SignatureCombiner {
    /// Create a new combiner
    pub fn new(public_key_package: frost::keys::PublicKeyPackage, threshold: u16) -> Self {
        Self {
            public_key_package,
            threshold,
        }
    }

    /// Number of distinct-peer shares required to combine
    pub fn required_shares(&self) -> usize {
        self.threshold as usize + 1
    }

    /// Aggregate partial signatures over one message into a quorum signature
    ///
    /// Rejects duplicate-peer shares: they add no new information and could
    /// bias the interpolation.
    pub fn combine(
        &self,
        message: &[u8],
        commitments: &[SigningCommitment],
        shares: &[SignatureShare],
    ) -> Result<QuorumSignature, CryptoError> {
        let mut seen = HashSet::new();
        for share in shares {
            if !seen.insert(share.peer.clone()) {
                return Err(CryptoError::DuplicateShare {
                    peer: share.peer_hex(),
                });
            }
        }

        if shares.len() < self.required_shares() {
            return Err(CryptoError::ThresholdNotMet {
                shares: shares.len(),
                required: self.required_shares(),
            });
        }

        let frost_commitments: BTreeMap<PeerId, frost::round1::SigningCommitments> = commitments
            .iter()
            .map(|c| c.to_frost())
            .collect::<Result<_, _>>()?;

        let signing_package = frost::SigningPackage::new(frost_commitments, message);

        let frost_shares: BTreeMap<PeerId, frost::round2::SignatureShare> = shares
            .iter()
            .map(|s| s.to_frost())
            .collect::<Result<_, _>>()?;

        let signature = frost::aggregate(&signing_package, &frost_shares, &self.public_key_package)
            .map_err(|e| CryptoError::Signing(format!("Aggregation failed: {}", e)))?;

        Ok(QuorumSignature::from_frost(&signature))
    }

    /// Verify a quorum signature under the group public key
    pub fn verify(&self, message: &[u8], signature: &QuorumSignature) -> Result<(), CryptoError> {
        let frost_sig = signature.to_frost()?;
        self.public_key_package
            .verifying_key()
            .verify(message, &frost_sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }

    /// Get the group public key
    pub fn group_public_key(&self) -> [u8; 32] {
        self.public_key_package
            .verifying_key()
            .serialize()
            .as_ref()
            .try_into()
            .unwrap_or([0u8; 32])
    }
}

/// Freshly generated key material for one quorum
pub struct QuorumKeyMaterial {
    /// Key shares, one per peer
    pub key_shares: Vec<QuorumKeyShare>,
    /// Public key package (same for all peers)
    pub public_key_package: frost::keys::PublicKeyPackage,
}

impl QuorumKeyMaterial {
    /// Get the quorum's group public key
    pub fn group_public_key(&self) -> [u8; 32] {
        self.public_key_package
            .verifying_key()
            .serialize()
            .as_ref()
            .try_into()
            .unwrap_or([0u8; 32])
    }
}

/// Generate quorum key material with a trusted dealer
///
/// Samples a random degree-`threshold` polynomial, evaluates it at `size`
/// distinct nonzero points for the per-peer shares, and commits to the
/// constant term for the group public key. Any `threshold + 1` shares can
/// sign; `threshold` or fewer reveal nothing.
pub fn generate_quorum_keys(
    size: u16,
    threshold: u16,
) -> Result<QuorumKeyMaterial, CryptoError> {
    if threshold < MIN_THRESHOLD {
        return Err(CryptoError::KeyGeneration(format!(
            "Threshold must be at least {}",
            MIN_THRESHOLD
        )));
    }
    if size > MAX_QUORUM_SIZE {
        return Err(CryptoError::KeyGeneration(format!(
            "Max {} peers supported",
            MAX_QUORUM_SIZE
        )));
    }
    if threshold >= size {
        return Err(CryptoError::KeyGeneration(
            "Threshold must be strictly below quorum size".to_string(),
        ));
    }

    let mut rng = OsRng;

    // FROST counts the minimum signer set, i.e. T+1
    let max_signers = size;
    let min_signers = threshold + 1;

    let (shares, public_key_package) = frost::keys::generate_with_dealer(
        max_signers,
        min_signers,
        frost::keys::IdentifierList::Default,
        &mut rng,
    )
    .map_err(|e| CryptoError::KeyGeneration(format!("Key generation failed: {}", e)))?;

    let key_shares: Result<Vec<QuorumKeyShare>, CryptoError> = shares
        .into_iter()
        .map(|(id, secret_share)| {
            let key_package = frost::keys::KeyPackage::try_from(secret_share).map_err(|e| {
                CryptoError::KeyGeneration(format!("Failed to convert secret share: {}", e))
            })?;
            Ok(QuorumKeyShare::new(id, key_package, public_key_package.clone()))
        })
        .collect();

    Ok(QuorumKeyMaterial {
        key_shares: key_shares?,
        public_key_package,
    })
}

/// Verify a quorum signature given only the serialized group public key
pub fn verify_signature(
    message: &[u8],
    signature: &QuorumSignature,
    group_public_key: &[u8; 32],
) -> Result<(), CryptoError> {
    let frost_sig = signature.to_frost()?;

    let verifying_key = frost::VerifyingKey::deserialize(*group_public_key)
        .map_err(|_| CryptoError::InvalidPublicKey)?;

    verifying_key
        .verify(message, &frost_sig)
        .map_err(|_| CryptoError::VerificationFailed)
}

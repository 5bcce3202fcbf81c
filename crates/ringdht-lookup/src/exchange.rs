//! Authenticated-lookup exchange coordination
//!
//! Drives the exchange through its states:
//! 1. `Collecting` — soliciting partial signatures from quorum members
//! 2. `Combining` — threshold+1 distinct shares arrived, aggregating
//! 3. `Verified` / `Rejected` — terminal; no way back to `Collecting`
//!
//! Solicitation is first-to-answer: every member is asked concurrently and
//! collection stops once threshold+1 distinct peers have responded. If the
//! window lapses first, the exchange is rejected.

use crate::request::LookupRequest;
use ringdht_common::crypto::threshold::{
    QuorumSignature, QuorumSigner, SignatureCombiner, SignatureShare, SigningCommitment,
};
use ringdht_common::error::{LookupError, RingDhtError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Exchange progress
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeStatus {
    /// Soliciting partial signatures
    Collecting { received: usize, required: usize },
    /// Enough distinct shares arrived; aggregation in progress
    Combining,
    /// Terminal success: combined signature verified under the quorum key
    Verified(QuorumSignature),
    /// Terminal failure: insufficient or invalid shares
    Rejected(String),
}

impl ExchangeStatus {
    /// Whether the exchange has concluded
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExchangeStatus::Verified(_) | ExchangeStatus::Rejected(_))
    }
}

/// One in-flight exchange
struct PendingExchange {
    request: LookupRequest,
    message: Vec<u8>,
    commitments: Vec<SigningCommitment>,
    shares: Vec<SignatureShare>,
    seen_peers: HashSet<Vec<u8>>,
    started_at: Instant,
    status: ExchangeStatus,
}

/// Configuration for the exchange coordinator
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Collection window for partial signatures, in milliseconds
    pub share_timeout_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            share_timeout_ms: 2000,
        }
    }
}

impl ExchangeConfig {
    /// Load configuration, letting environment variables override defaults
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Ok(val) = std::env::var("RINGDHT_SHARE_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                cfg.share_timeout_ms = v;
            }
        }

        Ok(cfg)
    }
}

/// Coordinates authenticated-lookup exchanges for one quorum
///
/// Collects per-peer partial signatures, combines them once threshold+1
/// distinct peers have answered, and verifies the result under the quorum's
/// shared public key before anything downstream trusts the message.
pub struct LookupAuthenticator {
    config: ExchangeConfig,
    combiner: SignatureCombiner,
    /// In-flight exchanges
    pending: Arc<RwLock<HashMap<Uuid, PendingExchange>>>,
}

impl LookupAuthenticator {
    /// Create a new authenticator for signatures combinable by `combiner`
    pub fn new(config: ExchangeConfig, combiner: SignatureCombiner) -> Self {
        Self {
            config,
            combiner,
            pending: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Distinct-peer shares needed to conclude an exchange
    pub fn required_shares(&self) -> usize {
        self.combiner.required_shares()
    }

    /// Open an exchange for a request; returns its identifier
    #[instrument(skip(self, request))]
    pub async fn begin_exchange(&self, request: LookupRequest) -> Uuid {
        let exchange_id = Uuid::new_v4();
        let message = request.canonical_bytes();
        let required = self.required_shares();

        info!(
            exchange = %exchange_id,
            request = %request,
            digest = %hex::encode(&request.digest()[..8]),
            required,
            "lookup exchange opened"
        );

        let exchange = PendingExchange {
            request,
            message,
            commitments: Vec::new(),
            shares: Vec::new(),
            seen_peers: HashSet::new(),
            started_at: Instant::now(),
            status: ExchangeStatus::Collecting {
                received: 0,
                required,
            },
        };

        let mut pending = self.pending.write().await;
        pending.insert(exchange_id, exchange);
        exchange_id
    }

    /// Record one peer's commitment and partial signature
    ///
    /// The threshold+1'th distinct peer triggers combination and
    /// verification; the returned status is terminal from then on.
    pub async fn add_share(
        &self,
        exchange_id: Uuid,
        commitment: SigningCommitment,
        share: SignatureShare,
    ) -> Result<ExchangeStatus, RingDhtError> {
        let required = self.required_shares();

        let mut pending = self.pending.write().await;
        let exchange = pending
            .get_mut(&exchange_id)
            .ok_or(LookupError::ExchangeNotFound(exchange_id))?;

        if exchange.status.is_terminal() {
            return Err(LookupError::ExchangeClosed(exchange_id).into());
        }

        // First-to-answer: a repeat from the same peer adds nothing
        if !exchange.seen_peers.insert(share.peer.clone()) {
            debug!(exchange = %exchange_id, peer = %share.peer_hex(), "duplicate share ignored");
            return Ok(exchange.status.clone());
        }

        exchange.commitments.push(commitment);
        exchange.shares.push(share);

        let received = exchange.shares.len();
        if received < required {
            exchange.status = ExchangeStatus::Collecting { received, required };
            return Ok(exchange.status.clone());
        }

        exchange.status = ExchangeStatus::Combining;
        debug!(exchange = %exchange_id, received, "combining partial signatures");

        let outcome = self
            .combiner
            .combine(&exchange.message, &exchange.commitments, &exchange.shares)
            .and_then(|signature| {
                self.combiner.verify(&exchange.message, &signature)?;
                Ok(signature)
            });

        exchange.status = match outcome {
            Ok(signature) => {
                info!(exchange = %exchange_id, "quorum signature verified");
                ExchangeStatus::Verified(signature)
            }
            Err(e) => {
                warn!(exchange = %exchange_id, error = %e, "exchange rejected");
                ExchangeStatus::Rejected(e.to_string())
            }
        };

        Ok(exchange.status.clone())
    }

    /// Current status of an exchange
    pub async fn status(&self, exchange_id: Uuid) -> Result<ExchangeStatus, RingDhtError> {
        let pending = self.pending.read().await;
        let exchange = pending
            .get(&exchange_id)
            .ok_or(LookupError::ExchangeNotFound(exchange_id))?;
        Ok(exchange.status.clone())
    }

    /// Reject every exchange that outlived the collection window
    ///
    /// Returns how many were swept.
    pub async fn cleanup_timeouts(&self) -> usize {
        let window = Duration::from_millis(self.config.share_timeout_ms);
        let mut swept = 0;

        let mut pending = self.pending.write().await;
        for (exchange_id, exchange) in pending.iter_mut() {
            if !exchange.status.is_terminal() && exchange.started_at.elapsed() > window {
                warn!(exchange = %exchange_id, request = %exchange.request, "exchange timed out");
                exchange.status = ExchangeStatus::Rejected(format!(
                    "timed out after {}ms",
                    self.config.share_timeout_ms
                ));
                swept += 1;
            }
        }
        swept
    }

    /// Run a full exchange against the given member signers
    ///
    /// Round 1 solicits commitments from every signer concurrently and keeps
    /// the first threshold+1 to answer. Round 2 collects those members'
    /// partial signatures, then combines and verifies. Either round failing
    /// to fill within the window rejects the exchange.
    #[instrument(skip_all, fields(request = %request))]
    pub async fn authenticate(
        &self,
        request: LookupRequest,
        signers: &[Arc<QuorumSigner>],
    ) -> Result<QuorumSignature, RingDhtError> {
        let exchange_id = self.begin_exchange(request.clone()).await;
        let message = request.canonical_bytes();
        let required = self.required_shares();
        let session = exchange_id.to_string();
        let window = Duration::from_millis(self.config.share_timeout_ms);
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + window;

        // Round 1: solicit commitments, first threshold+1 distinct peers win
        let (tx, mut rx) = mpsc::channel(signers.len().max(1));
        for signer in signers {
            let signer = Arc::clone(signer);
            let tx = tx.clone();
            let session = session.clone();
            let message = message.clone();
            tokio::spawn(async move {
                match signer.start_session(&session, &message).await {
                    Ok(commitment) => {
                        let _ = tx.send((signer, commitment)).await;
                    }
                    Err(e) => warn!(error = %e, "peer failed to commit"),
                }
            });
        }
        drop(tx);

        let mut participants: Vec<Arc<QuorumSigner>> = Vec::new();
        let mut commitments: Vec<SigningCommitment> = Vec::new();
        while participants.len() < required {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some((signer, commitment))) => {
                    participants.push(signer);
                    commitments.push(commitment);
                }
                Ok(None) | Err(_) => break,
            }
        }

        if participants.len() < required {
            let reason = format!(
                "{} of {} commitments within {}ms",
                participants.len(),
                required,
                self.config.share_timeout_ms
            );
            self.reject_exchange(exchange_id, reason).await;
            return Err(LookupError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
                limit_ms: self.config.share_timeout_ms,
            }
            .into());
        }

        // Non-participants never receive the signing package
        for signer in signers {
            if !participants.iter().any(|p| Arc::ptr_eq(p, signer)) {
                signer.abort_session(&session).await;
            }
        }

        // Distribute the participating set's commitments
        for signer in &participants {
            for commitment in &commitments {
                signer.add_commitment(&session, commitment.clone()).await?;
            }
        }

        // Round 2: collect partial signatures from the participating set
        let (tx, mut rx) = mpsc::channel(participants.len());
        for (signer, commitment) in participants.iter().zip(&commitments) {
            let signer = Arc::clone(signer);
            let tx = tx.clone();
            let session = session.clone();
            let commitment = commitment.clone();
            tokio::spawn(async move {
                match signer.sign(&session).await {
                    Ok(share) => {
                        let _ = tx.send((commitment, share)).await;
                    }
                    Err(e) => warn!(error = %e, "peer failed to sign"),
                }
            });
        }
        drop(tx);

        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some((commitment, share))) => {
                    match self.add_share(exchange_id, commitment, share).await? {
                        ExchangeStatus::Verified(signature) => return Ok(signature),
                        ExchangeStatus::Rejected(reason) => {
                            return Err(RingDhtError::Internal(format!(
                                "exchange rejected: {}",
                                reason
                            )));
                        }
                        ExchangeStatus::Collecting { .. } | ExchangeStatus::Combining => {}
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }

        let reason = format!(
            "insufficient partial signatures within {}ms",
            self.config.share_timeout_ms
        );
        self.reject_exchange(exchange_id, reason).await;
        Err(LookupError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
            limit_ms: self.config.share_timeout_ms,
        }
        .into())
    }

    async fn reject_exchange(&self, exchange_id: Uuid, reason: String) {
        let mut pending = self.pending.write().await;
        if let Some(exchange) = pending.get_mut(&exchange_id) {
            if !exchange.status.is_terminal() {
                warn!(exchange = %exchange_id, reason = %reason, "exchange rejected");
                exchange.status = ExchangeStatus::Rejected(reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringdht_common::types::quorum::Quorum;

    fn authenticator_for(quorum: &Quorum, timeout_ms: u64) -> LookupAuthenticator {
        LookupAuthenticator::new(
            ExchangeConfig {
                share_timeout_ms: timeout_ms,
            },
            quorum.combiner(),
        )
    }

    fn sample_request() -> LookupRequest {
        LookupRequest::new("peerP", "10.0.0.1", "LOOKUP")
    }

    #[test]
    fn test_config_env_override() {
        std::env::set_var("RINGDHT_SHARE_TIMEOUT_MS", "750");
        let cfg = ExchangeConfig::load().unwrap();
        assert_eq!(cfg.share_timeout_ms, 750);
        std::env::remove_var("RINGDHT_SHARE_TIMEOUT_MS");
    }

    #[tokio::test]
    async fn test_exchange_starts_collecting() {
        let quorum = Quorum::generate(1, 5, 3).unwrap();
        let authenticator = authenticator_for(&quorum, 2000);

        let id = authenticator.begin_exchange(sample_request()).await;
        assert_eq!(
            authenticator.status(id).await.unwrap(),
            ExchangeStatus::Collecting {
                received: 0,
                required: 4
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_exchange_rejected() {
        let quorum = Quorum::generate(1, 3, 1).unwrap();
        let authenticator = authenticator_for(&quorum, 2000);

        let err = authenticator.status(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(
            err,
            RingDhtError::Lookup(LookupError::ExchangeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_shares_reject_exchange() {
        let quorum = Quorum::generate(1, 3, 1).unwrap();
        let authenticator = authenticator_for(&quorum, 2000);
        let id = authenticator.begin_exchange(sample_request()).await;

        // Garbage shares from two distinct "peers" reach the threshold and
        // fail aggregation
        for i in 0..2u8 {
            let commitment = SigningCommitment {
                peer: vec![i + 1; 32],
                hiding: vec![0; 32],
                binding: vec![0; 32],
            };
            let share = SignatureShare {
                peer: vec![i + 1; 32],
                share: vec![0; 32],
            };
            let status = authenticator.add_share(id, commitment, share).await.unwrap();
            if i == 1 {
                assert!(matches!(status, ExchangeStatus::Rejected(_)));
            }
        }

        // Terminal state is frozen
        let commitment = SigningCommitment {
            peer: vec![9; 32],
            hiding: vec![0; 32],
            binding: vec![0; 32],
        };
        let share = SignatureShare {
            peer: vec![9; 32],
            share: vec![0; 32],
        };
        let err = authenticator
            .add_share(id, commitment, share)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RingDhtError::Lookup(LookupError::ExchangeClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_peer_share_ignored_while_collecting() {
        let quorum = Quorum::generate(1, 5, 3).unwrap();
        let authenticator = authenticator_for(&quorum, 2000);
        let id = authenticator.begin_exchange(sample_request()).await;

        let commitment = SigningCommitment {
            peer: vec![1; 32],
            hiding: vec![0; 32],
            binding: vec![0; 32],
        };
        let share = SignatureShare {
            peer: vec![1; 32],
            share: vec![0; 32],
        };

        let first = authenticator
            .add_share(id, commitment.clone(), share.clone())
            .await
            .unwrap();
        let second = authenticator.add_share(id, commitment, share).await.unwrap();

        assert_eq!(
            first,
            ExchangeStatus::Collecting {
                received: 1,
                required: 4
            }
        );
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cleanup_rejects_stale_exchanges() {
        let quorum = Quorum::generate(1, 5, 3).unwrap();
        let authenticator = authenticator_for(&quorum, 0);
        let id = authenticator.begin_exchange(sample_request()).await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(authenticator.cleanup_timeouts().await, 1);
        assert!(matches!(
            authenticator.status(id).await.unwrap(),
            ExchangeStatus::Rejected(_)
        ));

        // Already-terminal exchanges are not swept again
        assert_eq!(authenticator.cleanup_timeouts().await, 0);
    }

    #[tokio::test]
    async fn test_authenticate_times_out_below_threshold() {
        let quorum = Quorum::generate(1, 5, 3).unwrap();
        let authenticator = authenticator_for(&quorum, 200);

        // Only 3 of the required 4 members are reachable
        let signers: Vec<_> = quorum
            .peers()
            .iter()
            .take(3)
            .map(|p| Arc::new(p.signer()))
            .collect();

        let err = authenticator
            .authenticate(sample_request(), &signers)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RingDhtError::Lookup(LookupError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_authenticate_full_quorum() {
        let quorum = Quorum::generate(1, 5, 3).unwrap();
        let authenticator = authenticator_for(&quorum, 2000);

        let signers: Vec<_> = quorum.peers().iter().map(|p| Arc::new(p.signer())).collect();

        let request = sample_request();
        let message = request.canonical_bytes();
        let signature = authenticator.authenticate(request, &signers).await.unwrap();

        ringdht_common::crypto::verify_signature(
            &message,
            &signature,
            &quorum.group_public_key(),
        )
        .unwrap();
    }
}

//! Off-line proof generation as schedulable, cancellable work.
//!
//! Proving takes seconds, so every request runs on the blocking pool and never holds any
//! ledger lock. Requests share only the immutable proving key.

use crate::errors::LedgerError;
use ark_bn254::Bn254;
use ark_groth16::ProvingKey;
use rand::rngs::OsRng;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use zk_auth::constants::NUM_OWNERS;
use zk_auth::groth16::prove;
use zk_auth::{AuthorizationProof, IdentityCommitment, LimbVector, MessageHash};

/// Everything one approval proof needs.
#[derive(Clone, Debug)]
pub struct ProofRequest {
    pub limbs: LimbVector,
    pub message_hash: MessageHash,
    pub commitments: [IdentityCommitment; NUM_OWNERS],
}

#[derive(Clone)]
pub struct ProofService {
    pk: Arc<ProvingKey<Bn254>>,
}

impl ProofService {
    pub fn new(pk: Arc<ProvingKey<Bn254>>) -> Self {
        Self { pk }
    }

    pub async fn prove(&self, request: ProofRequest) -> Result<AuthorizationProof, LedgerError> {
        let (_keep_open, cancel) = watch::channel(false);
        self.prove_cancellable(request, cancel).await
    }

    /// Prove unless `cancel` flips to `true` first.
    ///
    /// Cancellation abandons the result; a Groth16 prover cannot be interrupted, so the
    /// blocking computation finishes in the background and is dropped.
    pub async fn prove_cancellable(
        &self,
        request: ProofRequest,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<AuthorizationProof, LedgerError> {
        if *cancel.borrow() {
            return Err(LedgerError::ProofCancelled);
        }

        let pk = self.pk.clone();
        let mut handle = tokio::task::spawn_blocking(move || {
            let mut rng = OsRng;
            prove(&mut rng, &pk, &request.limbs, &request.message_hash, &request.commitments)
        });

        debug!("proof generation started");
        let joined = tokio::select! {
            joined = &mut handle => joined,
            cancelled = async { cancel.wait_for(|c| *c).await.is_ok() } => {
                if cancelled {
                    info!("proof generation cancelled");
                    return Err(LedgerError::ProofCancelled);
                }
                // Every sender is gone, so nobody can cancel any more.
                handle.await
            }
        };

        let proof = joined.map_err(|e| LedgerError::Internal(format!("prover task failed: {e}")))??;
        debug!("proof generation finished");
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config, keys, owner_address, owner_limbs};
    use zk_auth::{bind_message, Amount, ZkError};

    fn request(owner: usize, value: u128) -> ProofRequest {
        ProofRequest {
            limbs: owner_limbs(owner),
            message_hash: bind_message(&owner_address(0), Amount::from(value), &[]),
            commitments: *config(2, false).commitments(),
        }
    }

    #[tokio::test]
    async fn concurrent_requests_produce_valid_proofs() {
        let service = ProofService::new(keys().pk.clone());

        let (a, b) = tokio::join!(service.prove(request(0, 1)), service.prove(request(1, 1)));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(keys().verifier.verify(&a.proof, &a.public_signals));
        assert!(keys().verifier.verify(&b.proof, &b.public_signals));
        assert_ne!(a.public_signals.nullifier, b.public_signals.nullifier);
    }

    #[tokio::test]
    async fn already_cancelled_request_never_starts() {
        let service = ProofService::new(keys().pk.clone());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let err = service.prove_cancellable(request(0, 1), rx).await.unwrap_err();
        assert!(matches!(err, LedgerError::ProofCancelled));
    }

    #[tokio::test]
    async fn cancellation_interrupts_waiting() {
        let service = ProofService::new(keys().pk.clone());
        let (tx, rx) = watch::channel(false);

        let pending = tokio::spawn(async move { service.prove_cancellable(request(2, 1), rx).await });
        tx.send(true).unwrap();

        assert!(matches!(pending.await.unwrap(), Err(LedgerError::ProofCancelled)));
    }

    #[tokio::test]
    async fn dropped_canceller_does_not_cancel() {
        let service = ProofService::new(keys().pk.clone());
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let proof = service.prove_cancellable(request(1, 4), rx).await.unwrap();
        assert!(keys().verifier.verify(&proof.proof, &proof.public_signals));
    }

    #[tokio::test]
    async fn unregistered_key_surfaces_witness_error() {
        let service = ProofService::new(keys().pk.clone());
        let mut req = request(0, 1);
        req.limbs = LimbVector::from_limbs(64, vec![1, 2, 3, 4]);

        let err = service.prove(req).await.unwrap_err();
        assert!(matches!(err, LedgerError::Zk(ZkError::WitnessUnsatisfiable(_))));
    }
}

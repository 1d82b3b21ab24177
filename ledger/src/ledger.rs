//! Proof-gated transaction lifecycle: propose → collect approvals → execute.
//!
//! No caller identity is checked anywhere. A submission or confirmation is accepted iff its
//! proof verifies against the transaction's message hash and the registered commitments.
//!
//! Each transaction sits behind its own mutex, so operations on one index are linearized
//! while different indices proceed independently. Checks run before any mutation under that
//! lock; a rejected call leaves no trace.

use crate::config::LedgerConfig;
use crate::errors::LedgerError;
use crate::escrow::{ExecutionEnvironment, Transfer};
use crate::models::TransactionView;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use zk_auth::{
    bind_message, Address, Amount, ApprovalNullifier, AuthorizationProof, MessageHash, ProofVerifier, PublicSignals,
};

#[derive(Debug)]
struct PendingTransaction {
    destination: Address,
    value: Amount,
    payload: Vec<u8>,
    message_hash: MessageHash,
    confirmations: u32,
    executed: bool,
    nullifiers: HashSet<ApprovalNullifier>,
    proposed_at: DateTime<Utc>,
    executed_at: Option<DateTime<Utc>>,
}

pub struct TransactionLedger<E> {
    config: LedgerConfig,
    verifier: ProofVerifier,
    env: E,
    transactions: RwLock<Vec<Arc<Mutex<PendingTransaction>>>>,
}

impl<E: ExecutionEnvironment> TransactionLedger<E> {
    pub fn new(config: LedgerConfig, verifier: ProofVerifier, env: E) -> Self {
        info!(
            required_confirmations = config.required_confirmations(),
            unique_approvals = config.unique_approvals(),
            "ledger initialized"
        );
        Self {
            config,
            verifier,
            env,
            transactions: RwLock::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    pub async fn transaction_count(&self) -> u64 {
        self.transactions.read().await.len() as u64
    }

    /// The public signals a valid approval of `message_hash` must carry. The nullifier is the
    /// circuit's own output, so it is taken from the submitted proof.
    pub fn expected_signals(&self, message_hash: MessageHash, nullifier: ApprovalNullifier) -> PublicSignals {
        PublicSignals {
            message_hash,
            commitments: *self.config.commitments(),
            nullifier,
        }
    }

    /// Propose a transaction. The proof counts as its first confirmation.
    pub async fn submit(
        &self,
        destination: Address,
        value: Amount,
        payload: Vec<u8>,
        proof: &AuthorizationProof,
    ) -> Result<u64, LedgerError> {
        let message_hash = bind_message(&destination, value, &payload);
        self.check_proof(message_hash, proof)?;

        let nullifier = proof.public_signals.nullifier;
        let tx = PendingTransaction {
            destination,
            value,
            payload,
            message_hash,
            confirmations: 1,
            executed: false,
            nullifiers: HashSet::from([nullifier]),
            proposed_at: Utc::now(),
            executed_at: None,
        };

        let mut transactions = self.transactions.write().await;
        let index = transactions.len() as u64;
        transactions.push(Arc::new(Mutex::new(tx)));

        info!(index, %destination, %value, "transaction submitted");
        Ok(index)
    }

    /// Add one approval to transaction `index`, returning the new confirmation count.
    pub async fn confirm(&self, index: u64, proof: &AuthorizationProof) -> Result<u32, LedgerError> {
        let entry = self.entry(index).await?;
        let mut tx = entry.lock().await;

        if tx.executed {
            return Err(LedgerError::AlreadyExecuted(index));
        }
        self.check_proof(tx.message_hash, proof)?;

        let nullifier = proof.public_signals.nullifier;
        if tx.nullifiers.contains(&nullifier) {
            if self.config.unique_approvals() {
                warn!(index, "repeated approval rejected");
                return Err(LedgerError::DuplicateApproval(index));
            }
            warn!(index, "repeated approval from one identity counted");
        }

        tx.nullifiers.insert(nullifier);
        tx.confirmations += 1;

        info!(index, confirmations = tx.confirmations, "transaction confirmed");
        Ok(tx.confirmations)
    }

    /// Release transaction `index` through the execution environment. At most once.
    pub async fn execute(&self, index: u64) -> Result<TransactionView, LedgerError> {
        let entry = self.entry(index).await?;
        let mut tx = entry.lock().await;

        if tx.executed {
            return Err(LedgerError::AlreadyExecuted(index));
        }
        let required = self.config.required_confirmations();
        if tx.confirmations < required {
            return Err(LedgerError::QuorumNotMet {
                index,
                confirmations: tx.confirmations,
                required,
            });
        }

        let transfer = Transfer {
            index,
            destination: tx.destination,
            value: tx.value,
            payload: tx.payload.clone(),
        };
        self.env.release(&transfer).inspect_err(|e| {
            warn!(index, error = %e, "execution failed");
        })?;

        tx.executed = true;
        tx.executed_at = Some(Utc::now());

        info!(index, destination = %tx.destination, value = %tx.value, "transaction executed");
        Ok(self.view(index, &tx))
    }

    pub async fn get_transaction(&self, index: u64) -> Result<TransactionView, LedgerError> {
        let entry = self.entry(index).await?;
        let tx = entry.lock().await;
        Ok(self.view(index, &tx))
    }

    fn check_proof(&self, message_hash: MessageHash, proof: &AuthorizationProof) -> Result<(), LedgerError> {
        let expected = self.expected_signals(message_hash, proof.public_signals.nullifier);
        self.verifier.ensure_valid(&proof.proof, &expected).map_err(|_| {
            warn!("approval proof rejected");
            LedgerError::InvalidProof
        })
    }

    async fn entry(&self, index: u64) -> Result<Arc<Mutex<PendingTransaction>>, LedgerError> {
        let transactions = self.transactions.read().await;
        usize::try_from(index)
            .ok()
            .and_then(|i| transactions.get(i))
            .cloned()
            .ok_or(LedgerError::UnknownTransaction(index))
    }

    fn view(&self, index: u64, tx: &PendingTransaction) -> TransactionView {
        TransactionView {
            index,
            destination: tx.destination,
            value: tx.value,
            payload: tx.payload.clone(),
            message_hash: tx.message_hash,
            confirmations: tx.confirmations,
            required_confirmations: self.config.required_confirmations(),
            executed: tx.executed,
            proposed_at: tx.proposed_at,
            executed_at: tx.executed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escrow::InMemoryEscrow;
    use crate::test_support::{approve, approve_amount, keys, ledger, owner_address, wei};

    const ETHER: u128 = 1_000_000_000_000_000_000;

    #[tokio::test]
    async fn two_of_three_quorum_lifecycle() {
        let ledger = ledger(2, false, 1000 * ETHER);
        let to = owner_address(0);

        let index = ledger.submit(to, wei(ETHER), vec![], &approve(0, &to, ETHER, &[])).await.unwrap();
        assert_eq!(index, 0);
        let pending = ledger.get_transaction(0).await.unwrap();
        assert_eq!(pending.confirmations, 1);
        assert!(!pending.quorum_met());

        let err = ledger.execute(0).await.unwrap_err();
        assert!(matches!(err, LedgerError::QuorumNotMet { index: 0, confirmations: 1, required: 2 }));

        assert_eq!(ledger.confirm(0, &approve(1, &to, ETHER, &[])).await.unwrap(), 2);

        let executed = ledger.execute(0).await.unwrap();
        assert!(executed.quorum_met());
        assert!(executed.executed);
        assert!(executed.executed_at.is_some());
        assert_eq!(ledger.environment().balance().unwrap(), wei(999 * ETHER));

        assert!(matches!(ledger.execute(0).await, Err(LedgerError::AlreadyExecuted(0))));
        assert_eq!(ledger.environment().released().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn proof_for_another_transaction_is_rejected() {
        let ledger = ledger(2, false, 0);
        let to = owner_address(0);

        let first = approve(0, &to, 1, &[]);
        ledger.submit(to, wei(1), vec![], &first).await.unwrap();
        ledger.submit(to, wei(2), vec![], &approve(0, &to, 2, &[])).await.unwrap();

        let err = ledger.confirm(1, &first).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidProof));
        assert_eq!(ledger.get_transaction(1).await.unwrap().confirmations, 1);
    }

    #[tokio::test]
    async fn submit_with_mismatched_proof_creates_nothing() {
        let ledger = ledger(2, false, 0);
        let to = owner_address(1);

        let proof = approve(2, &to, 5, b"payload");
        let err = ledger.submit(to, wei(5), b"other".to_vec(), &proof).await.unwrap_err();

        assert!(matches!(err, LedgerError::InvalidProof));
        assert_eq!(ledger.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn proof_against_a_different_registry_is_rejected() {
        let to = owner_address(0);
        let proof = approve(0, &to, 1, &[]);

        let mut commitments = *ledger(2, false, 0).registry().commitments();
        commitments.swap(1, 2);
        let config = LedgerConfig::new(commitments, 2).unwrap();
        let other = TransactionLedger::new(config, keys().verifier.clone(), InMemoryEscrow::default());

        assert!(matches!(other.submit(to, wei(1), vec![], &proof).await, Err(LedgerError::InvalidProof)));
    }

    #[tokio::test]
    async fn unknown_index_is_reported() {
        let ledger = ledger(2, false, 0);
        let to = owner_address(0);

        assert!(matches!(ledger.get_transaction(0).await, Err(LedgerError::UnknownTransaction(0))));
        assert!(matches!(ledger.execute(3).await, Err(LedgerError::UnknownTransaction(3))));
        assert!(matches!(
            ledger.confirm(u64::MAX, &approve(0, &to, 1, &[])).await,
            Err(LedgerError::UnknownTransaction(u64::MAX))
        ));
    }

    #[tokio::test]
    async fn reads_are_idempotent() {
        let ledger = ledger(2, false, 0);
        let to = owner_address(2);
        ledger.submit(to, wei(9), b"data".to_vec(), &approve(2, &to, 9, b"data")).await.unwrap();

        let a = ledger.get_transaction(0).await.unwrap();
        let b = ledger.get_transaction(0).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.payload, b"data".to_vec());
        assert_eq!(a.message_hash, bind_message(&to, wei(9), b"data"));
    }

    #[tokio::test]
    async fn values_beyond_u128_are_bound_and_released() {
        let huge = Amount::from_hex("0x0100000000000000000000000000000001").unwrap();
        let ledger = ledger(2, false, 0);
        ledger.environment().deposit(huge).unwrap();
        let to = owner_address(1);

        ledger.submit(to, huge, vec![], &approve_amount(1, &to, huge, &[])).await.unwrap();
        assert!(matches!(
            ledger.confirm(0, &approve(2, &to, 1, &[])).await,
            Err(LedgerError::InvalidProof)
        ));
        ledger.confirm(0, &approve_amount(2, &to, huge, &[])).await.unwrap();

        let executed = ledger.execute(0).await.unwrap();
        assert_eq!(executed.value, huge);
        assert_eq!(ledger.environment().balance().unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn confirming_an_executed_transaction_fails() {
        let ledger = ledger(1, false, 10);
        let to = owner_address(0);
        ledger.submit(to, wei(1), vec![], &approve(0, &to, 1, &[])).await.unwrap();
        ledger.execute(0).await.unwrap();

        let err = ledger.confirm(0, &approve(1, &to, 1, &[])).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyExecuted(0)));
        assert_eq!(ledger.get_transaction(0).await.unwrap().confirmations, 1);
    }

    #[tokio::test]
    async fn repeated_approval_is_counted_unless_uniqueness_is_enforced() {
        let to = owner_address(0);
        let again = approve(0, &to, 1, &[]);

        let lenient = ledger(2, false, 0);
        lenient.submit(to, wei(1), vec![], &approve(0, &to, 1, &[])).await.unwrap();
        assert_eq!(lenient.confirm(0, &again).await.unwrap(), 2);

        let strict = ledger(2, true, 0);
        strict.submit(to, wei(1), vec![], &approve(0, &to, 1, &[])).await.unwrap();
        assert!(matches!(strict.confirm(0, &again).await, Err(LedgerError::DuplicateApproval(0))));
        assert_eq!(strict.confirm(0, &approve(1, &to, 1, &[])).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn failed_release_leaves_transaction_pending() {
        let ledger = ledger(1, false, 0);
        let to = owner_address(1);
        ledger.submit(to, wei(50), vec![], &approve(1, &to, 50, &[])).await.unwrap();

        assert!(matches!(ledger.execute(0).await, Err(LedgerError::ExecutionFailed(_))));
        assert!(!ledger.get_transaction(0).await.unwrap().executed);

        ledger.environment().deposit(wei(50)).unwrap();
        assert!(ledger.execute(0).await.unwrap().executed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_confirmations_are_linearized() {
        let ledger = Arc::new(ledger(3, false, 0));
        let to = owner_address(0);
        ledger.submit(to, wei(1), vec![], &approve(0, &to, 1, &[])).await.unwrap();

        let approvals: Vec<_> = (0..6).map(|i| approve(i % 3, &to, 1, &[])).collect();
        let handles: Vec<_> = approvals
            .into_iter()
            .map(|proof| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.confirm(0, &proof).await })
            })
            .collect();

        let mut counts = Vec::new();
        for h in handles {
            counts.push(h.await.unwrap().unwrap());
        }
        counts.sort_unstable();

        assert_eq!(counts, vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(ledger.get_transaction(0).await.unwrap().confirmations, 7);
    }
}

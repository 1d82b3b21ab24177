use crate::escrow::ExecutionError;
use thiserror::Error;
use zk_auth::ZkError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid proof")]
    InvalidProof,

    #[error("unknown transaction: {0}")]
    UnknownTransaction(u64),

    #[error("transaction {0} already executed")]
    AlreadyExecuted(u64),

    #[error("quorum not met for transaction {index}: {confirmations} of {required} confirmations")]
    QuorumNotMet { index: u64, confirmations: u32, required: u32 },

    #[error("approval already counted for transaction {0}")]
    DuplicateApproval(u64),

    #[error("execution failed: {0}")]
    ExecutionFailed(#[from] ExecutionError),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("proof generation cancelled")]
    ProofCancelled,

    #[error("key material: {0}")]
    KeyMaterial(String),

    #[error(transparent)]
    Zk(#[from] ZkError),

    #[error("internal error: {0}")]
    Internal(String),
}

//! Boundary to the environment that holds escrowed value.
//!
//! The ledger only decides *whether* a transaction may run; moving value and invoking the
//! payload is delegated to an [`ExecutionEnvironment`].

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;
use zk_auth::{Address, Amount};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds { available: Amount, requested: Amount },

    #[error("balance overflow")]
    Overflow,

    #[error("execution environment unavailable: {0}")]
    Unavailable(String),
}

/// A value transfer released by an executed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub index: u64,
    pub destination: Address,
    pub value: Amount,
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
}

/// "Transfer value + invoke payload" primitive.
///
/// `release` must either apply the whole transfer or return an error with no effect; the
/// ledger only marks a transaction executed after a successful release.
pub trait ExecutionEnvironment: Send + Sync {
    fn release(&self, transfer: &Transfer) -> Result<(), ExecutionError>;
}

#[derive(Debug, Default)]
struct EscrowState {
    balance: Amount,
    released: Vec<Transfer>,
}

/// In-process escrow: a balance plus the log of released transfers.
#[derive(Debug, Default)]
pub struct InMemoryEscrow {
    state: Mutex<EscrowState>,
}

impl InMemoryEscrow {
    pub fn with_balance(balance: Amount) -> Self {
        Self {
            state: Mutex::new(EscrowState { balance, released: Vec::new() }),
        }
    }

    /// Credit the escrow, returning the new balance.
    pub fn deposit(&self, amount: Amount) -> Result<Amount, ExecutionError> {
        let mut state = self.lock()?;
        state.balance = state.balance.checked_add(amount).ok_or(ExecutionError::Overflow)?;
        info!(%amount, balance = %state.balance, "deposit received");
        Ok(state.balance)
    }

    pub fn balance(&self) -> Result<Amount, ExecutionError> {
        Ok(self.lock()?.balance)
    }

    pub fn released(&self) -> Result<Vec<Transfer>, ExecutionError> {
        Ok(self.lock()?.released.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, EscrowState>, ExecutionError> {
        self.state
            .lock()
            .map_err(|_| ExecutionError::Unavailable("escrow lock poisoned".to_string()))
    }
}

impl ExecutionEnvironment for InMemoryEscrow {
    fn release(&self, transfer: &Transfer) -> Result<(), ExecutionError> {
        let mut state = self.lock()?;
        let available = state.balance;
        state.balance = available.checked_sub(transfer.value).ok_or(ExecutionError::InsufficientFunds {
            available,
            requested: transfer.value,
        })?;
        state.released.push(transfer.clone());
        Ok(())
    }
}

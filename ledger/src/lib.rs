//! Anonymous threshold-authorization ledger.
//!
//! Three registered identities approve value transfers with zero-knowledge ownership proofs
//! instead of signatures; once enough approvals accumulate, a transaction is released to the
//! execution environment.

pub mod config;
pub mod errors;
pub mod escrow;
pub mod keys;
pub mod ledger;
pub mod models;
pub mod prover;

#[cfg(test)]
mod test_support;

pub use config::{LedgerConfig, RegistryFile, Settings};
pub use errors::LedgerError;
pub use escrow::{ExecutionEnvironment, InMemoryEscrow, Transfer};
pub use ledger::TransactionLedger;
pub use prover::{ProofRequest, ProofService};

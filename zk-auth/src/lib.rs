//! ZK layer for the anonymous threshold-authorization ledger.
//!
//! This crate contains:
//! - Private-key limb decomposition and identity commitments.
//! - Canonical transaction message binding.
//! - A SNARK circuit proving "I own one of three registered identities" for one message hash.
//! - Groth16 prover + verifier orchestration and transport encodings.

pub mod circuit;
pub mod commitment;
pub mod constants;
pub mod errors;
pub mod groth16;
pub mod limbs;
pub mod message;
pub mod types;

pub use commitment::{commit, Address, IdentityCommitment};
pub use errors::ZkError;
pub use groth16::{prove, ProofVerifier};
pub use limbs::{decompose, LimbVector, PrivateKey};
pub use message::{bind_message, Amount, MessageHash};
pub use types::{ApprovalNullifier, AuthorizationProof, PublicSignals};

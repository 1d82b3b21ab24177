//! Shared fixtures: one deterministic trusted setup per test binary and the demo owners.

use crate::config::{LedgerConfig, DEMO_OWNER_KEYS};
use crate::escrow::InMemoryEscrow;
use crate::keys::ZkKeys;
use crate::ledger::TransactionLedger;
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::OnceLock;
use zk_auth::commitment::derive_address;
use zk_auth::groth16::{prove, setup_keys};
use zk_auth::limbs::decompose_for_circuit;
use zk_auth::{bind_message, Address, Amount, AuthorizationProof, LimbVector, PrivateKey};

pub(crate) fn keys() -> &'static ZkKeys {
    static KEYS: OnceLock<ZkKeys> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(2024);
        let (pk, vk) = setup_keys(&mut rng).unwrap();
        ZkKeys::new(pk, vk).unwrap()
    })
}

pub(crate) fn wei(value: u128) -> Amount {
    Amount::from(value)
}

pub(crate) fn owner_limbs(owner: usize) -> LimbVector {
    decompose_for_circuit(&PrivateKey::from_hex(DEMO_OWNER_KEYS[owner]).unwrap())
}

pub(crate) fn owner_address(owner: usize) -> Address {
    derive_address(&owner_limbs(owner).to_circuit_limbs().unwrap())
}

pub(crate) fn config(threshold: u32, unique: bool) -> LedgerConfig {
    let owners: Vec<_> = (0..DEMO_OWNER_KEYS.len()).map(owner_limbs).collect();
    LedgerConfig::from_owner_limbs(&owners, threshold)
        .unwrap()
        .with_unique_approvals(unique)
}

pub(crate) fn ledger(threshold: u32, unique: bool, balance: u128) -> TransactionLedger<InMemoryEscrow> {
    TransactionLedger::new(
        config(threshold, unique),
        keys().verifier.clone(),
        InMemoryEscrow::with_balance(wei(balance)),
    )
}

/// Owner `owner`'s approval of `(to, value, payload)`.
pub(crate) fn approve(owner: usize, to: &Address, value: u128, payload: &[u8]) -> AuthorizationProof {
    approve_amount(owner, to, wei(value), payload)
}

pub(crate) fn approve_amount(owner: usize, to: &Address, value: Amount, payload: &[u8]) -> AuthorizationProof {
    let mut rng = OsRng;
    let registry = *config(1, false).commitments();
    prove(&mut rng, &keys().pk, &owner_limbs(owner), &bind_message(to, value, payload), &registry).unwrap()
}

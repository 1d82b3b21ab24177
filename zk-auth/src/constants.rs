//! Crate-wide constants shared by the ownership circuit and host-side orchestration.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::PrimeField;
use std::sync::OnceLock;

/// Width of one private-key limb, in bits.
pub const LIMB_BITS: u32 = 64;

/// Number of limbs a private key is split into for the circuit.
pub const LIMB_COUNT: usize = 4;

/// Bit width of a private key scalar.
pub const KEY_BITS: u32 = 256;

/// Bit width of an address.
pub const ADDRESS_BITS: usize = 160;

/// Size of the anonymity set. The circuit's public-input arity depends on it,
/// so changing this requires new proving/verifying keys.
pub const NUM_OWNERS: usize = 3;

/// Length of the public signal vector: message hash, one commitment per owner, nullifier.
pub const PUBLIC_SIGNAL_COUNT: usize = 2 + NUM_OWNERS;

// Domain tags absorbed first by every Poseidon use, so the three hashes never collide.
pub const DOMAIN_ADDRESS: u64 = 1;
pub const DOMAIN_COMMITMENT: u64 = 2;
pub const DOMAIN_NULLIFIER: u64 = 3;

// Poseidon sponge configuration.
//
// Width-3 sponge (rate=2, capacity=1); the same parameters are used natively and in-circuit.
pub const POSEIDON_RATE: usize = 2;
pub const POSEIDON_CAPACITY: usize = 1;

pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Poseidon S-box exponent (alpha).
pub const POSEIDON_ALPHA: u64 = 5;

/// Deterministically derive Poseidon parameters for BN254::Fr.
///
/// Both the native hasher and the in-circuit gadget call this, so they agree on the
/// round constants and MDS matrix. Derived once per process.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();
    CONFIG.get_or_init(derive_poseidon_config)
}

fn derive_poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits = Fr::MODULUS_BIT_SIZE as u64;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS as u64,
        POSEIDON_PARTIAL_ROUNDS as u64,
        0,
    );

    PoseidonConfig::new(
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        POSEIDON_ALPHA,
        mds,
        ark,
        POSEIDON_RATE,
        POSEIDON_CAPACITY,
    )
}

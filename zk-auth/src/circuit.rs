//! R1CS circuit for proving anonymous ownership of one of the registered identities.
//!
//! What this circuit proves:
//! 1) The prover knows four 64-bit limbs of a private key.
//! 2) The address derived from those limbs commits to one of the three public commitments,
//!    without revealing which one.
//! 3) The public nullifier equals Poseidon(limbs, message hash), which ties the proof to one
//!    transaction's message hash.
//!
//! Privacy: the limbs are witnesses (never public). Only the message hash, the registered
//! commitments and the nullifier are public.

use crate::constants::{
    poseidon_config, ADDRESS_BITS, DOMAIN_ADDRESS, DOMAIN_COMMITMENT, DOMAIN_NULLIFIER, LIMB_BITS,
    LIMB_COUNT, NUM_OWNERS,
};
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// Convert little-endian boolean bits into an FpVar.
fn bits_le_to_fp(bits_le: &[Boolean<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
    let mut acc = FpVar::<Fr>::zero();
    let mut coeff = FpVar::<Fr>::one();

    for b in bits_le {
        let term = b.select(&coeff, &FpVar::<Fr>::zero())?;
        acc += term;
        coeff += coeff.clone();
    }

    Ok(acc)
}

/// Enforce that `v` fits in `width` bits and return those little-endian bits.
fn constrain_bits(v: &FpVar<Fr>, width: usize) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    let bits = v.to_bits_le()?;
    let low = bits[..width].to_vec();
    let reconstructed = bits_le_to_fp(&low)?;
    reconstructed.enforce_equal(v)?;
    Ok(low)
}

/// In-circuit twin of `commitment::poseidon_hash`.
fn poseidon_var(
    cs: ConstraintSystemRef<Fr>,
    domain: u64,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::<Fr>::new(cs, poseidon_config());
    let mut absorbed = Vec::with_capacity(inputs.len() + 1);
    absorbed.push(FpVar::<Fr>::constant(Fr::from(domain)));
    absorbed.extend_from_slice(inputs);
    sponge.absorb(&absorbed)?;
    Ok(sponge.squeeze_field_elements(1)?.remove(0))
}

/// Ownership circuit. Build it through `groth16::ownership_circuit` so the public values are
/// consistent with the witness.
#[derive(Clone, Debug)]
pub struct OwnershipCircuit {
    /// Private key limbs, least significant first.
    pub limbs: [u64; LIMB_COUNT],

    pub public_message_hash: Fr,
    pub public_commitments: [Fr; NUM_OWNERS],
    pub public_nullifier: Fr,
}

impl ConstraintSynthesizer<Fr> for OwnershipCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // IMPORTANT: Public input ordering MUST match `PublicSignals::to_field_elems`.
        // message hash, commitments[0..3), nullifier.
        let message_hash = FpVar::<Fr>::new_input(cs.clone(), || Ok(self.public_message_hash))?;

        let mut commitments = Vec::<FpVar<Fr>>::with_capacity(NUM_OWNERS);
        for c in self.public_commitments {
            commitments.push(FpVar::<Fr>::new_input(cs.clone(), || Ok(c))?);
        }

        let public_nullifier = FpVar::<Fr>::new_input(cs.clone(), || Ok(self.public_nullifier))?;

        // --- Witness: key limbs ---
        let mut limbs = Vec::<FpVar<Fr>>::with_capacity(LIMB_COUNT);
        for limb in self.limbs {
            let v = FpVar::<Fr>::new_witness(cs.clone(), || Ok(Fr::from(limb)))?;
            constrain_bits(&v, LIMB_BITS as usize)?;
            limbs.push(v);
        }

        // Address: low 160 bits of the limb digest. `to_bits_le` is canonical, so the
        // truncation is unambiguous.
        let digest = poseidon_var(cs.clone(), DOMAIN_ADDRESS, &limbs)?;
        let digest_bits = digest.to_bits_le()?;
        let address = bits_le_to_fp(&digest_bits[..ADDRESS_BITS])?;

        let commitment = poseidon_var(cs.clone(), DOMAIN_COMMITMENT, &[address])?;

        // Membership: (c - c0)(c - c1)(c - c2) == 0.
        let mut product = FpVar::<Fr>::one();
        for registered in &commitments {
            product *= &commitment - registered;
        }
        product.enforce_equal(&FpVar::<Fr>::zero())?;

        // Binding: the nullifier mixes the key with this transaction's message hash.
        let mut nullifier_inputs = limbs;
        nullifier_inputs.push(message_hash);
        let nullifier = poseidon_var(cs, DOMAIN_NULLIFIER, &nullifier_inputs)?;
        nullifier.enforce_equal(&public_nullifier)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{commitment_for_limbs, Address};
    use crate::groth16::compute_nullifier;
    use crate::limbs::{decompose_for_circuit, PrivateKey};
    use crate::message::{bind_message, Amount};
    use ark_relations::r1cs::ConstraintSystem;

    const KEYS: [&str; 4] = [
        "0x7128f1a29d5c77a152a8f6ea20a48e9cbbd03b84a92957fa2e6779b67fd9db21",
        "0xf5d995524e50e12db492ed59a6493ea8ca944d4d11a1741b9184068e990e8288",
        "0x08e7c807341d16ce2f2c9a026cb521510f13a86388b45171074d24e4705c2bc1",
        "0x0000000000000000000000000000000000000000000000000000000000c0ffee",
    ];

    fn limbs(i: usize) -> [u64; LIMB_COUNT] {
        let key = PrivateKey::from_hex(KEYS[i]).unwrap();
        decompose_for_circuit(&key).to_circuit_limbs().unwrap()
    }

    fn registered() -> [Fr; NUM_OWNERS] {
        std::array::from_fn(|i| {
            let key = PrivateKey::from_hex(KEYS[i]).unwrap();
            *commitment_for_limbs(&decompose_for_circuit(&key)).unwrap().as_fr()
        })
    }

    fn is_satisfied(circuit: OwnershipCircuit) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    fn circuit_for(limbs: [u64; LIMB_COUNT]) -> OwnershipCircuit {
        let msg = *bind_message(&Address([0x42; 20]), Amount::from(1u128), b"").as_fr();
        OwnershipCircuit {
            limbs,
            public_message_hash: msg,
            public_commitments: registered(),
            public_nullifier: compute_nullifier(&limbs, msg).0,
        }
    }

    #[test]
    fn every_registered_owner_satisfies_the_circuit() {
        for i in 0..NUM_OWNERS {
            assert!(is_satisfied(circuit_for(limbs(i))), "owner {i}");
        }
    }

    #[test]
    fn unregistered_key_is_rejected() {
        assert!(!is_satisfied(circuit_for(limbs(3))));
    }

    #[test]
    fn nullifier_must_match_message_hash() {
        let mut circuit = circuit_for(limbs(0));
        circuit.public_message_hash += Fr::from(1u64);
        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn registered_commitment_order_does_not_matter() {
        let mut circuit = circuit_for(limbs(1));
        circuit.public_commitments.reverse();
        assert!(is_satisfied(circuit));
    }
}

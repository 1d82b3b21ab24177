//! Groth16 prover/verifier orchestration for the ownership circuit.
//!
//! SECURITY NOTE: Groth16 requires a trusted setup that produces a proving key (PK) and a
//! verifying key (VK). `setup_keys` runs that setup locally; deployments load keys produced by
//! a ceremony instead and never regenerate them at runtime.

use crate::circuit::OwnershipCircuit;
use crate::commitment::{commit, derive_address, poseidon_hash, IdentityCommitment};
use crate::constants::{DOMAIN_NULLIFIER, LIMB_COUNT, NUM_OWNERS};
use crate::errors::ZkError;
use crate::limbs::LimbVector;
use crate::message::MessageHash;
use crate::types::{ApprovalNullifier, AuthorizationProof, PublicSignals};
use ark_bn254::{Bn254, Fr};
use ark_crypto_primitives::snark::SNARK;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::RngCore;
use std::sync::Arc;
use tracing::debug;

/// Host-side nullifier: `Poseidon(DOMAIN_NULLIFIER, limbs, msgHash)`.
///
/// This MUST match the circuit's logic.
pub fn compute_nullifier(limbs: &[u64; LIMB_COUNT], message_hash: Fr) -> ApprovalNullifier {
    let mut inputs: Vec<Fr> = limbs.iter().map(|l| Fr::from(*l)).collect();
    inputs.push(message_hash);
    ApprovalNullifier(poseidon_hash(DOMAIN_NULLIFIER, &inputs))
}

/// Assemble a circuit whose public values are consistent with `limbs`.
pub fn ownership_circuit(
    limbs: [u64; LIMB_COUNT],
    message_hash: &MessageHash,
    commitments: &[IdentityCommitment; NUM_OWNERS],
) -> OwnershipCircuit {
    OwnershipCircuit {
        limbs,
        public_message_hash: *message_hash.as_fr(),
        public_commitments: commitments.map(|c| c.0),
        public_nullifier: compute_nullifier(&limbs, *message_hash.as_fr()).0,
    }
}

/// Generate a Groth16 keypair for the ownership circuit.
///
/// The constraint shape does not depend on the witness, so dummy values are used.
pub fn setup_keys(rng: &mut impl RngCore) -> Result<(ProvingKey<Bn254>, VerifyingKey<Bn254>), ZkError> {
    let limbs = [0u64; LIMB_COUNT];
    let placeholder = commit(&derive_address(&limbs));
    let circuit = ownership_circuit(limbs, &MessageHash(Fr::from(0u64)), &[placeholder; NUM_OWNERS]);

    let pk = Groth16::<Bn254>::generate_random_parameters_with_reduction(circuit, rng)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;

    let vk = pk.vk.clone();
    Ok((pk, vk))
}

/// Prove that `limbs` belong to one of `commitments`, bound to `message_hash`.
///
/// Fails with `WitnessUnsatisfiable` when the limbs are not a circuit-shaped key or the key's
/// commitment is not registered. Groth16 would happily produce a proof for an unsatisfied
/// circuit (one that never verifies), so the relation is checked here first.
pub fn prove(
    rng: &mut impl RngCore,
    pk: &ProvingKey<Bn254>,
    limbs: &LimbVector,
    message_hash: &MessageHash,
    commitments: &[IdentityCommitment; NUM_OWNERS],
) -> Result<AuthorizationProof, ZkError> {
    if !limbs.is_canonical() {
        return Err(ZkError::WitnessUnsatisfiable(format!(
            "limb exceeds {} bits",
            limbs.limb_bits()
        )));
    }
    let limbs = limbs.to_circuit_limbs()?;

    let commitment = commit(&derive_address(&limbs));
    if !commitments.contains(&commitment) {
        return Err(ZkError::WitnessUnsatisfiable(
            "key does not match any registered commitment".to_string(),
        ));
    }

    let circuit = ownership_circuit(limbs, message_hash, commitments);
    let public_signals = PublicSignals {
        message_hash: *message_hash,
        commitments: *commitments,
        nullifier: ApprovalNullifier(circuit.public_nullifier),
    };

    let proof = Groth16::<Bn254>::create_random_proof_with_reduction(circuit, pk, rng)
        .map_err(|e| ZkError::Ark(format!("{e}")))?;

    debug!("ownership proof generated");
    Ok(AuthorizationProof { proof, public_signals })
}

/// Stateless verifier over a prepared verifying key.
///
/// The key comes from trusted setup, is prepared once and then shared read-only; cloning
/// the verifier only clones the `Arc`.
#[derive(Clone)]
pub struct ProofVerifier {
    pvk: Arc<PreparedVerifyingKey<Bn254>>,
}

impl ProofVerifier {
    pub fn new(vk: &VerifyingKey<Bn254>) -> Result<Self, ZkError> {
        let pvk = Groth16::<Bn254>::process_vk(vk).map_err(|e| ZkError::Ark(format!("{e}")))?;
        Ok(Self { pvk: Arc::new(pvk) })
    }

    /// `true` iff `proof` verifies against exactly `public_signals`. Malformed input is a
    /// plain rejection.
    pub fn verify(&self, proof: &Proof<Bn254>, public_signals: &PublicSignals) -> bool {
        Groth16::<Bn254>::verify_proof(&self.pvk, proof, &public_signals.to_field_elems()).unwrap_or(false)
    }

    /// Like [`Self::verify`] but as a `Result`, for `?`-style callers.
    pub fn ensure_valid(&self, proof: &Proof<Bn254>, public_signals: &PublicSignals) -> Result<(), ZkError> {
        if !self.verify(proof, public_signals) {
            return Err(ZkError::InvalidProof);
        }
        Ok(())
    }
}

/// Free-function form of [`ProofVerifier::verify`] for one-off checks.
pub fn verify(vk: &VerifyingKey<Bn254>, proof: &Proof<Bn254>, public_signals: &PublicSignals) -> bool {
    ProofVerifier::new(vk).is_ok_and(|v| v.verify(proof, public_signals))
}

/// Serialize a proving key to bytes.
pub fn serialize_pk(pk: &ProvingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    pk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_pk(bytes: &[u8]) -> Result<ProvingKey<Bn254>, ZkError> {
    ProvingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

pub fn serialize_vk(vk: &VerifyingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    vk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_vk(bytes: &[u8]) -> Result<VerifyingKey<Bn254>, ZkError> {
    VerifyingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

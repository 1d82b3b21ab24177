//! Types shared between the circuit and the host-side prover/verifier.

use crate::commitment::IdentityCommitment;
use crate::constants::{NUM_OWNERS, PUBLIC_SIGNAL_COUNT};
use crate::errors::ZkError;
use crate::limbs::{decode_hex_padded, u256_from_be_bytes};
use crate::message::MessageHash;
use ark_bn254::{Bn254, Fr};
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::Proof;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// JSON-friendly representation of a field element.
///
/// Fr values travel as `0x`-prefixed big-endian hex. Parsing rejects non-canonical values
/// (at or above the modulus) instead of reducing them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrHex(pub String);

impl FrHex {
    pub fn from_fr(x: &Fr) -> Self {
        Self(format!("0x{}", hex::encode(x.into_bigint().to_bytes_be())))
    }

    pub fn to_fr(&self) -> Result<Fr, ZkError> {
        let bytes = decode_hex_padded::<32>(&self.0)?;
        Fr::from_bigint(u256_from_be_bytes(&bytes)).ok_or_else(|| {
            ZkError::InputOutOfRange(format!("{} is not below the field modulus", self.0))
        })
    }
}

/// Nullifier output by the circuit: `Poseidon(DOMAIN_NULLIFIER, limbs, msgHash)`.
///
/// Stable for one key and one transaction, unlinkable across transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FrHex", into = "FrHex")]
pub struct ApprovalNullifier(pub Fr);

impl TryFrom<FrHex> for ApprovalNullifier {
    type Error = ZkError;

    fn try_from(h: FrHex) -> Result<Self, Self::Error> {
        h.to_fr().map(Self)
    }
}

impl From<ApprovalNullifier> for FrHex {
    fn from(n: ApprovalNullifier) -> Self {
        FrHex::from_fr(&n.0)
    }
}

/// Public signals of an ownership proof.
///
/// Ordering MUST match the circuit's `new_input` allocation order:
/// message hash, commitments[0..3), nullifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSignals {
    pub message_hash: MessageHash,
    pub commitments: [IdentityCommitment; NUM_OWNERS],
    pub nullifier: ApprovalNullifier,
}

impl PublicSignals {
    pub fn to_field_elems(&self) -> Vec<Fr> {
        let mut v = Vec::with_capacity(PUBLIC_SIGNAL_COUNT);
        v.push(*self.message_hash.as_fr());
        v.extend(self.commitments.iter().map(|c| *c.as_fr()));
        v.push(self.nullifier.0);
        v
    }

    /// Inverse of [`Self::to_field_elems`]; the slice must have exactly five elements.
    pub fn from_field_elems(elems: &[Fr]) -> Result<Self, ZkError> {
        let [msg, c0, c1, c2, nullifier] = elems else {
            return Err(ZkError::Serialization(format!(
                "expected {PUBLIC_SIGNAL_COUNT} public signals, got {}",
                elems.len()
            )));
        };
        Ok(Self {
            message_hash: MessageHash(*msg),
            commitments: [IdentityCommitment(*c0), IdentityCommitment(*c1), IdentityCommitment(*c2)],
            nullifier: ApprovalNullifier(*nullifier),
        })
    }
}

/// A Groth16 proof together with the public signals it was produced against.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizationProof {
    pub proof: Proof<Bn254>,
    pub public_signals: PublicSignals,
}

/// Transport form of [`AuthorizationProof`]: base64 compressed proof plus hex signals.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofEnvelope {
    pub proof_b64: String,
    pub public_signals: PublicSignals,
}

impl AuthorizationProof {
    pub fn to_envelope(&self) -> Result<ProofEnvelope, ZkError> {
        let mut bytes = Vec::new();
        self.proof
            .serialize_compressed(&mut bytes)
            .map_err(|e| ZkError::Serialization(format!("{e}")))?;
        Ok(ProofEnvelope {
            proof_b64: base64::engine::general_purpose::STANDARD.encode(bytes),
            public_signals: self.public_signals,
        })
    }

    pub fn from_envelope(envelope: &ProofEnvelope) -> Result<Self, ZkError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&envelope.proof_b64)
            .map_err(|e| ZkError::Serialization(format!("invalid proof_b64: {e}")))?;
        let proof = Proof::<Bn254>::deserialize_compressed(&bytes[..])
            .map_err(|e| ZkError::Serialization(format!("{e}")))?;
        Ok(Self { proof, public_signals: envelope.public_signals })
    }
}

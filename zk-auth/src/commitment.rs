//! Identity commitments and the circuit-native address derivation.
//!
//! An owner registers `commit(address)`; the circuit later recomputes the same commitment from
//! the owner's private-key limbs and checks it against the registered set.

use crate::constants::{poseidon_config, ADDRESS_BITS, DOMAIN_ADDRESS, DOMAIN_COMMITMENT, LIMB_COUNT};
use crate::errors::ZkError;
use crate::limbs::{decode_hex_padded, LimbVector, U256};
use crate::types::FrHex;
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::PoseidonSponge;
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};
use std::fmt;

const ADDRESS_BYTES: usize = ADDRESS_BITS / 8;

/// A 160-bit account address, big-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    pub fn from_hex(s: &str) -> Result<Self, ZkError> {
        decode_hex_padded::<ADDRESS_BYTES>(s).map(Self)
    }

    /// Narrow a 256-bit integer to an address; anything above bit 159 is out of range.
    pub fn from_u256(value: &U256) -> Result<Self, ZkError> {
        if value.num_bits() as usize > ADDRESS_BITS {
            return Err(ZkError::InputOutOfRange(format!(
                "address needs {} bits, at most {ADDRESS_BITS} allowed",
                value.num_bits()
            )));
        }
        let be = value.to_bytes_be();
        let mut out = [0u8; ADDRESS_BYTES];
        out.copy_from_slice(&be[be.len() - ADDRESS_BYTES..]);
        Ok(Self(out))
    }

    /// The address as a field element. 160 bits always fit below the BN254 modulus.
    pub fn to_field(&self) -> Fr {
        Fr::from_be_bytes_mod_order(&self.0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Address {
    type Error = ZkError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_hex()
    }
}

/// Poseidon digest of an address; one per registered identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FrHex", into = "FrHex")]
pub struct IdentityCommitment(pub Fr);

impl IdentityCommitment {
    pub fn as_fr(&self) -> &Fr {
        &self.0
    }

    /// Parse a canonical field element; values at or above the modulus are rejected.
    pub fn from_hex(s: &str) -> Result<Self, ZkError> {
        FrHex(s.to_string()).to_fr().map(Self)
    }

    pub fn to_hex(&self) -> String {
        FrHex::from_fr(&self.0).0
    }
}

impl TryFrom<FrHex> for IdentityCommitment {
    type Error = ZkError;

    fn try_from(h: FrHex) -> Result<Self, Self::Error> {
        h.to_fr().map(Self)
    }
}

impl From<IdentityCommitment> for FrHex {
    fn from(c: IdentityCommitment) -> Self {
        FrHex::from_fr(&c.0)
    }
}

/// Domain-separated Poseidon over `inputs`, squeezing one element.
///
/// This MUST match `circuit::poseidon_var`.
pub fn poseidon_hash(domain: u64, inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::<Fr>::new(poseidon_config());
    let mut absorbed = Vec::with_capacity(inputs.len() + 1);
    absorbed.push(Fr::from(domain));
    absorbed.extend_from_slice(inputs);
    sponge.absorb(&absorbed);
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

/// `commit(address) = Poseidon(DOMAIN_COMMITMENT, address)`.
pub fn commit(address: &Address) -> IdentityCommitment {
    IdentityCommitment(poseidon_hash(DOMAIN_COMMITMENT, &[address.to_field()]))
}

/// Address derived from the circuit limbs: the low 160 bits of
/// `Poseidon(DOMAIN_ADDRESS, limb_0, .., limb_3)`.
pub fn derive_address(limbs: &[u64; LIMB_COUNT]) -> Address {
    let inputs: Vec<Fr> = limbs.iter().map(|l| Fr::from(*l)).collect();
    let digest = poseidon_hash(DOMAIN_ADDRESS, &inputs).into_bigint().to_bytes_be();

    let mut out = [0u8; ADDRESS_BYTES];
    out.copy_from_slice(&digest[digest.len() - ADDRESS_BYTES..]);
    Address(out)
}

/// Registration helper: the commitment an owner publishes for a decomposed key.
pub fn commitment_for_limbs(limbs: &LimbVector) -> Result<IdentityCommitment, ZkError> {
    let limbs = limbs.to_circuit_limbs()?;
    Ok(commit(&derive_address(&limbs)))
}

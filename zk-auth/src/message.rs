//! Transaction message binding.
//!
//! Every approval proof carries the message hash of one `(destination, value, payload)` triple
//! as a public input, so a proof for one transaction cannot authorize another.
//!
//! The triple is encoded exactly like Solidity's `abi.encode(address, uint256, bytes)`, hashed
//! with Keccak-256 and reduced into the BN254 scalar field.

use crate::commitment::Address;
use crate::errors::ZkError;
use crate::limbs::{decode_hex_padded, u256_from_be_bytes, U256};
use crate::types::FrHex;
use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, PrimeField};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

const WORD: usize = 32;

/// A `uint256` value, in the smallest unit of the escrowed asset.
///
/// Serialized as minimal `0x` hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(pub U256);

impl Amount {
    pub const ZERO: Self = Self(BigInt::new([0u64; 4]));

    pub fn from_be_bytes(bytes: [u8; WORD]) -> Self {
        Self(u256_from_be_bytes(&bytes))
    }

    /// Parse big-endian hex (optional `0x`). More than 32 bytes is `InputOutOfRange`.
    pub fn from_hex(s: &str) -> Result<Self, ZkError> {
        decode_hex_padded::<WORD>(s).map(Self::from_be_bytes)
    }

    pub fn to_be_bytes(&self) -> [u8; WORD] {
        let mut out = [0u8; WORD];
        out.copy_from_slice(&self.0.to_bytes_be());
        out
    }

    pub fn to_hex(&self) -> String {
        let digits = hex::encode(self.to_be_bytes());
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() { "0x0".to_string() } else { format!("0x{trimmed}") }
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        let mut sum = self.0;
        (!sum.add_with_carry(&other.0)).then_some(Self(sum))
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        let mut diff = self.0;
        (!diff.sub_with_borrow(&other.0)).then_some(Self(diff))
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Self(BigInt::new([v as u64, (v >> 64) as u64, 0, 0]))
    }
}

impl TryFrom<String> for Amount {
    type Error = ZkError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Amount> for String {
    fn from(a: Amount) -> Self {
        a.to_hex()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.to_hex())
    }
}

/// Field element a proof is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FrHex", into = "FrHex")]
pub struct MessageHash(pub Fr);

impl MessageHash {
    pub fn as_fr(&self) -> &Fr {
        &self.0
    }
}

impl TryFrom<FrHex> for MessageHash {
    type Error = ZkError;

    fn try_from(h: FrHex) -> Result<Self, Self::Error> {
        h.to_fr().map(Self)
    }
}

impl From<MessageHash> for FrHex {
    fn from(m: MessageHash) -> Self {
        FrHex::from_fr(&m.0)
    }
}

/// Canonical `abi.encode(address, uint256, bytes)`.
///
/// Head: address left-padded to a word, value as a big-endian word, offset of the dynamic
/// tail (0x60). Tail: payload length word, then the payload right-padded to a word boundary.
pub fn encode_transaction(destination: &Address, value: Amount, payload: &[u8]) -> Vec<u8> {
    let padded_len = payload.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(4 * WORD + padded_len);

    out.extend_from_slice(&[0u8; WORD - 20]);
    out.extend_from_slice(&destination.0);

    out.extend_from_slice(&value.to_be_bytes());
    out.extend_from_slice(&length_word(3 * WORD));

    out.extend_from_slice(&length_word(payload.len()));
    out.extend_from_slice(payload);
    out.resize(4 * WORD + padded_len, 0);

    out
}

/// Keccak-256 of the canonical encoding, big-endian, reduced modulo the scalar field.
pub fn bind_message(destination: &Address, value: Amount, payload: &[u8]) -> MessageHash {
    let digest = Keccak256::digest(encode_transaction(destination, value, payload));
    MessageHash(Fr::from_be_bytes_mod_order(&digest))
}

fn length_word(len: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(len as u64).to_be_bytes());
    word
}

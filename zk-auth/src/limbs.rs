//! Private-key limb decomposition.
//!
//! BN254's scalar field is ~254 bits wide, so a 256-bit private key cannot be carried as a
//! single field element. The key is split into fixed-width limbs instead and the circuit
//! consumes the limbs directly.
//!
//! Decomposition masks the key to its low `n * k` bits first. The high bits are dropped on
//! purpose: prover and circuit must apply the same truncation.

use crate::constants::{KEY_BITS, LIMB_BITS, LIMB_COUNT};
use crate::errors::ZkError;
use ark_ff::{BigInt, BigInteger};
use std::fmt;

/// Unsigned 256-bit integer, little-endian 64-bit words.
pub type U256 = BigInt<4>;

const ZERO: U256 = BigInt::new([0u64; 4]);

/// A 256-bit private key scalar.
///
/// Only ever consumed as circuit input. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(U256);

impl PrivateKey {
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(u256_from_be_bytes(&bytes))
    }

    /// Parse a big-endian hex string, with or without `0x`, of at most 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self, ZkError> {
        let bytes = decode_hex_padded::<32>(s)?;
        Ok(Self::from_be_bytes(bytes))
    }

    pub fn as_u256(&self) -> &U256 {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// `k` limbs of `limb_bits` bits each, limb 0 least significant.
///
/// Limbs are full 256-bit words, so any width works; widths past 256 simply leave the
/// high bits of each limb zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LimbVector {
    limb_bits: u32,
    limbs: Vec<U256>,
}

impl LimbVector {
    /// Wrap limbs produced elsewhere (e.g. by a wallet). No range check happens here; the
    /// prover rejects limbs that do not fit `limb_bits`.
    pub fn new(limb_bits: u32, limbs: Vec<U256>) -> Self {
        Self { limb_bits, limbs }
    }

    /// [`Self::new`] for limbs that fit in a machine word.
    pub fn from_limbs(limb_bits: u32, limbs: Vec<u64>) -> Self {
        Self::new(limb_bits, limbs.into_iter().map(U256::from).collect())
    }

    pub fn limb_bits(&self) -> u32 {
        self.limb_bits
    }

    pub fn limbs(&self) -> &[U256] {
        &self.limbs
    }

    pub fn len(&self) -> usize {
        self.limbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limbs.is_empty()
    }

    /// Whether every limb fits in `limb_bits` bits.
    pub fn is_canonical(&self) -> bool {
        self.limbs.iter().all(|l| l.num_bits() <= self.limb_bits)
    }

    /// Rebuild the (truncated) key, little-endian base 2^limb_bits.
    ///
    /// Bits that would land above bit 255 are dropped.
    pub fn recompose(&self) -> U256 {
        let mut out = ZERO;
        let n = u64::from(self.limb_bits);
        for (i, limb) in self.limbs.iter().enumerate() {
            for b in 0..n.min(u64::from(KEY_BITS)) {
                if get_bit(limb, b) {
                    set_bit(&mut out, i as u64 * n + b);
                }
            }
        }
        out
    }

    /// The fixed-shape limbs the ownership circuit takes as witness.
    pub fn to_circuit_limbs(&self) -> Result<[u64; LIMB_COUNT], ZkError> {
        if self.limb_bits != LIMB_BITS || self.limbs.len() != LIMB_COUNT {
            return Err(ZkError::WitnessUnsatisfiable(format!(
                "circuit expects {LIMB_COUNT} limbs of {LIMB_BITS} bits, got {} limbs of {} bits",
                self.limbs.len(),
                self.limb_bits
            )));
        }
        if !self.is_canonical() {
            return Err(ZkError::WitnessUnsatisfiable(format!("limb exceeds {LIMB_BITS} bits")));
        }
        Ok(std::array::from_fn(|i| self.limbs[i].0[0]))
    }
}

/// Split `key` into `k` limbs of `n` bits after masking it to its low `n * k` bits.
///
/// Total: `n = 0` yields `k` zero limbs, and limbs reaching past bit 255 are zero-filled.
pub fn decompose(key: &U256, n: u32, k: usize) -> LimbVector {
    let n = u64::from(n);
    let limbs = (0..k as u64)
        .map(|i| {
            let mut limb = ZERO;
            for b in 0..n.min(u64::from(KEY_BITS)) {
                if get_bit(key, i * n + b) {
                    set_bit(&mut limb, b);
                }
            }
            limb
        })
        .collect();

    LimbVector { limb_bits: n as u32, limbs }
}

/// Decompose with the circuit's parameters (`n = 64`, `k = 4`).
pub fn decompose_for_circuit(key: &PrivateKey) -> LimbVector {
    decompose(key.as_u256(), LIMB_BITS, LIMB_COUNT)
}

/// Keep the low `bits` bits of `value`.
pub fn mask_low_bits(value: &U256, bits: u64) -> U256 {
    let mut out = ZERO;
    for pos in 0..bits.min(u64::from(KEY_BITS)) {
        if get_bit(value, pos) {
            set_bit(&mut out, pos);
        }
    }
    out
}

pub fn u256_from_be_bytes(bytes: &[u8; 32]) -> U256 {
    let mut words = [0u64; 4];
    for (i, chunk) in bytes.rchunks_exact(8).enumerate() {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        words[i] = u64::from_be_bytes(word);
    }
    BigInt::new(words)
}

/// Decode hex (optional `0x`) into a big-endian `N`-byte array, left-padding short input.
pub(crate) fn decode_hex_padded<const N: usize>(s: &str) -> Result<[u8; N], ZkError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = if s.len() % 2 == 1 { format!("0{s}") } else { s.to_string() };
    let bytes = hex::decode(&s).map_err(|e| ZkError::Serialization(format!("invalid hex: {e}")))?;
    if bytes.len() > N {
        return Err(ZkError::InputOutOfRange(format!(
            "expected at most {N} bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out[N - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

fn get_bit(value: &U256, pos: u64) -> bool {
    if pos >= u64::from(KEY_BITS) {
        return false;
    }
    (value.0[(pos / 64) as usize] >> (pos % 64)) & 1 == 1
}

fn set_bit(value: &mut U256, pos: u64) {
    if pos < u64::from(KEY_BITS) {
        value.0[(pos / 64) as usize] |= 1u64 << (pos % 64);
    }
}

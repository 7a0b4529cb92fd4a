//! Seedless 64-bit hash functions over raw byte buffers.
//!
//! Both algorithms are deterministic across processes and instances of the
//! same binary. They read 8-byte blocks as little-endian words.

use core::fmt;
use core::str::FromStr;

use crate::error::Error;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

const MURMUR_C1: u64 = 0x87c37b91114253d5;
const MURMUR_C2: u64 = 0x4cf5ad432745937f;

#[inline]
fn read_u64(chunk: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(chunk);
    u64::from_le_bytes(word)
}

/// Streaming FNV-1a: whole 8-byte words first, then the 0..=7 tail bytes
/// one at a time.
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut state = FNV_OFFSET_BASIS;
    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        state ^= read_u64(chunk);
        state = state.wrapping_mul(FNV_PRIME);
    }
    for &b in chunks.remainder() {
        state ^= b as u64;
        state = state.wrapping_mul(FNV_PRIME);
    }
    state
}

/// FNV-1a of an integer key; its eight bytes are the whole input.
#[inline]
pub fn fnv1a_u64(value: u64) -> u64 {
    (FNV_OFFSET_BASIS ^ value).wrapping_mul(FNV_PRIME)
}

#[inline]
fn murmur_mix_k(mut k: u64) -> u64 {
    k = k.wrapping_mul(MURMUR_C1);
    k = k.rotate_left(31);
    k.wrapping_mul(MURMUR_C2)
}

/// MurmurHash3 finalizer: every input bit affects every output bit.
#[inline]
pub(crate) fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51afd7ed558ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ceb9fe1a85ec53);
    k ^= k >> 33;
    k
}

/// MurmurHash3 single-lane 64-bit variant with seed 0.
pub fn murmur3(bytes: &[u8]) -> u64 {
    let mut h: u64 = 0;
    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        h ^= murmur_mix_k(read_u64(chunk));
        h = h.rotate_left(27);
        h = h.wrapping_mul(5).wrapping_add(0x52dce729);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        // Little-endian fold of the tail, same as the classic fallthrough switch.
        let mut k: u64 = 0;
        for (i, &b) in tail.iter().enumerate() {
            k ^= (b as u64) << (8 * i);
        }
        h ^= murmur_mix_k(k);
    }

    h ^= bytes.len() as u64;
    fmix64(h)
}

/// MurmurHash3 of an integer key, hashed as its eight little-endian bytes.
#[inline]
pub fn murmur3_u64(value: u64) -> u64 {
    murmur3(&value.to_le_bytes())
}

/// Hash algorithm selected once per deployment.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    #[default]
    Fnv1a,
    Murmur3,
}

impl HashAlgorithm {
    #[inline]
    pub fn hash(self, bytes: &[u8]) -> u64 {
        match self {
            HashAlgorithm::Fnv1a => fnv1a(bytes),
            HashAlgorithm::Murmur3 => murmur3(bytes),
        }
    }

    #[inline]
    pub fn hash_u64(self, value: u64) -> u64 {
        match self {
            HashAlgorithm::Fnv1a => fnv1a_u64(value),
            HashAlgorithm::Murmur3 => murmur3_u64(value),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Fnv1a => "fnv1a",
            HashAlgorithm::Murmur3 => "murmur3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fnv1a" | "fnv" => Ok(HashAlgorithm::Fnv1a),
            "murmur3" | "murmur" => Ok(HashAlgorithm::Murmur3),
            other => Err(Error::UnknownHashAlgorithm(other.to_string())),
        }
    }
}

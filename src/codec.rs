//! Fixed-width key and value buffers plus the codec that defines key
//! equality and hashing.
//!
//! A [`Codec`] is chosen once per engine instance and never changes. Engines
//! never compare or hash a [`Key`] directly; they go through
//! [`Codec::prepare`], which zeroes every byte past the comparison width and
//! computes the hash over exactly that width. Two keys are the same entry iff
//! their prepared forms are byte-equal, and equal prepared keys always carry
//! equal hashes.

use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use core::str::FromStr;

use crate::error::Error;
use crate::hash::{fmix64, fnv1a, HashAlgorithm};

/// Key buffer capacity in bytes.
pub const KEY_CAP: usize = 16;
/// Value buffer capacity in bytes.
pub const VALUE_CAP: usize = 48;
/// Payload bytes of a length-tagged key; the last byte holds the length.
pub const KEY_DATA_CAP: usize = KEY_CAP - 1;

/// Opaque fixed-width lookup key.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Key {
    pub data: [u8; KEY_CAP],
}

impl Key {
    #[inline]
    pub const fn new(data: [u8; KEY_CAP]) -> Self {
        Self { data }
    }

    /// Copies at most [`KEY_DATA_CAP`] bytes and records the copied length in
    /// the trailing tag byte.
    #[inline]
    pub fn from_bytes(src: &[u8]) -> Self {
        let mut data = [0u8; KEY_CAP];
        let len = src.len().min(KEY_DATA_CAP);
        data[..len].copy_from_slice(&src[..len]);
        data[KEY_DATA_CAP] = len as u8;
        Self { data }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_CAP] {
        &self.data
    }

    /// Prefix named by the length tag, for keys built with [`Key::from_bytes`].
    #[inline]
    pub fn payload(&self) -> &[u8] {
        let len = (self.data[KEY_DATA_CAP] as usize).min(KEY_DATA_CAP);
        &self.data[..len]
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::from_bytes(s.as_bytes())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:02x?})", self.data)
    }
}

/// Opaque fixed-width value; never interpreted by the maps.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    pub data: [u8; VALUE_CAP],
}

impl Value {
    pub const ZERO: Value = Value {
        data: [0u8; VALUE_CAP],
    };

    #[inline]
    pub const fn new(data: [u8; VALUE_CAP]) -> Self {
        Self { data }
    }

    /// Zero-padded copy of `src`, truncated to [`VALUE_CAP`] bytes.
    #[inline]
    pub fn from_bytes(src: &[u8]) -> Self {
        let mut data = [0u8; VALUE_CAP];
        let len = src.len().min(VALUE_CAP);
        data[..len].copy_from_slice(&src[..len]);
        Self { data }
    }

    /// Every byte set to `byte`.
    #[inline]
    pub const fn filled(byte: u8) -> Self {
        Self {
            data: [byte; VALUE_CAP],
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; VALUE_CAP] {
        &self.data
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::ZERO
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:02x?})", &self.data[..])
    }
}

/// How many leading key bytes take part in equality and hashing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeyLayout {
    /// Last byte is a length tag and is ignored: W = `KEY_CAP - 1`.
    #[default]
    LengthTagged,
    /// The whole buffer is significant: W = `KEY_CAP`.
    Full,
}

impl KeyLayout {
    #[inline]
    pub const fn width(self) -> usize {
        match self {
            KeyLayout::LengthTagged => KEY_DATA_CAP,
            KeyLayout::Full => KEY_CAP,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyLayout::LengthTagged => "tagged",
            KeyLayout::Full => "full",
        }
    }
}

impl FromStr for KeyLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tagged" | "length-tagged" => Ok(KeyLayout::LengthTagged),
            "full" => Ok(KeyLayout::Full),
            other => Err(Error::UnknownKeyLayout(other.to_string())),
        }
    }
}

/// Comparison width plus hash algorithm, fixed for the life of an engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Codec {
    pub layout: KeyLayout,
    pub algorithm: HashAlgorithm,
}

impl Codec {
    /// Deployed configuration: length-tagged 16-byte keys hashed with FNV-1a.
    pub const DEFAULT: Codec = Codec {
        layout: KeyLayout::LengthTagged,
        algorithm: HashAlgorithm::Fnv1a,
    };

    pub const fn new(layout: KeyLayout, algorithm: HashAlgorithm) -> Self {
        Self { layout, algorithm }
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.layout.width()
    }

    /// Hash over the comparison width only.
    #[inline]
    pub fn hash(&self, key: &Key) -> u64 {
        self.algorithm.hash(&key.data[..self.width()])
    }

    #[inline]
    pub fn key_eq(&self, a: &Key, b: &Key) -> bool {
        let w = self.width();
        a.data[..w] == b.data[..w]
    }

    /// Canonical key with its hash; the form every engine stores and probes with.
    #[inline]
    pub fn prepare(&self, key: &Key) -> HashedKey {
        let w = self.width();
        let mut canonical = *key;
        canonical.data[w..].fill(0);
        HashedKey {
            hash: self.algorithm.hash(&canonical.data[..w]),
            key: canonical,
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::DEFAULT
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layout.as_str(), self.algorithm)
    }
}

/// Canonical key plus its precomputed hash.
///
/// Equality compares only the canonical bytes; `Hash` feeds
/// [`HashedKey::position`] as a single `u64` so [`PrehashedState`] can pass
/// it through unchanged.
#[derive(Copy, Clone, Debug)]
pub struct HashedKey {
    pub hash: u64,
    pub key: Key,
}

impl HashedKey {
    /// Hash that picks table positions: `hash` put through the MurmurHash3
    /// finalizer. FNV-1a's low bits only see the leading bytes of each
    /// 8-byte word, so keys sharing a prefix would share low bits.
    #[inline]
    pub fn position(&self) -> u64 {
        fmix64(self.hash)
    }
}

impl PartialEq for HashedKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.key.data == other.key.data
    }
}

impl Eq for HashedKey {}

impl Hash for HashedKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.position());
    }
}

/// `BuildHasher` for maps keyed by [`HashedKey`]: returns its position hash.
#[derive(Copy, Clone, Debug, Default)]
pub struct PrehashedState;

impl BuildHasher for PrehashedState {
    type Hasher = PrehashedHasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        PrehashedHasher(0)
    }
}

#[derive(Debug)]
pub struct PrehashedHasher(u64);

impl Hasher for PrehashedHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        debug_assert!(false, "PrehashedHasher only hashes HashedKey");
        self.0 = fmix64(self.0 ^ fnv1a(bytes));
    }

    #[inline]
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

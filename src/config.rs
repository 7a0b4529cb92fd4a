//! Engine selection and construction options.

use core::fmt;
use core::str::FromStr;

use crate::codec::{Codec, KeyLayout};
use crate::engine::AnyEngine;
use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;

/// Which concurrency strategy backs a map.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// One reader-writer lock over the whole table.
    Locked,
    /// Hash-partitioned shards, each behind its own lock.
    #[default]
    Sharded,
    /// A mutex per bucket chain.
    Striped,
    /// Lock-free open addressing with per-slot sequence locks.
    Probing,
    /// Copy-on-write snapshots read without locks.
    Snapshot,
    /// `dashmap::DashMap`.
    DashMap,
}

impl EngineKind {
    pub const ALL: [EngineKind; 6] = [
        EngineKind::Locked,
        EngineKind::Sharded,
        EngineKind::Striped,
        EngineKind::Probing,
        EngineKind::Snapshot,
        EngineKind::DashMap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Locked => "locked",
            EngineKind::Sharded => "sharded",
            EngineKind::Striped => "striped",
            EngineKind::Probing => "probing",
            EngineKind::Snapshot => "snapshot",
            EngineKind::DashMap => "dashmap",
        }
    }

    /// Stable numeric tag used across the C boundary.
    pub fn code(self) -> u32 {
        match self {
            EngineKind::Locked => 0,
            EngineKind::Sharded => 1,
            EngineKind::Striped => 2,
            EngineKind::Probing => 3,
            EngineKind::Snapshot => 4,
            EngineKind::DashMap => 5,
        }
    }

    pub fn from_code(code: u32) -> Result<Self> {
        EngineKind::ALL
            .into_iter()
            .find(|k| k.code() == code)
            .ok_or(Error::UnknownEngineCode(code))
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        EngineKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or(Error::UnknownEngine(wanted))
    }
}

/// Builder for one engine instance.
///
/// ```
/// use kvcore::{ConcurrentMap, EngineConfig, EngineKind, Key, Value};
///
/// let map = EngineConfig::new(EngineKind::Probing).capacity(1024).open().unwrap();
/// assert!(map.insert(&Key::from("a"), &Value::filled(1)));
/// assert_eq!(map.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub kind: EngineKind,
    pub capacity: usize,
    pub codec: Codec,
    /// Shard count for [`EngineKind::Sharded`]; `None` picks one from the core count.
    pub shards: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(EngineKind::default())
    }
}

impl EngineConfig {
    pub const ENV_ENGINE: &'static str = "KVCORE_ENGINE";
    pub const ENV_CAPACITY: &'static str = "KVCORE_CAPACITY";
    pub const ENV_SHARDS: &'static str = "KVCORE_SHARDS";
    pub const ENV_KEY_LAYOUT: &'static str = "KVCORE_KEY_LAYOUT";
    pub const ENV_HASH: &'static str = "KVCORE_HASH";

    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            capacity: 0,
            codec: Codec::DEFAULT,
            shards: None,
        }
    }

    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Reads `KVCORE_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`EngineConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();
        if let Some(kind) = lookup(Self::ENV_ENGINE) {
            config.kind = kind.parse()?;
        }
        if let Some(capacity) = lookup(Self::ENV_CAPACITY) {
            config.capacity = parse_number(Self::ENV_CAPACITY, &capacity)?;
        }
        if let Some(shards) = lookup(Self::ENV_SHARDS) {
            config.shards = Some(parse_number(Self::ENV_SHARDS, &shards)?);
        }
        if let Some(layout) = lookup(Self::ENV_KEY_LAYOUT) {
            config.codec.layout = layout.parse::<KeyLayout>()?;
        }
        if let Some(algorithm) = lookup(Self::ENV_HASH) {
            config.codec.algorithm = algorithm.parse::<HashAlgorithm>()?;
        }
        Ok(config)
    }

    pub fn open(&self) -> Result<AnyEngine> {
        AnyEngine::open(self)
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

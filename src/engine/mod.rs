//! Map engines. Every engine implements [`ConcurrentMap`] with identical
//! observable behavior and differs only in how it synchronizes.

pub mod dash;
pub mod locked;
pub mod probing;
pub mod sharded;
pub mod snapshot;
pub mod striped;
mod table;

pub use dash::DashMapEngine;
pub use locked::LockedEngine;
pub use probing::ProbingEngine;
pub use sharded::ShardedEngine;
pub use snapshot::SnapshotEngine;
pub use striped::StripedEngine;

use crate::codec::{Codec, Key, Value};
use crate::config::{EngineConfig, EngineKind};
use crate::error::Result;
use crate::map::ConcurrentMap;

/// An engine chosen at runtime.
pub enum AnyEngine {
    Locked(LockedEngine),
    Sharded(ShardedEngine),
    Striped(StripedEngine),
    Probing(ProbingEngine),
    Snapshot(SnapshotEngine),
    DashMap(DashMapEngine),
}

macro_rules! dispatch {
    ($self:expr, $engine:ident => $body:expr) => {
        match $self {
            AnyEngine::Locked($engine) => $body,
            AnyEngine::Sharded($engine) => $body,
            AnyEngine::Striped($engine) => $body,
            AnyEngine::Probing($engine) => $body,
            AnyEngine::Snapshot($engine) => $body,
            AnyEngine::DashMap($engine) => $body,
        }
    };
}

impl AnyEngine {
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let EngineConfig {
            kind,
            capacity,
            codec,
            shards,
        } = *config;
        let engine = match kind {
            EngineKind::Locked => AnyEngine::Locked(LockedEngine::with_capacity(capacity, codec)),
            EngineKind::Sharded => AnyEngine::Sharded(match shards {
                Some(n) => ShardedEngine::with_shards(capacity, codec, n)?,
                None => ShardedEngine::with_capacity(capacity, codec),
            }),
            EngineKind::Striped => {
                AnyEngine::Striped(StripedEngine::with_capacity(capacity, codec))
            }
            EngineKind::Probing => {
                AnyEngine::Probing(ProbingEngine::with_capacity(capacity, codec))
            }
            EngineKind::Snapshot => {
                AnyEngine::Snapshot(SnapshotEngine::with_capacity(capacity, codec))
            }
            EngineKind::DashMap => {
                AnyEngine::DashMap(DashMapEngine::with_capacity(capacity, codec))
            }
        };
        log::debug!("opened {kind} map, capacity {capacity}, codec {codec}");
        Ok(engine)
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            AnyEngine::Locked(_) => EngineKind::Locked,
            AnyEngine::Sharded(_) => EngineKind::Sharded,
            AnyEngine::Striped(_) => EngineKind::Striped,
            AnyEngine::Probing(_) => EngineKind::Probing,
            AnyEngine::Snapshot(_) => EngineKind::Snapshot,
            AnyEngine::DashMap(_) => EngineKind::DashMap,
        }
    }
}

impl core::fmt::Debug for AnyEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AnyEngine")
            .field("kind", &self.kind())
            .field("len", &self.len())
            .finish()
    }
}

impl ConcurrentMap for AnyEngine {
    /// Opens the default kind.
    fn with_capacity(capacity: usize, codec: Codec) -> Self {
        AnyEngine::Sharded(ShardedEngine::with_capacity(capacity, codec))
    }

    fn codec(&self) -> Codec {
        dispatch!(self, e => e.codec())
    }

    fn insert(&self, key: &Key, value: &Value) -> bool {
        dispatch!(self, e => e.insert(key, value))
    }

    fn get(&self, key: &Key) -> Option<Value> {
        dispatch!(self, e => e.get(key))
    }

    fn remove(&self, key: &Key) -> bool {
        dispatch!(self, e => e.remove(key))
    }

    fn update(&self, key: &Key, value: &Value) -> bool {
        dispatch!(self, e => e.update(key, value))
    }

    fn len(&self) -> usize {
        dispatch!(self, e => e.len())
    }

    fn clear(&self) {
        dispatch!(self, e => e.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn open_builds_requested_kind() {
        for kind in EngineKind::ALL {
            let m = EngineConfig::new(kind).capacity(8).open().unwrap();
            assert_eq!(m.kind(), kind);
            assert_eq!(m.codec(), Codec::DEFAULT);
            assert!(m.is_empty());
        }
    }

    #[test]
    fn dispatch_reaches_inner_engine() {
        for kind in EngineKind::ALL {
            let m = EngineConfig::new(kind).open().unwrap();
            let k = Key::from("k");
            assert!(m.insert(&k, &Value::filled(1)));
            assert!(m.contains_key(&k));
            assert!(m.update(&k, &Value::filled(2)));
            assert_eq!(m.get(&k), Some(Value::filled(2)));
            m.clear();
            assert_eq!(m.len(), 0, "{kind}");
            assert_eq!(m.get(&k), None);
        }
    }

    #[test]
    fn explicit_shard_count_is_honored() {
        let m = EngineConfig::new(EngineKind::Sharded).shards(2).open().unwrap();
        match m {
            AnyEngine::Sharded(s) => assert_eq!(s.shard_count(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}

//! Engines addressed by generational ids instead of raw pointers.
//!
//! An [`EngineId`] stays valid until its engine is destroyed; after that it
//! is rejected with [`Error::UnknownHandle`], even if the slot is reused.

use parking_lot::RwLock;
use slotmap::{DefaultKey, Key as _, KeyData, SlotMap};

use crate::codec::{Key, Value};
use crate::config::EngineConfig;
use crate::engine::AnyEngine;
use crate::error::{Error, Result};
use crate::map::ConcurrentMap;

/// Generational id of an engine in a [`Registry`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EngineId(DefaultKey);

impl EngineId {
    /// Packs index and generation into one integer for foreign callers.
    pub fn to_raw(self) -> u64 {
        self.0.data().as_ffi()
    }

    pub fn from_raw(raw: u64) -> Self {
        EngineId(KeyData::from_ffi(raw).into())
    }
}

/// Owns engines and hands out [`EngineId`]s.
///
/// Map operations hold the registry shared; `destroy` takes it exclusively,
/// so it waits for operations already in flight.
#[derive(Default)]
pub struct Registry {
    engines: RwLock<SlotMap<DefaultKey, AnyEngine>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, config: &EngineConfig) -> Result<EngineId> {
        let engine = config.open()?;
        let id = EngineId(self.engines.write().insert(engine));
        log::debug!("registered {} map as {:#x}", config.kind, id.to_raw());
        Ok(id)
    }

    /// Returns `false` for an id that is already gone.
    pub fn destroy(&self, id: EngineId) -> bool {
        let removed = self.engines.write().remove(id.0);
        if let Some(engine) = &removed {
            log::debug!(
                "destroyed {} map {:#x} holding {} entries",
                engine.kind(),
                id.to_raw(),
                engine.len()
            );
        }
        removed.is_some()
    }

    /// Runs `f` against a live engine with the registry held shared; `f`
    /// never calls back into the registry.
    fn with<R>(&self, id: EngineId, f: impl FnOnce(&AnyEngine) -> R) -> Result<R> {
        let engines = self.engines.read();
        engines.get(id.0).map(f).ok_or(Error::UnknownHandle)
    }

    pub fn insert(&self, id: EngineId, key: &Key, value: &Value) -> Result<bool> {
        self.with(id, |e| e.insert(key, value))
    }

    pub fn get(&self, id: EngineId, key: &Key) -> Result<Option<Value>> {
        self.with(id, |e| e.get(key))
    }

    pub fn remove(&self, id: EngineId, key: &Key) -> Result<bool> {
        self.with(id, |e| e.remove(key))
    }

    pub fn update(&self, id: EngineId, key: &Key, value: &Value) -> Result<bool> {
        self.with(id, |e| e.update(key, value))
    }

    pub fn len(&self, id: EngineId) -> Result<usize> {
        self.with(id, |e| e.len())
    }

    /// Number of live engines.
    pub fn engine_count(&self) -> usize {
        self.engines.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineKind;

    #[test]
    fn raw_id_round_trips() {
        let r = Registry::new();
        let id = r.create(&EngineConfig::new(EngineKind::Locked)).unwrap();
        assert_eq!(EngineId::from_raw(id.to_raw()), id);
    }

    #[test]
    fn stale_id_is_rejected_after_slot_reuse() {
        let r = Registry::new();
        let old = r.create(&EngineConfig::new(EngineKind::Striped)).unwrap();
        assert!(r.destroy(old));
        assert!(!r.destroy(old));

        let new = r.create(&EngineConfig::new(EngineKind::Striped)).unwrap();
        assert_ne!(old, new);
        assert_eq!(r.len(old), Err(Error::UnknownHandle));
        assert_eq!(r.insert(old, &Key::from("k"), &Value::ZERO), Err(Error::UnknownHandle));
        assert_eq!(r.len(new), Ok(0));
        assert_eq!(r.engine_count(), 1);
    }

    #[test]
    fn operations_on_one_engine_leave_registry_usable() {
        let r = Registry::new();
        let id = r.create(&EngineConfig::new(EngineKind::Locked)).unwrap();
        assert_eq!(r.insert(id, &Key::from("k"), &Value::ZERO), Ok(true));
        let other = r.create(&EngineConfig::new(EngineKind::Locked)).unwrap();
        assert_eq!(r.get(id, &Key::from("k")), Ok(Some(Value::ZERO)));
        assert!(r.destroy(other));
        assert_eq!(r.len(id), Ok(1));
    }

    #[test]
    fn garbage_raw_id_is_unknown() {
        let r = Registry::new();
        assert_eq!(r.get(EngineId::from_raw(0xdead_beef), &Key::from("k")), Err(Error::UnknownHandle));
    }

    #[test]
    fn create_propagates_config_errors() {
        let r = Registry::new();
        let err = r.create(&EngineConfig::new(EngineKind::Sharded).shards(6));
        assert_eq!(err, Err(Error::InvalidShardCount(6)));
        assert_eq!(r.engine_count(), 0);
    }
}

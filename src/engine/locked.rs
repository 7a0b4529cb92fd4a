//! One reader-writer lock around the whole table.

use parking_lot::RwLock;

use super::table::Table;
use crate::codec::{Codec, Key, Value};
use crate::map::ConcurrentMap;

/// Baseline engine: shared lock for lookups, exclusive lock for writes.
pub struct LockedEngine {
    codec: Codec,
    table: RwLock<Table>,
}

impl ConcurrentMap for LockedEngine {
    fn with_capacity(capacity: usize, codec: Codec) -> Self {
        Self {
            codec,
            table: RwLock::new(Table::with_capacity(capacity)),
        }
    }

    fn codec(&self) -> Codec {
        self.codec
    }

    fn insert(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        self.table.write().insert(key, *value)
    }

    fn get(&self, key: &Key) -> Option<Value> {
        let key = self.codec.prepare(key);
        self.table.read().get(&key).copied()
    }

    fn remove(&self, key: &Key) -> bool {
        let key = self.codec.prepare(key);
        self.table.write().remove(&key)
    }

    fn update(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        self.table.write().update(key, *value)
    }

    fn len(&self) -> usize {
        self.table.read().len()
    }

    fn clear(&self) {
        self.table.write().clear();
    }
}

//! Copy-on-write snapshots.
//!
//! Readers clone the current `Arc<Table>` under a momentary shared lock and
//! search it with no lock held. Writers are serialized by the exclusive lock
//! and go through `Arc::make_mut`, which copies the table only while some
//! reader still holds the previous snapshot. A published snapshot is never
//! mutated.

use std::sync::Arc;

use parking_lot::RwLock;

use super::table::Table;
use crate::codec::{Codec, Key, Value};
use crate::map::ConcurrentMap;

pub struct SnapshotEngine {
    codec: Codec,
    current: RwLock<Arc<Table>>,
}

impl SnapshotEngine {
    /// Point-in-time view; later writes never show up in it.
    fn snapshot(&self) -> Arc<Table> {
        Arc::clone(&*self.current.read())
    }
}

/// Writable table, copied first if a reader still holds it.
fn table_mut(current: &mut Arc<Table>) -> &mut Table {
    if Arc::strong_count(current) > 1 {
        log::trace!("snapshot map copying {} entries", current.len());
    }
    Arc::make_mut(current)
}

impl ConcurrentMap for SnapshotEngine {
    fn with_capacity(capacity: usize, codec: Codec) -> Self {
        Self {
            codec,
            current: RwLock::new(Arc::new(Table::with_capacity(capacity))),
        }
    }

    fn codec(&self) -> Codec {
        self.codec
    }

    fn insert(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        let mut current = self.current.write();
        // Rejected inserts must not force a copy.
        if current.contains(&key) {
            return false;
        }
        table_mut(&mut current).insert(key, *value)
    }

    fn get(&self, key: &Key) -> Option<Value> {
        let key = self.codec.prepare(key);
        self.snapshot().get(&key).copied()
    }

    fn remove(&self, key: &Key) -> bool {
        let key = self.codec.prepare(key);
        let mut current = self.current.write();
        if !current.contains(&key) {
            return false;
        }
        table_mut(&mut current).remove(&key)
    }

    fn update(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        table_mut(&mut self.current.write()).update(key, *value)
    }

    fn len(&self) -> usize {
        self.current.read().len()
    }

    fn clear(&self) {
        *self.current.write() = Arc::new(Table::default());
    }
}

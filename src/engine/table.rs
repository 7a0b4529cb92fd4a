//! Single-threaded table used by the lock-based and copy-on-write engines.
//!
//! Each slot keeps the key's precomputed hash, so the table never rehashes
//! through the codec when it grows. Positions come from
//! [`HashedKey::position`], not the raw codec hash.

use hashbrown::hash_table::Entry;
use hashbrown::HashTable;

use crate::codec::{HashedKey, Value};

#[derive(Copy, Clone, Debug)]
pub(crate) struct Slot {
    pub(crate) key: HashedKey,
    pub(crate) value: Value,
}

#[derive(Clone, Default)]
pub(crate) struct Table {
    index: HashTable<Slot>,
}

impl Table {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashTable::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub(crate) fn get(&self, key: &HashedKey) -> Option<&Value> {
        self.index
            .find(key.position(), |s| s.key == *key)
            .map(|s| &s.value)
    }

    #[inline]
    pub(crate) fn contains(&self, key: &HashedKey) -> bool {
        self.get(key).is_some()
    }

    /// Adds the entry unless the key is present.
    pub(crate) fn insert(&mut self, key: HashedKey, value: Value) -> bool {
        match self
            .index
            .entry(key.position(), |s| s.key == key, |s| s.key.position())
        {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(Slot { key, value });
                true
            }
        }
    }

    /// Writes the value; returns whether an entry was overwritten.
    pub(crate) fn update(&mut self, key: HashedKey, value: Value) -> bool {
        match self
            .index
            .entry(key.position(), |s| s.key == key, |s| s.key.position())
        {
            Entry::Occupied(mut o) => {
                o.get_mut().value = value;
                true
            }
            Entry::Vacant(v) => {
                v.insert(Slot { key, value });
                false
            }
        }
    }

    pub(crate) fn remove(&mut self, key: &HashedKey) -> bool {
        match self.index.find_entry(key.position(), |s| s.key == *key) {
            Ok(o) => {
                let _ = o.remove();
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
    }
}

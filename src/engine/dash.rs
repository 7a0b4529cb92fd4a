//! Forwards to `dashmap::DashMap`, keyed by prehashed canonical keys.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::codec::{Codec, HashedKey, Key, PrehashedState, Value};
use crate::map::ConcurrentMap;

pub struct DashMapEngine {
    codec: Codec,
    map: DashMap<HashedKey, Value, PrehashedState>,
}

impl ConcurrentMap for DashMapEngine {
    fn with_capacity(capacity: usize, codec: Codec) -> Self {
        Self {
            codec,
            map: DashMap::with_capacity_and_hasher(capacity, PrehashedState),
        }
    }

    fn codec(&self) -> Codec {
        self.codec
    }

    fn insert(&self, key: &Key, value: &Value) -> bool {
        match self.map.entry(self.codec.prepare(key)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(*value);
                true
            }
        }
    }

    fn get(&self, key: &Key) -> Option<Value> {
        self.map.get(&self.codec.prepare(key)).map(|r| *r.value())
    }

    fn remove(&self, key: &Key) -> bool {
        self.map.remove(&self.codec.prepare(key)).is_some()
    }

    fn update(&self, key: &Key, value: &Value) -> bool {
        self.map.insert(self.codec.prepare(key), *value).is_some()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&self) {
        self.map.clear();
    }
}

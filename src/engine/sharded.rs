//! Keyspace partitioned over independently locked shards.
//!
//! A key's shard comes from bits 40.. of its position hash, away from the low
//! bits the per-shard table indexes with and the top bits it uses as tags.

use parking_lot::RwLock;

use super::table::Table;
use crate::codec::{Codec, HashedKey, Key, Value};
use crate::error::{Error, Result};
use crate::map::ConcurrentMap;

const SHARD_HASH_SHIFT: u32 = 40;

/// Default shard count: four per available core, rounded up to a power of two.
pub fn default_shard_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores * 4).next_power_of_two()
}

pub struct ShardedEngine {
    codec: Codec,
    shards: Box<[RwLock<Table>]>,
    mask: usize,
}

impl ShardedEngine {
    /// `shards` must be a non-zero power of two.
    pub fn with_shards(capacity: usize, codec: Codec, shards: usize) -> Result<Self> {
        if shards == 0 || !shards.is_power_of_two() {
            return Err(Error::InvalidShardCount(shards));
        }
        Ok(Self::build(capacity, codec, shards))
    }

    fn build(capacity: usize, codec: Codec, shards: usize) -> Self {
        let per_shard = capacity.div_ceil(shards);
        let shards: Box<[RwLock<Table>]> = (0..shards)
            .map(|_| RwLock::new(Table::with_capacity(per_shard)))
            .collect();
        let mask = shards.len() - 1;
        Self {
            codec,
            shards,
            mask,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard(&self, key: &HashedKey) -> &RwLock<Table> {
        let idx = (key.position() >> SHARD_HASH_SHIFT) as usize & self.mask;
        &self.shards[idx]
    }
}

impl ConcurrentMap for ShardedEngine {
    fn with_capacity(capacity: usize, codec: Codec) -> Self {
        Self::build(capacity, codec, default_shard_count())
    }

    fn codec(&self) -> Codec {
        self.codec
    }

    fn insert(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        self.shard(&key).write().insert(key, *value)
    }

    fn get(&self, key: &Key) -> Option<Value> {
        let key = self.codec.prepare(key);
        self.shard(&key).read().get(&key).copied()
    }

    fn remove(&self, key: &Key) -> bool {
        let key = self.codec.prepare(key);
        self.shard(&key).write().remove(&key)
    }

    fn update(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        self.shard(&key).write().update(key, *value)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().clear();
        }
    }
}

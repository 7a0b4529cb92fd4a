//! Fine-grained locking: one mutex per bucket chain.
//!
//! Operations hold the bucket array shared and lock a single chain. The array
//! itself is only taken exclusively to double the bucket count.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use super::table::Slot;
use crate::codec::{Codec, Key, Value};
use crate::map::ConcurrentMap;

const MIN_BUCKETS: usize = 16;
/// Average chain length that triggers growth.
const MAX_LOAD: usize = 2;

type Chain = Mutex<Vec<Slot>>;

fn new_buckets(count: usize) -> Box<[Chain]> {
    (0..count).map(|_| Mutex::new(Vec::new())).collect()
}

#[inline]
fn bucket_index(hash: u64, count: usize) -> usize {
    hash as usize & (count - 1)
}

pub struct StripedEngine {
    codec: Codec,
    buckets: RwLock<Box<[Chain]>>,
    len: AtomicUsize,
}

impl StripedEngine {
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }

    /// Length of the longest bucket chain; stays small when keys spread.
    pub fn longest_chain(&self) -> usize {
        let buckets = self.buckets.read();
        buckets.iter().map(|c| c.lock().len()).max().unwrap_or(0)
    }

    /// Doubles the bucket array unless another thread already grew it past
    /// `seen`.
    fn grow(&self, seen: usize) {
        let mut buckets = self.buckets.write();
        if buckets.len() != seen {
            return;
        }
        let count = seen * 2;
        let mut next = new_buckets(count);
        for chain in buckets.iter_mut() {
            for slot in chain.get_mut().drain(..) {
                next[bucket_index(slot.key.position(), count)].get_mut().push(slot);
            }
        }
        log::trace!("striped map grew from {seen} to {count} buckets");
        *buckets = next;
    }

    /// Counts a new entry; returns the bucket count to grow from, if due.
    #[inline]
    fn note_added(&self, bucket_count: usize) -> Option<usize> {
        let len = self.len.fetch_add(1, Ordering::Relaxed) + 1;
        (len > bucket_count * MAX_LOAD).then_some(bucket_count)
    }
}

impl ConcurrentMap for StripedEngine {
    fn with_capacity(capacity: usize, codec: Codec) -> Self {
        let count = (capacity / MAX_LOAD + 1)
            .next_power_of_two()
            .max(MIN_BUCKETS);
        Self {
            codec,
            buckets: RwLock::new(new_buckets(count)),
            len: AtomicUsize::new(0),
        }
    }

    fn codec(&self) -> Codec {
        self.codec
    }

    fn insert(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        let grow_from = {
            let buckets = self.buckets.read();
            let mut chain = buckets[bucket_index(key.position(), buckets.len())].lock();
            if chain.iter().any(|s| s.key == key) {
                return false;
            }
            chain.push(Slot { key, value: *value });
            self.note_added(buckets.len())
        };
        if let Some(seen) = grow_from {
            self.grow(seen);
        }
        true
    }

    fn get(&self, key: &Key) -> Option<Value> {
        let key = self.codec.prepare(key);
        let buckets = self.buckets.read();
        let chain = buckets[bucket_index(key.position(), buckets.len())].lock();
        chain.iter().find(|s| s.key == key).map(|s| s.value)
    }

    fn remove(&self, key: &Key) -> bool {
        let key = self.codec.prepare(key);
        let buckets = self.buckets.read();
        let mut chain = buckets[bucket_index(key.position(), buckets.len())].lock();
        match chain.iter().position(|s| s.key == key) {
            Some(pos) => {
                chain.swap_remove(pos);
                self.len.fetch_sub(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn update(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        let grow_from = {
            let buckets = self.buckets.read();
            let mut chain = buckets[bucket_index(key.position(), buckets.len())].lock();
            if let Some(slot) = chain.iter_mut().find(|s| s.key == key) {
                slot.value = *value;
                return true;
            }
            chain.push(Slot { key, value: *value });
            self.note_added(buckets.len())
        };
        if let Some(seen) = grow_from {
            self.grow(seen);
        }
        false
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        let mut buckets = self.buckets.write();
        for chain in buckets.iter_mut() {
            chain.get_mut().clear();
        }
        self.len.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn grows_past_capacity_hint() {
        let m = StripedEngine::with_capacity(0, Codec::DEFAULT);
        let start = m.bucket_count();
        assert_eq!(start, MIN_BUCKETS);
        for i in 0..1_000u32 {
            assert!(m.insert(&Key::from_bytes(&i.to_le_bytes()), &Value::filled(i as u8)));
        }
        assert!(m.bucket_count() > start);
        assert_eq!(m.len(), 1_000);
        for i in 0..1_000u32 {
            assert_eq!(
                m.get(&Key::from_bytes(&i.to_le_bytes())),
                Some(Value::filled(i as u8))
            );
        }
    }

    #[test]
    fn shared_prefix_keys_spread_over_buckets() {
        let m = StripedEngine::with_capacity(0, Codec::DEFAULT);
        for i in 0..10_000 {
            assert!(m.insert(&Key::from_bytes(format!("key-{i}").as_bytes()), &Value::ZERO));
        }
        assert!(m.longest_chain() <= 16, "longest chain {}", m.longest_chain());
    }

    #[test]
    fn stale_grow_request_is_ignored() {
        let m = StripedEngine::with_capacity(0, Codec::DEFAULT);
        m.grow(MIN_BUCKETS);
        assert_eq!(m.bucket_count(), MIN_BUCKETS * 2);
        m.grow(MIN_BUCKETS);
        assert_eq!(m.bucket_count(), MIN_BUCKETS * 2);
    }
}

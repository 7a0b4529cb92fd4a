//! Open addressing with lock-free linear probing.
//!
//! A slot is claimed by CAS on its meta word and keeps its key for the life
//! of the table; removing an entry only marks the slot dead, and the same key
//! can later revive it. Slots never return to empty, so a probe for a key can
//! stop at the first empty slot it meets.
//!
//! Values are 48 bytes and cannot be swapped in one atomic step, so the meta
//! word doubles as a sequence lock: a writer sets `LOCKED`, stores the value
//! words and publishes a new version; a reader copies the words and retries
//! if the meta word moved underneath it.
//!
//! Once claimed slots pass 3/4 of the table, the table is rebuilt without its
//! dead slots. Operations hold the table lock shared; only the rebuild takes
//! it exclusively.
//!
//! Meta word layout: bits 0-1 state, bit 2 `LOCKED`, bits 3.. version.

use std::sync::atomic::{fence, AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::codec::{Codec, HashedKey, Key, Value, KEY_CAP, VALUE_CAP};
use crate::map::ConcurrentMap;

const KEY_WORDS: usize = KEY_CAP / 8;
const VALUE_WORDS: usize = VALUE_CAP / 8;
const _: () = assert!(KEY_CAP % 8 == 0 && VALUE_CAP % 8 == 0);

const STATE_MASK: u64 = 0b011;
const EMPTY: u64 = 0;
const LIVE: u64 = 1;
const DEAD: u64 = 2;
const LOCKED: u64 = 0b100;
const VERSION: u64 = 0b1000;

const MIN_SLOTS: usize = 16;

#[inline]
fn state(meta: u64) -> u64 {
    meta & STATE_MASK
}

#[inline]
fn is_locked(meta: u64) -> bool {
    meta & LOCKED != 0
}

/// Unlocked meta word one version past `meta`, in `state`.
#[inline]
fn advance(meta: u64, state: u64) -> u64 {
    (meta & !(STATE_MASK | LOCKED)).wrapping_add(VERSION) | state
}

#[inline]
fn word(chunk: &[u8]) -> u64 {
    let mut w = [0u8; 8];
    w.copy_from_slice(chunk);
    u64::from_ne_bytes(w)
}

/// Slot count whose 3/4 load ceiling fits `entries`.
fn slots_for(entries: usize) -> usize {
    (entries.saturating_mul(4) / 3 + 1)
        .next_power_of_two()
        .max(MIN_SLOTS)
}

const SPIN_LIMIT: u32 = 6;
const YIELD_LIMIT: u32 = 10;

/// Exponential spin, then yield to the scheduler.
struct Backoff {
    step: u32,
}

impl Backoff {
    #[inline]
    fn new() -> Self {
        Self { step: 0 }
    }

    #[inline]
    fn snooze(&mut self) {
        if self.step <= SPIN_LIMIT {
            for _ in 0..(1 << self.step) {
                core::hint::spin_loop();
            }
        } else {
            std::thread::yield_now();
        }
        if self.step <= YIELD_LIMIT {
            self.step += 1;
        }
    }
}

struct Slot {
    meta: AtomicU64,
    hash: AtomicU64,
    key: [AtomicU64; KEY_WORDS],
    value: [AtomicU64; VALUE_WORDS],
}

impl Slot {
    fn new() -> Self {
        Self {
            meta: AtomicU64::new(EMPTY),
            hash: AtomicU64::new(0),
            key: std::array::from_fn(|_| AtomicU64::new(0)),
            value: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    // Key words are written once, before the claiming thread publishes the
    // slot with a release store; readers acquire the meta word first.
    fn write_key(&self, key: &HashedKey) {
        self.hash.store(key.hash, Ordering::Relaxed);
        for (w, chunk) in self.key.iter().zip(key.key.data.chunks_exact(8)) {
            w.store(word(chunk), Ordering::Relaxed);
        }
    }

    fn key_matches(&self, key: &HashedKey) -> bool {
        self.hash.load(Ordering::Relaxed) == key.hash
            && self
                .key
                .iter()
                .zip(key.key.data.chunks_exact(8))
                .all(|(w, chunk)| w.load(Ordering::Relaxed) == word(chunk))
    }

    fn read_key(&self) -> HashedKey {
        let mut data = [0u8; KEY_CAP];
        for (w, chunk) in self.key.iter().zip(data.chunks_exact_mut(8)) {
            chunk.copy_from_slice(&w.load(Ordering::Relaxed).to_ne_bytes());
        }
        HashedKey {
            hash: self.hash.load(Ordering::Relaxed),
            key: Key::new(data),
        }
    }

    fn write_value(&self, value: &Value) {
        for (w, chunk) in self.value.iter().zip(value.data.chunks_exact(8)) {
            w.store(word(chunk), Ordering::Relaxed);
        }
    }

    fn read_value(&self) -> Value {
        let mut data = [0u8; VALUE_CAP];
        for (w, chunk) in self.value.iter().zip(data.chunks_exact_mut(8)) {
            chunk.copy_from_slice(&w.load(Ordering::Relaxed).to_ne_bytes());
        }
        Value::new(data)
    }

    /// Consistent copy of a live value, or `None` if the slot is dead.
    fn load_value(&self) -> Option<Value> {
        let mut backoff = Backoff::new();
        loop {
            let before = self.meta.load(Ordering::Acquire);
            if is_locked(before) {
                backoff.snooze();
                continue;
            }
            if state(before) != LIVE {
                return None;
            }
            let value = self.read_value();
            fence(Ordering::Acquire);
            if self.meta.load(Ordering::Relaxed) == before {
                return Some(value);
            }
        }
    }

    /// Sets `LOCKED` on `meta`; the caller must publish with `advance`.
    #[inline]
    fn try_lock(&self, meta: u64) -> bool {
        if self
            .meta
            .compare_exchange_weak(meta, meta | LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            // Order the lock bit before the value stores for readers.
            fence(Ordering::Release);
            true
        } else {
            false
        }
    }
}

enum Claim<'a> {
    Found(&'a Slot),
    /// Freshly claimed empty slot; holds `LOCKED` with the given meta word.
    Claimed(&'a Slot, u64),
    Full,
}

struct Table {
    slots: Box<[Slot]>,
    mask: usize,
    claimed: AtomicUsize,
    max_claimed: usize,
    generation: u64,
}

impl Table {
    fn new(slot_count: usize, generation: u64) -> Self {
        debug_assert!(slot_count.is_power_of_two());
        Self {
            slots: (0..slot_count).map(|_| Slot::new()).collect(),
            mask: slot_count - 1,
            claimed: AtomicUsize::new(0),
            max_claimed: slot_count / 4 * 3,
            generation,
        }
    }

    #[inline]
    fn has_room(&self) -> bool {
        self.claimed.load(Ordering::Relaxed) < self.max_claimed
    }

    fn find(&self, key: &HashedKey) -> Option<&Slot> {
        let mut idx = key.position() as usize & self.mask;
        for _ in 0..self.slots.len() {
            let slot = &self.slots[idx];
            let mut backoff = Backoff::new();
            loop {
                let meta = slot.meta.load(Ordering::Acquire);
                if state(meta) != EMPTY {
                    break;
                }
                if !is_locked(meta) {
                    return None;
                }
                // Claimed but the key is not published yet; it may be ours.
                backoff.snooze();
            }
            if slot.key_matches(key) {
                return Some(slot);
            }
            idx = (idx + 1) & self.mask;
        }
        None
    }

    fn find_or_claim(&self, key: &HashedKey) -> Claim<'_> {
        let mut idx = key.position() as usize & self.mask;
        for _ in 0..self.slots.len() {
            let slot = &self.slots[idx];
            let mut backoff = Backoff::new();
            loop {
                let meta = slot.meta.load(Ordering::Acquire);
                if state(meta) != EMPTY {
                    break;
                }
                if is_locked(meta) {
                    backoff.snooze();
                    continue;
                }
                if slot
                    .meta
                    .compare_exchange(meta, meta | LOCKED, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    self.claimed.fetch_add(1, Ordering::Relaxed);
                    return Claim::Claimed(slot, meta | LOCKED);
                }
            }
            if slot.key_matches(key) {
                return Claim::Found(slot);
            }
            idx = (idx + 1) & self.mask;
        }
        Claim::Full
    }

    /// Slots examined to find `key`, counting the hit.
    #[cfg(test)]
    fn probe_len(&self, key: &HashedKey) -> Option<usize> {
        let mut idx = key.position() as usize & self.mask;
        for n in 1..=self.slots.len() {
            let slot = &self.slots[idx];
            if state(slot.meta.load(Ordering::Acquire)) == EMPTY {
                return None;
            }
            if slot.key_matches(key) {
                return Some(n);
            }
            idx = (idx + 1) & self.mask;
        }
        None
    }

    /// Single-threaded placement used while rebuilding.
    fn place(&mut self, key: &HashedKey, value: &Value) {
        let mut idx = key.position() as usize & self.mask;
        loop {
            let slot = &mut self.slots[idx];
            if state(*slot.meta.get_mut()) == EMPTY {
                slot.write_key(key);
                slot.write_value(value);
                *slot.meta.get_mut() = VERSION | LIVE;
                *self.claimed.get_mut() += 1;
                return;
            }
            idx = (idx + 1) & self.mask;
        }
    }
}

pub struct ProbingEngine {
    codec: Codec,
    table: RwLock<Table>,
    len: AtomicUsize,
}

impl ProbingEngine {
    pub fn slot_count(&self) -> usize {
        self.table.read().slots.len()
    }

    /// Rebuilds the table unless another thread already did since `seen`.
    fn grow(&self, seen: u64) {
        let mut table = self.table.write();
        if table.generation != seen {
            return;
        }
        let live = self.len.load(Ordering::Relaxed);
        let slot_count = slots_for(live + live / 2 + 1);
        let mut next = Table::new(slot_count, seen + 1);
        for slot in table.slots.iter() {
            if state(slot.meta.load(Ordering::Relaxed)) == LIVE {
                next.place(&slot.read_key(), &slot.read_value());
            }
        }
        log::trace!(
            "probing map rebuilt: {} -> {} slots, {} live",
            table.slots.len(),
            slot_count,
            live
        );
        *table = next;
    }

    /// Publishes a freshly claimed slot as live.
    fn fill(&self, slot: &Slot, meta: u64, key: &HashedKey, value: &Value) {
        slot.write_key(key);
        slot.write_value(value);
        // Count before publishing so a remover can never decrement first.
        self.len.fetch_add(1, Ordering::Relaxed);
        slot.meta.store(advance(meta, LIVE), Ordering::Release);
    }

    /// Insert into an existing slot: succeeds only if the slot is dead.
    fn revive(&self, slot: &Slot, value: &Value) -> bool {
        let mut backoff = Backoff::new();
        loop {
            let meta = slot.meta.load(Ordering::Acquire);
            if is_locked(meta) {
                backoff.snooze();
                continue;
            }
            if state(meta) == LIVE {
                return false;
            }
            if slot.try_lock(meta) {
                slot.write_value(value);
                self.len.fetch_add(1, Ordering::Relaxed);
                slot.meta.store(advance(meta, LIVE), Ordering::Release);
                return true;
            }
        }
    }

    /// Unconditional write into an existing slot; returns whether it was live.
    fn overwrite(&self, slot: &Slot, value: &Value) -> bool {
        let mut backoff = Backoff::new();
        loop {
            let meta = slot.meta.load(Ordering::Relaxed);
            if is_locked(meta) {
                backoff.snooze();
                continue;
            }
            if slot.try_lock(meta) {
                let was_live = state(meta) == LIVE;
                slot.write_value(value);
                if !was_live {
                    self.len.fetch_add(1, Ordering::Relaxed);
                }
                slot.meta.store(advance(meta, LIVE), Ordering::Release);
                return was_live;
            }
        }
    }

    fn kill(&self, slot: &Slot) -> bool {
        let mut backoff = Backoff::new();
        loop {
            let meta = slot.meta.load(Ordering::Acquire);
            if is_locked(meta) {
                backoff.snooze();
                continue;
            }
            if state(meta) != LIVE {
                return false;
            }
            if slot
                .meta
                .compare_exchange_weak(
                    meta,
                    advance(meta, DEAD),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                self.len.fetch_sub(1, Ordering::Relaxed);
                return true;
            }
        }
    }
}

impl ConcurrentMap for ProbingEngine {
    fn with_capacity(capacity: usize, codec: Codec) -> Self {
        Self {
            codec,
            table: RwLock::new(Table::new(slots_for(capacity), 0)),
            len: AtomicUsize::new(0),
        }
    }

    fn codec(&self) -> Codec {
        self.codec
    }

    fn insert(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        loop {
            let seen = {
                let table = self.table.read();
                if !table.has_room() {
                    table.generation
                } else {
                    match table.find_or_claim(&key) {
                        Claim::Found(slot) => return self.revive(slot, value),
                        Claim::Claimed(slot, meta) => {
                            self.fill(slot, meta, &key, value);
                            return true;
                        }
                        Claim::Full => table.generation,
                    }
                }
            };
            self.grow(seen);
        }
    }

    fn get(&self, key: &Key) -> Option<Value> {
        let key = self.codec.prepare(key);
        let table = self.table.read();
        table.find(&key).and_then(Slot::load_value)
    }

    fn remove(&self, key: &Key) -> bool {
        let key = self.codec.prepare(key);
        let table = self.table.read();
        match table.find(&key) {
            Some(slot) => self.kill(slot),
            None => false,
        }
    }

    fn update(&self, key: &Key, value: &Value) -> bool {
        let key = self.codec.prepare(key);
        loop {
            let seen = {
                let table = self.table.read();
                if !table.has_room() {
                    table.generation
                } else {
                    match table.find_or_claim(&key) {
                        Claim::Found(slot) => return self.overwrite(slot, value),
                        Claim::Claimed(slot, meta) => {
                            self.fill(slot, meta, &key, value);
                            return false;
                        }
                        Claim::Full => table.generation,
                    }
                }
            };
            self.grow(seen);
        }
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        let mut table = self.table.write();
        let slot_count = table.slots.len();
        let generation = table.generation + 1;
        *table = Table::new(slot_count, generation);
        self.len.store(0, Ordering::Relaxed);
    }
}

//! The operation contract shared by every engine.

use crate::codec::{Codec, Key, Value};

/// A thread-safe map from [`Key`] to [`Value`].
///
/// Every implementation, whatever its locking or lock-free strategy, gives
/// the same observable behaviour:
///
/// - `insert` adds the entry only when no equal key is present. It returns
///   `false` and leaves the table untouched otherwise.
/// - `get` returns a value that was current at some instant during the call,
///   never a mix of two writers' bytes.
/// - `remove` returns whether an entry was present; retrying is harmless.
/// - `update` writes unconditionally and returns `true` iff it overwrote an
///   existing entry (`false` means the entry was created).
/// - `len` may lag under concurrent mutation but is exact once mutation stops.
///
/// Operations on one key are linearizable. Key equality and hashing come from
/// the [`Codec`] the map was built with.
pub trait ConcurrentMap: Send + Sync {
    /// Builds an empty map. `capacity` is a sizing hint, never a limit.
    fn with_capacity(capacity: usize, codec: Codec) -> Self
    where
        Self: Sized;

    fn codec(&self) -> Codec;

    fn insert(&self, key: &Key, value: &Value) -> bool;

    fn get(&self, key: &Key) -> Option<Value>;

    fn remove(&self, key: &Key) -> bool;

    fn update(&self, key: &Key, value: &Value) -> bool;

    fn len(&self) -> usize;

    /// Drops every entry.
    fn clear(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains_key(&self, key: &Key) -> bool {
        self.get(key).is_some()
    }
}

//! kvcore: fixed-width concurrent key-value maps for a cache server, with
//! several interchangeable engines behind one contract.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: let the server pick the fastest concurrency strategy
//!   empirically while every strategy keeps identical observable
//!   behaviour.
//! - Layers:
//!   - `codec`: 16-byte keys and 48-byte values, plus the [`Codec`] that
//!     fixes the comparison width and hash algorithm for one engine.
//!   - `hash`: FNV-1a and MurmurHash3 over byte spans and `u64`s.
//!   - [`ConcurrentMap`]: the operation contract (insert, get, remove,
//!     update, len).
//!   - `engine`: one type per strategy, plus [`AnyEngine`] for runtime
//!     selection.
//!   - `ffi` and [`Registry`]: opaque pointer handles and generational
//!     ids for callers across a boundary.
//!
//! Engines
//! - [`LockedEngine`]: one reader-writer lock over a single table.
//! - [`ShardedEngine`]: power-of-two shards, each its own locked table.
//! - [`StripedEngine`]: a mutex per bucket chain.
//! - [`ProbingEngine`]: lock-free linear probing with per-slot sequence
//!   locks; readers never block writers.
//! - [`SnapshotEngine`]: copy-on-write tables; readers take a snapshot and
//!   search it unlocked.
//! - [`DashMapEngine`]: `dashmap::DashMap`.
//!
//! Key equality and hashing
//! - Engines store the canonical form of each key (bytes past the
//!   comparison width zeroed) together with its hash, computed once per
//!   call. Equal keys therefore always hash equally, and no engine ever
//!   rehashes stored keys.
//! - The default codec treats the last key byte as a length tag that does
//!   not take part in equality, and hashes with FNV-1a.
//!
//! Update polarity
//! - `update` returns `true` iff it overwrote an existing entry, and
//!   `false` when it created one. Every engine is tested for this.
//!
//! Notes and non-goals
//! - No eviction, expiry, iteration, or persistence; those belong to the
//!   surrounding server.
//! - Capacity is a hint. Every engine grows instead of failing.
//! - Allocation failure aborts; it is not reported as an error.

pub mod codec;
pub mod config;
pub mod engine;
mod error;
pub mod ffi;
pub mod hash;
mod map;
pub mod registry;

#[cfg(test)]
mod engine_proptest;

// Public surface
pub use codec::{Codec, HashedKey, Key, KeyLayout, Value, KEY_CAP, VALUE_CAP};
pub use config::{EngineConfig, EngineKind};
pub use engine::{
    AnyEngine, DashMapEngine, LockedEngine, ProbingEngine, ShardedEngine, SnapshotEngine,
    StripedEngine,
};
pub use error::{Error, Result};
pub use hash::HashAlgorithm;
pub use map::ConcurrentMap;
pub use registry::{EngineId, Registry};

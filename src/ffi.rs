//! C ABI over the engines.
//!
//! Each engine gets the same seven symbols, `kv_<kind>_create` through
//! `kv_<kind>_size`. A handle is an owning pointer to one engine built with
//! [`Codec::DEFAULT`]. `kv_open` picks the engine by its numeric code and
//! returns a handle for the `kv_any_*` family.
//!
//! Keys and values cross the boundary as fixed-width `#[repr(C)]` buffers.
//! Lookups write `*out` only on a hit.
//!
//! # Safety
//!
//! Every handle passed in must come from the matching `create` (or
//! `kv_open` for `kv_any_*`) and must not have been destroyed. Destroying a
//! handle while another thread still uses it is undefined behavior. Key,
//! value, and output pointers must be valid and aligned for their type.

use crate::codec::{Codec, Key, Value};
use crate::config::{EngineConfig, EngineKind};
use crate::engine::{
    AnyEngine, DashMapEngine, LockedEngine, ProbingEngine, ShardedEngine, SnapshotEngine,
    StripedEngine,
};
use crate::map::ConcurrentMap;

#[inline]
fn into_handle<E: ConcurrentMap>(engine: E) -> *mut E {
    Box::into_raw(Box::new(engine))
}

/// # Safety
/// `handle` is null or a live handle that nothing else is using.
#[inline]
unsafe fn drop_handle<E: ConcurrentMap>(handle: *mut E) {
    if handle.is_null() {
        return;
    }
    let engine = unsafe { Box::from_raw(handle) };
    log::debug!("destroying map handle holding {} entries", engine.len());
}

/// # Safety
/// `out` is valid for writes.
#[inline]
unsafe fn write_hit(found: Option<Value>, out: *mut Value) -> bool {
    match found {
        Some(value) => {
            unsafe { out.write(value) };
            true
        }
        None => false,
    }
}

#[inline]
fn size_of_map(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

macro_rules! export_engine {
    (
        $engine:ty,
        $create:ident,
        $destroy:ident,
        $insert:ident,
        $get:ident,
        $remove:ident,
        $update:ident,
        $size:ident
    ) => {
        /// Allocates an empty map; `capacity` is a hint and may be zero.
        #[no_mangle]
        pub extern "C" fn $create(capacity: usize) -> *mut $engine {
            log::debug!("creating {} with capacity {capacity}", stringify!($engine));
            into_handle(<$engine>::with_capacity(capacity, Codec::DEFAULT))
        }

        /// Releases the map. Null is ignored.
        ///
        /// # Safety
        /// See the module documentation.
        #[no_mangle]
        pub unsafe extern "C" fn $destroy(handle: *mut $engine) {
            unsafe { drop_handle(handle) }
        }

        /// # Safety
        /// See the module documentation.
        #[no_mangle]
        pub unsafe extern "C" fn $insert(
            handle: *const $engine,
            key: *const Key,
            value: *const Value,
        ) -> bool {
            unsafe { (*handle).insert(&*key, &*value) }
        }

        /// # Safety
        /// See the module documentation.
        #[no_mangle]
        pub unsafe extern "C" fn $get(
            handle: *const $engine,
            key: *const Key,
            out: *mut Value,
        ) -> bool {
            unsafe { write_hit((*handle).get(&*key), out) }
        }

        /// # Safety
        /// See the module documentation.
        #[no_mangle]
        pub unsafe extern "C" fn $remove(handle: *const $engine, key: *const Key) -> bool {
            unsafe { (*handle).remove(&*key) }
        }

        /// Returns true iff an existing entry was overwritten.
        ///
        /// # Safety
        /// See the module documentation.
        #[no_mangle]
        pub unsafe extern "C" fn $update(
            handle: *const $engine,
            key: *const Key,
            value: *const Value,
        ) -> bool {
            unsafe { (*handle).update(&*key, &*value) }
        }

        /// # Safety
        /// See the module documentation.
        #[no_mangle]
        pub unsafe extern "C" fn $size(handle: *const $engine) -> i64 {
            unsafe { size_of_map((*handle).len()) }
        }
    };
}

export_engine!(
    LockedEngine,
    kv_locked_create,
    kv_locked_destroy,
    kv_locked_insert,
    kv_locked_get,
    kv_locked_remove,
    kv_locked_update,
    kv_locked_size
);

export_engine!(
    ShardedEngine,
    kv_sharded_create,
    kv_sharded_destroy,
    kv_sharded_insert,
    kv_sharded_get,
    kv_sharded_remove,
    kv_sharded_update,
    kv_sharded_size
);

export_engine!(
    StripedEngine,
    kv_striped_create,
    kv_striped_destroy,
    kv_striped_insert,
    kv_striped_get,
    kv_striped_remove,
    kv_striped_update,
    kv_striped_size
);

export_engine!(
    ProbingEngine,
    kv_probing_create,
    kv_probing_destroy,
    kv_probing_insert,
    kv_probing_get,
    kv_probing_remove,
    kv_probing_update,
    kv_probing_size
);

export_engine!(
    SnapshotEngine,
    kv_snapshot_create,
    kv_snapshot_destroy,
    kv_snapshot_insert,
    kv_snapshot_get,
    kv_snapshot_remove,
    kv_snapshot_update,
    kv_snapshot_size
);

export_engine!(
    DashMapEngine,
    kv_dashmap_create,
    kv_dashmap_destroy,
    kv_dashmap_insert,
    kv_dashmap_get,
    kv_dashmap_remove,
    kv_dashmap_update,
    kv_dashmap_size
);

export_engine!(
    AnyEngine,
    kv_any_create,
    kv_any_destroy,
    kv_any_insert,
    kv_any_get,
    kv_any_remove,
    kv_any_update,
    kv_any_size
);

/// Opens the engine whose code is `kind` (see [`EngineKind::code`]).
/// Returns null for an unknown code. Release with `kv_any_destroy`.
#[no_mangle]
pub extern "C" fn kv_open(kind: u32, capacity: usize) -> *mut AnyEngine {
    let opened = EngineKind::from_code(kind)
        .and_then(|kind| EngineConfig::new(kind).capacity(capacity).open());
    match opened {
        Ok(engine) => into_handle(engine),
        Err(err) => {
            log::warn!("kv_open({kind}) failed: {err}");
            core::ptr::null_mut()
        }
    }
}

/// Engine code behind an `AnyEngine` handle.
///
/// # Safety
/// See the module documentation.
#[no_mangle]
pub unsafe extern "C" fn kv_any_kind(handle: *const AnyEngine) -> u32 {
    unsafe { (*handle).kind().code() }
}

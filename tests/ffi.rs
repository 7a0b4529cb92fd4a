// Boundary layer suite: drives engines only through the exported C symbols.
//
// Invariants exercised:
// - create accepts a zero capacity and returns a non-null handle.
// - get writes the output slot only on a hit.
// - size is reported as a signed 64-bit count.
// - kv_open selects engines by numeric code and rejects unknown codes.
// - Handles may be shared by threads between create and destroy.
use std::thread;

use kvcore::ffi::*;
use kvcore::{EngineKind, Key, Value};

struct Handle(*mut kvcore::ProbingEngine);
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

// Test: reference scenario through one engine's symbol family.
// Verifies: every return flag and the out-slot rule.
macro_rules! scenario_through_symbols {
    ($name:ident, $create:ident, $destroy:ident, $insert:ident, $get:ident, $remove:ident, $update:ident, $size:ident) => {
        #[test]
        fn $name() {
            let h = $create(0);
            assert!(!h.is_null());
            let (a, b, d) = (Key::from("a"), Key::from("b"), Key::from("d"));
            let sentinel = Value::filled(0x5A);
            let mut out = sentinel;
            unsafe {
                assert!($insert(h, &a, &Value::filled(1)));
                assert!($insert(h, &b, &Value::filled(2)));
                assert!(!$insert(h, &a, &Value::filled(9)));
                assert_eq!($size(h), 2);

                assert!($remove(h, &b));
                assert!(!$remove(h, &b));
                assert!(!$get(h, &b, &mut out));
                assert_eq!(out, sentinel);

                assert!($update(h, &a, &Value::filled(3)));
                assert!($get(h, &a, &mut out));
                assert_eq!(out, Value::filled(3));

                assert!(!$update(h, &d, &Value::filled(4)));
                assert_eq!($size(h), 2);
                $destroy(h);
            }
        }
    };
}

scenario_through_symbols!(locked_symbols, kv_locked_create, kv_locked_destroy, kv_locked_insert, kv_locked_get, kv_locked_remove, kv_locked_update, kv_locked_size);
scenario_through_symbols!(sharded_symbols, kv_sharded_create, kv_sharded_destroy, kv_sharded_insert, kv_sharded_get, kv_sharded_remove, kv_sharded_update, kv_sharded_size);
scenario_through_symbols!(striped_symbols, kv_striped_create, kv_striped_destroy, kv_striped_insert, kv_striped_get, kv_striped_remove, kv_striped_update, kv_striped_size);
scenario_through_symbols!(probing_symbols, kv_probing_create, kv_probing_destroy, kv_probing_insert, kv_probing_get, kv_probing_remove, kv_probing_update, kv_probing_size);
scenario_through_symbols!(snapshot_symbols, kv_snapshot_create, kv_snapshot_destroy, kv_snapshot_insert, kv_snapshot_get, kv_snapshot_remove, kv_snapshot_update, kv_snapshot_size);
scenario_through_symbols!(dashmap_symbols, kv_dashmap_create, kv_dashmap_destroy, kv_dashmap_insert, kv_dashmap_get, kv_dashmap_remove, kv_dashmap_update, kv_dashmap_size);
scenario_through_symbols!(any_symbols, kv_any_create, kv_any_destroy, kv_any_insert, kv_any_get, kv_any_remove, kv_any_update, kv_any_size);

// Test: kv_open over every engine code.
// Verifies: the handle reports the requested kind and works.
#[test]
fn open_every_code() {
    for kind in EngineKind::ALL {
        let h = kv_open(kind.code(), 8);
        assert!(!h.is_null(), "{kind}");
        unsafe {
            assert_eq!(kv_any_kind(h), kind.code());
            assert!(kv_any_insert(h, &Key::from("x"), &Value::filled(7)));
            let mut out = Value::ZERO;
            assert!(kv_any_get(h, &Key::from("x"), &mut out));
            assert_eq!(out, Value::filled(7));
            assert_eq!(kv_any_size(h), 1);
            kv_any_destroy(h);
        }
    }
    assert!(kv_open(6, 8).is_null());
    assert!(kv_open(u32::MAX, 8).is_null());
}

// Test: one handle shared by several threads, destroyed after they join.
// Assumes: the caller quiesces all operations before destroy.
// Verifies: the final size equals the number of distinct inserted keys.
#[test]
fn shared_handle_across_threads() {
    let handle = Handle(kv_probing_create(0));
    thread::scope(|s| {
        for t in 0..4u8 {
            let handle = &handle;
            s.spawn(move || {
                for i in 0..500u16 {
                    let mut raw = [0u8; 3];
                    raw[0] = t;
                    raw[1..].copy_from_slice(&i.to_le_bytes());
                    let key = Key::from_bytes(&raw);
                    unsafe { assert!(kv_probing_insert(handle.0, &key, &Value::filled(t))) };
                }
            });
        }
    });
    unsafe {
        assert_eq!(kv_probing_size(handle.0), 2_000);
        kv_probing_destroy(handle.0);
    }
}

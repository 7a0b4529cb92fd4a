#![cfg(test)]

// Property tests that drive every engine through the same random operation
// sequences and compare each result with std::collections::HashMap.

use crate::codec::{Codec, Key, KeyLayout, Value, KEY_CAP};
use crate::config::{EngineConfig, EngineKind};
use crate::hash::HashAlgorithm;
use crate::map::ConcurrentMap;
use proptest::prelude::*;
use std::collections::HashMap;

// Pool-indexed operations so shrinking moves toward earlier keys and shorter
// op lists. `tag` rewrites the trailing key byte, which the default codec
// ignores and the full-width codec does not.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, u8, u8),
    Update(usize, u8, u8),
    Remove(usize, u8),
    Get(usize, u8),
    Clear,
}

fn key_at(pool: &[Vec<u8>], i: usize, tag: u8) -> Key {
    let mut key = Key::from_bytes(&pool[i]);
    if tag % 4 == 0 {
        key.data[KEY_CAP - 1] = tag;
    }
    key
}

fn arb_codec() -> impl Strategy<Value = Codec> {
    prop_oneof![
        Just(Codec::DEFAULT),
        Just(Codec::new(KeyLayout::Full, HashAlgorithm::Murmur3)),
        Just(Codec::new(KeyLayout::LengthTagged, HashAlgorithm::Murmur3)),
    ]
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<Op>)> {
    // Keys up to 20 bytes: longer ones truncate and collide on purpose.
    proptest::collection::vec(proptest::collection::vec(0u8..4, 0..=20), 1..=12).prop_flat_map(
        |pool| {
            let idx = 0..pool.len();
            let op = prop_oneof![
                4 => (idx.clone(), any::<u8>(), any::<u8>()).prop_map(|(i, t, v)| Op::Insert(i, t, v)),
                4 => (idx.clone(), any::<u8>(), any::<u8>()).prop_map(|(i, t, v)| Op::Update(i, t, v)),
                3 => (idx.clone(), any::<u8>()).prop_map(|(i, t)| Op::Remove(i, t)),
                3 => (idx.clone(), any::<u8>()).prop_map(|(i, t)| Op::Get(i, t)),
                1 => Just(Op::Clear),
            ];
            proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
        },
    )
}

fn run_against_model(
    kind: EngineKind,
    codec: Codec,
    capacity: usize,
    pool: &[Vec<u8>],
    ops: &[Op],
) -> Result<(), TestCaseError> {
    let sut = EngineConfig::new(kind)
        .capacity(capacity)
        .codec(codec)
        .open()
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    let mut model: HashMap<Key, Value> = HashMap::new();
    // The model is keyed by the canonical key, so it applies the codec's
    // equality the same way every engine must.
    let canon = |k: &Key| codec.prepare(k).key;

    for op in ops {
        match *op {
            Op::Insert(i, tag, v) => {
                let k = key_at(pool, i, tag);
                let value = Value::filled(v);
                let expect = !model.contains_key(&canon(&k));
                if expect {
                    model.insert(canon(&k), value);
                }
                prop_assert_eq!(sut.insert(&k, &value), expect, "{} insert {:?}", kind, k);
            }
            Op::Update(i, tag, v) => {
                let k = key_at(pool, i, tag);
                let value = Value::filled(v);
                let expect = model.insert(canon(&k), value).is_some();
                prop_assert_eq!(sut.update(&k, &value), expect, "{} update {:?}", kind, k);
            }
            Op::Remove(i, tag) => {
                let k = key_at(pool, i, tag);
                let expect = model.remove(&canon(&k)).is_some();
                prop_assert_eq!(sut.remove(&k), expect, "{} remove {:?}", kind, k);
            }
            Op::Get(i, tag) => {
                let k = key_at(pool, i, tag);
                let expect = model.get(&canon(&k)).copied();
                prop_assert_eq!(sut.get(&k), expect, "{} get {:?}", kind, k);
                prop_assert_eq!(sut.contains_key(&k), expect.is_some());
            }
            Op::Clear => {
                model.clear();
                sut.clear();
            }
        }
        prop_assert_eq!(sut.len(), model.len(), "{} len", kind);
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }

    // Every surviving entry is reachable through every pool key that maps to it.
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(*v));
    }
    Ok(())
}

// Property: every engine is observationally equivalent to a HashMap keyed by
// canonical keys.
// - `insert` succeeds iff the canonical key is absent and never overwrites.
// - `update` reports whether it overwrote and always leaves the new value.
// - `remove` reports presence; `get` returns the model's value.
// - `len` matches after every step, including across internal growth from a
//   zero capacity hint.
proptest! {
    #![proptest_config(ProptestConfig { cases: 48, .. ProptestConfig::default() })]
    #[test]
    fn prop_engines_match_model(
        (pool, ops) in arb_scenario(),
        codec in arb_codec(),
        capacity in prop_oneof![Just(0usize), Just(4), Just(64)],
    ) {
        for kind in EngineKind::ALL {
            run_against_model(kind, codec, capacity, &pool, &ops)?;
        }
    }
}

// Property: under the default codec the trailing tag byte never splits a key.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_tag_byte_is_ignored(
        body in proptest::collection::vec(any::<u8>(), 0..=15),
        tag in any::<u8>(),
        v in any::<u8>(),
    ) {
        for kind in EngineKind::ALL {
            let sut = EngineConfig::new(kind).open().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let a = Key::from_bytes(&body);
            let mut b = a;
            b.data[KEY_CAP - 1] = tag;
            prop_assert!(sut.insert(&a, &Value::filled(v)));
            prop_assert!(!sut.insert(&b, &Value::filled(v.wrapping_add(1))));
            prop_assert_eq!(sut.get(&b), Some(Value::filled(v)));
            prop_assert!(sut.remove(&b));
            prop_assert_eq!(sut.len(), 0);
        }
    }
}

//! Property-Based Tests for the Store Module
//!
//! Uses proptest to verify the store's core guarantees: codec round-trips,
//! duration parsing, and set/get/remove semantics over a memory-only
//! platform.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::codec;
use crate::config::StoreConfig;
use crate::expiry::{parse_duration, UnitTable};
use crate::platform::Platform;
use crate::store::Store;

// == Strategies ==
/// Logical keys made of word characters only, so the sanitized physical
/// form is identical to the logical form.
fn word_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}"
}

/// Non-falsy JSON values: everything the store accepts.
fn storable_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        // no ':' so the structured-tag sentinel can never be generated
        "[a-zA-Z0-9 ,.{}\\[\\]\"]{1,64}".prop_map(Value::from),
        (1i64..i64::MAX).prop_map(Value::from),
        (i64::MIN..0i64).prop_map(Value::from),
        Just(json!(true)),
        prop::collection::vec(0i64..100, 0..8).prop_map(|v| json!(v)),
        ("[a-z]{1,8}", 0i64..100).prop_map(|(k, n)| {
            let mut object = serde_json::Map::new();
            object.insert(k, json!(n));
            Value::Object(object)
        }),
    ]
}

fn blocking_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn memory_store(rt: &tokio::runtime::Runtime) -> Store {
    rt.block_on(Store::open(
        StoreConfig::new("prop").unwrap(),
        Platform::new("localhost"),
    ))
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Every storable value survives encode-then-decode unchanged, including
    // strings that look like numbers.
    #[test]
    fn prop_codec_roundtrip(value in storable_value_strategy()) {
        let text = codec::encode(&value).unwrap();
        let decoded = codec::decode(&text).unwrap();
        prop_assert_eq!(decoded, value);
    }

    // Bare numeric text always decodes to a JSON number.
    #[test]
    fn prop_bare_integer_text_decodes_to_number(n in proptest::num::i64::ANY) {
        let decoded = codec::decode(&n.to_string()).unwrap();
        prop_assert_eq!(decoded, json!(n));
    }

    // A single count-unit group parses to count times the unit's span, for
    // every supported unit alias.
    #[test]
    fn prop_single_group_duration(
        count in 1u64..10_000,
        unit_index in 0usize..7,
    ) {
        let units = UnitTable::default();
        let day = 24 * 3600;
        let aliases: [(&str, u64); 7] = [
            ("s", 1),
            ("m", 60),
            ("h", 3600),
            ("d", day),
            ("w", 7 * day),
            ("mth", 4 * 7 * day),
            ("y", 12 * 4 * 7 * day),
        ];
        let (alias, span) = aliases[unit_index];
        let parsed = parse_duration(&format!("{count}{alias}"), &units).unwrap();
        prop_assert_eq!(parsed, count * span);
    }

    // Whitespace between count and unit never changes the result.
    #[test]
    fn prop_duration_whitespace_insensitive(count in 1u64..10_000) {
        let units = UnitTable::default();
        let tight = parse_duration(&format!("{count}h"), &units).unwrap();
        let spaced = parse_duration(&format!("{count} h"), &units).unwrap();
        prop_assert_eq!(tight, spaced);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Storing a value and reading it back before expiry returns the exact
    // value stored.
    #[test]
    fn prop_store_roundtrip(key in word_key_strategy(), value in storable_value_strategy()) {
        let rt = blocking_runtime();
        let mut store = memory_store(&rt);

        let stored = store.set(&key, value.clone());
        prop_assert_eq!(stored, Some(value.clone()));
        prop_assert_eq!(store.get(&key), Some(value));

        // spawned mirror completions are no-ops on a memory-only platform
        rt.block_on(tokio::task::yield_now());
    }

    // The last write wins and the cache holds exactly one entry per key.
    #[test]
    fn prop_store_overwrite(
        key in word_key_strategy(),
        first in storable_value_strategy(),
        second in storable_value_strategy(),
    ) {
        let rt = blocking_runtime();
        let mut store = memory_store(&rt);

        store.set(&key, first);
        store.set(&key, second.clone());

        prop_assert_eq!(store.get(&key), Some(second));
        prop_assert_eq!(store.len(), 1);
    }

    // After removal a key reads as absent, and removing again stays true.
    #[test]
    fn prop_store_remove(key in word_key_strategy(), value in storable_value_strategy()) {
        let rt = blocking_runtime();
        let mut store = memory_store(&rt);

        store.set(&key, value);
        prop_assert!(store.remove(&key));
        prop_assert_eq!(store.get(&key), None);
        prop_assert!(store.remove(&key));
    }

    // A falsy write never disturbs the existing entry.
    #[test]
    fn prop_falsy_write_preserves_prior(
        key in word_key_strategy(),
        value in storable_value_strategy(),
    ) {
        let rt = blocking_runtime();
        let mut store = memory_store(&rt);

        store.set(&key, value.clone());
        for falsy in [json!(null), json!(false), json!(0), json!("")] {
            prop_assert_eq!(store.set(&key, falsy), None);
        }
        prop_assert_eq!(store.get(&key), Some(value));
    }
}

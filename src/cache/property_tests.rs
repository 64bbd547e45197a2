//! Property-Based Tests for the Cache Contract
//!
//! Drives the in-process store with proptest-generated operation
//! sequences and compares it against a plain map model.

use proptest::prelude::*;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::backends::MemoryStore;
use crate::cache::{CacheStore, Fallback};

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

/// Arbitrary JSON values, including the falsy ones
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z ]{0,16}".prop_map(Value::from),
    ];
    leaf.prop_recursive(2, 8, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::hash_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Add { key: String, value: Value },
    Get { key: String },
    Pull { key: String },
    Delete { keys: Vec<String> },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Add { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Pull { key }),
        prop::collection::vec(key_strategy(), 0..5).prop_map(|keys| CacheOp::Delete { keys }),
    ]
}

fn new_store() -> MemoryStore {
    MemoryStore::new("prop", Duration::from_secs(3600))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Any operation sequence leaves the store agreeing with a map model.
    #[test]
    fn prop_matches_map_model(ops in prop::collection::vec(cache_op_strategy(), 1..40)) {
        tokio_test::block_on(async {
            let store = new_store();
            let mut model: HashMap<String, Value> = HashMap::new();

            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        store.set(&key, value.clone(), None).await.unwrap();
                        model.insert(key, value);
                    }
                    CacheOp::Add { key, value } => {
                        let added = store.add(&key, value.clone(), None).await.unwrap();
                        prop_assert_eq!(added, !model.contains_key(&key));
                        model.entry(key).or_insert(value);
                    }
                    CacheOp::Get { key } => {
                        prop_assert_eq!(store.get(&key).await.unwrap(), model.get(&key).cloned());
                    }
                    CacheOp::Pull { key } => {
                        prop_assert_eq!(store.pull(&key).await.unwrap(), model.remove(&key));
                    }
                    CacheOp::Delete { keys } => {
                        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
                        let expected = keys
                            .iter()
                            .collect::<HashSet<_>>()
                            .into_iter()
                            .filter(|key| model.remove(*key).is_some())
                            .count() as u64;
                        prop_assert_eq!(store.delete_many(&refs).await.unwrap(), expected);
                    }
                }
            }

            prop_assert_eq!(store.len().await, model.len());
            Ok(())
        })?;
    }

    // set then get returns the same value, whatever it is.
    #[test]
    fn prop_roundtrip(
        key in key_strategy(),
        value in value_strategy(),
        ttl in prop::option::of(0u64..3600),
    ) {
        tokio_test::block_on(async {
            let store = new_store();
            store.set(&key, value.clone(), ttl).await.unwrap();
            prop_assert_eq!(store.get(&key).await.unwrap(), Some(value));
            prop_assert!(store.has(&key).await.unwrap());
            Ok(())
        })?;
    }

    // fetch returns the stored value on a hit, even a falsy one.
    #[test]
    fn prop_fetch_prefers_stored(
        key in key_strategy(),
        stored in value_strategy(),
        fallback in value_strategy(),
    ) {
        tokio_test::block_on(async {
            let store = new_store();
            store.forever(&key, stored.clone()).await.unwrap();
            let fetched = store.fetch(&key, Fallback::Value(fallback), None).await.unwrap();
            prop_assert_eq!(fetched, stored);
            Ok(())
        })?;
    }

    // fetch on a miss stores and returns the fallback.
    #[test]
    fn prop_fetch_stores_fallback(key in key_strategy(), fallback in value_strategy()) {
        tokio_test::block_on(async {
            let store = new_store();
            let fallback_value = Fallback::Value(fallback.clone());
            let fetched = store.fetch(&key, fallback_value, Some(60)).await.unwrap();
            prop_assert_eq!(&fetched, &fallback);
            prop_assert_eq!(store.get(&key).await.unwrap(), Some(fallback));
            Ok(())
        })?;
    }
}

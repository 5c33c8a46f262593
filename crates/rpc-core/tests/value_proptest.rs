//! Property-based tests for the `Value` wire model.

use indexmap::IndexMap;
use proptest::prelude::*;
use rpc_core::{get_deep, Value};

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>().prop_filter("finite", |n| n.is_finite()).prop_map(Value::Number),
        "[a-zA-Z0-9 ]{0,20}".prop_map(Value::String),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                let mut map = IndexMap::new();
                for (k, v) in entries {
                    map.insert(k, v);
                }
                Value::Object(map)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn value_roundtrips_through_json(value in arb_value()) {
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(value, back);
    }

    #[test]
    fn get_deep_finds_every_top_level_object_key(entries in proptest::collection::vec(("[a-z]{1,6}", arb_leaf()), 0..6)) {
        let mut map = IndexMap::new();
        for (k, v) in &entries {
            map.insert(k.clone(), v.clone());
        }
        let root = Value::Object(map.clone());
        for (k, v) in &map {
            prop_assert_eq!(get_deep(&root, k), Some(v));
        }
    }
}

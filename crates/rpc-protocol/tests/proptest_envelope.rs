//! Property-based round-trip tests for the `Envelope` wire type.

use indexmap::IndexMap;
use proptest::prelude::*;
use rpc_core::Value;
use rpc_protocol::{Codec, Envelope, Message};

fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_-]{0,15}"
}

fn arb_id() -> impl Strategy<Value = String> {
    "[0-9a-f]{1,12}-[0-9a-f]{1,12}"
}

fn arb_scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>().prop_filter("finite", |n| n.is_finite()).prop_map(Value::Number),
        "[a-zA-Z0-9 ]{0,20}".prop_map(Value::String),
    ]
}

fn arb_array_value() -> impl Strategy<Value = Value> {
    proptest::collection::vec(arb_scalar_value(), 0..5).prop_map(Value::Array)
}

fn arb_object_value() -> impl Strategy<Value = Value> {
    proptest::collection::vec(("[a-z]{1,8}", arb_scalar_value()), 0..5).prop_map(|entries| {
        let mut map = IndexMap::new();
        for (k, v) in entries {
            map.insert(k, v);
        }
        Value::Object(map)
    })
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![arb_scalar_value(), arb_array_value(), arb_object_value()]
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        Just(Message::Get),
        (arb_id(), "[a-z.]{0,20}", proptest::collection::vec(arb_value(), 0..4))
            .prop_map(|(id, method, args)| Message::Call { id, method, args, handle: None }),
        (arb_id(), arb_value()).prop_map(|(id, v)| Message::Result {
            id,
            result: rpc_protocol::CallResult::Value(v),
        }),
        (arb_id(), "[a-zA-Z ]{0,30}").prop_map(|(id, error)| Message::Error { id, error }),
    ]
}

fn arb_envelope() -> impl Strategy<Value = Envelope> {
    (arb_name(), arb_message()).prop_map(|(name, message)| Envelope::new(name, message))
}

proptest! {
    #[test]
    fn encode_decode_string_roundtrips(env in arb_envelope()) {
        let raw = Codec::encode(&env).unwrap();
        let back = Codec::decode(&raw).unwrap();
        prop_assert_eq!(env, back);
    }

    #[test]
    fn encode_decode_json_value_roundtrips(env in arb_envelope()) {
        let as_value = Codec::encode_value(&env).unwrap();
        let back = Codec::decode_value(as_value).unwrap();
        prop_assert_eq!(env, back);
    }
}

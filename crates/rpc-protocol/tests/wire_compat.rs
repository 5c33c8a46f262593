//! Wire-format backwards-compatibility tests.
//!
//! Every hardcoded JSON shape in this file is a "blessed" wire shape. If a
//! refactor changes any of these, it is a **breaking** wire-format change.

use indexmap::IndexMap;
use rpc_core::{RegexLiteral, Value};
use rpc_protocol::{CallResult, Codec, Envelope, HandleMarker, HandlePayload, Message, ReadyPayload};
use serde_json::json;

#[test]
fn ready_message_matches_blessed_shape() {
    let mut obj = IndexMap::new();
    obj.insert("count".to_string(), Value::Number(3.0));
    let env = Envelope::new(
        "widget",
        Message::Ready {
            payload: ReadyPayload {
                values: Value::Object(obj),
                functions: vec!["increment".into()],
            },
        },
    );
    let actual = Codec::encode_value(&env).unwrap();
    let expected = json!({
        "iframeRpc": "iframe-rpc",
        "name": "widget",
        "type": "ready",
        "payload": {
            "values": {"t": "object", "c": {"count": {"t": "number", "c": 3.0}}},
            "functions": ["increment"],
        },
    });
    assert_eq!(actual, expected);
}

#[test]
fn call_message_matches_blessed_shape() {
    let env = Envelope::new(
        "widget",
        Message::Call {
            id: "c1".into(),
            method: "increment".into(),
            args: vec![Value::Number(1.0), Value::Regex(RegexLiteral::new("a+", "i"))],
            handle: None,
        },
    );
    let actual = Codec::encode_value(&env).unwrap();
    let expected = json!({
        "iframeRpc": "iframe-rpc",
        "name": "widget",
        "type": "call",
        "id": "c1",
        "method": "increment",
        "args": [
            {"t": "number", "c": 1.0},
            {"t": "regex", "c": {"pattern": "a+", "flags": "i"}},
        ],
    });
    assert_eq!(actual, expected);
    assert!(!actual.as_object().unwrap().contains_key("handle"));
}

#[test]
fn handle_result_matches_blessed_shape() {
    let env = Envelope::new(
        "widget",
        Message::Result {
            id: "c1".into(),
            result: CallResult::Handle {
                marker: HandleMarker,
                handle: HandlePayload::Object {
                    id: "h1".into(),
                    values: Value::Object(IndexMap::new()),
                    functions: vec![String::new()],
                },
            },
        },
    );
    let actual = Codec::encode_value(&env).unwrap();
    let expected = json!({
        "iframeRpc": "iframe-rpc",
        "name": "widget",
        "type": "result",
        "id": "c1",
        "result": {
            "__rpc__": "handle",
            "kind": "object",
            "id": "h1",
            "values": {"t": "object", "c": {}},
            "functions": [""],
        },
    });
    assert_eq!(actual, expected);
}

#[test]
fn error_message_matches_blessed_shape() {
    let env = Envelope::new(
        "widget",
        Message::Error {
            id: "c1".into(),
            error: "TypeError: boom".into(),
        },
    );
    let actual = Codec::encode_value(&env).unwrap();
    let expected = json!({
        "iframeRpc": "iframe-rpc",
        "name": "widget",
        "type": "error",
        "id": "c1",
        "error": "TypeError: boom",
    });
    assert_eq!(actual, expected);
}

//! The wire envelope (§4.2): a literal `"iframe-rpc"` discriminator, a
//! channel name, and a tagged message body.

use rpc_core::Value;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DISCRIMINATOR: &str = "iframe-rpc";

/// Zero-sized marker that always serializes to the literal string
/// `"iframe-rpc"` and rejects any other value on decode, so a message from
/// an unrelated library sharing the same channel is never mistaken for one
/// of ours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discriminator;

impl Serialize for Discriminator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(DISCRIMINATOR)
    }
}

impl<'de> Deserialize<'de> for Discriminator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == DISCRIMINATOR {
            Ok(Discriminator)
        } else {
            Err(D::Error::custom(format!(
                "expected discriminator {DISCRIMINATOR:?}, got {raw:?}"
            )))
        }
    }
}

/// The payload of a `READY` message: the value snapshot and the function
/// path set computed once at provider startup (§3 "Snapshot").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadyPayload {
    /// The value-only deep copy of the API tree.
    pub values: Value,
    /// Dotted paths at which a function is reachable.
    pub functions: Vec<String>,
}

/// A handle payload (§4.2 "Handle payload"): appears inside a `RESULT`
/// wherever the result is, or contains, a function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlePayload {
    /// The result itself was a function: only the id is meaningful.
    Function {
        /// The handle id.
        id: String,
    },
    /// The result was a non-pass-through object/array containing at least
    /// one function: carries a scoped snapshot of that result.
    Object {
        /// The handle id.
        id: String,
        /// The scoped value snapshot of the handle's bound value.
        values: Value,
        /// Dotted paths, relative to the handle, at which a function is
        /// reachable.
        functions: Vec<String>,
    },
}

impl HandlePayload {
    /// The handle id, regardless of kind.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            HandlePayload::Function { id } | HandlePayload::Object { id, .. } => id,
        }
    }
}

/// What a `RESULT` carries: either a plain value, or a handle payload when
/// the value is/contains a function (§4.3 step 4 "Serialisation").
///
/// `untagged` is safe here because the two shapes never overlap on the
/// wire: [`Value`] tags itself with `t`/`c`, [`HandlePayload`] tags itself
/// with `__rpc__`/`kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CallResult {
    /// A handle-wrapped result.
    Handle {
        /// Marker confirming this JSON shape is a handle payload, not a
        /// value that happens to share field names.
        #[serde(rename = "__rpc__")]
        marker: HandleMarker,
        /// The handle payload itself, flattened alongside the marker.
        #[serde(flatten)]
        handle: HandlePayload,
    },
    /// A plain, structured-clone-safe value.
    Value(Value),
}

/// Marker type that serializes to the literal string `"handle"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleMarker;

impl Serialize for HandleMarker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("handle")
    }
}

impl<'de> Deserialize<'de> for HandleMarker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "handle" {
            Ok(HandleMarker)
        } else {
            Err(D::Error::custom(format!("expected \"handle\", got {raw:?}")))
        }
    }
}

/// The tagged message body carried by an [`Envelope`] (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Provider → Consumer: handshake broadcast.
    Ready {
        /// The snapshot and function path set.
        payload: ReadyPayload,
    },
    /// Consumer → Provider: request a fresh `READY` (optional re-handshake).
    Get,
    /// Consumer → Provider: invoke a method.
    Call {
        /// Correlation id for the matching `RESULT`/`ERROR`.
        id: String,
        /// Dotted method path; empty means "call the handle itself".
        method: String,
        /// Ordered, structured-clone-safe arguments.
        args: Vec<Value>,
        /// The handle this call is scoped to, if any.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        handle: Option<String>,
    },
    /// Provider → Consumer: a successful call result.
    Result {
        /// Correlation id matching the originating `CALL`.
        id: String,
        /// The call's result, possibly handle-wrapped.
        result: CallResult,
    },
    /// Provider → Consumer: a failed call.
    Error {
        /// Correlation id matching the originating `CALL`.
        id: String,
        /// The stringified cause (§4.1 `serializeError`).
        error: String,
    },
    /// Provider → Consumer: the provider failed to initialise.
    InitError {
        /// The stringified cause.
        error: String,
    },
    /// Consumer → Provider: release a previously issued handle.
    ReleaseHandle {
        /// The handle id to release.
        handle: String,
    },
    /// A `type` this peer's build doesn't recognise (e.g. a future message
    /// kind added by a newer peer sharing the same channel). Carries no
    /// data; both peers drop it without acting on it (§6 "unknown message
    /// types MUST be ignored silently").
    #[serde(other)]
    Unknown,
}

/// A complete wire envelope: the literal discriminator, the channel name,
/// and the tagged message body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Always `"iframe-rpc"` on the wire.
    #[serde(rename = "iframeRpc")]
    pub marker: Discriminator,
    /// The channel name both peers were constructed with.
    pub name: String,
    /// The message body.
    #[serde(flatten)]
    pub message: Message,
}

impl Envelope {
    /// Wrap a [`Message`] for `name` with the required discriminator.
    #[must_use]
    pub fn new(name: impl Into<String>, message: Message) -> Self {
        Envelope {
            marker: Discriminator,
            name: name.into(),
            message,
        }
    }
}

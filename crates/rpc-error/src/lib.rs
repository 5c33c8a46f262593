// SPDX-License-Identifier: MIT OR Apache-2.0
//! rpc-error
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Error taxonomy shared by every `iframe-rpc` crate.
//!
//! The wire protocol only ever carries a plain `String` message (see
//! `rpc-protocol::Envelope::Error`/`InitError`). [`RpcError`] is the typed,
//! in-process counterpart: every fallible operation in this workspace
//! returns (or wraps) an `RpcError`, and [`RpcError::to_wire_message`]
//! collapses it to the string that actually crosses the channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors arising anywhere in the provider/consumer RPC core.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The consumer's handshake timer expired before a matching `READY`
    /// (or `INIT_ERROR`) arrived.
    #[error("iframe-rpc initialization timeout for name: {name}")]
    HandshakeTimeout {
        /// Channel name the consumer was waiting on.
        name: String,
    },

    /// The provider emitted `INIT_ERROR` instead of `READY` (snapshot
    /// construction or the initial broadcast failed).
    #[error("{cause}")]
    InitFailed {
        /// Stringified cause carried by `INIT_ERROR`.
        cause: String,
    },

    /// A `CALL` referenced a handle id the provider no longer has.
    #[error("Handle {id} not found")]
    HandleNotFound {
        /// The handle id that was missing.
        id: String,
    },

    /// A `CALL`'s `method` path did not resolve to a callable.
    #[error("Method {} not found", display_method(.method))]
    MethodNotFound {
        /// The dotted method path, or `None` for the handle root (`""`).
        method: Option<String>,
    },

    /// The invoked function returned an error; `cause` is its stringified
    /// message (see [`serialize_error`]).
    #[error("{cause}")]
    HandlerFailed {
        /// Stringified cause returned by the handler.
        cause: String,
    },

    /// A call was attempted on a handle that has already been released,
    /// either locally (auto-release/page-lifecycle) or by the provider.
    #[error("Handle {id} released")]
    HandleReleased {
        /// The handle id that is no longer usable.
        id: String,
    },

    /// The underlying transport could not deliver a message (send to a
    /// detached/closed peer). Best-effort: callers usually swallow this,
    /// except during the initial `READY` broadcast (see §7 kind 1).
    #[error("transport send failed: {0}")]
    TransportSend(String),

    /// A message referenced a peer the transport no longer recognises
    /// (post-handshake call with no bound peer, §4.4 "pending-call
    /// semantics").
    #[error("no peer bound for channel {name}")]
    PeerUnavailable {
        /// Channel name with no bound peer.
        name: String,
    },
}

fn display_method(method: &Option<String>) -> String {
    match method {
        Some(m) => m.clone(),
        None => "\"<root>\"".to_string(),
    }
}

impl RpcError {
    /// Collapse this error to the plain message string that crosses the
    /// wire inside `Envelope::Error`/`Envelope::InitError` (§9
    /// "Error-shape normalisation").
    #[must_use]
    pub fn to_wire_message(&self) -> String {
        self.to_string()
    }

    /// Reconstruct a synthetic, locally-raised error from a wire message
    /// received inside `Envelope::Error`. Used by the consumer when
    /// rejecting a pending call.
    #[must_use]
    pub fn from_wire_message(message: impl Into<String>) -> Self {
        RpcError::HandlerFailed {
            cause: message.into(),
        }
    }
}

/// Stringify an arbitrary error for transport, following §4.1
/// `serializeError`: prefer a message field, then JSON, then `Display`.
#[must_use]
pub fn serialize_error(err: &(dyn std::error::Error + 'static)) -> String {
    err.to_string()
}

/// Stringify a [`serde_json::Value`] error payload the same way
/// `serializeError` does for a plain JS value: use its `message` field if
/// present, else JSON-stringify it, else fall back to `Display`.
#[must_use]
pub fn serialize_error_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => match map.get("message") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => value.to_string(),
        },
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A wire-safe, serialisable projection of [`RpcError`] for contexts (like
/// golden tests) that want to assert on error *shape* rather than just the
/// rendered message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorShape {
    /// See [`RpcError::HandshakeTimeout`].
    HandshakeTimeout,
    /// See [`RpcError::InitFailed`].
    InitFailed,
    /// See [`RpcError::HandleNotFound`].
    HandleNotFound,
    /// See [`RpcError::MethodNotFound`].
    MethodNotFound,
    /// See [`RpcError::HandlerFailed`].
    HandlerFailed,
    /// See [`RpcError::HandleReleased`].
    HandleReleased,
    /// See [`RpcError::TransportSend`].
    TransportSend,
    /// See [`RpcError::PeerUnavailable`].
    PeerUnavailable,
}

impl From<&RpcError> for ErrorShape {
    fn from(err: &RpcError) -> Self {
        match err {
            RpcError::HandshakeTimeout { .. } => ErrorShape::HandshakeTimeout,
            RpcError::InitFailed { .. } => ErrorShape::InitFailed,
            RpcError::HandleNotFound { .. } => ErrorShape::HandleNotFound,
            RpcError::MethodNotFound { .. } => ErrorShape::MethodNotFound,
            RpcError::HandlerFailed { .. } => ErrorShape::HandlerFailed,
            RpcError::HandleReleased { .. } => ErrorShape::HandleReleased,
            RpcError::TransportSend(_) => ErrorShape::TransportSend,
            RpcError::PeerUnavailable { .. } => ErrorShape::PeerUnavailable,
        }
    }
}

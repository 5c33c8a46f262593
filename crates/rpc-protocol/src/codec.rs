//! JSON codec for [`Envelope`] (§6 "Wire format": "JSON
//! structurally-clonable objects").
//!
//! The transport carries one [`Envelope`] per message event rather than a
//! newline-delimited stream — there is no line framing to own here, just
//! `serde_json` at the message/value boundary.

use rpc_error::RpcError;

use crate::envelope::Envelope;

/// Stateless encode/decode for [`Envelope`] messages.
#[derive(Debug, Clone, Copy)]
pub struct Codec;

impl Codec {
    /// Serialize an [`Envelope`] to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::TransportSend`] if serialization fails (should
    /// not happen for well-formed [`Envelope`] values built through this
    /// crate's constructors).
    pub fn encode(envelope: &Envelope) -> Result<String, RpcError> {
        serde_json::to_string(envelope).map_err(|e| RpcError::TransportSend(e.to_string()))
    }

    /// Encode to a [`serde_json::Value`], for transports that pass
    /// structured JSON rather than text (matching `postMessage`'s
    /// structured-clone delivery more closely than a string would).
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::TransportSend`] if serialization fails.
    pub fn encode_value(envelope: &Envelope) -> Result<serde_json::Value, RpcError> {
        serde_json::to_value(envelope).map_err(|e| RpcError::TransportSend(e.to_string()))
    }

    /// Deserialize an [`Envelope`] from a JSON string.
    ///
    /// An unrecognized `type` decodes successfully as [`Message::Unknown`]
    /// rather than erroring (§6 "unknown message types MUST be ignored
    /// silently") — callers simply drop that variant without acting on it.
    /// A mismatched discriminator, or JSON that isn't an envelope shape at
    /// all, is still a hard decode error.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the string is not valid JSON or does
    /// not match the [`Envelope`] shape.
    pub fn decode(raw: &str) -> Result<Envelope, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Deserialize an [`Envelope`] from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the value does not match the
    /// [`Envelope`] shape.
    pub fn decode_value(value: serde_json::Value) -> Result<Envelope, serde_json::Error> {
        serde_json::from_value(value)
    }
}

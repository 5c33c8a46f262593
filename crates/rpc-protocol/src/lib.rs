// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Wire envelopes and JSON codec for `iframe-rpc` (§4.2).
//!
//! This crate owns the shape of messages exchanged between a provider and
//! a consumer; it has no opinion on how those messages are actually
//! delivered (see [`rpc-transport`](../rpc_transport/index.html)).

pub mod codec;
pub mod envelope;

pub use codec::Codec;
pub use envelope::{
    CallResult, Discriminator, Envelope, HandleMarker, HandlePayload, Message, ReadyPayload,
};

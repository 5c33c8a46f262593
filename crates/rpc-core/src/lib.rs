// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Value model, provider-side API tree, and snapshot construction shared
//! by the rest of the `iframe-rpc` workspace.
//!
//! This crate has no notion of a transport or a wire envelope — it only
//! answers "what can an API tree hold, and what does a value-only snapshot
//! of it look like." [`rpc-protocol`](../rpc_protocol/index.html) builds the
//! envelopes that carry a [`value::Value`] across a channel.

pub mod id;
pub mod snapshot;
pub mod tree;
pub mod value;

pub use id::gen_id;
pub use snapshot::{snapshot, Snapshot};
pub use tree::{
    get_node_deep, ApiAccessor, ApiFunction, ApiNode, ApiTree, ApiTreeBuilder, BoxFuture,
    CallContext, NodeId,
};
pub use value::{canonical_path, get_deep, get_deep_resolved, RegexLiteral, Value};

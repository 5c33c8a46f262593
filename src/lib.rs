// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `iframe-rpc`: a bidirectional object-capability RPC core over an
//! asynchronous, same-process message channel (§1, §4.5).
//!
//! This crate is a thin re-export facade over the workspace's sub-crates —
//! [`rpc_core`], [`rpc_error`], [`rpc_protocol`], [`rpc_transport`],
//! [`rpc_provider`], and [`rpc_consumer`] — plus the two entry points
//! described in §4.5: [`create_provider`] and [`create_consumer`]. Everyone
//! downstream of this core should need only this crate's name, not the
//! individual sub-crates.
//!
//! ```no_run
//! use iframe_rpc::{create_consumer, create_provider, ApiTree, ApiTreeBuilder};
//! use iframe_rpc::{ConsumerConfig, FakeChannel, ProviderConfig, Value};
//!
//! # async fn run() -> Result<(), iframe_rpc::RpcError> {
//! let (provider_end, consumer_end) = FakeChannel::pair("https://a.example", "https://b.example");
//!
//! let mut builder = ApiTreeBuilder::new();
//! let a = builder.value(1.0);
//! let test = builder.function(|args: Vec<Value>, _ctx| async move {
//!     let Value::Number(n) = args[0] else { unreachable!() };
//!     Ok(ApiTree::leaf(n + 1.0))
//! });
//! let root = builder.object_of(vec![("a", a), ("test", test)]);
//! let tree = builder.finish(root);
//!
//! let _provider = create_provider(tree, ProviderConfig::new("widget"), provider_end).await;
//! let consumer = create_consumer("widget", ConsumerConfig::default(), consumer_end).await?;
//!
//! let test_fn = match consumer.root().get("test") {
//!     iframe_rpc::ConsumerRead::Callable(f) => f,
//!     _ => panic!("expected a callable"),
//! };
//! let outcome = test_fn.call(vec![Value::Number(1.0)]).await?;
//! assert!(matches!(outcome, iframe_rpc::CallOutcome::Value(Value::Number(n)) if n == 2.0));
//! # Ok(())
//! # }
//! ```

pub use rpc_consumer::{
    CallOutcome, Callable, Consumer, ConsumerConfig, ConsumerProxy, ConsumerRead, PageHideEvent,
    ReleaseOnPageHide,
};
pub use rpc_core::{
    canonical_path, gen_id, get_deep, get_deep_resolved, snapshot, ApiAccessor, ApiFunction,
    ApiNode, ApiTree, ApiTreeBuilder, BoxFuture, CallContext, NodeId, RegexLiteral, Snapshot,
    Value,
};
pub use rpc_error::RpcError;
pub use rpc_protocol::{
    CallResult, Codec, Discriminator, Envelope, HandleMarker, HandlePayload, Message, ReadyPayload,
};
pub use rpc_provider::{HandleKind, HandleTable, Provider, ProviderConfig};
pub use rpc_transport::{FakeChannel, FakeTransport, MessageEvent, OriginPolicy, PeerId, Transport};

/// Build the provider-side API tree's snapshot, broadcast `READY` (or
/// `INIT_ERROR` on failure) over `transport`, and spawn the background
/// message loop that serves `GET`/`CALL`/`RELEASE_HANDLE` for as long as
/// the returned [`Provider`] lives (§4.3 "Construction", §4.5
/// `createProvider`). Side-effect only, matching `createProvider`'s own
/// "constructs and returns nothing" contract — the returned [`Provider`]
/// exists only so a caller can `abort`/`join` it in tests.
pub async fn create_provider<T>(tree: ApiTree, config: ProviderConfig, transport: T) -> Provider
where
    T: Transport + Send + 'static,
{
    Provider::spawn(tree, config, transport).await
}

/// Connect a [`Consumer`] to `name` over `transport`, resolving once a
/// matching `READY` arrives or rejecting on `INIT_ERROR`/handshake timeout
/// (§4.4 "Initialisation state machine", §4.5 `createConsumer`).
///
/// # Errors
///
/// See [`Consumer::connect`].
pub async fn create_consumer<T>(
    name: impl Into<String>,
    config: ConsumerConfig,
    transport: T,
) -> Result<Consumer, RpcError>
where
    T: Transport + Send + 'static,
{
    Consumer::connect(name, config, transport).await
}

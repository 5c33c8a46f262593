//! The transport contract (§6): a send primitive and a message listener.
//! Delivery semantics (ordering per-sender, best-effort) are all that
//! matters here — the concrete channel is an external collaborator (§1).

use async_trait::async_trait;
use rpc_error::RpcError;
use rpc_protocol::Envelope;

use crate::message::{MessageEvent, PeerId};

/// One peer's view of the channel: a send primitive and an inbound queue.
///
/// Implementors deep-copy outgoing payloads (matching `postMessage`'s
/// structured-clone semantics) — this trait only specifies the contract,
/// not how a given transport enforces it.
#[async_trait]
pub trait Transport: Send {
    /// Broadcast an envelope to this peer's counterpart, addressed to
    /// `target_origin` (the provider's initial `READY`, or a `GET`/`CALL`
    /// from a consumer that has not yet bound to a specific source).
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::TransportSend`] if delivery fails. Per §7,
    /// callers are expected to treat this as best-effort and swallow it,
    /// except during initial broadcast.
    async fn send(&self, envelope: &Envelope, target_origin: &str) -> Result<(), RpcError>;

    /// Reply to whichever peer `source` identifies, echoing its `origin`
    /// (§4.3 "for responses, echo the request's origin").
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::PeerUnavailable`] if `source` no longer
    /// resolves to a live peer (e.g. the target window closed).
    async fn reply(
        &self,
        source: PeerId,
        envelope: &Envelope,
        origin: &str,
    ) -> Result<(), RpcError>;

    /// Receive the next inbound message. Returns `None` once the channel
    /// is permanently closed.
    async fn recv(&mut self) -> Option<MessageEvent>;
}

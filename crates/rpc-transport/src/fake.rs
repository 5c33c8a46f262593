//! A fake, in-process paired channel (§2 "Test scaffolding"): drives both
//! peers through `tokio::sync::mpsc` queues instead of a real `postMessage`
//! bridge, so provider/consumer behaviour can be exercised in one process.

use async_trait::async_trait;
use rpc_error::RpcError;
use rpc_protocol::Envelope;
use tokio::sync::mpsc;

use crate::message::{MessageEvent, PeerId};
use crate::transport::Transport;

/// One end of a [`FakeChannel`] pair.
pub struct FakeTransport {
    /// Stable identity for this end, handed back in [`MessageEvent::source`]
    /// on the other end.
    self_id: PeerId,
    origin: String,
    outbox: mpsc::UnboundedSender<MessageEvent>,
    inbox: mpsc::UnboundedReceiver<MessageEvent>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, envelope: &Envelope, _target_origin: &str) -> Result<(), RpcError> {
        self.outbox
            .send(MessageEvent {
                envelope: envelope.clone(),
                origin: self.origin.clone(),
                source: self.self_id,
            })
            .map_err(|_| RpcError::PeerUnavailable {
                name: envelope.name.clone(),
            })
    }

    async fn reply(
        &self,
        _source: PeerId,
        envelope: &Envelope,
        _origin: &str,
    ) -> Result<(), RpcError> {
        // A fake pair only ever has one counterpart; `source` is not used
        // to pick among several, unlike a real multi-frame host.
        self.send(envelope, _origin).await
    }

    async fn recv(&mut self) -> Option<MessageEvent> {
        self.inbox.recv().await
    }
}

/// Constructs a pair of [`FakeTransport`]s wired directly to each other.
pub struct FakeChannel;

impl FakeChannel {
    /// Build a symmetric pair of transports: messages sent on one arrive
    /// on the other's [`Transport::recv`]. `origin_a`/`origin_b` are the
    /// origins each side reports to its counterpart.
    #[must_use]
    pub fn pair(origin_a: impl Into<String>, origin_b: impl Into<String>) -> (FakeTransport, FakeTransport) {
        let (tx_a_to_b, rx_a_to_b) = mpsc::unbounded_channel();
        let (tx_b_to_a, rx_b_to_a) = mpsc::unbounded_channel();
        let a = FakeTransport {
            self_id: PeerId(0),
            origin: origin_a.into(),
            outbox: tx_a_to_b,
            inbox: rx_b_to_a,
        };
        let b = FakeTransport {
            self_id: PeerId(1),
            origin: origin_b.into(),
            outbox: tx_b_to_a,
            inbox: rx_a_to_b,
        };
        (a, b)
    }
}

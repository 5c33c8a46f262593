//! The pending-call correlation table (§4.4 "Pending-call semantics"):
//! every in-flight `CALL` is keyed by its id until a matching `RESULT`/
//! `ERROR` arrives.

use std::collections::HashMap;

use rpc_error::RpcError;
use tokio::sync::oneshot;

use crate::fabric::CallOutcome;

/// Owned exclusively by the consumer's loop task — never shared, so no
/// locking is needed (§4.4 "Shared-resource policy").
#[derive(Default)]
pub(crate) struct PendingCalls {
    inner: HashMap<String, oneshot::Sender<Result<CallOutcome, RpcError>>>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a newly sent call, to be resolved later by [`Self::resolve`].
    pub(crate) fn register(&mut self, id: String, respond: oneshot::Sender<Result<CallOutcome, RpcError>>) {
        self.inner.insert(id, respond);
    }

    /// Dispatch `outcome` to the caller waiting on `id`, removing the entry.
    /// Silently drops if `id` is unknown (a duplicate/late `RESULT`, or one
    /// whose caller already gave up).
    pub(crate) fn resolve(&mut self, id: &str, outcome: Result<CallOutcome, RpcError>) {
        if let Some(respond) = self.inner.remove(id) {
            let _ = respond.send(outcome);
        }
    }

    /// Reject every outstanding call with `err` — used when the transport
    /// closes or `shutdown()` is called while calls are still in flight.
    pub(crate) fn fail_all(&mut self, err: impl Fn() -> RpcError) {
        for (_, respond) in self.inner.drain() {
            let _ = respond.send(Err(err()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_to_the_registered_receiver() {
        let mut pending = PendingCalls::new();
        let (tx, rx) = oneshot::channel();
        pending.register("c1".to_string(), tx);
        pending.resolve("c1", Ok(CallOutcome::Value(rpc_core::Value::Number(1.0))));
        let outcome = rx.await.unwrap().unwrap();
        assert!(matches!(outcome, CallOutcome::Value(rpc_core::Value::Number(n)) if n == 1.0));
    }

    #[tokio::test]
    async fn resolve_of_unknown_id_is_silently_dropped() {
        let mut pending = PendingCalls::new();
        pending.resolve("missing", Ok(CallOutcome::Value(rpc_core::Value::Null)));
    }

    #[tokio::test]
    async fn fail_all_rejects_every_outstanding_call() {
        let mut pending = PendingCalls::new();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        pending.register("c1".to_string(), tx1);
        pending.register("c2".to_string(), tx2);
        pending.fail_all(|| RpcError::PeerUnavailable { name: "consumer".into() });
        assert!(rx1.await.unwrap().is_err());
        assert!(rx2.await.unwrap().is_err());
    }
}

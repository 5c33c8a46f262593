//! The provider runtime: handshake broadcast, message loop, and TTL
//! sweeper (§4.3).

use rpc_core::{snapshot, ApiTree};
use rpc_error::RpcError;
use rpc_protocol::{Envelope, Message, ReadyPayload};
use rpc_transport::{MessageEvent, Transport};
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::dispatch::{dispatch_call, release_handle};
use crate::handle::HandleTable;

/// A running provider. Dropping this stops the message loop by aborting
/// its background task — there is no graceful shutdown handshake on the
/// wire (§1 "the core... the end-user API object itself" has no teardown
/// message; a real embedding simply tears down the channel).
pub struct Provider {
    task: tokio::task::JoinHandle<()>,
}

impl Provider {
    /// Build a snapshot of `tree`, broadcast `READY` (or `INIT_ERROR` on
    /// failure), and spawn the background message loop that serves `CALL`/
    /// `GET`/`RELEASE_HANDLE` for the lifetime of `transport` (§4.3
    /// "Construction", createProvider is side-effect only — see
    /// `rpc_provider::create_provider` in the facade crate for the
    /// fire-and-forget entry point built on top of this handle).
    pub async fn spawn<T>(tree: ApiTree, config: ProviderConfig, mut transport: T) -> Provider
    where
        T: Transport + Send + 'static,
    {
        let snap = snapshot(&tree);
        let ready = Envelope::new(
            config.name.clone(),
            Message::Ready {
                payload: ReadyPayload {
                    values: snap.values,
                    functions: snap.functions,
                },
            },
        );
        if let Err(e) = transport.send(&ready, &config.target_origin).await {
            warn!(target: "iframe_rpc.provider", "initial READY broadcast failed: {e}");
            let init_err = Envelope::new(
                config.name.clone(),
                Message::InitError {
                    error: e.to_wire_message(),
                },
            );
            let _ = transport.send(&init_err, &config.target_origin).await;
        }

        let task = tokio::spawn(run_loop(tree, config, transport));
        Provider { task }
    }

    /// Wait for the message loop to end (it normally only ends when the
    /// transport closes). Mostly useful in tests that want to observe a
    /// clean shutdown.
    pub async fn join(self) {
        let _ = self.task.await;
    }

    /// Stop the message loop immediately, without waiting for the
    /// transport to close on its own.
    pub fn abort(&self) {
        self.task.abort();
    }
}

async fn run_loop<T>(tree: ApiTree, config: ProviderConfig, mut transport: T)
where
    T: Transport,
{
    let mut handles = HandleTable::new();
    let sweeper_disabled = config.sweeper_disabled();
    let mut sweep_ticker = tokio::time::interval(if sweeper_disabled {
        std::time::Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        config.sweep_interval
    });
    sweep_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Consume the immediate first tick every `interval` fires on creation.
    sweep_ticker.tick().await;

    loop {
        tokio::select! {
            event = transport.recv() => {
                let Some(event) = event else {
                    debug!(target: "iframe_rpc.provider", "transport closed, stopping message loop");
                    break;
                };
                handle_event(&tree, &mut handles, &config, &transport, event).await;
            }
            _ = sweep_ticker.tick(), if !sweeper_disabled => {
                handles.sweep(config.handle_ttl);
            }
        }
    }
}

async fn handle_event<T>(
    tree: &ApiTree,
    handles: &mut HandleTable,
    config: &ProviderConfig,
    transport: &T,
    event: MessageEvent,
) where
    T: Transport,
{
    if event.envelope.name != config.name {
        return;
    }
    if !config.allowed_origins.allows(&event.origin) {
        warn!(target: "iframe_rpc.provider", origin = %event.origin, "dropping message from disallowed origin");
        return;
    }

    match event.envelope.message {
        Message::Get => {
            let snap = snapshot(tree);
            let ready = Envelope::new(
                config.name.clone(),
                Message::Ready {
                    payload: ReadyPayload {
                        values: snap.values,
                        functions: snap.functions,
                    },
                },
            );
            if let Err(e) = transport.reply(event.source, &ready, &event.origin).await {
                warn!(target: "iframe_rpc.provider", "failed to reply to GET: {e}");
            }
        }
        Message::Call {
            id,
            method,
            args,
            handle,
        } => {
            let response = match dispatch_call(tree, handles, handle.as_deref(), &method, args)
                .await
            {
                Ok(result) => Message::Result { id, result },
                Err(e) => Message::Error {
                    id,
                    error: e.to_wire_message(),
                },
            };
            let envelope = Envelope::new(config.name.clone(), response);
            if let Err(e) = transport.reply(event.source, &envelope, &event.origin).await {
                debug!(target: "iframe_rpc.provider", "failed to send CALL response: {e}");
            }
        }
        Message::ReleaseHandle { handle } => {
            release_handle(handles, &handle);
        }
        Message::Ready { .. } | Message::Result { .. } | Message::Error { .. } | Message::InitError { .. } => {
            // Provider-origin messages looping back (e.g. a test harness
            // sharing one bus both ways); never acted on here.
        }
        Message::Unknown => {
            debug!(target: "iframe_rpc.provider", "dropping unrecognized message type");
        }
    }
}

//! The consumer runtime: handshake state machine, message loop, and the
//! weak-reference GC sweeper (§4.4).

use rpc_core::gen_id;
use rpc_error::RpcError;
use rpc_protocol::{Envelope, Message};
use rpc_transport::{MessageEvent, PeerId, Transport};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::command::LoopCommand;
use crate::config::{ConsumerConfig, ReleaseOnPageHide};
use crate::fabric::{CallOutcome, ConsumerProxy};
use crate::handle::ActiveHandleTable;
use crate::pending::PendingCalls;
use crate::snapshot::ConsumerSnapshot;

/// A page-hide transition to hand to [`Consumer::on_page_hide`] (§4.4
/// "Page-lifecycle release").
#[derive(Debug, Clone, Copy)]
pub struct PageHideEvent {
    /// `true` if the browsing context is being preserved (e.g. bfcache),
    /// matching the DOM event's own `persisted` field. `releaseOnPageHide:
    /// "nonPersisted"` (the default) only releases when this is `false`.
    pub persisted: bool,
}

/// A connected consumer: the root proxy plus the handles needed to tear the
/// channel down (§4.4, §4.5 `createConsumer`).
pub struct Consumer {
    task: JoinHandle<()>,
    commands: mpsc::UnboundedSender<LoopCommand>,
    root: ConsumerProxy,
}

impl Consumer {
    /// Attach to `name` over `transport`, waiting up to `config.timeout`
    /// for a matching `READY` (§4.4 "Initialisation state machine").
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::HandshakeTimeout`] if nothing arrives in time,
    /// or [`RpcError::InitFailed`] if the provider sent `INIT_ERROR` first.
    pub async fn connect<T>(
        name: impl Into<String>,
        config: ConsumerConfig,
        transport: T,
    ) -> Result<Consumer, RpcError>
    where
        T: Transport + Send + 'static,
    {
        let name = name.into();
        let timeout = config.timeout;
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (init_tx, init_rx) = oneshot::channel();

        let task = tokio::spawn(run_loop(
            name.clone(),
            config,
            transport,
            cmd_rx,
            cmd_tx.clone(),
            init_tx,
        ));

        match tokio::time::timeout(timeout, init_rx).await {
            Ok(Ok(Ok(root))) => Ok(Consumer {
                task,
                commands: cmd_tx,
                root,
            }),
            Ok(Ok(Err(e))) => {
                task.abort();
                Err(e)
            }
            Ok(Err(_)) => {
                task.abort();
                Err(RpcError::PeerUnavailable { name })
            }
            Err(_) => {
                task.abort();
                Err(RpcError::HandshakeTimeout { name })
            }
        }
    }

    /// The root proxy resolved at handshake.
    #[must_use]
    pub fn root(&self) -> &ConsumerProxy {
        &self.root
    }

    /// Release every outstanding handle and stop the message loop
    /// (§4.4 "before-unload": always release).
    pub fn shutdown(&self) {
        let _ = self.commands.send(LoopCommand::Shutdown);
    }

    /// Apply the configured `releaseOnPageHide` policy for a page-hide
    /// transition.
    pub fn on_page_hide(&self, event: PageHideEvent) {
        let _ = self.commands.send(LoopCommand::OnPageHide {
            persisted: event.persisted,
        });
    }

    /// Wait for the message loop to end (normally only after
    /// [`Self::shutdown`] or the transport closing).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

async fn run_loop<T>(
    name: String,
    config: ConsumerConfig,
    mut transport: T,
    mut commands: mpsc::UnboundedReceiver<LoopCommand>,
    self_commands: mpsc::UnboundedSender<LoopCommand>,
    init: oneshot::Sender<Result<ConsumerProxy, RpcError>>,
) where
    T: Transport,
{
    let get_envelope = Envelope::new(name.clone(), Message::Get);
    if let Err(e) = transport.send(&get_envelope, &config.target_origin).await {
        debug!(target: "iframe_rpc.consumer", "initial GET failed, waiting for an unsolicited READY: {e}");
    }

    let Some((bound_peer, bound_origin)) =
        wait_for_handshake(&name, &config, &mut transport, &self_commands, init).await
    else {
        return;
    };

    let mut pending = PendingCalls::new();
    let mut active = ActiveHandleTable::new();
    let mut sweep_ticker = tokio::time::interval(config.gc_sweep_interval);
    sweep_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    sweep_ticker.tick().await;

    loop {
        tokio::select! {
            event = transport.recv() => {
                let Some(event) = event else {
                    debug!(target: "iframe_rpc.consumer", "transport closed, stopping message loop");
                    pending.fail_all(|| RpcError::PeerUnavailable { name: name.clone() });
                    break;
                };
                handle_inbound(&name, bound_peer, &config, &self_commands, &mut pending, &mut active, event);
            }
            cmd = commands.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                if handle_command(&name, bound_peer, &bound_origin, &config, &transport, &mut pending, &mut active, cmd).await {
                    break;
                }
            }
            _ = sweep_ticker.tick() => {
                for id in active.sweep_collected() {
                    send_release(&name, bound_peer, &bound_origin, &transport, id).await;
                }
            }
        }
    }
}

/// *Waiting* phase of §4.4's state machine: resolves `init` with the root
/// proxy once a matching `READY` arrives (or with an error on
/// `INIT_ERROR`/transport closure) and returns the bound peer/origin to
/// the caller, or `None` once `init` has already been resolved with an
/// error and the loop should simply stop.
async fn wait_for_handshake<T>(
    name: &str,
    config: &ConsumerConfig,
    transport: &mut T,
    self_commands: &mpsc::UnboundedSender<LoopCommand>,
    init: oneshot::Sender<Result<ConsumerProxy, RpcError>>,
) -> Option<(PeerId, String)>
where
    T: Transport,
{
    loop {
        let Some(event) = transport.recv().await else {
            let _ = init.send(Err(RpcError::PeerUnavailable { name: name.to_string() }));
            return None;
        };
        if event.envelope.name != name || !config.allowed_origins.allows(&event.origin) {
            continue;
        }
        match event.envelope.message {
            Message::Ready { payload } => {
                let snapshot = ConsumerSnapshot {
                    values: payload.values,
                    functions: payload.functions,
                };
                let root = ConsumerProxy::build_root(
                    snapshot,
                    config.hide_structure,
                    self_commands.clone(),
                    None,
                );
                let bound = (event.source, event.origin.clone());
                // First READY wins; this phase is never re-entered, so two
                // successive broadcasts leave the consumer bound to
                // whichever peer answered first (§4.4 "Two successive
                // handshake broadcasts leave the Consumer bound to exactly
                // one Provider instance").
                let _ = init.send(Ok(root));
                return Some(bound);
            }
            Message::InitError { error } => {
                let _ = init.send(Err(RpcError::InitFailed { cause: error }));
                return None;
            }
            _ => {}
        }
    }
}

fn handle_inbound(
    name: &str,
    bound_peer: PeerId,
    config: &ConsumerConfig,
    self_commands: &mpsc::UnboundedSender<LoopCommand>,
    pending: &mut PendingCalls,
    active: &mut ActiveHandleTable,
    event: MessageEvent,
) {
    if event.envelope.name != name
        || event.source != bound_peer
        || !config.allowed_origins.allows(&event.origin)
    {
        return;
    }
    match event.envelope.message {
        Message::Result { id, result } => {
            let outcome = CallOutcome::from_wire(result, config, self_commands, active);
            pending.resolve(&id, Ok(outcome));
        }
        Message::Error { id, error } => {
            pending.resolve(&id, Err(RpcError::from_wire_message(error)));
        }
        Message::Ready { .. }
        | Message::InitError { .. }
        | Message::Get
        | Message::Call { .. }
        | Message::ReleaseHandle { .. }
        | Message::Unknown => {
            // Not expected from a provider once bound; provider-origin
            // re-broadcasts and loop-backs are ignored here.
        }
    }
}

/// Returns `true` if the loop should stop after this command.
async fn handle_command<T>(
    name: &str,
    bound_peer: PeerId,
    bound_origin: &str,
    config: &ConsumerConfig,
    transport: &T,
    pending: &mut PendingCalls,
    active: &mut ActiveHandleTable,
    cmd: LoopCommand,
) -> bool
where
    T: Transport,
{
    match cmd {
        LoopCommand::Call {
            method,
            args,
            handle_id,
            respond,
        } => {
            let id = gen_id();
            let envelope = Envelope::new(
                name.to_string(),
                Message::Call {
                    id: id.clone(),
                    method,
                    args,
                    handle: handle_id,
                },
            );
            match transport.reply(bound_peer, &envelope, bound_origin).await {
                Ok(()) => pending.register(id, respond),
                Err(e) => {
                    let _ = respond.send(Err(e));
                }
            }
            false
        }
        LoopCommand::ReleaseHandle { id } => {
            active.untrack(&id);
            send_release(name, bound_peer, bound_origin, transport, id).await;
            false
        }
        LoopCommand::Shutdown => {
            for id in active.tracked_ids() {
                send_release(name, bound_peer, bound_origin, transport, id).await;
            }
            pending.fail_all(|| RpcError::PeerUnavailable { name: name.to_string() });
            true
        }
        LoopCommand::OnPageHide { persisted } => {
            let should_release = match config.release_on_page_hide {
                ReleaseOnPageHide::Off => false,
                ReleaseOnPageHide::All => true,
                ReleaseOnPageHide::NonPersisted => !persisted,
            };
            if should_release {
                for id in active.tracked_ids() {
                    send_release(name, bound_peer, bound_origin, transport, id).await;
                }
            }
            false
        }
    }
}

async fn send_release<T>(name: &str, bound_peer: PeerId, bound_origin: &str, transport: &T, id: String)
where
    T: Transport,
{
    let envelope = Envelope::new(name.to_string(), Message::ReleaseHandle { handle: id });
    if let Err(e) = transport.reply(bound_peer, &envelope, bound_origin).await {
        debug!(target: "iframe_rpc.consumer", "failed to send RELEASE_HANDLE: {e}");
    }
}

//! Internal commands sent from user-facing handles into the single task
//! that owns all consumer state (§4.4 "Shared-resource policy": the
//! pending-call map and active-handle table are mutated only from one
//! task, never locked).

use rpc_core::Value;
use rpc_error::RpcError;
use tokio::sync::oneshot;

use crate::fabric::CallOutcome;

/// A message from a [`crate::fabric::Callable`] or [`crate::Consumer`]
/// handle into the background loop task.
pub(crate) enum LoopCommand {
    /// Post a `CALL` and await its `RESULT`/`ERROR`.
    Call {
        method: String,
        args: Vec<Value>,
        handle_id: Option<String>,
        respond: oneshot::Sender<Result<CallOutcome, RpcError>>,
    },
    /// Post `RELEASE_HANDLE` for `id` and stop tracking it. Best-effort:
    /// no response channel, matching the wire message's own fire-and-forget
    /// semantics.
    ReleaseHandle { id: String },
    /// Release every outstanding handle and stop the loop (`shutdown()`,
    /// "before-unload").
    Shutdown,
    /// Apply `releaseOnPageHide` policy for a page-hide transition.
    OnPageHide {
        /// `true` if the browsing context is being preserved (bfcache-style
        /// "persisted" transition); `nonPersisted` only releases when this
        /// is `false`.
        persisted: bool,
    },
}

//! Proxy fabrics (§4.4 "Lazy proxy fabric", "Materialised fabric"): the two
//! strategies for turning a [`ConsumerSnapshot`] into something callers can
//! read values from and invoke functions on.
//!
//! Both fabrics resolve a child read with the exact same six-step
//! algorithm ([`resolve_step`]) — `LazyFabric` runs it on every read;
//! `MaterializedFabric` runs it once per function path at build time and
//! caches the result in a [`ConsumerTree`] arena. Sharing one resolution
//! function is how the two stay behaviourally identical (matching
//! `spec.md`'s "exercised by the same conformance tests").

use std::sync::Arc;

use indexmap::IndexMap;
use rpc_core::Value;
use rpc_error::RpcError;
use rpc_protocol::{CallResult, HandlePayload};
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::command::LoopCommand;
use crate::config::ConsumerConfig;
use crate::handle::{ActiveHandleTable, HandleGuard};
use crate::snapshot::ConsumerSnapshot;

fn join(prefix: &str, seg: &str) -> String {
    if prefix.is_empty() {
        seg.to_string()
    } else {
        format!("{prefix}.{seg}")
    }
}

/// The outcome of resolving one property read against a [`ConsumerSnapshot`]
/// (§4.4 steps 1-6).
#[derive(Debug, Clone)]
enum Resolved {
    Value(Value),
    Callable(String),
    SubTree(String),
    Undefined,
}

/// Run steps 1-6 of the lazy-proxy algorithm for `key` read under `prefix`
/// (`full = prefix.key`, or just `key` when `prefix` is empty).
fn resolve_step(snapshot: &ConsumerSnapshot, prefix: &str, key: &str) -> Resolved {
    let full = join(prefix, key);

    // Step 1.
    if snapshot.is_function(&full) {
        return Resolved::Callable(full);
    }

    // Step 2: alias resolution through the parent's canonical path.
    if let Some(canon_parent) = snapshot.canonical_path(prefix) {
        let candidate = join(&canon_parent, key);
        if snapshot.is_function(&candidate) {
            return Resolved::Callable(candidate);
        }
    }

    // Step 3.
    if let Some(v) = snapshot.read(&full) {
        if v.is_plain_container() {
            return Resolved::SubTree(full);
        }
        return Resolved::Value(v.clone());
    }

    // Step 4.
    if snapshot.has_function_under(&full) {
        return Resolved::SubTree(full);
    }

    // Step 5: alias-expansion descendant check.
    if let Some(canon_parent) = snapshot.canonical_path(prefix) {
        let c_k = join(&canon_parent, key);
        if snapshot.has_function_under(&c_k) {
            return Resolved::SubTree(full);
        }
    }

    // Step 6.
    Resolved::Undefined
}

/// What a [`ConsumerProxy::get`] read produces.
pub enum ConsumerRead {
    /// A plain, already-resolved value.
    Value(Value),
    /// A callable at this position.
    Callable(Callable),
    /// A nested proxy — read further keys through it.
    Proxy(ConsumerProxy),
    /// No such property under either resolution path.
    Undefined,
}

/// One leaf in a materialised tree.
#[derive(Debug, Clone)]
enum ConsumerNode {
    Value(Value),
    Array(Vec<ConsumerNodeId>),
    Object(IndexMap<String, ConsumerNodeId>),
    Callable(String),
}

/// An index into a [`ConsumerTree`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConsumerNodeId(usize);

/// A pre-walked, enumerable materialisation of a [`ConsumerSnapshot`] (§4.4
/// "Materialised fabric"). Built once, at handshake (or handle-consumption)
/// time.
#[derive(Debug)]
struct ConsumerTree {
    nodes: Vec<ConsumerNode>,
    root: ConsumerNodeId,
}

impl ConsumerTree {
    fn node(&self, id: ConsumerNodeId) -> &ConsumerNode {
        &self.nodes[id.0]
    }
}

/// Build a materialised tree from a snapshot: a deep copy of `values`
/// (cycles preserved via a canonical-path identity map, mirroring
/// `rpc_core::ApiTreeBuilder`'s own arena-identity approach) with a
/// [`ConsumerNode::Callable`] installed at every function path.
fn build_materialized(snapshot: &ConsumerSnapshot) -> ConsumerTree {
    let mut nodes = Vec::new();
    let mut canon: std::collections::HashMap<String, ConsumerNodeId> = std::collections::HashMap::new();
    let root = build_value_node(&snapshot.values, "", &mut nodes, &mut canon);

    for path in &snapshot.functions {
        let (parent_path, leaf) = path.rsplit_once('.').unwrap_or(("", path));
        let Some(&parent_id) = canon.get(parent_path) else {
            // A container's canonical path always precedes its function
            // children in `snapshot.functions` (§4.1 BFS discovery order);
            // this would only miss if the provider violated that invariant.
            continue;
        };
        let leaf_id = push(&mut nodes, ConsumerNode::Callable(path.clone()));
        match &mut nodes[parent_id.0] {
            ConsumerNode::Object(map) => {
                map.insert(leaf.to_string(), leaf_id);
            }
            ConsumerNode::Array(items) => {
                if let Ok(idx) = leaf.parse::<usize>() {
                    if idx < items.len() {
                        items[idx] = leaf_id;
                    }
                }
            }
            ConsumerNode::Value(_) | ConsumerNode::Callable(_) => {}
        }
    }

    ConsumerTree { nodes, root }
}

fn push(nodes: &mut Vec<ConsumerNode>, node: ConsumerNode) -> ConsumerNodeId {
    let id = ConsumerNodeId(nodes.len());
    nodes.push(node);
    id
}

fn build_value_node(
    value: &Value,
    path: &str,
    nodes: &mut Vec<ConsumerNode>,
    canon: &mut std::collections::HashMap<String, ConsumerNodeId>,
) -> ConsumerNodeId {
    if let Value::Alias(target) = value {
        if let Some(&id) = canon.get(target) {
            return id;
        }
        // Defensive: canonical targets are always built before their
        // aliases in a well-formed snapshot; fall through to a Null leaf
        // rather than panic on a malformed one.
        return push(nodes, ConsumerNode::Value(Value::Null));
    }

    match value {
        Value::Object(map) => {
            let id = push(nodes, ConsumerNode::Object(IndexMap::new()));
            canon.insert(path.to_string(), id);
            let mut built = IndexMap::new();
            for (k, v) in map {
                let child_path = join(path, k);
                built.insert(k.clone(), build_value_node(v, &child_path, nodes, canon));
            }
            nodes[id.0] = ConsumerNode::Object(built);
            id
        }
        Value::Array(items) => {
            let id = push(nodes, ConsumerNode::Array(Vec::new()));
            canon.insert(path.to_string(), id);
            let mut built = Vec::with_capacity(items.len());
            for (i, v) in items.iter().enumerate() {
                let child_path = join(path, &i.to_string());
                built.push(build_value_node(v, &child_path, nodes, canon));
            }
            nodes[id.0] = ConsumerNode::Array(built);
            id
        }
        other => {
            let id = push(nodes, ConsumerNode::Value(other.clone()));
            canon.insert(path.to_string(), id);
            id
        }
    }
}

/// Which strategy backs a [`ConsumerProxy`].
enum FabricKind {
    Lazy(Arc<ConsumerSnapshot>),
    Materialized(Arc<ConsumerTree>),
}

/// Where a [`ConsumerProxy`] currently sits within its fabric.
enum Position {
    Lazy(String),
    Materialized(ConsumerNodeId),
}

struct ProxyState {
    kind: FabricKind,
    commands: mpsc::UnboundedSender<LoopCommand>,
    /// Present only for a scoped (handle-consumed) proxy; `None` for the
    /// root proxy, which has nothing to `__release`.
    handle: Option<Arc<HandleGuard>>,
}

/// A readable position in the consumer's view of the provider's API (§4.4
/// "Lazy proxy fabric" / "Materialised fabric"). Cheap to clone — clones
/// share the same underlying fabric and handle scope.
#[derive(Clone)]
pub struct ConsumerProxy {
    state: Arc<ProxyState>,
    position: Arc<Position>,
}

impl ConsumerProxy {
    /// Build the root proxy for a freshly received snapshot, choosing the
    /// lazy or materialised strategy per `hide_structure` (§4.4
    /// construction option).
    pub(crate) fn build_root(
        snapshot: ConsumerSnapshot,
        hide_structure: bool,
        commands: mpsc::UnboundedSender<LoopCommand>,
        handle: Option<Arc<HandleGuard>>,
    ) -> ConsumerProxy {
        let state = Arc::new(ProxyState {
            kind: if hide_structure {
                FabricKind::Lazy(Arc::new(snapshot))
            } else {
                FabricKind::Materialized(Arc::new(build_materialized(&snapshot)))
            },
            commands,
            handle,
        });
        let position = match &state.kind {
            FabricKind::Lazy(_) => Position::Lazy(String::new()),
            FabricKind::Materialized(tree) => Position::Materialized(tree.root),
        };
        ConsumerProxy {
            state,
            position: Arc::new(position),
        }
    }

    /// Resolve a single property read (§4.4 steps 1-6, run live for a lazy
    /// fabric or replayed against the cached tree for a materialised one).
    #[must_use]
    pub fn get(&self, key: &str) -> ConsumerRead {
        match (&self.state.kind, self.position.as_ref()) {
            (FabricKind::Lazy(snapshot), Position::Lazy(prefix)) => {
                match resolve_step(snapshot, prefix, key) {
                    Resolved::Value(v) => ConsumerRead::Value(v),
                    Resolved::Callable(path) => ConsumerRead::Callable(self.callable(path)),
                    Resolved::SubTree(p) => ConsumerRead::Proxy(self.reposition(Position::Lazy(p))),
                    Resolved::Undefined => ConsumerRead::Undefined,
                }
            }
            (FabricKind::Materialized(tree), Position::Materialized(id)) => {
                let child = match tree.node(*id) {
                    ConsumerNode::Object(map) => map.get(key).copied(),
                    ConsumerNode::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).copied()),
                    ConsumerNode::Value(_) | ConsumerNode::Callable(_) => None,
                };
                match child {
                    None => ConsumerRead::Undefined,
                    Some(child_id) => match tree.node(child_id) {
                        ConsumerNode::Value(v) => ConsumerRead::Value(v.clone()),
                        ConsumerNode::Callable(path) => ConsumerRead::Callable(self.callable(path.clone())),
                        ConsumerNode::Object(_) | ConsumerNode::Array(_) => {
                            ConsumerRead::Proxy(self.reposition(Position::Materialized(child_id)))
                        }
                    },
                }
            }
            _ => unreachable!("a proxy's fabric kind and position are always constructed together"),
        }
    }

    /// The handle id this proxy is scoped to, if any (`None` for the root
    /// proxy).
    #[must_use]
    pub fn handle_id(&self) -> Option<&str> {
        self.state.handle.as_deref().map(HandleGuard::id)
    }

    /// Issue `RELEASE_HANDLE` for this proxy's handle, if it is scoped to
    /// one (§4.4 "carries a `__release` method"). A no-op on the root
    /// proxy, which owns no handle.
    pub fn release(&self) {
        release_guard(&self.state.handle, &self.state.commands);
    }

    fn reposition(&self, position: Position) -> ConsumerProxy {
        ConsumerProxy {
            state: Arc::clone(&self.state),
            position: Arc::new(position),
        }
    }

    fn callable(&self, method: String) -> Callable {
        Callable {
            method,
            handle: self.state.handle.clone(),
            commands: self.state.commands.clone(),
        }
    }
}

fn release_guard(handle: &Option<Arc<HandleGuard>>, commands: &mpsc::UnboundedSender<LoopCommand>) {
    if let Some(guard) = handle {
        if guard.mark_released() {
            let _ = commands.send(LoopCommand::ReleaseHandle { id: guard.id().to_string() });
        }
    }
}

/// A function reachable at a dotted path, optionally scoped to a handle
/// (§4.4 "return a callable that posts CALL").
#[derive(Clone)]
pub struct Callable {
    method: String,
    handle: Option<Arc<HandleGuard>>,
    commands: mpsc::UnboundedSender<LoopCommand>,
}

impl Callable {
    /// Invoke this function, awaiting its `RESULT`/`ERROR` (§4.4 "Pending
    /// call semantics"). Short-circuits without touching the wire if this
    /// callable's handle has already been released.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::HandleReleased`] if the bound handle was already
    /// released; [`RpcError::PeerUnavailable`] if the consumer's loop task
    /// is gone; otherwise whatever [`RpcError`] the provider's `ERROR`
    /// carried.
    pub async fn call(&self, args: Vec<Value>) -> Result<CallOutcome, RpcError> {
        if let Some(guard) = &self.handle {
            if guard.is_released() {
                return Err(RpcError::HandleReleased {
                    id: guard.id().to_string(),
                });
            }
        }
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(LoopCommand::Call {
                method: self.method.clone(),
                args,
                handle_id: self.handle.as_ref().map(|g| g.id().to_string()),
                respond: tx,
            })
            .map_err(|_| RpcError::PeerUnavailable {
                name: "consumer".to_string(),
            })?;
        rx.await.map_err(|_| RpcError::PeerUnavailable {
            name: "consumer".to_string(),
        })?
    }

    /// Release the handle this callable is scoped to, if any.
    pub fn release(&self) {
        release_guard(&self.handle, &self.commands);
    }
}

/// What a completed `CALL` produced (§4.3 step 4 "Serialisation"), recast
/// on the consumer side as either a plain value or a freshly scoped handle.
pub enum CallOutcome {
    /// A plain, structured-clone-safe value.
    Value(Value),
    /// The result was itself a function (§4.4 "for `function` kind, return
    /// a callable").
    Function(Callable),
    /// The result was a non-pass-through object/array containing a
    /// function (§4.4 "for `object` kind, return a scoped proxy").
    Object(ConsumerProxy),
}

impl CallOutcome {
    /// Turn a wire-level [`CallResult`] into a [`CallOutcome`], minting and
    /// tracking a [`HandleGuard`] when the result carries one.
    pub(crate) fn from_wire(
        result: CallResult,
        config: &ConsumerConfig,
        commands: &mpsc::UnboundedSender<LoopCommand>,
        active: &mut ActiveHandleTable,
    ) -> CallOutcome {
        match result {
            CallResult::Value(v) => CallOutcome::Value(v),
            CallResult::Handle { handle, .. } => {
                let guard = Arc::new(HandleGuard::new(handle.id().to_string()));
                active.track(&guard);
                match handle {
                    HandlePayload::Function { .. } => CallOutcome::Function(Callable {
                        method: String::new(),
                        handle: Some(guard),
                        commands: commands.clone(),
                    }),
                    HandlePayload::Object { values, functions, .. } => {
                        let snapshot = ConsumerSnapshot { values, functions };
                        CallOutcome::Object(ConsumerProxy::build_root(
                            snapshot,
                            config.hide_structure,
                            commands.clone(),
                            Some(guard),
                        ))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: Vec<(&str, Value)>) -> Value {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<IndexMap<_, _>>())
    }

    fn test_commands() -> mpsc::UnboundedSender<LoopCommand> {
        mpsc::unbounded_channel().0
    }

    fn cyclic_snapshot() -> ConsumerSnapshot {
        // cycle = { a: 1, nested: { val: 2, parent: <alias ""> }, self: <alias ""> }
        let values = obj(vec![
            ("a", Value::Number(1.0)),
            (
                "nested",
                obj(vec![
                    ("val", Value::Number(2.0)),
                    ("parent", Value::Alias(String::new())),
                ]),
            ),
            ("self", Value::Alias(String::new())),
        ]);
        ConsumerSnapshot {
            values,
            functions: vec!["nested.fn".to_string()],
        }
    }

    #[test]
    fn lazy_fabric_resolves_plain_value() {
        let snapshot = cyclic_snapshot();
        let proxy = ConsumerProxy::build_root(snapshot, true, test_commands(), None);
        match proxy.get("a") {
            ConsumerRead::Value(Value::Number(n)) => assert_eq!(n, 1.0),
            _ => panic!("expected a plain number"),
        }
    }

    #[test]
    fn lazy_fabric_resolves_function_path() {
        let snapshot = cyclic_snapshot();
        let proxy = ConsumerProxy::build_root(snapshot, true, test_commands(), None);
        let nested = match proxy.get("nested") {
            ConsumerRead::Proxy(p) => p,
            _ => panic!("expected a nested proxy"),
        };
        assert!(matches!(nested.get("fn"), ConsumerRead::Callable(_)));
    }

    #[test]
    fn lazy_fabric_resolves_self_alias_then_nested_fn() {
        let snapshot = cyclic_snapshot();
        let proxy = ConsumerProxy::build_root(snapshot, true, test_commands(), None);
        let self_proxy = match proxy.get("self") {
            ConsumerRead::Proxy(p) => p,
            _ => panic!("expected self to resolve to a proxy (cyclic root alias)"),
        };
        let nested = match self_proxy.get("nested") {
            ConsumerRead::Proxy(p) => p,
            _ => panic!("expected nested proxy via self alias"),
        };
        assert!(matches!(nested.get("fn"), ConsumerRead::Callable(_)));
    }

    #[test]
    fn materialized_fabric_mirrors_lazy_resolution() {
        let snapshot = cyclic_snapshot();
        let proxy = ConsumerProxy::build_root(snapshot, false, test_commands(), None);
        match proxy.get("a") {
            ConsumerRead::Value(Value::Number(n)) => assert_eq!(n, 1.0),
            _ => panic!("expected a plain number"),
        }
        let nested = match proxy.get("nested") {
            ConsumerRead::Proxy(p) => p,
            _ => panic!("expected a nested proxy"),
        };
        assert!(matches!(nested.get("fn"), ConsumerRead::Callable(_)));
        assert!(matches!(nested.get("val"), ConsumerRead::Value(Value::Number(_))));
    }

    #[test]
    fn materialized_fabric_preserves_cycle_identity() {
        let snapshot = cyclic_snapshot();
        let proxy = ConsumerProxy::build_root(snapshot, false, test_commands(), None);
        let self_proxy = match proxy.get("self") {
            ConsumerRead::Proxy(p) => p,
            _ => panic!("expected self to materialise as a proxy"),
        };
        assert!(matches!(self_proxy.get("a"), ConsumerRead::Value(Value::Number(_))));
    }

    #[test]
    fn undefined_key_resolves_to_undefined() {
        let snapshot = cyclic_snapshot();
        let lazy = ConsumerProxy::build_root(snapshot.clone(), true, test_commands(), None);
        assert!(matches!(lazy.get("missing"), ConsumerRead::Undefined));
        let materialized = ConsumerProxy::build_root(snapshot, false, test_commands(), None);
        assert!(matches!(materialized.get("missing"), ConsumerRead::Undefined));
    }

    #[test]
    fn release_is_a_no_op_without_a_handle() {
        let snapshot = cyclic_snapshot();
        let proxy = ConsumerProxy::build_root(snapshot, true, test_commands(), None);
        proxy.release(); // must not panic
    }
}

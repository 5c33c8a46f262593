//! `CALL` dispatch (§4.3 "Incoming message handling"): context selection,
//! method resolution, invocation, and result serialisation.

use rpc_core::{get_node_deep, gen_id, snapshot, ApiNode, ApiTree, CallContext, Value};
use rpc_error::RpcError;
use rpc_protocol::{CallResult, HandleMarker, HandlePayload};

use crate::handle::{HandleKind, HandleTable};

/// Resolve `method` against `tree`, splitting it into a parent path and a
/// leaf key (§4.3 step 2 "the last segment is the function key, the
/// remainder is the parent path"). An empty `method` calls the tree's root
/// directly (§4.2 "Empty string means call the handle itself").
fn resolve_function<'a>(
    tree: &'a ApiTree,
    method: &str,
) -> Result<&'a rpc_core::ApiFunction, RpcError> {
    let not_found = || RpcError::MethodNotFound {
        method: if method.is_empty() {
            None
        } else {
            Some(method.to_string())
        },
    };

    let node_id = if method.is_empty() {
        tree.root()
    } else {
        let (parent_path, leaf) = method.rsplit_once('.').unwrap_or(("", method));
        let parent_id = get_node_deep(tree, tree.root(), parent_path).ok_or_else(not_found)?;
        match tree.node(parent_id) {
            ApiNode::Object(map) => *map.get(leaf).ok_or_else(not_found)?,
            ApiNode::Array(items) => {
                let idx: usize = leaf.parse().map_err(|_| not_found())?;
                *items.get(idx).ok_or_else(not_found)?
            }
            ApiNode::Value(_) | ApiNode::Accessor(_) | ApiNode::Function(_) => {
                return Err(not_found())
            }
        }
    };

    match tree.node(node_id) {
        ApiNode::Function(f) => Ok(f),
        _ => Err(not_found()),
    }
}

/// Run one `CALL` end to end: context selection, method resolution,
/// invocation, and result serialisation (§4.3 steps 1-4). Does not touch
/// the transport — the caller wraps the outcome into a `RESULT`/`ERROR`
/// envelope.
pub async fn dispatch_call(
    api_tree: &ApiTree,
    handles: &mut HandleTable,
    handle_id: Option<&str>,
    method: &str,
    args: Vec<Value>,
) -> Result<CallResult, RpcError> {
    // Step 1: context selection.
    let context_tree = match handle_id {
        Some(id) => {
            let entry = handles
                .touch(id)
                .ok_or_else(|| RpcError::HandleNotFound { id: id.to_string() })?;
            entry.tree.clone()
        }
        None => api_tree.clone(),
    };

    // Step 2: method resolution.
    let func = resolve_function(&context_tree, method)?;

    // Step 3: invocation, with the parent as receiver (folded into the
    // closure's own captured state — see `rpc_core::ApiFunction` docs).
    let ctx = CallContext {
        method: method.to_string(),
        handle_id: handle_id.map(str::to_string),
    };
    let result_tree = func.call(args, ctx).await?;

    // Step 4: serialisation, minting a handle when the result is or
    // contains a function.
    Ok(serialize_result(result_tree, handles))
}

fn serialize_result(result_tree: ApiTree, handles: &mut HandleTable) -> CallResult {
    let root_is_function = matches!(result_tree.node(result_tree.root()), ApiNode::Function(_));

    if root_is_function {
        let id = gen_id();
        handles.insert(id.clone(), result_tree, HandleKind::Function);
        return CallResult::Handle {
            marker: HandleMarker,
            handle: HandlePayload::Function { id },
        };
    }

    let result_snapshot = snapshot(&result_tree);
    if !result_snapshot.functions.is_empty() {
        let id = gen_id();
        let payload = HandlePayload::Object {
            id: id.clone(),
            values: result_snapshot.values,
            functions: result_snapshot.functions,
        };
        handles.insert(id, result_tree, HandleKind::Object);
        return CallResult::Handle {
            marker: HandleMarker,
            handle: payload,
        };
    }

    CallResult::Value(result_snapshot.values)
}

/// Release a handle by id (§4.3 `RELEASE_HANDLE`: unconditional, absent
/// ids are not an error).
pub fn release_handle(handles: &mut HandleTable, id: &str) {
    handles.release(id);
}

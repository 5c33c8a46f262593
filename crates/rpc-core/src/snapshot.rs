//! Snapshot construction and function-path collection (§4.1
//! `collectFunctionPaths`, `cloneValuesOnly`, `buildCanonicalIndex`).
//!
//! Built in two BFS passes over the same arena so that "first-discovered
//! shortest path" (§3 invariant) is guaranteed for both the function path
//! set and the canonical index, rather than relying on traversal-order
//! coincidence the way a naive recursive DFS would.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;

use crate::tree::{ApiNode, ApiTree, NodeId};
use crate::value::Value;

/// The result of snapshotting an [`ApiTree`]: a value-only deep copy, the
/// set of dotted paths at which a function is reachable, and the
/// provider-side canonical index (node identity → first-discovered path).
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The value-only deep copy of the API tree (§3 "Value Snapshot").
    pub values: Value,
    /// The dotted paths at which a function is reachable (§3 "Function
    /// Path Set"). In first-discovered (BFS) order.
    pub functions: Vec<String>,
    /// Node identity → first-discovered dotted path, for provider-side use
    /// (e.g. deciding a handle's `kind` without re-walking the tree).
    pub canonical: HashMap<NodeId, String>,
}

impl Snapshot {
    /// `true` if `path` is in the function path set.
    #[must_use]
    pub fn is_function(&self, path: &str) -> bool {
        self.functions.iter().any(|p| p == path)
    }

    /// `true` if any recorded function path is `prefix` itself or a
    /// descendant of it (§4.4 lazy-proxy step 4).
    #[must_use]
    pub fn has_function_under(&self, prefix: &str) -> bool {
        self.functions
            .iter()
            .any(|p| p == prefix || p.starts_with(&format!("{prefix}.")))
    }
}

fn join_path(prefix: &str, seg: &str) -> String {
    if prefix.is_empty() {
        seg.to_string()
    } else {
        format!("{prefix}.{seg}")
    }
}

/// Snapshot an [`ApiTree`]: decide value vs. function at every reachable
/// position, preserve sharing/cycles as `Value::Alias` markers, and never
/// traverse into a previously-visited node twice.
#[must_use]
pub fn snapshot(tree: &ApiTree) -> Snapshot {
    let (canonical, discovery_order) = compute_canonical_index(tree);
    let mut functions = Vec::new();
    for (id, path) in &discovery_order {
        if matches!(tree.node(*id), ApiNode::Function(_)) {
            functions.push(path.clone());
        }
    }
    let values = build_value(tree, tree.root(), "", &canonical).unwrap_or(Value::Null);
    Snapshot {
        values,
        functions,
        canonical,
    }
}

/// Phase 1: BFS assigns every reachable node its first-discovered (hence
/// shortest) dotted path. A node already present in the map is an alias
/// occurrence wherever it is found again and its children are never
/// enqueued a second time (cycles terminate here). Returns both the
/// identity → path map and the literal order nodes were first discovered
/// in, so callers that care about discovery order (e.g. the function path
/// set) don't have to reconstruct it by re-sorting the map afterwards.
fn compute_canonical_index(tree: &ApiTree) -> (HashMap<NodeId, String>, Vec<(NodeId, String)>) {
    let mut canonical = HashMap::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<(NodeId, String)> = VecDeque::new();
    queue.push_back((tree.root(), String::new()));
    while let Some((id, path)) = queue.pop_front() {
        if canonical.contains_key(&id) {
            continue;
        }
        canonical.insert(id, path.clone());
        order.push((id, path.clone()));
        match tree.node(id) {
            ApiNode::Array(items) => {
                for (i, &child) in items.iter().enumerate() {
                    queue.push_back((child, join_path(&path, &i.to_string())));
                }
            }
            ApiNode::Object(map) => {
                for (k, &child) in map {
                    queue.push_back((child, join_path(&path, k)));
                }
            }
            ApiNode::Value(_) | ApiNode::Accessor(_) | ApiNode::Function(_) => {}
        }
    }
    (canonical, order)
}

/// Phase 2: build the `Value` tree, substituting `Value::Alias(canonical)`
/// for any occurrence that is not itself the canonical position.
fn build_value(
    tree: &ApiTree,
    id: NodeId,
    path: &str,
    canonical: &HashMap<NodeId, String>,
) -> Option<Value> {
    let canon = canonical.get(&id)?;
    if canon != path {
        return Some(Value::Alias(canon.clone()));
    }
    match tree.node(id) {
        ApiNode::Value(v) => Some(v.clone()),
        ApiNode::Accessor(a) => a.get(),
        ApiNode::Function(_) => None,
        ApiNode::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, &child) in items.iter().enumerate() {
                let child_path = join_path(path, &i.to_string());
                out.push(build_value(tree, child, &child_path, canonical).unwrap_or(Value::Null));
            }
            Some(Value::Array(out))
        }
        ApiNode::Object(map) => {
            let mut out = IndexMap::new();
            for (k, &child) in map {
                let child_path = join_path(path, k);
                if let Some(v) = build_value(tree, child, &child_path, canonical) {
                    out.insert(k.clone(), v);
                }
            }
            Some(Value::Object(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ApiTreeBuilder;
    use crate::value::{get_deep, get_deep_resolved};

    #[test]
    fn empty_api_has_empty_snapshot() {
        let mut b = ApiTreeBuilder::new();
        let root = b.object();
        let tree = b.finish(root);
        let snap = snapshot(&tree);
        assert_eq!(snap.values, Value::Object(IndexMap::new()));
        assert!(snap.functions.is_empty());
    }

    #[test]
    fn simple_value_and_function() {
        let mut b = ApiTreeBuilder::new();
        let a = b.value(1.0);
        let test = b.function(|args: Vec<Value>, _ctx| async move {
            let Value::Number(n) = args[0] else {
                unreachable!()
            };
            Ok(ApiTree::leaf(n + 1.0))
        });
        let root = b.object_of(vec![("a", a), ("test", test)]);
        let tree = b.finish(root);
        let snap = snapshot(&tree);
        assert_eq!(get_deep(&snap.values, "a"), Some(&Value::Number(1.0)));
        assert_eq!(snap.functions, vec!["test".to_string()]);
        // the function key is dropped from the value snapshot entirely
        assert_eq!(get_deep(&snap.values, "test"), None);
    }

    #[test]
    fn cyclic_tree_preserves_sharing_via_alias() {
        // cycle = { a: 1, nested: { val: 2 } }; cycle.self = cycle;
        // cycle.nested.parent = cycle; cycle.nested.fn = n => n + cycle.a
        let mut b = ApiTreeBuilder::new();
        let cycle = b.object();
        let a = b.value(1.0);
        let nested = b.object();
        let val = b.value(2.0);
        let func = b.function(|args: Vec<Value>, _ctx| async move {
            let Value::Number(n) = args[0] else {
                unreachable!()
            };
            Ok(ApiTree::leaf(n + 1.0))
        });
        b.set_key(nested, "val", val);
        b.set_key(nested, "parent", cycle);
        b.set_key(nested, "fn", func);
        b.set_key(cycle, "a", a);
        b.set_key(cycle, "nested", nested);
        b.set_key(cycle, "self", cycle);
        let tree = b.finish(cycle);
        let snap = snapshot(&tree);

        assert_eq!(get_deep(&snap.values, "a"), Some(&Value::Number(1.0)));
        assert_eq!(get_deep(&snap.values, "self"), Some(&Value::Alias(String::new())));
        assert_eq!(
            get_deep_resolved(&snap.values, "self.a"),
            Some(&Value::Number(1.0))
        );
        assert_eq!(
            get_deep_resolved(&snap.values, "nested.parent.a"),
            Some(&Value::Number(1.0))
        );
        // only the first-discovered (shortest) path is recorded
        assert_eq!(snap.functions, vec!["nested.fn".to_string()]);
    }

    #[test]
    fn array_preserves_index_alignment_when_function_omitted() {
        let mut b = ApiTreeBuilder::new();
        let zero = b.value(0.0);
        let func = b.function(|_: Vec<Value>, _ctx| async move { Ok(ApiTree::leaf(1.0)) });
        let two = b.value(2.0);
        let arr = b.array_of(vec![zero, func, two]);
        let tree = b.finish(arr);
        let snap = snapshot(&tree);
        assert_eq!(
            snap.values,
            Value::Array(vec![Value::Number(0.0), Value::Null, Value::Number(2.0)])
        );
        assert_eq!(snap.functions, vec!["1".to_string()]);
    }

    #[test]
    fn throwing_accessor_omits_key() {
        let mut b = ApiTreeBuilder::new();
        let ok = b.accessor(|| Some(Value::Number(1.0)));
        let fails = b.accessor(|| None);
        let root = b.object_of(vec![("ok", ok), ("fails", fails)]);
        let tree = b.finish(root);
        let snap = snapshot(&tree);
        assert_eq!(get_deep(&snap.values, "ok"), Some(&Value::Number(1.0)));
        assert_eq!(get_deep(&snap.values, "fails"), None);
    }
}

//! The provider-side API tree (§3 "API Tree").
//!
//! Modeled as an arena (`Vec<ApiNode>` indexed by [`NodeId`]) rather than a
//! pointer graph, so that cyclic trees (`cycle.self = cycle`) are
//! expressible without `Rc<RefCell<_>>` or unsafe code: two fields that
//! reference the same `NodeId` already *are* the same object, by
//! construction, which also means arena identity directly serves as the
//! "reference identity" the spec's cycle/alias handling depends on — no
//! separate identity map is needed on this side of the channel.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;
use rpc_error::RpcError;

use crate::value::Value;

/// A future boxed for storage behind a trait object — the usual shape for
/// an async fn signature hiding behind a plain `Fn` at a trait seam.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;

/// An index into an [`ApiTree`]'s arena. Cheap to copy; equality is
/// reference identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Context passed to an [`ApiFunction`] on invocation.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// The dotted method path this invocation resolved to (empty string
    /// for "call the handle itself").
    pub method: String,
    /// The handle id this call was scoped to, if any (§4.3 "Context
    /// selection").
    pub handle_id: Option<String>,
}

/// A callable leaf in the API tree.
///
/// The receiver ("call with parent as the receiver") has no separate
/// representation here: a Rust closure captures whatever state it needs to
/// act as its own receiver, which is the idiomatic equivalent.
///
/// A function's result is itself an [`ApiTree`] fragment — this is how a
/// call can transparently return further functions (closures, or objects
/// containing closures), which the provider then wraps in a handle.
#[derive(Clone)]
pub struct ApiFunction(
    Arc<dyn Fn(Vec<Value>, CallContext) -> BoxFuture<'static, Result<ApiTree, RpcError>> + Send + Sync>,
);

impl fmt::Debug for ApiFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiFunction(..)")
    }
}

impl ApiFunction {
    /// Wrap an async closure as an [`ApiFunction`].
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApiTree, RpcError>> + Send + 'static,
    {
        ApiFunction(Arc::new(move |args, ctx| Box::pin(f(args, ctx))))
    }

    /// Invoke the function.
    pub async fn call(&self, args: Vec<Value>, ctx: CallContext) -> Result<ApiTree, RpcError> {
        (self.0)(args, ctx).await
    }
}

/// An accessor (getter) leaf: evaluated once, at snapshot time (§3
/// "Accessors are evaluated once at snapshot time; a throwing accessor
/// excludes that key" — modeled here as `None`).
#[derive(Clone)]
pub struct ApiAccessor(Arc<dyn Fn() -> Option<Value> + Send + Sync>);

impl fmt::Debug for ApiAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiAccessor(..)")
    }
}

impl ApiAccessor {
    /// Wrap a closure as an accessor.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Option<Value> + Send + Sync + 'static,
    {
        ApiAccessor(Arc::new(f))
    }

    /// Evaluate the accessor.
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        (self.0)()
    }
}

/// A node in the provider-side API tree arena.
#[derive(Debug, Clone)]
pub enum ApiNode {
    /// A plain leaf value (includes pass-through built-ins — see
    /// [`Value::is_pass_through`]).
    Value(Value),
    /// A getter, evaluated once at snapshot time.
    Accessor(ApiAccessor),
    /// An ordered sequence of children.
    Array(Vec<NodeId>),
    /// A keyed, order-preserving collection of children.
    Object(IndexMap<String, NodeId>),
    /// A callable leaf.
    Function(ApiFunction),
}

/// The provider-side API tree: an arena of [`ApiNode`]s plus a root.
#[derive(Debug, Clone)]
pub struct ApiTree {
    nodes: Vec<ApiNode>,
    root: NodeId,
}

impl ApiTree {
    /// The root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ApiNode {
        &self.nodes[id.0]
    }

    /// Number of nodes in the arena (including unreachable ones, if any).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the arena holds no nodes at all (never true for a tree
    /// built through [`ApiTreeBuilder`], which always allocates a root).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build a single-node tree wrapping a plain value. Convenience for
    /// function results that are just a value (the common case).
    #[must_use]
    pub fn leaf(value: impl Into<Value>) -> Self {
        let mut b = ApiTreeBuilder::new();
        let id = b.value(value.into());
        b.finish(id)
    }

    /// Build a single-node tree wrapping a callable. Convenience for
    /// function results that are themselves functions (e.g. `mkAdder`).
    #[must_use]
    pub fn function(f: ApiFunction) -> Self {
        let mut b = ApiTreeBuilder::new();
        let id = b.push(ApiNode::Function(f));
        b.finish(id)
    }
}

/// Builder for an [`ApiTree`] arena.
///
/// Supports cycles by allocating a node first (e.g. via [`Self::object`])
/// and wiring a child back to its own id afterwards with
/// [`Self::set_key`]/[`Self::set_item`].
#[derive(Debug, Default)]
pub struct ApiTreeBuilder {
    nodes: Vec<ApiNode>,
}

impl ApiTreeBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn push(&mut self, node: ApiNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Allocate a plain value leaf.
    pub fn value(&mut self, value: impl Into<Value>) -> NodeId {
        self.push(ApiNode::Value(value.into()))
    }

    /// Allocate an accessor (getter) leaf.
    pub fn accessor<F>(&mut self, f: F) -> NodeId
    where
        F: Fn() -> Option<Value> + Send + Sync + 'static,
    {
        self.push(ApiNode::Accessor(ApiAccessor::new(f)))
    }

    /// Allocate a callable leaf.
    pub fn function<F, Fut>(&mut self, f: F) -> NodeId
    where
        F: Fn(Vec<Value>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApiTree, RpcError>> + Send + 'static,
    {
        self.push(ApiNode::Function(ApiFunction::new(f)))
    }

    /// Allocate an empty object node, to be filled in with
    /// [`Self::set_key`] (possibly including a self-reference, for cycles).
    pub fn object(&mut self) -> NodeId {
        self.push(ApiNode::Object(IndexMap::new()))
    }

    /// Allocate an empty array node, to be filled in with
    /// [`Self::push_item`].
    pub fn array(&mut self) -> NodeId {
        self.push(ApiNode::Array(Vec::new()))
    }

    /// Build an object node from already-allocated children in one shot.
    pub fn object_of(&mut self, entries: Vec<(impl Into<String>, NodeId)>) -> NodeId {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.push(ApiNode::Object(map))
    }

    /// Build an array node from already-allocated children in one shot.
    pub fn array_of(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(ApiNode::Array(items))
    }

    /// Set (or overwrite) a key on a previously-allocated object node.
    ///
    /// # Panics
    ///
    /// Panics if `obj` does not refer to an [`ApiNode::Object`].
    pub fn set_key(&mut self, obj: NodeId, key: impl Into<String>, child: NodeId) {
        match &mut self.nodes[obj.0] {
            ApiNode::Object(map) => {
                map.insert(key.into(), child);
            }
            other => panic!("set_key called on non-object node: {other:?}"),
        }
    }

    /// Append an item to a previously-allocated array node.
    ///
    /// # Panics
    ///
    /// Panics if `arr` does not refer to an [`ApiNode::Array`].
    pub fn push_item(&mut self, arr: NodeId, child: NodeId) {
        match &mut self.nodes[arr.0] {
            ApiNode::Array(items) => items.push(child),
            other => panic!("push_item called on non-array node: {other:?}"),
        }
    }

    /// Finish building, anchoring the tree at `root`.
    #[must_use]
    pub fn finish(self, root: NodeId) -> ApiTree {
        ApiTree {
            nodes: self.nodes,
            root,
        }
    }
}

/// Walk a dotted path through the arena starting at `start` (§4.3 "Method
/// resolution" uses this for the parent-path half of a split method).
/// Numeric segments index into [`ApiNode::Array`]; other segments index
/// into [`ApiNode::Object`]. An empty path returns `start` unchanged.
#[must_use]
pub fn get_node_deep(tree: &ApiTree, start: NodeId, dotted: &str) -> Option<NodeId> {
    if dotted.is_empty() {
        return Some(start);
    }
    let mut current = start;
    for segment in dotted.split('.') {
        current = match tree.node(current) {
            ApiNode::Object(map) => *map.get(segment)?,
            ApiNode::Array(items) => {
                let idx: usize = segment.parse().ok()?;
                *items.get(idx)?
            }
            ApiNode::Value(_) | ApiNode::Accessor(_) | ApiNode::Function(_) => return None,
        };
    }
    Some(current)
}

//! Provider-side handle table (§3 "Handle", §4.3 "Handle TTL sweeper").

use std::collections::HashMap;
use std::time::Instant;

use rpc_core::ApiTree;

/// What kind of thing a handle is bound to — decides the wire payload
/// shape (§4.2 "Handle payload").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// The handle's root node is itself a callable.
    Function,
    /// The handle's root node is a composite value containing functions.
    Object,
}

/// A single handle-table entry: the [`ApiTree`] fragment the handle is
/// bound to, and when it was last touched (§3 "Handle").
pub struct HandleEntry {
    /// The fragment returned by the invocation that minted this handle.
    /// Method resolution for calls scoped to this handle walks this tree
    /// starting at its own root, not the provider's main API tree.
    pub tree: ApiTree,
    /// `function` or `object`, per the root node's shape.
    pub kind: HandleKind,
    last_used: Instant,
}

impl HandleEntry {
    fn new(tree: ApiTree, kind: HandleKind) -> Self {
        Self {
            tree,
            kind,
            last_used: Instant::now(),
        }
    }
}

/// The provider's table of outstanding handles (§3 "Handle", `{ id →
/// (value, lastUsed) }`).
#[derive(Default)]
pub struct HandleTable {
    entries: HashMap<String, HandleEntry>,
}

impl HandleTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new handle, bound to `tree`. Callers choose the id
    /// (typically [`rpc_core::gen_id`]) so dispatch code can embed it in
    /// the outgoing wire payload before it has to borrow the table again.
    pub fn insert(&mut self, id: String, tree: ApiTree, kind: HandleKind) {
        self.entries.insert(id, HandleEntry::new(tree, kind));
    }

    /// Look up a handle, refreshing its `lastUsed` timestamp on a hit
    /// (§4.3 step 1 "refresh its lastUsed").
    pub fn touch(&mut self, id: &str) -> Option<&HandleEntry> {
        let entry = self.entries.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(&*entry)
    }

    /// Look up a handle without updating its `lastUsed`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&HandleEntry> {
        self.entries.get(id)
    }

    /// Delete a handle unconditionally; absent ids are not an error
    /// (§4.3 `RELEASE_HANDLE`: "delete the handle entry unconditionally").
    pub fn release(&mut self, id: &str) {
        self.entries.remove(id);
    }

    /// Remove every handle whose `lastUsed` is older than `ttl`
    /// (§4.3 "Handle TTL sweeper").
    pub fn sweep(&mut self, ttl: std::time::Duration) {
        let now = Instant::now();
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_used) <= ttl);
    }

    /// Number of live handles. Used by tests to observe sweeper effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no handles are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc_core::ApiTree;
    use std::time::Duration;

    #[test]
    fn release_of_absent_id_is_not_an_error() {
        let mut table = HandleTable::new();
        table.release("missing");
        assert!(table.is_empty());
    }

    #[test]
    fn touch_refreshes_last_used_and_survives_a_short_sweep() {
        let mut table = HandleTable::new();
        table.insert("h1".into(), ApiTree::leaf(1.0), HandleKind::Object);
        table.touch("h1");
        table.sweep(Duration::from_secs(60));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sweep_removes_only_idle_handles() {
        let mut table = HandleTable::new();
        table.insert("h1".into(), ApiTree::leaf(1.0), HandleKind::Object);
        table.sweep(Duration::ZERO);
        assert!(table.is_empty());
    }
}

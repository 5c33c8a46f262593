//! The consumer's view of a handshake (or handle) snapshot: the value tree,
//! the function path set, and canonical-path resolution (§4.4 "record
//! source handle... store snapshot and function set, build canonical
//! index").
//!
//! Unlike the provider's [`rpc_core::Snapshot`], this side never walks an
//! arena — `values`/`functions` arrive over the wire as plain data, so
//! canonical-path lookups go straight through [`rpc_core::canonical_path`]
//! against the received [`Value`] tree instead of a precomputed node map.

use rpc_core::{canonical_path, get_deep_resolved, Value};

/// The value tree and function path set backing one proxy fabric — either
/// the root handshake snapshot or a handle's own scoped `values`/`functions`
/// (§4.4 "Scoped proxies").
#[derive(Debug, Clone)]
pub struct ConsumerSnapshot {
    /// The value-only tree, as received in `READY`'s `payload.values` or a
    /// handle payload's `values`.
    pub values: Value,
    /// Dotted paths at which a function is reachable, relative to this
    /// snapshot's own root.
    pub functions: Vec<String>,
}

impl ConsumerSnapshot {
    /// `true` if `path` is exactly a function path.
    #[must_use]
    pub fn is_function(&self, path: &str) -> bool {
        self.functions.iter().any(|p| p == path)
    }

    /// `true` if any function path is `prefix` itself or a descendant of it
    /// (§4.4 lazy-proxy step 4/5).
    #[must_use]
    pub fn has_function_under(&self, prefix: &str) -> bool {
        self.functions
            .iter()
            .any(|p| p == prefix || p.starts_with(&format!("{prefix}.")))
    }

    /// The canonical (first-discovered) dotted path of whatever sits at
    /// `dotted`, resolving through `Value::Alias` hops (§4.4 step 2/5).
    #[must_use]
    pub fn canonical_path(&self, dotted: &str) -> Option<String> {
        canonical_path(&self.values, dotted)
    }

    /// Alias-transparent read of `dotted` against this snapshot's values.
    #[must_use]
    pub fn read(&self, dotted: &str) -> Option<&Value> {
        get_deep_resolved(&self.values, dotted)
    }
}

//! Handle consumption state (§4.4 "Scoped proxies", "Auto-release").
//!
//! Rust has no finalisation callback observable from safe code, so of the
//! two release mechanisms the spec allows, only the weak-reference sweeper
//! is implementable here: a [`HandleGuard`] is handed out inside every
//! `Arc` a scoped proxy/callable carries, and [`ActiveHandleTable`] keeps
//! only a [`Weak`] per outstanding handle. Once every `Arc` is dropped, the
//! `Weak`'s strong count hits zero — the Rust analogue of "collected" — and
//! the periodic sweeper in `rpc_consumer::consumer` notices and issues
//! `RELEASE_HANDLE`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Per-handle release state shared by every clone of a scoped proxy/callable
/// bound to the same handle id.
#[derive(Debug)]
pub struct HandleGuard {
    id: String,
    released: AtomicBool,
}

impl HandleGuard {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            released: AtomicBool::new(false),
        }
    }

    /// The handle id this guard tracks.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `true` once this handle has been released, locally or by the
    /// provider's own sweeper.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Mark this handle released. Idempotent; returns `true` the first
    /// time it transitions (callers use this to decide whether a
    /// `RELEASE_HANDLE` still needs to be sent).
    pub(crate) fn mark_released(&self) -> bool {
        !self.released.swap(true, Ordering::AcqRel)
    }
}

/// Tracks every handle the consumer has handed a live proxy for, by weak
/// reference only, so a periodic sweep can detect when the last `Arc` to a
/// given handle has been dropped (§4.4 "a periodic sweeper... detects
/// collected references").
#[derive(Debug, Default)]
pub struct ActiveHandleTable {
    entries: HashMap<String, Weak<HandleGuard>>,
}

impl ActiveHandleTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `guard` by weak reference.
    pub fn track(&mut self, guard: &Arc<HandleGuard>) {
        self.entries.insert(guard.id().to_string(), Arc::downgrade(guard));
    }

    /// Stop tracking a handle id outright (used once its release has
    /// already been sent, whether explicitly or via the sweep below, so a
    /// later sweep tick does not act on it again).
    pub fn untrack(&mut self, id: &str) {
        self.entries.remove(id);
    }

    /// Scan for handles whose last strong reference has been dropped,
    /// removing them from the table and returning their ids so the caller
    /// can issue `RELEASE_HANDLE` for each.
    pub fn sweep_collected(&mut self) -> Vec<String> {
        let collected: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, weak)| weak.strong_count() == 0)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &collected {
            self.entries.remove(id);
        }
        collected
    }

    /// Every id still tracked, regardless of liveness — used by
    /// `shutdown()`/`on_page_hide()` to release everything outstanding.
    pub fn tracked_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_released_is_idempotent() {
        let guard = HandleGuard::new("h1".into());
        assert!(guard.mark_released());
        assert!(!guard.mark_released());
        assert!(guard.is_released());
    }

    #[test]
    fn sweep_finds_handles_with_no_remaining_strong_ref() {
        let mut table = ActiveHandleTable::new();
        let guard = Arc::new(HandleGuard::new("h1".into()));
        table.track(&guard);
        assert!(table.sweep_collected().is_empty());
        drop(guard);
        assert_eq!(table.sweep_collected(), vec!["h1".to_string()]);
        // already removed from the table by the previous sweep
        assert!(table.sweep_collected().is_empty());
    }
}

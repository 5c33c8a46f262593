//! Inbound message records and origin policy (§6 "Transport contract", §4.3
//! "Origin policy").

use rpc_protocol::Envelope;

/// A single inbound delivery: the decoded envelope plus the metadata a
/// `postMessage`-style listener would hand a real browsing context — the
/// sending origin, and an opaque handle identifying which peer to reply to.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// The decoded envelope.
    pub envelope: Envelope,
    /// The origin the message claims to be from (e.g. `"https://a.example"`).
    pub origin: String,
    /// Opaque identifier for the peer this message arrived from, used to
    /// target a reply without broadcasting to every other peer.
    pub source: PeerId,
}

/// Opaque identifier for one end of a [`crate::Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub(crate) usize);

/// An origin allow-list (§4.3): absent accepts everything, a predicate is
/// evaluated per message, a fixed list is checked by membership.
pub enum OriginPolicy {
    /// Accept every origin.
    Any,
    /// Accept only origins in this list.
    List(Vec<String>),
    /// Accept only origins for which this predicate returns `true`.
    Predicate(Box<dyn Fn(&str) -> bool + Send + Sync>),
}

impl std::fmt::Debug for OriginPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginPolicy::Any => f.write_str("OriginPolicy::Any"),
            OriginPolicy::List(list) => f.debug_tuple("OriginPolicy::List").field(list).finish(),
            OriginPolicy::Predicate(_) => f.write_str("OriginPolicy::Predicate(..)"),
        }
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        OriginPolicy::Any
    }
}

impl OriginPolicy {
    /// `true` if `origin` is allowed under this policy.
    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        match self {
            OriginPolicy::Any => true,
            OriginPolicy::List(list) => list.iter().any(|o| o == origin),
            OriginPolicy::Predicate(f) => f(origin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_allows_everything() {
        assert!(OriginPolicy::Any.allows("https://anywhere.example"));
    }

    #[test]
    fn list_checks_membership() {
        let policy = OriginPolicy::List(vec!["https://a.example".into()]);
        assert!(policy.allows("https://a.example"));
        assert!(!policy.allows("https://b.example"));
    }

    #[test]
    fn predicate_is_evaluated() {
        let policy = OriginPolicy::Predicate(Box::new(|o| o.ends_with(".example")));
        assert!(policy.allows("https://a.example"));
        assert!(!policy.allows("https://a.evil"));
    }
}

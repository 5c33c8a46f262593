//! The structured-clone-safe value model (§3, §4.1 of the spec).
//!
//! `Value` is the payload type carried by `READY`/`RESULT`/`CALL` envelopes.
//! It folds the spec's "structured-clone pass-through" built-ins (Date,
//! RegExp, ArrayBuffer/TypedArray, Map, Set) directly into its own variants
//! rather than wrapping them in a separate `PassThrough` type, since in this
//! Rust model they already behave as opaque leaves — there is no prototype
//! chain to walk into.
//!
//! `Value::Alias` is the one variant with no JS counterpart: JS's
//! `postMessage` structured-clone algorithm preserves object identity and
//! cycles natively, so the original protocol never needs to name a path.
//! Rust's `Value` is a plain recursive enum (no shared ownership across the
//! wire), so cyclic/aliased positions are marked explicitly with the
//! canonical dotted path they stand in for — see [`crate::snapshot::snapshot`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A structured-clone-safe value: the non-function payload exchanged over
/// the wire and held in every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c", rename_all = "snake_case")]
pub enum Value {
    /// `null` / `undefined`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Always `f64`, matching JS's single numeric type.
    Number(f64),
    /// A string.
    String(String),
    /// `ArrayBuffer` / any `TypedArray` view, passed through by reference.
    Bytes(Vec<u8>),
    /// A `Date` instance, passed through by reference.
    DateTime(chrono::DateTime<chrono::Utc>),
    /// A `RegExp` instance, passed through by reference.
    Regex(RegexLiteral),
    /// A `Map` instance. Entries are recursively value-cloned (§3).
    Map(Vec<(Value, Value)>),
    /// A `Set` instance. Entries are recursively value-cloned (§3).
    Set(Vec<Value>),
    /// A plain array.
    Array(Vec<Value>),
    /// A plain object. Key order is preserved (`IndexMap`), matching the
    /// enumeration order JS's own reflection would produce.
    Object(IndexMap<String, Value>),
    /// A marker standing in for a cyclic or shared reference: "this
    /// position holds the same object as the one found at this dotted,
    /// canonical path within the same snapshot." See module docs.
    Alias(String),
}

/// A `RegExp` pass-through payload: pattern source plus flags, not a
/// compiled pattern — compiling is deferred to [`RegexLiteral::compile`]
/// since most consumers only need to observe the literal, not execute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexLiteral {
    /// The pattern source, e.g. `"a+b"`.
    pub pattern: String,
    /// Flags, e.g. `"gi"`. Only `i` (case-insensitive) and `m` (multiline)
    /// affect [`RegexLiteral::compile`]; others are preserved verbatim but
    /// have no `regex`-crate equivalent.
    pub flags: String,
}

impl RegexLiteral {
    /// Create a new pass-through regex literal.
    #[must_use]
    pub fn new(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    /// Compile this literal into an executable [`regex::Regex`], honoring
    /// the `i` and `m` flags.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`regex::Error`] if the pattern is invalid.
    pub fn compile(&self) -> Result<regex::Regex, regex::Error> {
        let mut builder = regex::RegexBuilder::new(&self.pattern);
        builder.case_insensitive(self.flags.contains('i'));
        builder.multi_line(self.flags.contains('m'));
        builder.dot_matches_new_line(self.flags.contains('s'));
        builder.build()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        Value::Number(v as f64)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl Value {
    /// `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` for the structured-clone pass-through variants (§4.1
    /// `isStructuredClonePassThrough`): everything except the plain
    /// scalar/array/object/alias shapes.
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        matches!(
            self,
            Value::Bytes(_) | Value::DateTime(_) | Value::Regex(_) | Value::Map(_) | Value::Set(_)
        )
    }

    /// `true` for [`Value::Object`] or [`Value::Array`] — the only shapes a
    /// lazy proxy will ever wrap.
    #[must_use]
    pub fn is_plain_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Follow a single `Value::Alias` hop, if `self` is one, resolving
    /// against `root` (§4.1 "buildCanonicalIndex" / §4.4 step 2 alias
    /// resolution). Follows chained aliases defensively, though the
    /// snapshot builder never produces them (canonical paths are never
    /// themselves aliases).
    #[must_use]
    pub fn deref_alias<'a>(&'a self, root: &'a Value) -> Option<&'a Value> {
        let mut current = self;
        let mut hops = 0;
        while let Value::Alias(path) = current {
            hops += 1;
            if hops > 64 {
                return None; // malformed snapshot; never happens for builder-produced trees
            }
            current = get_deep(root, path)?;
        }
        Some(current)
    }
}

/// Walk a dotted path (§4.1 `getDeep`). An empty path returns `root`
/// unchanged. Numeric segments index into [`Value::Array`]; any other
/// segment indexes into [`Value::Object`]. Missing intermediates yield
/// `None`. Does **not** follow `Value::Alias` — callers that need
/// alias-transparent reads should combine this with
/// [`Value::deref_alias`].
#[must_use]
pub fn get_deep<'a>(root: &'a Value, dotted: &str) -> Option<&'a Value> {
    if dotted.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for segment in dotted.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let idx: usize = segment.parse().ok()?;
                items.get(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Alias-transparent variant of [`get_deep`]: dereferences through
/// `Value::Alias` at every hop (not just the final one), exactly as a JS
/// reader would when the structured-clone algorithm handed back a shared
/// reference partway down the path (§4.4 step 2).
#[must_use]
pub fn get_deep_resolved<'a>(root: &'a Value, dotted: &str) -> Option<&'a Value> {
    if dotted.is_empty() {
        return root.deref_alias(root);
    }
    let mut current = root;
    for segment in dotted.split('.') {
        let resolved = current.deref_alias(root)?;
        current = match resolved {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let idx: usize = segment.parse().ok()?;
                items.get(idx)?
            }
            _ => return None,
        };
    }
    current.deref_alias(root)
}

/// Compute the canonical (first-discovered) dotted path of whatever object
/// sits at `dotted`, resolving through any `Value::Alias` hops along the
/// way (§4.4 lazy-proxy step 2 "alias resolution"). This is the consumer
/// side's substitute for `buildCanonicalIndex`: since [`Value`] has no
/// object identity of its own, the canonical path of a shared/cyclic
/// position is recovered entirely from the `Value::Alias` markers the
/// provider's snapshot already placed at every non-canonical occurrence.
///
/// An empty `dotted` is trivially canonical (`""`, the root is never an
/// alias of itself). Returns `None` if `dotted` does not resolve to any
/// value in `root`.
#[must_use]
pub fn canonical_path(root: &Value, dotted: &str) -> Option<String> {
    if dotted.is_empty() {
        return Some(String::new());
    }
    let mut current = root;
    let mut canon = String::new();
    for segment in dotted.split('.') {
        if let Value::Alias(target) = current {
            canon = target.clone();
            current = get_deep(root, target)?;
        }
        let next = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let idx: usize = segment.parse().ok()?;
                items.get(idx)?
            }
            _ => return None,
        };
        canon = join_dotted(&canon, segment);
        current = next;
    }
    if let Value::Alias(target) = current {
        canon = target.clone();
    }
    Some(canon)
}

fn join_dotted(prefix: &str, seg: &str) -> String {
    if prefix.is_empty() {
        seg.to_string()
    } else {
        format!("{prefix}.{seg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: Vec<(&str, Value)>) -> Value {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn get_deep_empty_path_returns_root() {
        let root = obj(vec![("a", Value::Number(1.0))]);
        assert_eq!(get_deep(&root, ""), Some(&root));
    }

    #[test]
    fn get_deep_walks_nested_object_and_array_index() {
        let root = obj(vec![(
            "arr",
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]),
        )]);
        assert_eq!(get_deep(&root, "arr.1"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn get_deep_missing_intermediate_is_none() {
        let root = obj(vec![("a", Value::Number(1.0))]);
        assert_eq!(get_deep(&root, "a.b.c"), None);
    }

    #[test]
    fn deref_alias_follows_to_canonical_path() {
        let root = obj(vec![
            ("a", Value::Number(1.0)),
            ("b", Value::Alias("a".into())),
        ]);
        let b = get_deep(&root, "b").unwrap();
        assert_eq!(b.deref_alias(&root), Some(&Value::Number(1.0)));
    }

    #[test]
    fn get_deep_resolved_is_alias_transparent() {
        let root = obj(vec![
            ("a", Value::Number(1.0)),
            ("b", Value::Alias("a".into())),
        ]);
        assert_eq!(get_deep_resolved(&root, "b"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn get_deep_resolved_follows_alias_mid_path() {
        // cycle = { a: 1, nested: { val: 2 } }; cycle.nested.parent = cycle
        let root = obj(vec![
            ("a", Value::Number(1.0)),
            (
                "nested",
                obj(vec![
                    ("val", Value::Number(2.0)),
                    ("parent", Value::Alias(String::new())),
                ]),
            ),
        ]);
        // root is canonical path "", so "nested.parent.a" should resolve to 1.0
        assert_eq!(
            get_deep_resolved(&root, "nested.parent.a"),
            Some(&Value::Number(1.0))
        );
    }

    #[test]
    fn regex_literal_compiles_with_flags() {
        let lit = RegexLiteral::new("^FOO$", "i");
        let re = lit.compile().unwrap();
        assert!(re.is_match("foo"));
    }

    #[test]
    fn value_tagged_json_roundtrip() {
        let v = Value::Map(vec![(Value::String("k".into()), Value::Number(1.0))]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn canonical_path_of_root_is_empty() {
        let root = obj(vec![("a", Value::Number(1.0))]);
        assert_eq!(canonical_path(&root, ""), Some(String::new()));
    }

    #[test]
    fn canonical_path_resolves_through_mid_path_alias() {
        // cycle = { a: 1, nested: { val: 2, parent: <alias to root> } }
        let root = obj(vec![
            ("a", Value::Number(1.0)),
            (
                "nested",
                obj(vec![
                    ("val", Value::Number(2.0)),
                    ("parent", Value::Alias(String::new())),
                ]),
            ),
        ]);
        assert_eq!(
            canonical_path(&root, "nested.parent"),
            Some(String::new())
        );
    }

    #[test]
    fn canonical_path_of_non_aliased_prefix_is_itself() {
        let root = obj(vec![(
            "nested",
            obj(vec![("val", Value::Number(2.0))]),
        )]);
        assert_eq!(
            canonical_path(&root, "nested"),
            Some("nested".to_string())
        );
    }
}

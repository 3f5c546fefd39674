//! The session scope chain: a local declaration table with theory overlays
//! and an optional parent: a borrowed parent chain rather than a slot-indexed
//! stack, since child sessions nest the way call frames do and never outlive
//! their parent.

use indexmap::IndexMap;

use crate::value::Value;

/// Strips a leading `@` or `$` sigil so `@r`, `$r`, and `r` all resolve to
/// the same stored key. See `DESIGN.md`'s Open Question #1.
#[must_use]
pub fn normalize_name(raw: &str) -> &str {
    raw.strip_prefix('@').or_else(|| raw.strip_prefix('$')).unwrap_or(raw)
}

/// One session's declarations, plus any theory overlays currently in scope
/// and a link to the parent session a child was forked from.
#[derive(Debug)]
pub struct Namespace<'a> {
    local: IndexMap<String, Value>,
    /// Theories brought into scope by `UseTheory`, scanned in insertion
    /// order (spec §4.4: overlay lookup is textual-order, first match wins).
    theory_overlays: Vec<IndexMap<String, Value>>,
    parent: Option<&'a Namespace<'a>>,
}

impl<'a> Namespace<'a> {
    #[must_use]
    pub fn root() -> Self {
        Self {
            local: IndexMap::new(),
            theory_overlays: Vec::new(),
            parent: None,
        }
    }

    #[must_use]
    pub fn child(parent: &'a Namespace<'a>) -> Self {
        Self {
            local: IndexMap::new(),
            theory_overlays: Vec::new(),
            parent: Some(parent),
        }
    }

    pub fn declare(&mut self, name: &str, value: Value) {
        self.local.insert(normalize_name(name).to_string(), value);
    }

    /// Adds a theory overlay to the front of the scan order: the most
    /// recently `UseTheory`'d theory shadows earlier ones.
    pub fn push_theory_overlay(&mut self, overlay: IndexMap<String, Value>) {
        self.theory_overlays.insert(0, overlay);
    }

    /// Resolves a `$name` reference: local table, then theory overlays in
    /// scan order, then the parent session's namespace, recursively.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        let key = normalize_name(name);
        if let Some(value) = self.local.get(key) {
            return Some(value);
        }
        for overlay in &self.theory_overlays {
            if let Some(value) = overlay.get(key) {
                return Some(value);
            }
        }
        self.parent.and_then(|parent| parent.resolve(key))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Local declarations only, in insertion order — the view `Remember`
    /// serializes back into SpockDSL source text.
    #[must_use]
    pub fn local_declarations(&self) -> &IndexMap<String, Value> {
        &self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{NumericValue, Origin, Value};

    fn numeric(n: f64) -> Value {
        Value::Numeric(NumericValue::new(n, None, Origin::new(None, String::new(), 0)))
    }

    #[test]
    fn sigils_normalize_to_same_key() {
        let mut ns = Namespace::root();
        ns.declare("@r", numeric(1.0));
        assert!(ns.resolve("$r").is_some());
        assert!(ns.resolve("r").is_some());
    }

    #[test]
    fn child_falls_back_to_parent() {
        let mut parent = Namespace::root();
        parent.declare("shared", numeric(2.0));
        let child = Namespace::child(&parent);
        assert_eq!(child.resolve("shared"), parent.resolve("shared"));
    }

    #[test]
    fn local_shadows_parent() {
        let mut parent = Namespace::root();
        parent.declare("x", numeric(1.0));
        let mut child = Namespace::child(&parent);
        child.declare("x", numeric(9.0));
        assert_eq!(child.resolve("x"), Some(&numeric(9.0)));
    }

    #[test]
    fn most_recent_overlay_shadows_earlier_ones() {
        let mut ns = Namespace::root();
        let mut first = IndexMap::new();
        first.insert("k".to_string(), numeric(1.0));
        let mut second = IndexMap::new();
        second.insert("k".to_string(), numeric(2.0));
        ns.push_theory_overlay(first);
        ns.push_theory_overlay(second);
        assert_eq!(ns.resolve("k"), Some(&numeric(2.0)));
    }
}

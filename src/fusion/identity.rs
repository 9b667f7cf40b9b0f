//! Canonical alias map
//!
//! Every focus node owns the set of identifiers merged into it. Lookups go
//! through a flat parent map: when a canonical node is itself merged away,
//! its aliases are re-pointed at the new root, so an alias always resolves
//! in one step.

use fnv::FnvHashMap;
use indexmap::{IndexMap, IndexSet};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::term::Term;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: IndexMap<Term, IndexSet<Term>>,
    parent: FnvHashMap<Term, Term>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `node` has an entry, unless it is already an alias
    pub fn ensure(&mut self, node: &Term) {
        if !self.parent.contains_key(node) {
            self.entries.entry(node.clone()).or_default();
        }
    }

    /// Record `alias` as merged into `canonical`
    ///
    /// Aliases previously owned by `alias` move to `canonical` rather than
    /// being dropped with `alias`'s entry, so every merged identifier stays
    /// resolvable. Returns false when nothing changed.
    pub fn record(&mut self, canonical: &Term, alias: &Term) -> bool {
        let root = self.canonical(canonical).clone();
        if &root == alias || self.parent.get(alias) == Some(&root) {
            return false;
        }

        let folded = self.entries.shift_remove(alias).unwrap_or_default();
        for moved in &folded {
            self.parent.insert(moved.clone(), root.clone());
        }
        self.parent.insert(alias.clone(), root.clone());

        let owned = self.entries.entry(root).or_default();
        owned.insert(alias.clone());
        owned.extend(folded);
        true
    }

    /// The canonical representative of `node` (itself when not an alias)
    pub fn canonical<'a>(&'a self, node: &'a Term) -> &'a Term {
        self.parent.get(node).unwrap_or(node)
    }

    pub fn is_alias(&self, node: &Term) -> bool {
        self.parent.contains_key(node)
    }

    pub fn aliases_of(&self, node: &Term) -> Option<&IndexSet<Term>> {
        self.entries.get(node)
    }

    /// Canonical nodes with their aliases
    pub fn iter(&self) -> impl Iterator<Item = (&Term, &IndexSet<Term>)> {
        self.entries.iter()
    }

    /// Every merged-away identifier
    pub fn aliases(&self) -> impl Iterator<Item = &Term> {
        self.parent.keys()
    }

    /// Number of canonical entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn alias_count(&self) -> usize {
        self.parent.len()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Serialized as `{ "<canonical>": ["<alias>", ...] }`, aliases sorted
impl Serialize for AliasMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (canonical, aliases) in &self.entries {
            let mut names: Vec<String> = aliases.iter().map(|a| a.to_string()).collect();
            names.sort();
            map.serialize_entry(&canonical.to_string(), &names)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(local: &str) -> Term {
        Term::uri(format!("http://example.org/{}", local))
    }

    #[test]
    fn test_record_and_lookup() {
        let mut map = AliasMap::new();
        map.ensure(&ex("a"));
        assert!(map.record(&ex("a"), &ex("b")));
        assert!(!map.record(&ex("a"), &ex("b")));

        assert!(map.is_alias(&ex("b")));
        assert!(!map.is_alias(&ex("a")));
        assert_eq!(map.canonical(&ex("b")), &ex("a"));
        assert_eq!(map.canonical(&ex("z")), &ex("z"));
        assert_eq!(map.aliases_of(&ex("a")).map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_merged_canonical_folds_its_aliases() {
        let mut map = AliasMap::new();
        map.ensure(&ex("a"));
        map.ensure(&ex("c"));
        map.record(&ex("c"), &ex("d"));
        map.record(&ex("a"), &ex("c"));

        assert!(map.aliases_of(&ex("c")).is_none());
        let owned = map.aliases_of(&ex("a")).unwrap();
        assert!(owned.contains(&ex("c")));
        assert!(owned.contains(&ex("d")));
        assert_eq!(map.canonical(&ex("d")), &ex("a"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.alias_count(), 2);
    }

    #[test]
    fn test_record_through_alias_uses_root() {
        let mut map = AliasMap::new();
        map.record(&ex("a"), &ex("b"));
        map.record(&ex("b"), &ex("c"));
        assert_eq!(map.canonical(&ex("c")), &ex("a"));
        assert!(!map.record(&ex("b"), &ex("a")));
    }

    #[test]
    fn test_ensure_skips_aliases() {
        let mut map = AliasMap::new();
        map.record(&ex("a"), &ex("b"));
        map.ensure(&ex("b"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_json_form() {
        let mut map = AliasMap::new();
        map.ensure(&ex("lonely"));
        map.record(&ex("a"), &ex("c"));
        map.record(&ex("a"), &ex("b"));

        let value: serde_json::Value = serde_json::from_str(&map.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["<http://example.org/lonely>"], serde_json::json!([]));
        assert_eq!(
            value["<http://example.org/a>"],
            serde_json::json!(["<http://example.org/b>", "<http://example.org/c>"])
        );
    }
}

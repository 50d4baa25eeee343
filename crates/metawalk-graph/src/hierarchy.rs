//! Type-hierarchy capability used to resolve a node's deepest categories.
//!
//! The loader only needs one question answered: given the raw category labels
//! of a node, which of them are not ancestors of another label in the same set?
//! Ontology specifics live behind [`TypeHierarchy`].

use ahash::{AHashMap, AHashSet};
use anyhow::Result;
use std::collections::BTreeSet;
use std::io::Read;

pub type LabelSet = BTreeSet<String>;

pub trait TypeHierarchy {
    fn deepest_types(&self, labels: &LabelSet) -> LabelSet;
}

/// Keeps every label. Used when no closure table is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatTypeHierarchy;

impl TypeHierarchy for FlatTypeHierarchy {
    fn deepest_types(&self, labels: &LabelSet) -> LabelSet {
        labels.clone()
    }
}

/// Hierarchy backed by a precomputed `type -> descendants` closure.
///
/// Every type is treated as its own descendant. Labels missing from the
/// closure (mixins, typos) are dropped from the result.
#[derive(Debug, Default, Clone)]
pub struct ClosureTypeHierarchy {
    descendants: AHashMap<String, AHashSet<String>>,
}

impl ClosureTypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, ty: &str, descendants: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.descendants.entry(ty.to_string()).or_default();
        entry.insert(ty.to_string());
        entry.extend(descendants.into_iter().map(Into::into));
    }

    /// Parse a JSON object `{ "type": ["descendant", ...], ... }`.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: std::collections::HashMap<String, Vec<String>> = serde_json::from_reader(reader)?;
        let mut hierarchy = Self::new();
        for (ty, descendants) in raw {
            hierarchy.insert(&ty, descendants);
        }
        Ok(hierarchy)
    }

    pub fn len(&self) -> usize {
        self.descendants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descendants.is_empty()
    }
}

impl TypeHierarchy for ClosureTypeHierarchy {
    fn deepest_types(&self, labels: &LabelSet) -> LabelSet {
        labels
            .iter()
            .filter(|label| match self.descendants.get(label.as_str()) {
                None => false,
                Some(desc) => labels.iter().filter(|l| desc.contains(l.as_str())).count() == 1,
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(xs: &[&str]) -> LabelSet {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn biolink_fragment() -> ClosureTypeHierarchy {
        let mut h = ClosureTypeHierarchy::new();
        h.insert(
            "biolink:NamedThing",
            ["biolink:BiologicalEntity", "biolink:Gene", "biolink:Protein"],
        );
        h.insert("biolink:BiologicalEntity", ["biolink:Gene", "biolink:Protein"]);
        h.insert("biolink:Gene", Vec::<String>::new());
        h.insert("biolink:Protein", Vec::<String>::new());
        h
    }

    #[test]
    fn ancestors_are_removed() {
        let h = biolink_fragment();
        let got = h.deepest_types(&labels(&[
            "biolink:NamedThing",
            "biolink:BiologicalEntity",
            "biolink:Gene",
        ]));
        assert_eq!(got, labels(&["biolink:Gene"]));
    }

    #[test]
    fn siblings_both_survive_and_mixins_drop() {
        let h = biolink_fragment();
        let got = h.deepest_types(&labels(&[
            "biolink:Gene",
            "biolink:Protein",
            "biolink:GeneProductMixin",
        ]));
        assert_eq!(got, labels(&["biolink:Gene", "biolink:Protein"]));
    }

    #[test]
    fn closure_parses_from_json() {
        let h = ClosureTypeHierarchy::from_json_reader(
            r#"{"A":["B"],"B":[]}"#.as_bytes(),
        )
        .unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h.deepest_types(&labels(&["A", "B"])), labels(&["B"]));
    }
}

//! Category and predicate remapping applied before collapsing.
//!
//! The built-in tables follow Biolink conventions; a JSON file with the same
//! shape replaces them wholesale (missing sections become empty).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use crate::model::{CanonicalRecord, DirectEdges, EdgeObject, MetapathStep};

/// Replace the category signature `from` (as an exact label set) with `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub from: Vec<String>,
    pub to: Vec<String>,
}

impl CategoryRule {
    pub fn new(from: &[&str], to: &[&str]) -> Self {
        let sorted = |labels: &[&str]| {
            let set: BTreeSet<String> = labels.iter().map(|s| s.to_string()).collect();
            set.into_iter().collect::<Vec<_>>()
        };
        Self {
            from: sorted(from),
            to: sorted(to),
        }
    }

    fn matches(&self, labels: &[String]) -> bool {
        let from: BTreeSet<&str> = self.from.iter().map(String::as_str).collect();
        let have: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
        from == have
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapConfig {
    /// First matching rule wins.
    #[serde(default)]
    pub category_remap: Vec<CategoryRule>,
    #[serde(default)]
    pub predicate_remap: BTreeMap<String, String>,
    /// Predicates whose direction carries no meaning; their edges lose the
    /// reverse flag.
    #[serde(default)]
    pub symmetric_predicates: BTreeSet<String>,
}

const CHEMICAL_VARIANTS: &[&str] = &[
    "biolink:SmallMolecule",
    "biolink:MolecularMixture",
    "biolink:ComplexMolecularMixture",
    "biolink:ChemicalMixture",
];

const PREDICATE_SYNONYMS: &[(&str, &str)] = &[
    (
        "biolink:directly_physically_interacts_with",
        "biolink:physically_interacts_with",
    ),
    ("biolink:related_to_at_instance_level", "biolink:related_to"),
    ("biolink:related_to_at_concept_level", "biolink:related_to"),
];

const SYMMETRIC_PREDICATES: &[&str] = &[
    "biolink:related_to",
    "biolink:associated_with",
    "biolink:correlated_with",
    "biolink:positively_correlated_with",
    "biolink:negatively_correlated_with",
    "biolink:interacts_with",
    "biolink:physically_interacts_with",
    "biolink:genetically_interacts_with",
    "biolink:coexists_with",
    "biolink:colocalizes_with",
    "biolink:in_complex_with",
    "biolink:similar_to",
    "biolink:chemically_similar_to",
    "biolink:homologous_to",
    "biolink:orthologous_to",
    "biolink:paralogous_to",
    "biolink:same_as",
    "biolink:exact_match",
    "biolink:close_match",
];

impl Default for RemapConfig {
    fn default() -> Self {
        let mut category_remap: Vec<CategoryRule> = CHEMICAL_VARIANTS
            .iter()
            .map(|&from| CategoryRule::new(&[from], &["biolink:ChemicalEntity"]))
            .collect();
        category_remap.push(CategoryRule::new(&["biolink:Protein"], &["biolink:Gene"]));
        category_remap.push(CategoryRule::new(
            &["biolink:Gene", "biolink:Protein"],
            &["biolink:Gene"],
        ));
        Self {
            category_remap,
            predicate_remap: PREDICATE_SYNONYMS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            symmetric_predicates: SYMMETRIC_PREDICATES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RemapConfig {
    /// No remapping at all.
    pub fn identity() -> Self {
        Self {
            category_remap: Vec::new(),
            predicate_remap: BTreeMap::new(),
            symmetric_predicates: BTreeSet::new(),
        }
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).context("parse remap configuration")
    }

    pub fn remap_category(&self, labels: &[String]) -> Vec<String> {
        match self.category_remap.iter().find(|rule| rule.matches(labels)) {
            Some(rule) => rule.to.clone(),
            None => labels.to_vec(),
        }
    }

    pub fn remap_edge(&self, edge: &EdgeObject) -> EdgeObject {
        let mut out = edge.clone();
        if let Some(to) = self.predicate_remap.get(&edge.predicate) {
            out.predicate = to.clone();
        }
        if self.symmetric_predicates.contains(&out.predicate) {
            out.reverse = false;
        }
        out
    }

    pub fn remap_step(&self, step: &MetapathStep) -> MetapathStep {
        match step {
            MetapathStep::Category(labels) => {
                MetapathStep::category(self.remap_category(labels))
            }
            MetapathStep::Edge(edge) => MetapathStep::Edge(self.remap_edge(edge)),
        }
    }

    /// Remap the metapath and every witness edge. The total is unchanged.
    pub fn apply(&self, record: &CanonicalRecord) -> CanonicalRecord {
        CanonicalRecord {
            metapath: record.metapath.iter().map(|s| self.remap_step(s)).collect(),
            direct_edges: record
                .direct_edges
                .iter()
                .map(|d| DirectEdges {
                    count: d.count,
                    edge: d.edge.iter().map(|e| self.remap_edge(e)).collect(),
                })
                .collect(),
            total_count: record.total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn chemical_variants_collapse() {
        let remap = RemapConfig::default();
        assert_eq!(
            remap.remap_category(&labels(&["biolink:SmallMolecule"])),
            labels(&["biolink:ChemicalEntity"])
        );
        assert_eq!(
            remap.remap_category(&labels(&["biolink:Protein", "biolink:Gene"])),
            labels(&["biolink:Gene"])
        );
        assert_eq!(
            remap.remap_category(&labels(&["biolink:Disease"])),
            labels(&["biolink:Disease"])
        );
    }

    #[test]
    fn category_rules_need_an_exact_label_set() {
        let remap = RemapConfig::default();
        let mixed = labels(&["biolink:Protein", "biolink:Drug"]);
        assert_eq!(remap.remap_category(&mixed), mixed);
    }

    #[test]
    fn symmetric_predicates_lose_direction() {
        let remap = RemapConfig::default();
        let e = EdgeObject::new("biolink:directly_physically_interacts_with").reversed();
        let out = remap.remap_edge(&e);
        assert_eq!(out.predicate, "biolink:physically_interacts_with");
        assert!(!out.reverse);

        let treats = EdgeObject::new("biolink:treats").reversed();
        assert!(remap.remap_edge(&treats).reverse);
    }

    #[test]
    fn partial_json_leaves_other_sections_empty() {
        let text = r#"{"symmetric_predicates": ["ex:knows"]}"#;
        let remap = RemapConfig::from_json_reader(text.as_bytes()).unwrap();
        assert!(remap.category_remap.is_empty());
        assert!(remap.predicate_remap.is_empty());
        assert!(!remap.remap_edge(&EdgeObject::new("ex:knows").reversed()).reverse);
    }
}

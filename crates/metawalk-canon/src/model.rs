//! Canonical (post-processed) metapath records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use metawalk_graph::signature::EdgeTypeSignature;

/// A predicate with its qualifiers, as traversed.
///
/// `reverse` is only serialized when set. Qualifiers sit in a `BTreeMap`, so
/// two objects with the same content compare and serialize identically
/// whatever key order they were read in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeObject {
    pub predicate: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reverse: bool,
    #[serde(flatten)]
    pub qualifiers: BTreeMap<String, String>,
}

impl EdgeObject {
    pub fn new(predicate: &str) -> Self {
        Self {
            predicate: predicate.to_string(),
            reverse: false,
            qualifiers: BTreeMap::new(),
        }
    }

    pub fn from_signature(signature: &EdgeTypeSignature, reverse: bool) -> Self {
        Self {
            predicate: signature.predicate().to_string(),
            reverse,
            qualifiers: signature
                .qualifiers()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn with_qualifier(mut self, key: &str, value: &str) -> Self {
        self.qualifiers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers.get(key).map(String::as_str)
    }
}

/// One element of a metapath: a category signature (sorted labels) or an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetapathStep {
    Category(Vec<String>),
    Edge(EdgeObject),
}

impl MetapathStep {
    pub fn category<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        labels.sort();
        labels.dedup();
        MetapathStep::Category(labels)
    }
}

/// How often a given set of direct edges joined the endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectEdges {
    pub count: u64,
    pub edge: Vec<EdgeObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub metapath: Vec<MetapathStep>,
    pub direct_edges: Vec<DirectEdges>,
    pub total_count: u64,
}

impl CanonicalRecord {
    /// Count of walks whose endpoints had no direct edge.
    pub fn no_direct_count(&self) -> u64 {
        self.direct_edges
            .iter()
            .filter(|d| d.edge.is_empty())
            .map(|d| d.count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_object_serializes_flat() {
        let e = EdgeObject::new("biolink:affects")
            .with_qualifier("object_aspect_qualifier", "activity")
            .reversed();
        let text = serde_json::to_string(&e).unwrap();
        assert_eq!(
            text,
            r#"{"predicate":"biolink:affects","reverse":true,"object_aspect_qualifier":"activity"}"#
        );
        let back: EdgeObject = serde_json::from_str(
            r#"{"object_aspect_qualifier":"activity","reverse":true,"predicate":"biolink:affects"}"#,
        )
        .unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn forward_edges_omit_reverse() {
        let text = serde_json::to_string(&EdgeObject::new("biolink:treats")).unwrap();
        assert_eq!(text, r#"{"predicate":"biolink:treats"}"#);
    }

    #[test]
    fn steps_deserialize_by_shape() {
        let steps: Vec<MetapathStep> = serde_json::from_str(
            r#"[["biolink:Gene"], {"predicate":"biolink:treats"}, ["biolink:Disease"]]"#,
        )
        .unwrap();
        assert_eq!(steps[0], MetapathStep::category(["biolink:Gene"]));
        assert_eq!(steps[1], MetapathStep::Edge(EdgeObject::new("biolink:treats")));
    }
}

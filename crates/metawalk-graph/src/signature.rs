//! Edge-type signatures: predicate + qualifiers, canonically serialized and
//! interned to dense 1-based ids.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::EdgeTypeId;

/// Key under which the predicate is stored inside a signature object.
pub const PREDICATE_KEY: &str = "predicate";

/// A predicate plus its qualifier set.
///
/// Backed by a `BTreeMap`, so serialization always emits keys in
/// lexicographic order regardless of the order qualifiers arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeTypeSignature(BTreeMap<String, String>);

impl EdgeTypeSignature {
    pub fn new<I, K, V>(predicate: &str, qualifiers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = BTreeMap::new();
        fields.insert(PREDICATE_KEY.to_string(), predicate.to_string());
        for (k, v) in qualifiers {
            let k = k.into();
            // A qualifier can never shadow the predicate.
            if k == PREDICATE_KEY {
                continue;
            }
            fields.insert(k, v.into());
        }
        Self(fields)
    }

    pub fn predicate(&self) -> &str {
        self.0.get(PREDICATE_KEY).map(String::as_str).unwrap_or_default()
    }

    /// Qualifier pairs in key order (predicate excluded).
    pub fn qualifiers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(k, _)| k.as_str() != PREDICATE_KEY)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// Canonical JSON text: compact, keys sorted.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    pub fn from_canonical_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Append-only registry from signature to edge-type id.
///
/// Ids start at 1 so that the sign of an adjacency entry can carry direction.
#[derive(Debug, Default, Clone)]
pub struct EdgeTypeRegistry {
    by_signature: AHashMap<String, EdgeTypeId>,
    signatures: Vec<EdgeTypeSignature>,
}

impl EdgeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a predicate + qualifier set, returning its id.
    pub fn intern<I, K, V>(&mut self, predicate: &str, qualifiers: I) -> EdgeTypeId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.intern_signature(EdgeTypeSignature::new(predicate, qualifiers))
    }

    pub fn intern_signature(&mut self, signature: EdgeTypeSignature) -> EdgeTypeId {
        let key = signature.canonical_json();
        if let Some(&id) = self.by_signature.get(&key) {
            return id;
        }
        self.signatures.push(signature);
        let id = self.signatures.len() as EdgeTypeId;
        self.by_signature.insert(key, id);
        id
    }

    pub fn id_of(&self, signature: &EdgeTypeSignature) -> Option<EdgeTypeId> {
        self.by_signature.get(&signature.canonical_json()).copied()
    }

    pub fn signature(&self, id: EdgeTypeId) -> Option<&EdgeTypeSignature> {
        let idx = (id as usize).checked_sub(1)?;
        self.signatures.get(idx)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// `(id, signature)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (EdgeTypeId, &EdgeTypeSignature)> {
        self.signatures
            .iter()
            .enumerate()
            .map(|(idx, sig)| (idx as EdgeTypeId + 1, sig))
    }
}

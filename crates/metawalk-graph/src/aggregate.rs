//! Online aggregation of walks into metapath / direct-edge counts.

use ahash::AHashMap;

use crate::graph::OneHopIndex;
use crate::sampler::Walk;
use crate::{CategoryId, NodeId, SignedEdgeType};

/// A walk with every node replaced by its category id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaWalk {
    categories: Vec<CategoryId>,
    edges: Vec<SignedEdgeType>,
}

impl MetaWalk {
    /// `categories.len()` must be `edges.len() + 1`.
    pub fn new(categories: Vec<CategoryId>, edges: Vec<SignedEdgeType>) -> Option<Self> {
        (categories.len() == edges.len() + 1).then_some(Self { categories, edges })
    }

    /// Substitute each node by its category. `None` if a node has no category.
    pub fn from_walk(walk: &Walk, node_categories: &[CategoryId]) -> Option<Self> {
        let categories = walk
            .nodes()
            .iter()
            .map(|&n| node_categories.get(n as usize).copied())
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            categories,
            edges: walk.edges().to_vec(),
        })
    }

    pub fn categories(&self) -> &[CategoryId] {
        &self.categories
    }

    pub fn edges(&self) -> &[SignedEdgeType] {
        &self.edges
    }

    /// Interleaved tokens `c0, e1, c1, ..., eL, cL`.
    pub fn tokens(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.categories.len() + self.edges.len());
        for (i, &c) in self.categories.iter().enumerate() {
            if i > 0 {
                out.push(i64::from(self.edges[i - 1]));
            }
            out.push(i64::from(c));
        }
        out
    }

    /// Inverse of [`MetaWalk::tokens`].
    pub fn from_tokens(tokens: &[i64]) -> Option<Self> {
        if tokens.len() % 2 == 0 {
            return None;
        }
        let mut categories = Vec::with_capacity(tokens.len() / 2 + 1);
        let mut edges = Vec::with_capacity(tokens.len() / 2);
        for (i, &t) in tokens.iter().enumerate() {
            if i % 2 == 0 {
                categories.push(CategoryId::try_from(t).ok()?);
            } else {
                let e = SignedEdgeType::try_from(t).ok()?;
                if e == 0 {
                    return None;
                }
                edges.push(e);
            }
        }
        Some(Self { categories, edges })
    }
}

/// Edge types directly joining a walk's endpoints, oriented first → last.
/// Sorted and deduplicated so equal sets compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WitnessSet(Vec<SignedEdgeType>);

impl WitnessSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(mut edges: Vec<SignedEdgeType>) -> Self {
        edges.sort_unstable();
        edges.dedup();
        Self(edges)
    }

    /// Look up `(first, last)`; failing that, `(last, first)` with signs
    /// flipped so the set still reads first → last.
    pub fn between(one_hop: &OneHopIndex, first: NodeId, last: NodeId) -> Self {
        if let Some(ids) = one_hop.get(first, last) {
            return Self::new(ids.iter().map(|&id| id as SignedEdgeType).collect());
        }
        if let Some(ids) = one_hop.get(last, first) {
            return Self::new(ids.iter().map(|&id| -(id as SignedEdgeType)).collect());
        }
        Self::empty()
    }

    pub fn edges(&self) -> &[SignedEdgeType] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// MetaWalk → witness set → count.
#[derive(Debug, Default, Clone)]
pub struct MetapathTable {
    table: AHashMap<MetaWalk, AHashMap<WitnessSet, u64>>,
    absorbed: u64,
}

impl MetapathTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one walk. Walks through a node without a category are ignored and
    /// reported as `false`.
    pub fn absorb(
        &mut self,
        walk: &Walk,
        node_categories: &[CategoryId],
        one_hop: &OneHopIndex,
    ) -> bool {
        let Some(key) = MetaWalk::from_walk(walk, node_categories) else {
            return false;
        };
        let witness = WitnessSet::between(one_hop, walk.first(), walk.last());
        self.record(key, witness, 1);
        true
    }

    pub fn record(&mut self, key: MetaWalk, witness: WitnessSet, count: u64) {
        *self
            .table
            .entry(key)
            .or_default()
            .entry(witness)
            .or_default() += count;
        self.absorbed += count;
    }

    /// Fold another table in. Counts for identical (key, witness) pairs add up.
    pub fn merge(&mut self, other: MetapathTable) {
        for (key, witnesses) in other.table {
            let slot = self.table.entry(key).or_default();
            for (witness, count) in witnesses {
                *slot.entry(witness).or_default() += count;
            }
        }
        self.absorbed += other.absorbed;
    }

    /// Walks counted so far.
    pub fn absorbed(&self) -> u64 {
        self.absorbed
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn witnesses(&self, key: &MetaWalk) -> Option<&AHashMap<WitnessSet, u64>> {
        self.table.get(key)
    }

    pub fn count(&self, key: &MetaWalk, witness: &WitnessSet) -> u64 {
        self.table
            .get(key)
            .and_then(|w| w.get(witness))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all witness counts for `key`.
    pub fn total_count(&self, key: &MetaWalk) -> u64 {
        self.table
            .get(key)
            .map(|w| w.values().sum())
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetaWalk, &AHashMap<WitnessSet, u64>)> {
        self.table.iter()
    }
}

//! In-memory graph produced by the loader: dense node ids, category
//! signatures, signed adjacency lists and the one-hop pair index.

use ahash::AHashMap;

use crate::hierarchy::LabelSet;
use crate::signature::EdgeTypeRegistry;
use crate::{CategoryId, EdgeTypeId, NodeId, SignedEdgeType};

/// One adjacency entry. `edge > 0` follows the edge type subject→object,
/// `edge < 0` walks it backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hop {
    pub edge: SignedEdgeType,
    pub neighbor: NodeId,
}

impl Hop {
    pub fn forward(edge_type: EdgeTypeId, neighbor: NodeId) -> Self {
        Self {
            edge: edge_type as SignedEdgeType,
            neighbor,
        }
    }

    pub fn reverse(edge_type: EdgeTypeId, neighbor: NodeId) -> Self {
        Self {
            edge: -(edge_type as SignedEdgeType),
            neighbor,
        }
    }

    pub fn edge_type(&self) -> EdgeTypeId {
        self.edge.unsigned_abs()
    }

    pub fn is_reverse(&self) -> bool {
        self.edge < 0
    }
}

/// Ordered pair `(subject, object)` → edge types seen directly between them.
#[derive(Debug, Default, Clone)]
pub struct OneHopIndex {
    pairs: AHashMap<(NodeId, NodeId), Vec<EdgeTypeId>>,
}

impl OneHopIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject: NodeId, object: NodeId, edge_type: EdgeTypeId) {
        let ids = self.pairs.entry((subject, object)).or_default();
        if !ids.contains(&edge_type) {
            ids.push(edge_type);
        }
    }

    /// Edge types on `subject -> object`, if any edge connects that ordered pair.
    pub fn get(&self, subject: NodeId, object: NodeId) -> Option<&[EdgeTypeId]> {
        self.pairs.get(&(subject, object)).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Deepest-type label sets interned to dense, first-seen category ids.
#[derive(Debug, Default, Clone)]
pub struct CategoryTable {
    sets: Vec<LabelSet>,
    ids: AHashMap<LabelSet, CategoryId>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, labels: LabelSet) -> CategoryId {
        if let Some(&id) = self.ids.get(&labels) {
            return id;
        }
        let id = self.sets.len() as CategoryId;
        self.ids.insert(labels.clone(), id);
        self.sets.push(labels);
        id
    }

    pub fn get(&self, id: CategoryId) -> Option<&LabelSet> {
        self.sets.get(id as usize)
    }

    pub fn id_of(&self, labels: &LabelSet) -> Option<CategoryId> {
        self.ids.get(labels).copied()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, &LabelSet)> {
        self.sets
            .iter()
            .enumerate()
            .map(|(idx, set)| (idx as CategoryId, set))
    }
}

/// The loaded graph. Immutable once the loader hands it out.
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    pub(crate) node_ids: AHashMap<String, NodeId>,
    pub(crate) external_ids: Vec<String>,
    pub(crate) node_categories: Vec<CategoryId>,
    pub(crate) categories: CategoryTable,
    pub(crate) adjacency: Vec<Vec<Hop>>,
    pub(crate) one_hop: OneHopIndex,
    pub(crate) registry: EdgeTypeRegistry,
}

impl KnowledgeGraph {
    pub fn node_count(&self) -> usize {
        self.external_ids.len()
    }

    pub fn node_id(&self, external: &str) -> Option<NodeId> {
        self.node_ids.get(external).copied()
    }

    pub fn external_id(&self, node: NodeId) -> Option<&str> {
        self.external_ids.get(node as usize).map(String::as_str)
    }

    /// External ids indexed by dense id.
    pub fn external_ids(&self) -> &[String] {
        &self.external_ids
    }

    pub fn category_of(&self, node: NodeId) -> Option<CategoryId> {
        self.node_categories.get(node as usize).copied()
    }

    /// Category ids indexed by dense node id.
    pub fn node_categories(&self) -> &[CategoryId] {
        &self.node_categories
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    pub fn adjacency(&self) -> &[Vec<Hop>] {
        &self.adjacency
    }

    pub fn neighbors(&self, node: NodeId) -> &[Hop] {
        self.adjacency
            .get(node as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    pub fn one_hop(&self) -> &OneHopIndex {
        &self.one_hop
    }

    pub fn registry(&self) -> &EdgeTypeRegistry {
        &self.registry
    }

    /// Number of adjacency entries across all nodes (twice the edge count).
    pub fn adjacency_len(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }
}

//! Degree-weighted, self-avoiding random walks.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::graph::Hop;
use crate::{NodeId, SignedEdgeType};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WalkError {
    #[error("walk length must be at least one hop")]
    InvalidLength,
    #[error("graph has no edges; nothing to walk")]
    NoEdges,
    #[error("no self-avoiding walk of length {length} found after {attempts} attempts")]
    Exhausted { length: usize, attempts: u64 },
    #[error("walk revisits node {0}")]
    NotSelfAvoiding(NodeId),
    #[error("walk has {nodes} nodes for {edges} edges")]
    ShapeMismatch { nodes: usize, edges: usize },
}

/// `[n0, e1, n1, ..., eL, nL]` with all `n` pairwise distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Walk {
    nodes: Vec<NodeId>,
    edges: Vec<SignedEdgeType>,
}

impl Walk {
    pub fn new(nodes: Vec<NodeId>, edges: Vec<SignedEdgeType>) -> Result<Self, WalkError> {
        if edges.is_empty() {
            return Err(WalkError::InvalidLength);
        }
        if nodes.len() != edges.len() + 1 {
            return Err(WalkError::ShapeMismatch {
                nodes: nodes.len(),
                edges: edges.len(),
            });
        }
        for (i, n) in nodes.iter().enumerate() {
            if nodes[..i].contains(n) {
                return Err(WalkError::NotSelfAvoiding(*n));
            }
        }
        Ok(Self { nodes, edges })
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SignedEdgeType] {
        &self.edges
    }

    /// Hop count.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn first(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn last(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Hops per walk.
    pub length: usize,
    /// Growth attempts from one drawn start before a new start is drawn.
    /// `1` redraws the start after every rejected walk.
    pub attempts_per_start: u32,
    /// Total growth attempts per walk before giving up.
    pub max_attempts: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            length: 2,
            attempts_per_start: 1,
            max_attempts: 10_000_000,
        }
    }
}

/// Samples walks over a read-only adjacency structure.
///
/// Start nodes are drawn proportionally to degree, so zero-degree nodes are
/// never chosen. Each step picks uniformly among the current node's entries.
pub struct WalkSampler<'g> {
    adjacency: &'g [Vec<Hop>],
    starts: WeightedIndex<usize>,
    config: SamplerConfig,
}

impl<'g> WalkSampler<'g> {
    pub fn new(adjacency: &'g [Vec<Hop>], config: SamplerConfig) -> Result<Self, WalkError> {
        if config.length == 0 {
            return Err(WalkError::InvalidLength);
        }
        let starts = WeightedIndex::new(adjacency.iter().map(Vec::len))
            .map_err(|_| WalkError::NoEdges)?;
        Ok(Self {
            adjacency,
            starts,
            config,
        })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn draw_start<R: Rng + ?Sized>(&self, rng: &mut R) -> NodeId {
        self.starts.sample(rng) as NodeId
    }

    /// Grow one walk from `start`. `None` as soon as a node repeats; the
    /// rest of the walk could not be accepted anyway.
    pub fn try_grow<R: Rng + ?Sized>(&self, start: NodeId, rng: &mut R) -> Option<Walk> {
        let length = self.config.length;
        let mut nodes = Vec::with_capacity(length + 1);
        let mut edges = Vec::with_capacity(length);
        nodes.push(start);
        let mut current = start;
        for _ in 0..length {
            let hop = self.adjacency.get(current as usize)?.choose(rng)?;
            if nodes.contains(&hop.neighbor) {
                return None;
            }
            edges.push(hop.edge);
            nodes.push(hop.neighbor);
            current = hop.neighbor;
        }
        Some(Walk { nodes, edges })
    }

    /// Draw walks until one is self-avoiding, or fail after `max_attempts`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Walk, WalkError> {
        let per_start = u64::from(self.config.attempts_per_start.max(1));
        let mut attempts: u64 = 0;
        while attempts < self.config.max_attempts {
            let start = self.draw_start(rng);
            let budget = per_start.min(self.config.max_attempts - attempts);
            for _ in 0..budget {
                attempts += 1;
                if let Some(walk) = self.try_grow(start, rng) {
                    return Ok(walk);
                }
            }
        }
        Err(WalkError::Exhausted {
            length: self.config.length,
            attempts,
        })
    }
}

//! Numeric metapaths back to labels and predicate objects.

use ahash::AHashMap;
use anyhow::Result;
use std::path::Path;
use thiserror::Error;

use metawalk_graph::aggregate::{MetaWalk, MetapathTable};
use metawalk_graph::graph::KnowledgeGraph;
use metawalk_graph::hierarchy::LabelSet;
use metawalk_graph::signature::EdgeTypeSignature;
use metawalk_graph::tables::{read_category_map, read_edge_signatures};
use metawalk_graph::{CategoryId, EdgeTypeId, SignedEdgeType};

use crate::model::{CanonicalRecord, DirectEdges, EdgeObject, MetapathStep};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("unknown category id {0}")]
    UnknownCategory(CategoryId),

    #[error("unknown edge type id {0}")]
    UnknownEdgeType(SignedEdgeType),
}

/// The id tables a sampling run wrote, keyed the other way round.
#[derive(Debug, Clone, Default)]
pub struct IdTables {
    categories: AHashMap<CategoryId, LabelSet>,
    edge_types: AHashMap<EdgeTypeId, EdgeTypeSignature>,
}

impl IdTables {
    pub fn new(
        categories: AHashMap<CategoryId, LabelSet>,
        edge_types: AHashMap<EdgeTypeId, EdgeTypeSignature>,
    ) -> Self {
        Self {
            categories,
            edge_types,
        }
    }

    /// Read `category_map` and `pq_to_num` from a run directory.
    pub fn read(dir: &Path) -> Result<Self> {
        Ok(Self::new(read_category_map(dir)?, read_edge_signatures(dir)?))
    }

    pub fn from_graph(graph: &KnowledgeGraph) -> Self {
        Self::new(
            graph
                .categories()
                .iter()
                .map(|(id, labels)| (id, labels.clone()))
                .collect(),
            graph
                .registry()
                .iter()
                .map(|(id, sig)| (id, sig.clone()))
                .collect(),
        )
    }

    pub fn category(&self, id: CategoryId) -> Result<MetapathStep, ExpandError> {
        self.categories
            .get(&id)
            .map(|labels| MetapathStep::category(labels.iter().cloned()))
            .ok_or(ExpandError::UnknownCategory(id))
    }

    pub fn edge(&self, signed: SignedEdgeType) -> Result<EdgeObject, ExpandError> {
        self.edge_types
            .get(&signed.unsigned_abs())
            .map(|sig| EdgeObject::from_signature(sig, signed < 0))
            .ok_or(ExpandError::UnknownEdgeType(signed))
    }

    pub fn metapath(&self, key: &MetaWalk) -> Result<Vec<MetapathStep>, ExpandError> {
        let mut steps = Vec::with_capacity(key.categories().len() + key.edges().len());
        for (i, &cat) in key.categories().iter().enumerate() {
            if i > 0 {
                steps.push(MetapathStep::Edge(self.edge(key.edges()[i - 1])?));
            }
            steps.push(self.category(cat)?);
        }
        Ok(steps)
    }
}

/// One record per metapath key, in no particular order. Witness edge lists
/// follow the sorted numeric witness; collapsing re-sorts them.
pub fn expand(table: &MetapathTable, ids: &IdTables) -> Result<Vec<CanonicalRecord>, ExpandError> {
    table
        .iter()
        .map(|(key, witnesses)| {
            let metapath = ids.metapath(key)?;
            let mut direct_edges = Vec::with_capacity(witnesses.len());
            let mut total_count = 0;
            for (witness, &count) in witnesses {
                let edge = witness
                    .edges()
                    .iter()
                    .map(|&e| ids.edge(e))
                    .collect::<Result<Vec<_>, _>>()?;
                total_count += count;
                direct_edges.push(DirectEdges { count, edge });
            }
            Ok(CanonicalRecord {
                metapath,
                direct_edges,
                total_count,
            })
        })
        .collect()
}

//! Streaming graph loader.
//!
//! Two passes over lazily-read JSON-lines sources:
//! 1. nodes: dense ids in first-seen order + deepest-type category signature
//! 2. edges: signature interning, signed adjacency entries, one-hop index
//!
//! Bad records never abort a load. They are skipped and counted per reason in
//! the [`LoadReport`].

use ahash::AHashMap;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::time::Instant;

use crate::graph::{Hop, KnowledgeGraph};
use crate::hierarchy::{LabelSet, TypeHierarchy};
use crate::records::{read_json_lines, EdgeRecord, NodeRecord, RecordError};
use crate::{CategoryId, EdgeTypeId, NodeId};

#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Log a progress line every this many edges (0 disables).
    pub progress_every: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            progress_every: 10_000_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NodeRejection {
    #[error("duplicate node id {0}")]
    DuplicateId(String),
    #[error("malformed node record: {0}")]
    Malformed(RecordError),
}

impl NodeRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            NodeRejection::DuplicateId(_) => "duplicate_id",
            NodeRejection::Malformed(_) => "malformed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EdgeRejection {
    #[error("unknown subject {0}")]
    UnknownSubject(String),
    #[error("unknown object {0}")]
    UnknownObject(String),
    #[error("edge {subject} -> {object} has no predicate")]
    MissingPredicate { subject: String, object: String },
    #[error("malformed edge record: {0}")]
    Malformed(RecordError),
}

impl EdgeRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            EdgeRejection::UnknownSubject(_) => "unknown_subject",
            EdgeRejection::UnknownObject(_) => "unknown_object",
            EdgeRejection::MissingPredicate { .. } => "missing_predicate",
            EdgeRejection::Malformed(_) => "malformed",
        }
    }
}

/// Counters surfaced at the end of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub nodes: u64,
    pub edges: u64,
    pub rejected_nodes: BTreeMap<String, u64>,
    pub rejected_edges: BTreeMap<String, u64>,
    /// Distinct raw label sets seen (each costs one hierarchy lookup).
    pub hierarchy_lookups: u64,
}

impl LoadReport {
    pub fn rejected_edge_count(&self) -> u64 {
        self.rejected_edges.values().sum()
    }

    pub fn rejected_node_count(&self) -> u64 {
        self.rejected_nodes.values().sum()
    }
}

/// Memoizes deepest-type resolution by the exact raw label set.
///
/// Lives only as long as the loader that owns it.
#[derive(Debug, Default)]
struct DeepestTypesCache {
    resolved: AHashMap<LabelSet, CategoryId>,
}

pub struct GraphLoader<'h> {
    hierarchy: &'h dyn TypeHierarchy,
    config: LoaderConfig,
    cache: DeepestTypesCache,
    graph: KnowledgeGraph,
    report: LoadReport,
}

impl<'h> GraphLoader<'h> {
    pub fn new(hierarchy: &'h dyn TypeHierarchy, config: LoaderConfig) -> Self {
        Self {
            hierarchy,
            config,
            cache: DeepestTypesCache::default(),
            graph: KnowledgeGraph::default(),
            report: LoadReport::default(),
        }
    }

    /// Register one node. Dense ids follow call order.
    pub fn add_node(&mut self, record: NodeRecord) -> Result<NodeId, NodeRejection> {
        if self.graph.node_ids.contains_key(&record.id) {
            return Err(NodeRejection::DuplicateId(record.id));
        }
        let category = self.resolve_category(record.category.into_iter().collect());
        let node = self.graph.external_ids.len() as NodeId;
        self.graph.node_ids.insert(record.id.clone(), node);
        self.graph.external_ids.push(record.id);
        self.graph.node_categories.push(category);
        self.graph.adjacency.push(Vec::new());
        self.report.nodes += 1;
        Ok(node)
    }

    /// Register one edge: both adjacency entries plus the one-hop pair.
    pub fn add_edge(&mut self, record: &EdgeRecord) -> Result<EdgeTypeId, EdgeRejection> {
        let subject = self
            .graph
            .node_id(&record.subject)
            .ok_or_else(|| EdgeRejection::UnknownSubject(record.subject.clone()))?;
        let object = self
            .graph
            .node_id(&record.object)
            .ok_or_else(|| EdgeRejection::UnknownObject(record.object.clone()))?;
        let predicate = record
            .predicate
            .as_deref()
            .ok_or_else(|| EdgeRejection::MissingPredicate {
                subject: record.subject.clone(),
                object: record.object.clone(),
            })?;

        let edge_type = self
            .graph
            .registry
            .intern(predicate, record.qualifier_pairs());
        self.graph.adjacency[subject as usize].push(Hop::forward(edge_type, object));
        self.graph.adjacency[object as usize].push(Hop::reverse(edge_type, subject));
        self.graph.one_hop.insert(subject, object, edge_type);
        self.report.edges += 1;
        Ok(edge_type)
    }

    /// Node pass. Only I/O failures abort; everything else is counted.
    pub fn load_nodes<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<NodeRecord, RecordError>>,
    {
        let start = Instant::now();
        for record in records {
            let outcome = match record {
                Ok(record) => self.add_node(record).map(|_| ()),
                Err(err) if err.is_io() => return Err(err.into()),
                Err(err) => Err(NodeRejection::Malformed(err)),
            };
            if let Err(rejection) = outcome {
                tracing::debug!(%rejection, "skipping node");
                *self
                    .report
                    .rejected_nodes
                    .entry(rejection.reason().to_string())
                    .or_default() += 1;
            }
        }
        tracing::info!(
            nodes = self.report.nodes,
            categories = self.graph.categories.len(),
            hierarchy_lookups = self.report.hierarchy_lookups,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded nodes"
        );
        Ok(())
    }

    /// Edge pass. Must run after the node pass.
    pub fn load_edges<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<EdgeRecord, RecordError>>,
    {
        let start = Instant::now();
        let mut seen: u64 = 0;
        for record in records {
            let outcome = match record {
                Ok(record) => self.add_edge(&record).map(|_| ()),
                Err(err) if err.is_io() => return Err(err.into()),
                Err(err) => Err(EdgeRejection::Malformed(err)),
            };
            if let Err(rejection) = outcome {
                tracing::debug!(%rejection, "skipping edge");
                *self
                    .report
                    .rejected_edges
                    .entry(rejection.reason().to_string())
                    .or_default() += 1;
            }
            seen += 1;
            if self.config.progress_every > 0 && seen % self.config.progress_every == 0 {
                tracing::info!(edges = seen, "loading edges");
            }
        }
        tracing::info!(
            edges = self.report.edges,
            edge_types = self.graph.registry.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded edges"
        );
        if self.report.rejected_edge_count() > 0 {
            tracing::warn!(
                rejected = self.report.rejected_edge_count(),
                reasons = ?self.report.rejected_edges,
                "some edges were skipped"
            );
        }
        Ok(())
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Finish the load. The deepest-types cache is dropped here.
    pub fn finish(self) -> (KnowledgeGraph, LoadReport) {
        (self.graph, self.report)
    }

    fn resolve_category(&mut self, raw: LabelSet) -> CategoryId {
        if let Some(&id) = self.cache.resolved.get(&raw) {
            return id;
        }
        self.report.hierarchy_lookups += 1;
        let deepest = self.hierarchy.deepest_types(&raw);
        let id = self.graph.categories.intern(deepest);
        self.cache.resolved.insert(raw, id);
        id
    }
}

/// Load both passes from JSON-lines readers.
pub fn load_graph<N, E>(
    nodes: N,
    edges: E,
    hierarchy: &dyn TypeHierarchy,
    config: LoaderConfig,
) -> Result<(KnowledgeGraph, LoadReport)>
where
    N: BufRead,
    E: BufRead,
{
    let mut loader = GraphLoader::new(hierarchy, config);
    loader.load_nodes(read_json_lines::<NodeRecord, _>(nodes))?;
    loader.load_edges(read_json_lines::<EdgeRecord, _>(edges))?;
    Ok(loader.finish())
}

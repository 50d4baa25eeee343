//! Metawalk graph core: Monte-Carlo metapath statistics over large
//! heterogeneous knowledge graphs.
//!
//! Pipeline:
//! 1. **Load** ([`loader`]): stream JSON-lines nodes and edges into dense ids,
//!    deepest-type category signatures, signed adjacency lists and a one-hop
//!    pair index. Edge types (predicate + qualifiers) are interned by
//!    [`signature::EdgeTypeRegistry`].
//! 2. **Sample** ([`sampler`]): degree-weighted start node, uniform steps,
//!    rejection of walks that revisit a node.
//! 3. **Aggregate** ([`aggregate`]): each walk becomes a category-level
//!    [`MetaWalk`] plus the set of edge types directly joining its endpoints;
//!    counts are checkpointed to disk ([`artifact`]).
//!
//! Canonicalization of the persisted artifacts lives in `metawalk-canon`.

pub mod aggregate;
pub mod artifact;
pub mod filter;
pub mod graph;
pub mod hierarchy;
pub mod job;
pub mod loader;
pub mod records;
pub mod sampler;
pub mod signature;
pub mod tables;

/// Dense node id, assigned in first-seen order starting at 0.
pub type NodeId = u32;
/// Dense category-signature id, first-seen order starting at 0.
pub type CategoryId = u32;
/// Edge-type id, 1-based so that its sign can encode direction.
pub type EdgeTypeId = u32;
/// Edge-type id as traversed: positive forward, negative reverse.
pub type SignedEdgeType = i32;

pub use aggregate::{MetaWalk, MetapathTable, WitnessSet};
pub use artifact::{read_artifact, write_artifact, Checkpointer, ResumeError};
pub use graph::{CategoryTable, Hop, KnowledgeGraph, OneHopIndex};
pub use hierarchy::{ClosureTypeHierarchy, FlatTypeHierarchy, LabelSet, TypeHierarchy};
pub use job::{run_sampling, JobConfig, JobOutcome, StopToken};
pub use loader::{load_graph, EdgeRejection, GraphLoader, LoadReport, LoaderConfig, NodeRejection};
pub use records::{EdgeRecord, NodeRecord, RecordError};
pub use sampler::{SamplerConfig, Walk, WalkError, WalkSampler};
pub use signature::{EdgeTypeRegistry, EdgeTypeSignature};

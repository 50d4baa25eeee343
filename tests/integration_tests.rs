//! Integration tests for the complete Metawalk pipeline
//!
//! These tests drive everything through files:
//! - JSON-lines nodes/edges → load → id tables
//! - Sampling → checkpoint / final artifact
//! - Post-processing → processed_metapaths.json → tabulated_metapaths.tsv
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use std::io::BufReader;
use std::path::Path;
use tempfile::tempdir;

use metawalk_canon::{
    canonicalize_dir, read_records, write_records, write_report_file, Abbreviations,
    EdgeObject, MetapathStep, RemapConfig, PROCESSED_METAPATHS, TABULATED_METAPATHS,
};
use metawalk_graph::artifact::{read_artifact, Checkpointer, FINAL_ARTIFACT, WORKING_ARTIFACT};
use metawalk_graph::filter::filter_nodes;
use metawalk_graph::tables::{
    verify_id_tables, write_id_tables, CATEGORY_MAP, NODES_TO_CATS, NODES_TO_NUMS, PQ_TO_NUM,
};
use metawalk_graph::{
    load_graph, run_sampling, ClosureTypeHierarchy, FlatTypeHierarchy, JobConfig,
    KnowledgeGraph, LoaderConfig, MetaWalk, MetapathTable, ResumeError, SamplerConfig,
    StopToken, TypeHierarchy, Walk, WitnessSet,
};

const TRIANGLE_NODES: &str = r#"{"id":"A","category":["ex:X"]}
{"id":"B","category":["ex:Y"]}
{"id":"C","category":["ex:Y"]}
"#;

const TRIANGLE_EDGES: &str = r#"{"subject":"A","predicate":"ex:p1","object":"B"}
{"subject":"B","predicate":"ex:p2","object":"C"}
{"subject":"A","predicate":"ex:p3","object":"C"}
"#;

fn write_inputs(dir: &Path, nodes: &str, edges: &str) {
    fs::write(dir.join("nodes.jsonl"), nodes).unwrap();
    fs::write(dir.join("edges.jsonl"), edges).unwrap();
}

fn load_from(dir: &Path, hierarchy: &dyn TypeHierarchy) -> KnowledgeGraph {
    let nodes = BufReader::new(fs::File::open(dir.join("nodes.jsonl")).unwrap());
    let edges = BufReader::new(fs::File::open(dir.join("edges.jsonl")).unwrap());
    let (graph, report) = load_graph(nodes, edges, hierarchy, LoaderConfig::default()).unwrap();
    assert_eq!(report.rejected_edge_count(), 0);
    graph
}

fn job(num_walks: u64, length: usize) -> JobConfig {
    JobConfig {
        num_walks,
        checkpoint_every: 250,
        seed: Some(2024),
        threads: 2,
        sampler: SamplerConfig {
            length,
            ..SamplerConfig::default()
        },
    }
}

// ============================================================================
// Triangle scenario
// ============================================================================

#[test]
fn test_triangle_walk_records_direct_witness() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), TRIANGLE_NODES, TRIANGLE_EDGES);
    let graph = load_from(dir.path(), &FlatTypeHierarchy);

    let a = graph.node_id("A").unwrap();
    let b = graph.node_id("B").unwrap();
    let c = graph.node_id("C").unwrap();
    let p1 = graph.neighbors(a)[0].edge;
    let p2 = graph.neighbors(b).iter().find(|h| h.neighbor == c).unwrap().edge;
    let p3 = graph.neighbors(a).iter().find(|h| h.neighbor == c).unwrap().edge;

    let mut table = MetapathTable::new();
    let walk = Walk::new(vec![a, b, c], vec![p1, p2]).unwrap();
    assert!(table.absorb(&walk, graph.node_categories(), graph.one_hop()));

    let x = graph.category_of(a).unwrap();
    let y = graph.category_of(b).unwrap();
    let key = MetaWalk::new(vec![x, y, y], vec![p1, p2]).unwrap();
    assert_eq!(table.count(&key, &WitnessSet::new(vec![p3])), 1);
    assert_eq!(table.total_count(&key), 1);
}

#[test]
fn test_full_pipeline_through_files() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), TRIANGLE_NODES, TRIANGLE_EDGES);
    let out = dir.path().join("run");
    let graph = load_from(dir.path(), &FlatTypeHierarchy);
    write_id_tables(&out, &graph).unwrap();
    for name in [NODES_TO_NUMS, NODES_TO_CATS, PQ_TO_NUM, CATEGORY_MAP] {
        assert!(out.join(name).exists(), "missing {name}");
    }

    let mut table = MetapathTable::new();
    let mut checkpointer = Checkpointer::new(&out);
    let outcome = run_sampling(
        &graph,
        &job(1_000, 2),
        &mut table,
        &mut checkpointer,
        &StopToken::new(),
    )
    .unwrap();
    assert!(!outcome.stopped);
    assert_eq!(outcome.rounds, 4);
    assert!(out.join(WORKING_ARTIFACT).exists());
    assert_eq!(read_artifact(&out.join(FINAL_ARTIFACT)).unwrap().absorbed(), 1_000);

    let records = canonicalize_dir(&out, &RemapConfig::identity()).unwrap();
    let total: u64 = records.iter().map(|r| r.total_count).sum();
    assert_eq!(total, 1_000);
    for pair in records.windows(2) {
        assert!(pair[0].total_count >= pair[1].total_count);
    }
    // Every length-2 walk on a triangle ends next to where it started.
    assert!(records.iter().all(|r| r.no_direct_count() == 0));

    let forward = records
        .iter()
        .find(|r| {
            r.metapath
                == vec![
                    MetapathStep::category(["ex:X"]),
                    MetapathStep::Edge(EdgeObject::new("ex:p1")),
                    MetapathStep::category(["ex:Y"]),
                    MetapathStep::Edge(EdgeObject::new("ex:p2")),
                    MetapathStep::category(["ex:Y"]),
                ]
        })
        .expect("A -p1-> B -p2-> C is reachable");
    assert_eq!(forward.direct_edges.len(), 1);
    assert_eq!(forward.direct_edges[0].edge, vec![EdgeObject::new("ex:p3")]);

    let processed = out.join(PROCESSED_METAPATHS);
    write_records(&processed, &records).unwrap();
    let first = fs::read(&processed).unwrap();
    let again = canonicalize_dir(&out, &RemapConfig::identity()).unwrap();
    write_records(&processed, &again).unwrap();
    assert_eq!(fs::read(&processed).unwrap(), first);

    let report = out.join(TABULATED_METAPATHS);
    let rows = write_report_file(&report, &read_records(&processed).unwrap(), &Abbreviations::default())
        .unwrap();
    assert_eq!(rows, records.len());
    let text = fs::read_to_string(&report).unwrap();
    assert!(text.starts_with("MetaPath\ttotal_count\t"));
    assert!(text.contains("X p1_> Y p2_> Y\t"));
    assert_eq!(text.lines().count(), rows + 1);
}

#[test]
fn test_interrupted_run_resumes_from_checkpoint() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), TRIANGLE_NODES, TRIANGLE_EDGES);
    let out = dir.path().join("run");
    let graph = load_from(dir.path(), &FlatTypeHierarchy);

    let mut table = MetapathTable::new();
    let mut checkpointer = Checkpointer::new(&out);
    run_sampling(&graph, &job(500, 2), &mut table, &mut checkpointer, &StopToken::new())
        .unwrap();
    // Pretend the process died before the final write of a longer run.
    fs::remove_file(out.join(FINAL_ARTIFACT)).unwrap();

    let mut checkpointer = Checkpointer::new(&out);
    let mut resumed = checkpointer.resume().unwrap().expect("working checkpoint");
    assert_eq!(resumed.absorbed(), 500);
    let outcome = run_sampling(
        &graph,
        &job(800, 2),
        &mut resumed,
        &mut checkpointer,
        &StopToken::new(),
    )
    .unwrap();
    assert_eq!(outcome.sampled, 300);
    assert_eq!(read_artifact(&out.join(FINAL_ARTIFACT)).unwrap().absorbed(), 800);
}

#[test]
fn test_resume_refuses_changed_inputs() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), TRIANGLE_NODES, TRIANGLE_EDGES);
    let out = dir.path().join("run");
    let graph = load_from(dir.path(), &FlatTypeHierarchy);

    write_id_tables(&out, &graph).unwrap();
    let mut table = MetapathTable::new();
    let mut checkpointer = Checkpointer::new(&out);
    run_sampling(&graph, &job(250, 2), &mut table, &mut checkpointer, &StopToken::new())
        .unwrap();
    let written = fs::read_to_string(out.join(PQ_TO_NUM)).unwrap();

    // The same inputs resume cleanly.
    verify_id_tables(&out, &graph).unwrap();

    // Reordered edges intern the predicates under different ids.
    let reordered = r#"{"subject":"A","predicate":"ex:p3","object":"C"}
{"subject":"A","predicate":"ex:p1","object":"B"}
{"subject":"B","predicate":"ex:p2","object":"C"}
"#;
    write_inputs(dir.path(), TRIANGLE_NODES, reordered);
    let changed = load_from(dir.path(), &FlatTypeHierarchy);
    let err = verify_id_tables(&out, &changed).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResumeError>(),
        Some(ResumeError::IdTableMismatch(PQ_TO_NUM))
    ));
    assert_eq!(fs::read_to_string(out.join(PQ_TO_NUM)).unwrap(), written);

    // A checkpoint sampled at two hops cannot be continued at three.
    let mut resumed = checkpointer.resume().unwrap().expect("working checkpoint");
    let err = run_sampling(
        &graph,
        &job(500, 3),
        &mut resumed,
        &mut checkpointer,
        &StopToken::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResumeError>(),
        Some(ResumeError::LengthMismatch { expected: 3, found: 2 })
    ));
}

// ============================================================================
// Hierarchy, filtering and remapping
// ============================================================================

#[test]
fn test_closure_file_resolves_deepest_types() {
    let dir = tempdir().unwrap();
    let nodes = r#"{"id":"g1","category":["biolink:NamedThing","biolink:Gene"]}
{"id":"p1","category":["biolink:Protein","biolink:NamedThing"]}
{"id":"d1","category":["biolink:Disease","biolink:NamedThing","biolink:Mixin"]}
"#;
    let edges = r#"{"subject":"g1","predicate":"biolink:interacts_with","object":"p1"}
{"subject":"p1","predicate":"biolink:directly_physically_interacts_with","object":"g1"}
{"subject":"d1","predicate":"biolink:related_to","object":"g1"}
"#;
    write_inputs(dir.path(), nodes, edges);
    let closure = r#"{
        "biolink:NamedThing": ["biolink:Gene", "biolink:Protein", "biolink:Disease"],
        "biolink:Gene": [],
        "biolink:Protein": [],
        "biolink:Disease": []
    }"#;
    let hierarchy = ClosureTypeHierarchy::from_json_reader(closure.as_bytes()).unwrap();
    let graph = load_from(dir.path(), &hierarchy);

    let labels = |ext: &str| {
        let cat = graph.category_of(graph.node_id(ext).unwrap()).unwrap();
        graph.categories().get(cat).unwrap().iter().cloned().collect::<Vec<_>>()
    };
    assert_eq!(labels("g1"), vec!["biolink:Gene"]);
    assert_eq!(labels("p1"), vec!["biolink:Protein"]);
    assert_eq!(labels("d1"), vec!["biolink:Disease"]);

    // With the default remap Protein folds into Gene and the direct physical
    // interaction folds into its undirected parent predicate.
    let out = dir.path().join("run");
    write_id_tables(&out, &graph).unwrap();
    let mut table = MetapathTable::new();
    let mut checkpointer = Checkpointer::new(&out);
    run_sampling(&graph, &job(300, 1), &mut table, &mut checkpointer, &StopToken::new())
        .unwrap();
    let records = canonicalize_dir(&out, &RemapConfig::default()).unwrap();
    let gene_gene = records
        .iter()
        .find(|r| {
            r.metapath
                == vec![
                    MetapathStep::category(["biolink:Gene"]),
                    MetapathStep::Edge(EdgeObject::new("biolink:physically_interacts_with")),
                    MetapathStep::category(["biolink:Gene"]),
                ]
        })
        .expect("gene-gene interaction metapath");
    assert!(gene_gene.total_count > 0);
    assert!(records.iter().all(|r| r.metapath.iter().all(|s| match s {
        MetapathStep::Edge(e) => !e.reverse,
        MetapathStep::Category(_) => true,
    })));
}

#[test]
fn test_filtered_nodes_load_cleanly() {
    let dir = tempdir().unwrap();
    let nodes = format!("{TRIANGLE_NODES}{{\"id\":\"D\",\"category\":[\"ex:Z\"]}}\n");
    write_inputs(dir.path(), &nodes, TRIANGLE_EDGES);

    let filtered = dir.path().join("filtered.jsonl");
    let report = filter_nodes(
        BufReader::new(fs::File::open(dir.path().join("edges.jsonl")).unwrap()),
        BufReader::new(fs::File::open(dir.path().join("nodes.jsonl")).unwrap()),
        fs::File::create(&filtered).unwrap(),
    )
    .unwrap();
    assert_eq!(report.kept, 3);
    assert_eq!(report.dropped, 1);
    fs::rename(&filtered, dir.path().join("nodes.jsonl")).unwrap();

    let graph = load_from(dir.path(), &FlatTypeHierarchy);
    assert_eq!(graph.node_count(), 3);
    assert!(graph.node_id("D").is_none());
}

#[test]
fn test_remap_file_overrides_builtin_tables() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path(), TRIANGLE_NODES, TRIANGLE_EDGES);
    let out = dir.path().join("run");
    let graph = load_from(dir.path(), &FlatTypeHierarchy);
    write_id_tables(&out, &graph).unwrap();
    let mut table = MetapathTable::new();
    let mut checkpointer = Checkpointer::new(&out);
    run_sampling(&graph, &job(400, 2), &mut table, &mut checkpointer, &StopToken::new())
        .unwrap();

    let remap = RemapConfig::from_json_reader(
        r#"{
            "category_remap": [{"from": ["ex:X"], "to": ["ex:Y"]}],
            "predicate_remap": {"ex:p1": "ex:p", "ex:p2": "ex:p", "ex:p3": "ex:p"},
            "symmetric_predicates": ["ex:p"]
        }"#
        .as_bytes(),
    )
    .unwrap();
    let records = canonicalize_dir(&out, &remap).unwrap();
    // Everything is now Y -p- Y -p- Y with witness {p}.
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].total_count, 400);
    assert_eq!(records[0].direct_edges.len(), 1);
    assert_eq!(records[0].direct_edges[0].edge, vec![EdgeObject::new("ex:p")]);
}

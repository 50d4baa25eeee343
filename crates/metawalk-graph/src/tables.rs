//! Tab-separated id tables written next to the walk artifacts.
//!
//! Each line is `key<TAB>value`. Values are always integers, so readers split
//! on the last tab.

use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::artifact::ResumeError;
use crate::graph::KnowledgeGraph;
use crate::hierarchy::LabelSet;
use crate::signature::EdgeTypeSignature;
use crate::{CategoryId, EdgeTypeId};

pub const NODES_TO_NUMS: &str = "nodes_to_nums";
pub const NODES_TO_CATS: &str = "nodes_to_cats";
pub const PQ_TO_NUM: &str = "pq_to_num";
pub const CATEGORY_MAP: &str = "category_map";

fn render_lines<I, K, V>(rows: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: std::fmt::Display,
    V: std::fmt::Display,
{
    let mut text = String::new();
    for (k, v) in rows {
        let _ = writeln!(text, "{k}\t{v}");
    }
    text
}

fn write_lines(path: &Path, text: &str) -> Result<()> {
    let mut out = BufWriter::new(
        fs::File::create(path).with_context(|| format!("create {}", path.display()))?,
    );
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn read_lines(path: &Path) -> Result<Vec<(String, u64)>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .rsplit_once('\t')
            .ok_or_else(|| anyhow!("{}:{}: missing tab", path.display(), idx + 1))?;
        let value = value
            .trim()
            .parse()
            .with_context(|| format!("{}:{}: bad id", path.display(), idx + 1))?;
        rows.push((key.to_string(), value));
    }
    Ok(rows)
}

/// Labels of a category signature as canonical JSON (`["a","b"]`, sorted).
pub fn label_set_json(labels: &LabelSet) -> String {
    serde_json::to_string(labels).unwrap_or_default()
}

fn pq_to_num(graph: &KnowledgeGraph) -> String {
    render_lines(
        graph
            .registry()
            .iter()
            .map(|(id, sig)| (sig.canonical_json(), id)),
    )
}

fn category_map(graph: &KnowledgeGraph) -> String {
    render_lines(
        graph
            .categories()
            .iter()
            .map(|(id, labels)| (label_set_json(labels), id)),
    )
}

/// Write all four id tables into `out_dir`.
pub fn write_id_tables(out_dir: &Path, graph: &KnowledgeGraph) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    write_lines(
        &out_dir.join(NODES_TO_NUMS),
        &render_lines(graph.external_ids().iter().enumerate().map(|(i, id)| (id, i))),
    )?;
    write_lines(
        &out_dir.join(NODES_TO_CATS),
        &render_lines(graph.node_categories().iter().enumerate().map(|(i, c)| (i, c))),
    )?;
    write_lines(&out_dir.join(PQ_TO_NUM), &pq_to_num(graph))?;
    write_lines(&out_dir.join(CATEGORY_MAP), &category_map(graph))?;
    Ok(())
}

/// Check that the tables the artifact ids refer to (`pq_to_num` and
/// `category_map`) in `out_dir` are exactly what `graph` would write.
///
/// Run before resuming: the checkpoint keys are only meaningful against the
/// ids they were sampled with.
pub fn verify_id_tables(out_dir: &Path, graph: &KnowledgeGraph) -> Result<()> {
    for (name, expected) in [(PQ_TO_NUM, pq_to_num(graph)), (CATEGORY_MAP, category_map(graph))] {
        let path = out_dir.join(name);
        let existing = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResumeError::MissingIdTable(name).into());
            }
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        if existing != expected {
            return Err(ResumeError::IdTableMismatch(name).into());
        }
    }
    Ok(())
}

/// `category id -> label set`, from `category_map`.
pub fn read_category_map(dir: &Path) -> Result<AHashMap<CategoryId, LabelSet>> {
    let path = dir.join(CATEGORY_MAP);
    read_lines(&path)?
        .into_iter()
        .map(|(labels, id)| -> Result<(CategoryId, LabelSet)> {
            let labels: LabelSet = serde_json::from_str(&labels)
                .with_context(|| format!("{}: bad label set {labels}", path.display()))?;
            let id = CategoryId::try_from(id)
                .with_context(|| format!("{}: category id {id} out of range", path.display()))?;
            Ok((id, labels))
        })
        .collect()
}

/// `edge type id -> signature`, from `pq_to_num`.
pub fn read_edge_signatures(dir: &Path) -> Result<AHashMap<EdgeTypeId, EdgeTypeSignature>> {
    let path = dir.join(PQ_TO_NUM);
    read_lines(&path)?
        .into_iter()
        .map(|(json, id)| -> Result<(EdgeTypeId, EdgeTypeSignature)> {
            let sig = EdgeTypeSignature::from_canonical_json(&json)
                .with_context(|| format!("{}: bad signature {json}", path.display()))?;
            let id = EdgeTypeId::try_from(id)
                .with_context(|| format!("{}: edge type id {id} out of range", path.display()))?;
            Ok((id, sig))
        })
        .collect()
}

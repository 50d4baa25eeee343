//! Node pruning: keep only nodes that some edge references.

use ahash::AHashSet;
use anyhow::Result;
use serde::Deserialize;
use std::io::{BufRead, Write};

#[derive(Deserialize)]
struct EdgeEnds {
    subject: String,
    object: String,
}

#[derive(Deserialize)]
struct NodeKey {
    id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub referenced: usize,
    pub kept: u64,
    pub dropped: u64,
    pub malformed: u64,
}

/// Copy through (verbatim) every node line whose `id` appears as a subject or
/// object in `edges`.
pub fn filter_nodes<E, N, W>(edges: E, nodes: N, mut out: W) -> Result<FilterReport>
where
    E: BufRead,
    N: BufRead,
    W: Write,
{
    let mut report = FilterReport::default();
    let mut keep: AHashSet<String> = AHashSet::new();
    for line in edges.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EdgeEnds>(&line) {
            Ok(edge) => {
                keep.insert(edge.subject);
                keep.insert(edge.object);
            }
            Err(_) => report.malformed += 1,
        }
    }
    report.referenced = keep.len();

    for line in nodes.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<NodeKey>(&line) {
            Ok(node) if keep.contains(&node.id) => {
                writeln!(out, "{line}")?;
                report.kept += 1;
            }
            Ok(_) => report.dropped += 1,
            Err(_) => report.malformed += 1,
        }
    }
    out.flush()?;
    tracing::info!(
        referenced = report.referenced,
        kept = report.kept,
        dropped = report.dropped,
        malformed = report.malformed,
        "filtered nodes"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreferenced_nodes_are_dropped() {
        let edges = "{\"subject\":\"A\",\"object\":\"B\",\"predicate\":\"p\"}\nbroken\n";
        let nodes = "{\"id\":\"A\",\"category\":[\"X\"]}\n{\"id\":\"C\"}\n{\"id\":\"B\", \"name\":\"b\"}\n";
        let mut out = Vec::new();
        let report = filter_nodes(edges.as_bytes(), nodes.as_bytes(), &mut out).unwrap();
        assert_eq!(report.kept, 2);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.malformed, 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "{\"id\":\"A\",\"category\":[\"X\"]}\n{\"id\":\"B\", \"name\":\"b\"}\n"
        );
    }
}

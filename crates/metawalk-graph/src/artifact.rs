//! Raw walk-statistics artifact.
//!
//! A JSON object keyed by stringified MetaWalk tuples `"(0, 3, 1, -2, 1)"`;
//! each value maps stringified witness tuples (`"()"`, `"(5,)"`, `"(-2, 7)"`)
//! to counts. Files are written to a temporary sibling and renamed into place.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::aggregate::{MetaWalk, MetapathTable, WitnessSet};
use crate::SignedEdgeType;

pub const WORKING_ARTIFACT: &str = "meta_walks.json";
pub const FINAL_ARTIFACT: &str = "meta_walks_final.json";

pub type RawArtifact = BTreeMap<String, BTreeMap<String, u64>>;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("not a metawalk tuple: {0}")]
    BadMetaWalk(String),
    #[error("not a witness tuple: {0}")]
    BadWitness(String),
}

/// A checkpoint that cannot be continued by the current run.
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    #[error("checkpoint holds {found}-hop metapaths but this run samples {expected}-hop walks")]
    LengthMismatch { expected: usize, found: usize },
    #[error("id table {0} is missing next to the checkpoint")]
    MissingIdTable(&'static str),
    #[error("id table {0} no longer matches the loaded graph; the checkpoint ids would expand to the wrong labels")]
    IdTableMismatch(&'static str),
}

/// `()` / `(a,)` / `(a, b, ...)`.
pub fn format_tuple<T: std::fmt::Display>(items: &[T]) -> String {
    match items {
        [] => "()".to_string(),
        [one] => format!("({one},)"),
        many => {
            let parts: Vec<String> = many.iter().map(ToString::to_string).collect();
            format!("({})", parts.join(", "))
        }
    }
}

pub fn parse_tuple(text: &str) -> Option<Vec<i64>> {
    let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut out = Vec::new();
    let mut parts = inner.split(',').map(str::trim).peekable();
    while let Some(part) = parts.next() {
        if part.is_empty() {
            // Only a trailing comma may leave an empty slot.
            if parts.peek().is_some() || out.is_empty() && !inner.trim().is_empty() {
                return None;
            }
            continue;
        }
        out.push(part.parse().ok()?);
    }
    Some(out)
}

pub fn to_raw(table: &MetapathTable) -> RawArtifact {
    table
        .iter()
        .map(|(key, witnesses)| {
            let inner = witnesses
                .iter()
                .map(|(w, &count)| (format_tuple(w.edges()), count))
                .collect();
            (format_tuple(&key.tokens()), inner)
        })
        .collect()
}

pub fn from_raw(raw: &RawArtifact) -> Result<MetapathTable, ArtifactError> {
    let mut table = MetapathTable::new();
    for (key_text, witnesses) in raw {
        let key = parse_tuple(key_text)
            .and_then(|tokens| MetaWalk::from_tokens(&tokens))
            .ok_or_else(|| ArtifactError::BadMetaWalk(key_text.clone()))?;
        for (witness_text, &count) in witnesses {
            let edges = parse_tuple(witness_text)
                .and_then(|tokens| {
                    tokens
                        .into_iter()
                        .map(|t| SignedEdgeType::try_from(t).ok().filter(|&e| e != 0))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| ArtifactError::BadWitness(witness_text.clone()))?;
            table.record(key.clone(), WitnessSet::new(edges), count);
        }
    }
    Ok(table)
}

pub fn write_artifact(path: &Path, table: &MetapathTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut out = BufWriter::new(fs::File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut out, &to_raw(table))?;
        out.write_all(b"\n")?;
        out.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_artifact(path: &Path) -> Result<MetapathTable> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let raw: RawArtifact = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(from_raw(&raw)?)
}

/// Periodic + final artifact writer for one output directory.
#[derive(Debug, Clone)]
pub struct Checkpointer {
    working: PathBuf,
    final_path: PathBuf,
    failures: u64,
}

impl Checkpointer {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            working: out_dir.join(WORKING_ARTIFACT),
            final_path: out_dir.join(FINAL_ARTIFACT),
            failures: 0,
        }
    }

    pub fn working_path(&self) -> &Path {
        &self.working
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Write the working checkpoint. A failure is logged and counted; the
    /// next interval simply tries again.
    pub fn checkpoint(&mut self, table: &MetapathTable) -> bool {
        match write_artifact(&self.working, table) {
            Ok(()) => {
                tracing::debug!(path = %self.working.display(), absorbed = table.absorbed(), "checkpoint written");
                true
            }
            Err(err) => {
                self.failures += 1;
                tracing::warn!(path = %self.working.display(), error = %err, "checkpoint write failed");
                false
            }
        }
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn write_final(&self, table: &MetapathTable) -> Result<()> {
        write_artifact(&self.final_path, table)
            .with_context(|| format!("write {}", self.final_path.display()))
    }

    /// The most recent artifact in the directory: working checkpoint first,
    /// then the final file.
    pub fn resume(&self) -> Result<Option<MetapathTable>> {
        for path in [&self.working, &self.final_path] {
            if path.exists() {
                return read_artifact(path).map(Some);
            }
        }
        Ok(None)
    }
}

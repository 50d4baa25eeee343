//! Metawalk canonicalization: turn the numeric metapath artifact into labelled,
//! remapped and collapsed records, and tabulate them.
//!
//! ```text
//! meta_walks_final.json + category_map + pq_to_num
//!     -> expand    (ids back to labels / predicate objects)
//!     -> remap     (category and predicate synonyms, symmetric predicates)
//!     -> collapse  (merge equal metapaths, sort)
//!     -> processed_metapaths.json
//!     -> tabulated_metapaths.tsv
//! ```

pub mod collapse;
pub mod expand;
pub mod model;
pub mod remap;
pub mod report;

use anyhow::{Context, Result};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use metawalk_graph::aggregate::MetapathTable;
use metawalk_graph::artifact::{read_artifact, FINAL_ARTIFACT};

pub use collapse::collapse;
pub use expand::{expand, ExpandError, IdTables};
pub use model::{CanonicalRecord, DirectEdges, EdgeObject, MetapathStep};
pub use remap::{CategoryRule, RemapConfig};
pub use report::{shorten_edge, tabulate, write_report, Abbreviations, ReportError, ReportRow};

pub const PROCESSED_METAPATHS: &str = "processed_metapaths.json";
pub const TABULATED_METAPATHS: &str = "tabulated_metapaths.tsv";

/// Expand, remap and collapse a metapath table.
pub fn canonicalize(
    table: &MetapathTable,
    ids: &IdTables,
    remap: &RemapConfig,
) -> Result<Vec<CanonicalRecord>, ExpandError> {
    let expanded = expand(table, ids)?;
    Ok(collapse(expanded.iter().map(|r| remap.apply(r))))
}

/// Canonicalize the final artifact of a sampling run directory.
pub fn canonicalize_dir(dir: &Path, remap: &RemapConfig) -> Result<Vec<CanonicalRecord>> {
    let ids = IdTables::read(dir)?;
    let table = read_artifact(&dir.join(FINAL_ARTIFACT))?;
    let records = canonicalize(&table, &ids, remap)?;
    tracing::info!(
        metapaths_in = table.len(),
        metapaths_out = records.len(),
        walks = table.absorbed(),
        "canonicalized metapaths"
    );
    Ok(records)
}

/// Pretty JSON, written to a temporary file and renamed into place.
pub fn write_records(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut out = BufWriter::new(
            fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?,
        );
        serde_json::to_writer_pretty(&mut out, records)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<CanonicalRecord>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse {}", path.display()))
}

/// Tabulate records into a TSV file.
pub fn write_report_file(
    path: &Path,
    records: &[CanonicalRecord],
    abbreviations: &Abbreviations,
) -> Result<usize> {
    let rows = tabulate(records, abbreviations);
    let out = BufWriter::new(
        fs::File::create(path).with_context(|| format!("create {}", path.display()))?,
    );
    write_report(&rows, out)?;
    Ok(rows.len())
}

//! Human-readable tabulation of canonical records.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use thiserror::Error;

use crate::model::{CanonicalRecord, EdgeObject, MetapathStep};

pub const REPORT_HEADER: &str =
    "MetaPath\ttotal_count\tfraction_no_direct\tMost Common Direct\tFraction MCE\tNum Direct Types";

const AFFECTS: &str = "biolink:affects";
const REGULATES: &str = "biolink:regulates";
const DIRECTION: &str = "object_direction_qualifier";
const ASPECT: &str = "object_aspect_qualifier";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("abbreviation {abbreviation:?} is used by both {first:?} and {second:?}")]
    AbbreviationCollision {
        abbreviation: String,
        first: String,
        second: String,
    },
}

const BIOLINK_ABBREVIATIONS: &[(&str, &str)] = &[
    ("biolink:SmallMolecule", "SM"),
    ("biolink:Gene", "G"),
    ("biolink:Protein", "P"),
    ("biolink:Gene,biolink:Protein", "G,P"),
    ("biolink:Pathway", "PW"),
    ("biolink:Disease", "D"),
    ("biolink:PhenotypicFeature", "PF"),
    ("biolink:BiologicalProcess", "BP"),
    ("biolink:PhysiologicalProcess", "PP"),
    ("biolink:Cell", "C"),
    ("biolink:CellularComponent", "CC"),
    ("biolink:MolecularActivity", "MA"),
    ("biolink:AnatomicalEntity", "AE"),
    ("biolink:OrganismTaxon", "OT"),
    ("biolink:GeneFamily", "GF"),
    ("biolink:GrossAnatomicalStructure", "AS"),
    ("biolink:MolecularMixture", "MM"),
    ("biolink:ComplexMolecularMixture", "CMM"),
    ("biolink:ChemicalMixture", "CM"),
    ("biolink:ChemicalEntity", "CE"),
    ("biolink:BiologicalEntity", "BE"),
    ("biolink:Polypeptide", "Po"),
    ("biolink:Procedure", "Pr"),
    ("biolink:Behavior", "B"),
    ("biolink:OrganismAttribute", "OA"),
    ("biolink:ClinicalAttribute", "CA"),
    ("biolink:InformationContentEntity", "ICE"),
    ("biolink:Activity", "A"),
    ("biolink:Drug", "Dr"),
    ("biolink:Phenomenon", "Ph"),
    ("biolink:Device", "Dv"),
];

fn signature_key<'a, I>(labels: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut labels: Vec<&str> = labels.into_iter().map(str::trim).collect();
    labels.sort_unstable();
    labels.dedup();
    labels.join(",")
}

fn local_name(curie: &str) -> &str {
    curie.rsplit_once(':').map_or(curie, |(_, local)| local)
}

/// Category signature -> short label. Keys are comma-joined labels in any
/// order; they are normalized to sorted order on construction.
#[derive(Debug, Clone)]
pub struct Abbreviations {
    table: BTreeMap<String, String>,
}

impl Abbreviations {
    pub fn new<I, K, V>(entries: I) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut table = BTreeMap::new();
        let mut owners: BTreeMap<String, String> = BTreeMap::new();
        for (key, abbr) in entries {
            let key = signature_key(key.as_ref().split(','));
            let abbr = abbr.into();
            if let Some(first) = owners.get(&abbr) {
                if *first != key {
                    return Err(ReportError::AbbreviationCollision {
                        abbreviation: abbr,
                        first: first.clone(),
                        second: key,
                    });
                }
            }
            owners.insert(abbr.clone(), key.clone());
            table.insert(key, abbr);
        }
        Ok(Self { table })
    }

    /// Built-in Biolink table.
    pub fn biolink() -> Self {
        let table = BIOLINK_ABBREVIATIONS
            .iter()
            .map(|(k, v)| (signature_key(k.split(',')), v.to_string()))
            .collect();
        Self { table }
    }

    /// JSON object `{ "label,label": "ABBR" }`.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: BTreeMap<String, String> =
            serde_json::from_reader(reader).context("parse abbreviation table")?;
        Ok(Self::new(raw)?)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn abbreviate(&self, labels: &[String]) -> String {
        let key = signature_key(labels.iter().map(String::as_str));
        match self.table.get(&key) {
            Some(abbr) => abbr.clone(),
            None => labels
                .iter()
                .map(|l| local_name(l))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl Default for Abbreviations {
    fn default() -> Self {
        Self::biolink()
    }
}

/// Compact edge label: `name_>` forward, `<_name` reverse.
pub fn shorten_edge(edge: &EdgeObject) -> String {
    let direction = edge.qualifier(DIRECTION);
    let aspect = edge.qualifier(ASPECT);
    let name = match (edge.predicate.as_str(), direction, aspect) {
        (AFFECTS, Some(dir), Some(aspect)) => format!("{dir}_{aspect}"),
        (AFFECTS, None, Some(aspect)) => format!("affects_{aspect}"),
        (AFFECTS, Some(dir), None) => format!("{dir}_affects"),
        (REGULATES, Some(dir), _) => format!("regulates_{dir}"),
        (predicate, _, _) => local_name(predicate).to_string(),
    };
    if edge.reverse {
        format!("<_{name}")
    } else {
        format!("{name}_>")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub metapath: String,
    pub total_count: u64,
    pub fraction_no_direct: f64,
    pub most_common_direct: String,
    pub fraction_mce: f64,
    pub num_direct_types: usize,
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

pub fn tabulate_record(record: &CanonicalRecord, abbreviations: &Abbreviations) -> ReportRow {
    let metapath = record
        .metapath
        .iter()
        .map(|step| match step {
            MetapathStep::Category(labels) => abbreviations.abbreviate(labels),
            MetapathStep::Edge(edge) => shorten_edge(edge),
        })
        .collect::<Vec<_>>()
        .join(" ");

    // First maximum wins, so ties follow the record's own witness order.
    let mut mce: Option<(u64, &[EdgeObject])> = None;
    for direct in record.direct_edges.iter().filter(|d| !d.edge.is_empty()) {
        if mce.map_or(true, |(best, _)| direct.count > best) {
            mce = Some((direct.count, direct.edge.as_slice()));
        }
    }
    let (mce_count, most_common_direct) = match mce {
        Some((count, edges)) => (
            count,
            edges.iter().map(shorten_edge).collect::<Vec<_>>().join(","),
        ),
        None => (0, String::new()),
    };

    ReportRow {
        metapath,
        total_count: record.total_count,
        fraction_no_direct: ratio(record.no_direct_count(), record.total_count),
        most_common_direct,
        fraction_mce: ratio(mce_count, record.total_count),
        num_direct_types: record.direct_edges.len(),
    }
}

pub fn tabulate(records: &[CanonicalRecord], abbreviations: &Abbreviations) -> Vec<ReportRow> {
    records
        .iter()
        .map(|r| tabulate_record(r, abbreviations))
        .collect()
}

pub fn write_report<W: Write>(rows: &[ReportRow], mut out: W) -> Result<()> {
    writeln!(out, "{REPORT_HEADER}")?;
    for row in rows {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.metapath,
            row.total_count,
            row.fraction_no_direct,
            row.most_common_direct,
            row.fraction_mce,
            row.num_direct_types
        )?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_has_no_collisions() {
        let builtin = Abbreviations::biolink();
        let rebuilt = Abbreviations::new(builtin.table.clone()).unwrap();
        assert_eq!(rebuilt.len(), BIOLINK_ABBREVIATIONS.len());
    }

    #[test]
    fn label_order_in_keys_is_irrelevant() {
        let abbr = Abbreviations::new([("biolink:Protein, biolink:Gene", "GP")]).unwrap();
        let labels = vec!["biolink:Gene".to_string(), "biolink:Protein".to_string()];
        assert_eq!(abbr.abbreviate(&labels), "GP");
    }

    #[test]
    fn unknown_signatures_fall_back_to_local_names() {
        let abbr = Abbreviations::biolink();
        let labels = vec!["biolink:Aardvark".to_string(), "ex:Zebra".to_string()];
        assert_eq!(abbr.abbreviate(&labels), "Aardvark,Zebra");
    }

    #[test]
    fn edge_shortening_rules() {
        let affects = EdgeObject::new(AFFECTS);
        let both = affects
            .clone()
            .with_qualifier(DIRECTION, "increased")
            .with_qualifier(ASPECT, "activity");
        assert_eq!(shorten_edge(&both), "increased_activity_>");
        let aspect = affects.clone().with_qualifier(ASPECT, "expression");
        assert_eq!(shorten_edge(&aspect), "affects_expression_>");
        let dir = affects.clone().with_qualifier(DIRECTION, "decreased");
        assert_eq!(shorten_edge(&dir), "decreased_affects_>");
        assert_eq!(shorten_edge(&affects), "affects_>");

        let regulates = EdgeObject::new(REGULATES).with_qualifier(DIRECTION, "upregulated");
        assert_eq!(shorten_edge(&regulates.reversed()), "<_regulates_upregulated");
        assert_eq!(shorten_edge(&EdgeObject::new(REGULATES)), "regulates_>");
        assert_eq!(
            shorten_edge(&EdgeObject::new("biolink:treats").reversed()),
            "<_treats"
        );
    }
}

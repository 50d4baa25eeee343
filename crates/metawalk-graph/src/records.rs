//! Node and edge input records (one JSON object per line).

use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::BufRead;

/// Suffix that marks a flattened qualifier field on an edge record.
pub const QUALIFIER_SUFFIX: &str = "_qualifier";

/// A node line: `{"id": ..., "category": [...]}`. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default)]
    pub category: Vec<String>,
}

/// One entry of the structured `qualifiers` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QualifierRecord {
    pub qualifier_type_id: String,
    pub qualifier_value: Value,
}

/// An edge line.
///
/// `predicate` is optional at the parse level so that a missing predicate is
/// reported as a named rejection instead of a generic parse failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EdgeRecord {
    pub subject: String,
    pub object: String,
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default)]
    pub qualifiers: Option<Vec<QualifierRecord>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EdgeRecord {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Self {
        Self {
            subject: subject.to_string(),
            object: object.to_string(),
            predicate: Some(predicate.to_string()),
            qualifiers: None,
            extra: Map::new(),
        }
    }

    /// Attach a flattened `*_qualifier` field.
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.extra
            .insert(name.to_string(), Value::String(value.to_string()));
        self
    }

    /// Qualifier key/value pairs, in input order.
    ///
    /// The structured list wins when present; otherwise every flattened field
    /// whose name ends in [`QUALIFIER_SUFFIX`] is used. Null values count as absent.
    pub fn qualifier_pairs(&self) -> Vec<(String, String)> {
        match &self.qualifiers {
            Some(list) => list
                .iter()
                .filter(|q| !q.qualifier_value.is_null())
                .map(|q| (q.qualifier_type_id.clone(), value_text(&q.qualifier_value)))
                .collect(),
            None => self
                .extra
                .iter()
                .filter(|(name, value)| name.ends_with(QUALIFIER_SUFFIX) && !value.is_null())
                .map(|(name, value)| (name.clone(), value_text(value)))
                .collect(),
        }
    }
}

/// Qualifier values are almost always strings; anything else keeps its JSON text.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("line {line}: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: read failed: {source}")]
    Io {
        line: u64,
        #[source]
        source: std::io::Error,
    },
}

impl RecordError {
    pub fn is_io(&self) -> bool {
        matches!(self, RecordError::Io { .. })
    }
}

/// Lazily parse a JSON-lines stream, one record at a time.
///
/// Blank lines are skipped. A line that fails to parse yields
/// `RecordError::Malformed` and iteration continues with the next line.
pub fn read_json_lines<T, R>(reader: R) -> impl Iterator<Item = Result<T, RecordError>>
where
    T: serde::de::DeserializeOwned,
    R: BufRead,
{
    reader
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line_no = idx as u64 + 1;
            match line {
                Err(source) => Some(Err(RecordError::Io {
                    line: line_no,
                    source,
                })),
                Ok(text) if text.trim().is_empty() => None,
                Ok(text) => Some(serde_json::from_str::<T>(&text).map_err(|source| {
                    RecordError::Malformed {
                        line: line_no,
                        source,
                    }
                })),
            }
        })
}

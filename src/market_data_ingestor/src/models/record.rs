//! Column-oriented view of one exchange report after normalization.
//!
//! A [`RecordSet`] keeps the report's column list alongside its rows so that
//! joins can check for the presence of a key column before touching any row.
//! Rows map column name to [`Field`]; declared numeric columns hold typed,
//! nullable numbers and every other column passes through as text.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;

/// Column holding the security code in every exchange report.
pub const CODE_COLUMN: &str = "Code";
/// Column holding the security short name in every exchange report.
pub const NAME_COLUMN: &str = "Name";

/// One cell of a normalized report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    /// A pass-through (non-numeric) column.
    Text(String),
    /// A declared integer column; `None` when empty or unparsable.
    Int(Option<i64>),
    /// A declared float column; `None` when empty or unparsable.
    Float(Option<f64>),
}

impl Field {
    /// Text value, if this is a pass-through column.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, if present.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Field::Int(v) => *v,
            _ => None,
        }
    }

    /// Numeric value as a float, if present. Integer columns widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Float(v) => *v,
            Field::Int(v) => v.map(|i| i as f64),
            Field::Text(_) => None,
        }
    }
}

/// A single report row.
pub type Record = IndexMap<String, Field>;

/// All rows of one report plus the union of their columns, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct security codes present in the set.
    pub fn codes(&self) -> BTreeSet<&str> {
        self.rows.iter().filter_map(record_code).collect()
    }

    /// Looks up the row for a single security code.
    pub fn find(&self, code: &str) -> Option<&Record> {
        self.rows.iter().find(|r| record_code(r) == Some(code))
    }

    /// Keeps only the rows for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&Record) -> bool) {
        self.rows.retain(keep);
    }
}

/// The code of a row, if it has a text `Code` column.
pub fn record_code(record: &Record) -> Option<&str> {
    record.get(CODE_COLUMN).and_then(Field::as_text)
}

/// The name of a row, if it has a text `Name` column.
pub fn record_name(record: &Record) -> Option<&str> {
    record.get(NAME_COLUMN).and_then(Field::as_text)
}

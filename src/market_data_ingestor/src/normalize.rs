//! Market data normalizer.
//!
//! Exchange report feeds deliver every value as a string, with thousands
//! separators in large numbers and empty strings (or placeholders such as
//! `--`) where a value is missing. This module turns a raw JSON payload into a
//! [`RecordSet`] whose declared numeric columns hold typed, nullable numbers.
//!
//! Conversion never fails a single field: an empty or unparsable value becomes
//! `None`, never zero. Only a payload that is not a list of objects is treated
//! as a failed feed, and that is reported as `None` rather than an error.

use serde_json::{Map, Value};
use tracing::warn;

use crate::models::record::{Field, Record, RecordSet};

/// Thousands separator used by the exchange feeds.
const GROUPING_SEPARATOR: char = ',';

/// Target type of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Integer,
    Float,
}

/// A parsed numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

/// Declares which columns of a report are numeric.
#[derive(Debug)]
pub struct ReportSchema {
    pub int_columns: &'static [&'static str],
    pub float_columns: &'static [&'static str],
}

impl ReportSchema {
    fn kind_of(&self, column: &str) -> Option<NumericKind> {
        if self.int_columns.contains(&column) {
            Some(NumericKind::Integer)
        } else if self.float_columns.contains(&column) {
            Some(NumericKind::Float)
        } else {
            None
        }
    }

    fn declared(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.int_columns.iter().chain(self.float_columns).copied()
    }
}

/// Parses a raw feed value into a number of the given kind.
///
/// Grouping separators are stripped first. Surrounding whitespace is ignored.
/// Empty input and input that does not parse under `kind` yield `None`.
///
/// ```
/// use market_data_ingestor::normalize::{parse_optional_number, Number, NumericKind};
///
/// assert_eq!(parse_optional_number("1,234,567", NumericKind::Integer), Some(Number::Integer(1_234_567)));
/// assert_eq!(parse_optional_number("", NumericKind::Float), None);
/// assert_eq!(parse_optional_number("--", NumericKind::Float), None);
/// ```
pub fn parse_optional_number(raw: &str, kind: NumericKind) -> Option<Number> {
    let cleaned: String = raw.chars().filter(|c| *c != GROUPING_SEPARATOR).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    match kind {
        NumericKind::Integer => cleaned.parse::<i64>().ok().map(Number::Integer),
        NumericKind::Float => cleaned.parse::<f64>().ok().map(Number::Float),
    }
}

fn numeric_field(value: Option<&Value>, kind: NumericKind) -> Field {
    let number = match value {
        Some(Value::String(s)) => parse_optional_number(s, kind),
        Some(Value::Number(n)) => match kind {
            NumericKind::Integer => n.as_i64().map(Number::Integer),
            NumericKind::Float => n.as_f64().map(Number::Float),
        },
        _ => None,
    };
    match kind {
        NumericKind::Integer => Field::Int(match number {
            Some(Number::Integer(i)) => Some(i),
            _ => None,
        }),
        NumericKind::Float => Field::Float(match number {
            Some(Number::Float(f)) => Some(f),
            _ => None,
        }),
    }
}

fn text_field(value: &Value) -> Field {
    match value {
        Value::String(s) => Field::Text(s.clone()),
        Value::Null => Field::Text(String::new()),
        other => Field::Text(other.to_string()),
    }
}

fn normalize_row(object: &Map<String, Value>, schema: &ReportSchema) -> Record {
    let mut row = Record::with_capacity(object.len());
    for (column, value) in object {
        let field = match schema.kind_of(column) {
            Some(kind) => numeric_field(Some(value), kind),
            None => text_field(value),
        };
        row.insert(column.clone(), field);
    }
    // Declared columns the row omitted are null, not absent.
    for column in schema.declared() {
        if !row.contains_key(column) {
            let kind = schema.kind_of(column).unwrap_or(NumericKind::Float);
            row.insert(column.to_string(), numeric_field(None, kind));
        }
    }
    row
}

/// Normalizes a raw report payload.
///
/// Returns `None` when the payload is not a JSON array of objects; callers must
/// treat that as a failed feed. The column list is the union of every row's
/// keys in first-seen order, followed by any declared numeric column no row
/// carried.
pub fn normalize_payload(payload: &Value, schema: &ReportSchema) -> Option<RecordSet> {
    let Some(items) = payload.as_array() else {
        warn!("report payload is not a list");
        return None;
    };

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Some(object) = item.as_object() else {
            warn!("report payload contains a non-object entry");
            return None;
        };
        for key in object.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        rows.push(normalize_row(object, schema));
    }
    for column in schema.declared() {
        if !columns.iter().any(|c| c == column) {
            columns.push(column.to_string());
        }
    }

    Some(RecordSet::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    static SCHEMA: ReportSchema = ReportSchema {
        int_columns: &["TradeVolume"],
        float_columns: &["ClosingPrice"],
    };

    #[test]
    fn parses_grouped_numbers() {
        assert_eq!(
            parse_optional_number("12,345", NumericKind::Integer),
            Some(Number::Integer(12_345))
        );
        assert_eq!(
            parse_optional_number("1,025.50", NumericKind::Float),
            Some(Number::Float(1025.5))
        );
    }

    #[test]
    fn empty_and_garbage_become_none() {
        assert_eq!(parse_optional_number("", NumericKind::Integer), None);
        assert_eq!(parse_optional_number(",", NumericKind::Integer), None);
        assert_eq!(parse_optional_number("--", NumericKind::Float), None);
        assert_eq!(parse_optional_number("12.5", NumericKind::Integer), None);
    }

    #[test]
    fn normalizes_declared_columns_only() {
        let payload = json!([
            {"Code": "2330", "Name": "TSMC", "TradeVolume": "31,234,000", "ClosingPrice": "1,025.00"},
            {"Code": "0050", "Name": "ETF", "TradeVolume": "", "ClosingPrice": "--"}
        ]);
        let set = normalize_payload(&payload, &SCHEMA).unwrap();

        assert_eq!(set.columns(), &["Code", "Name", "TradeVolume", "ClosingPrice"]);
        let tsmc = set.find("2330").unwrap();
        assert_eq!(tsmc["TradeVolume"], Field::Int(Some(31_234_000)));
        assert_eq!(tsmc["ClosingPrice"], Field::Float(Some(1025.0)));
        assert_eq!(tsmc["Name"], Field::Text("TSMC".into()));

        let etf = set.find("0050").unwrap();
        assert_eq!(etf["TradeVolume"], Field::Int(None));
        assert_eq!(etf["ClosingPrice"], Field::Float(None));
    }

    #[test]
    fn missing_declared_column_is_null() {
        let payload = json!([{"Code": "2330", "Name": "TSMC"}]);
        let set = normalize_payload(&payload, &SCHEMA).unwrap();
        assert!(set.has_column("TradeVolume"));
        assert_eq!(set.rows()[0]["TradeVolume"], Field::Int(None));
    }

    #[test]
    fn non_list_payload_is_a_failed_feed() {
        assert!(normalize_payload(&json!({"stat": "error"}), &SCHEMA).is_none());
        assert!(normalize_payload(&json!([1, 2, 3]), &SCHEMA).is_none());
        assert!(normalize_payload(&json!("nope"), &SCHEMA).is_none());
    }

    #[test]
    fn empty_list_is_an_empty_set() {
        let set = normalize_payload(&json!([]), &SCHEMA).unwrap();
        assert!(set.is_empty());
        assert!(!set.has_column("Code"));
    }

    fn group(digits: &str) -> String {
        let mut out = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }

    proptest! {
        #[test]
        fn grouping_separators_do_not_change_integers(n in 0i64..1_000_000_000_000) {
            let plain = n.to_string();
            prop_assert_eq!(
                parse_optional_number(&group(&plain), NumericKind::Integer),
                parse_optional_number(&plain, NumericKind::Integer)
            );
        }

        #[test]
        fn grouping_separators_do_not_change_floats(whole in 0u64..10_000_000, frac in 0u32..100) {
            let plain = format!("{whole}.{frac:02}");
            let grouped = format!("{}.{frac:02}", group(&whole.to_string()));
            prop_assert_eq!(
                parse_optional_number(&grouped, NumericKind::Float),
                parse_optional_number(&plain, NumericKind::Float)
            );
        }

        #[test]
        fn never_panics_on_arbitrary_input(raw in ".*") {
            let _ = parse_optional_number(&raw, NumericKind::Integer);
            let _ = parse_optional_number(&raw, NumericKind::Float);
        }
    }
}

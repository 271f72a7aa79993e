//! Dataset reconciler: inner join of two report record sets.
//!
//! Rows are matched on the pair `(Code, Name)`. Only securities present in both
//! sets survive; nothing is defaulted. When both sides carry the same non-key
//! column the left value wins, so joining a set with itself returns it
//! unchanged.

use std::collections::HashMap;

use crate::{
    errors::{JoinSide, ReconcileError},
    models::record::{CODE_COLUMN, NAME_COLUMN, Record, RecordSet, record_code, record_name},
};

fn require_keys(set: &RecordSet, side: JoinSide) -> Result<(), ReconcileError> {
    for column in [CODE_COLUMN, NAME_COLUMN] {
        if !set.has_column(column) {
            return Err(ReconcileError::MissingJoinKey { side, column });
        }
    }
    Ok(())
}

/// Inner-joins `left` and `right` on `(Code, Name)`.
///
/// Output rows follow `left`'s order, but callers should not rely on it.
///
/// # Errors
///
/// [`ReconcileError::MissingJoinKey`] if either set lacks a `Code` or `Name` column.
pub fn reconcile(left: &RecordSet, right: &RecordSet) -> Result<RecordSet, ReconcileError> {
    require_keys(left, JoinSide::Left)?;
    require_keys(right, JoinSide::Right)?;

    // First occurrence wins on the right side.
    let mut index: HashMap<(&str, &str), &Record> = HashMap::with_capacity(right.len());
    for row in right.rows() {
        if let (Some(code), Some(name)) = (record_code(row), record_name(row)) {
            index.entry((code, name)).or_insert(row);
        }
    }

    let mut columns = left.columns().to_vec();
    for column in right.columns() {
        if !left.has_column(column) {
            columns.push(column.clone());
        }
    }

    let rows = left
        .rows()
        .iter()
        .filter_map(|row| {
            let key = (record_code(row)?, record_name(row)?);
            let other = index.get(&key)?;
            let mut merged = row.clone();
            for (column, field) in other.iter() {
                if !merged.contains_key(column) {
                    merged.insert(column.clone(), field.clone());
                }
            }
            Some(merged)
        })
        .collect();

    Ok(RecordSet::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::Field;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn row(code: &str, extra: (&str, Field)) -> Record {
        let mut r = Record::new();
        r.insert(CODE_COLUMN.into(), Field::Text(code.into()));
        r.insert(NAME_COLUMN.into(), Field::Text(format!("name-{code}")));
        r.insert(extra.0.into(), extra.1);
        r
    }

    fn trade_set(codes: &[&str]) -> RecordSet {
        RecordSet::new(
            vec![CODE_COLUMN.into(), NAME_COLUMN.into(), "TradeVolume".into()],
            codes
                .iter()
                .map(|c| row(c, ("TradeVolume", Field::Int(Some(1_000)))))
                .collect(),
        )
    }

    fn valuation_set(codes: &[&str]) -> RecordSet {
        RecordSet::new(
            vec![CODE_COLUMN.into(), NAME_COLUMN.into(), "PEratio".into()],
            codes
                .iter()
                .map(|c| row(c, ("PEratio", Field::Float(Some(12.5)))))
                .collect(),
        )
    }

    #[test]
    fn keeps_only_codes_in_both_sets() {
        let joined =
            reconcile(&trade_set(&["2330", "2317", "1101"]), &valuation_set(&["2317", "2330", "9999"]))
                .unwrap();

        assert_eq!(joined.codes(), BTreeSet::from(["2317", "2330"]));
        assert_eq!(
            joined.columns(),
            &["Code", "Name", "TradeVolume", "PEratio"]
        );
        let tsmc = joined.find("2330").unwrap();
        assert_eq!(tsmc["TradeVolume"], Field::Int(Some(1_000)));
        assert_eq!(tsmc["PEratio"], Field::Float(Some(12.5)));
    }

    #[test]
    fn name_mismatch_drops_the_row() {
        let left = trade_set(&["2330"]);
        let mut right = valuation_set(&["2330"]);
        let renamed: Vec<Record> = right
            .clone()
            .into_rows()
            .into_iter()
            .map(|mut r| {
                r.insert(NAME_COLUMN.into(), Field::Text("other".into()));
                r
            })
            .collect();
        right = RecordSet::new(right.columns().to_vec(), renamed);

        assert!(reconcile(&left, &right).unwrap().is_empty());
    }

    #[test]
    fn missing_code_column_is_a_precondition_error() {
        let left = trade_set(&["2330"]);
        let right = RecordSet::new(vec![NAME_COLUMN.into()], vec![]);
        assert_eq!(
            reconcile(&left, &right).unwrap_err(),
            ReconcileError::MissingJoinKey {
                side: JoinSide::Right,
                column: CODE_COLUMN
            }
        );

        let empty = RecordSet::default();
        assert!(matches!(
            reconcile(&empty, &left),
            Err(ReconcileError::MissingJoinKey {
                side: JoinSide::Left,
                ..
            })
        ));
    }

    proptest! {
        #[test]
        fn output_codes_are_the_intersection(
            a in proptest::collection::btree_set("[0-9]{4}", 0..20),
            b in proptest::collection::btree_set("[0-9]{4}", 0..20),
        ) {
            let a_codes: Vec<&str> = a.iter().map(String::as_str).collect();
            let b_codes: Vec<&str> = b.iter().map(String::as_str).collect();
            let joined = reconcile(&trade_set(&a_codes), &valuation_set(&b_codes)).unwrap();

            let expected: BTreeSet<&str> = a.intersection(&b).map(String::as_str).collect();
            prop_assert_eq!(joined.codes(), expected);
            prop_assert_eq!(joined.len(), a.intersection(&b).count());
        }

        #[test]
        fn self_join_is_identity(codes in proptest::collection::btree_set("[0-9]{4}", 0..20)) {
            let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
            let set = trade_set(&codes);
            prop_assert_eq!(reconcile(&set, &set).unwrap(), set);
        }
    }
}

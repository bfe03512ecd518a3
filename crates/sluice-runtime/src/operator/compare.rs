//! Tabular comparator.

use std::collections::HashMap;

use sluice_core::{Datum, Operator, Result, Table};

use super::table_input;
use crate::TRACING_TARGET_OPERATOR;

/// A cell whose value differs between the compared tables.
#[derive(Debug, Clone, PartialEq)]
pub struct CellMismatch {
    /// Rendered uid of the row.
    pub uid: String,
    /// Column holding the cell.
    pub column: String,
    /// Value in the incoming table.
    pub input: Datum,
    /// Value in the reference table.
    pub reference: Datum,
}

/// Differences between an incoming table and a reference table.
///
/// Rows are matched by their uid; cells are compared in the columns present
/// in both tables, excluding the uid column and any ignored columns. Two null
/// cells, or two NaN cells, are considered equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDiff {
    /// Columns present only in the incoming table.
    pub only_in_input: Vec<String>,
    /// Columns present only in the reference table.
    pub only_in_reference: Vec<String>,
    /// Whether the uid column is missing from either table.
    pub uid_missing: bool,
    /// Reference uids with no row in the incoming table.
    pub missing_rows: Vec<String>,
    /// Incoming uids with no row in the reference table.
    pub new_rows: Vec<String>,
    /// Differing cells of rows present in both tables.
    pub mismatches: Vec<CellMismatch>,
    /// Incoming uids held by more than one row; only the first row is compared.
    pub duplicate_uids: Vec<String>,
}

impl TableDiff {
    /// Compares `input` against `reference`.
    pub fn between(input: &Table, reference: &Table, uid_column: &str, ignore: &[String]) -> Self {
        let mut diff = Self {
            only_in_input: difference(input.columns(), reference.columns()),
            only_in_reference: difference(reference.columns(), input.columns()),
            ..Self::default()
        };

        let (Some(input_uid), Some(reference_uid)) =
            (input.column_index(uid_column), reference.column_index(uid_column))
        else {
            diff.uid_missing = true;
            return diff;
        };

        let overlapping: Vec<(&str, usize, usize)> = reference
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, column)| *column != uid_column && !ignore.contains(*column))
            .filter_map(|(reference_index, column)| {
                let input_index = input.column_index(column)?;
                Some((column.as_str(), input_index, reference_index))
            })
            .collect();

        let mut input_rows: HashMap<String, &[Datum]> = HashMap::new();
        for row in input.rows() {
            let uid = row.get(input_uid).map(Datum::to_string).unwrap_or_default();
            if input_rows.contains_key(&uid) {
                if !diff.duplicate_uids.contains(&uid) {
                    diff.duplicate_uids.push(uid);
                }
                continue;
            }
            input_rows.insert(uid, row);
        }

        let mut reference_uids = Vec::with_capacity(reference.num_rows());
        for reference_row in reference.rows() {
            let uid = reference_row
                .get(reference_uid)
                .map(Datum::to_string)
                .unwrap_or_default();
            reference_uids.push(uid.clone());

            let Some(input_row) = input_rows.get(&uid) else {
                diff.missing_rows.push(uid);
                continue;
            };

            for (column, input_index, reference_index) in &overlapping {
                let left = input_row.get(*input_index).cloned().unwrap_or_default();
                let right = reference_row.get(*reference_index).cloned().unwrap_or_default();
                if !left.same_as(&right) {
                    diff.mismatches.push(CellMismatch {
                        uid: uid.clone(),
                        column: (*column).to_owned(),
                        input: left,
                        reference: right,
                    });
                }
            }
        }

        for row in input.rows() {
            let uid = row.get(input_uid).map(Datum::to_string).unwrap_or_default();
            if !reference_uids.contains(&uid) && !diff.new_rows.contains(&uid) {
                diff.new_rows.push(uid);
            }
        }

        diff
    }

    /// Returns whether every reference row is present and unchanged.
    pub fn is_consistent(&self) -> bool {
        !self.uid_missing && self.missing_rows.is_empty() && self.mismatches.is_empty()
    }

    /// Emits one warning per finding.
    pub fn log(&self, uid_column: &str) {
        if !self.only_in_input.is_empty() {
            tracing::warn!(
                target: TRACING_TARGET_OPERATOR,
                columns = ?self.only_in_input,
                "Columns found in the input but not in the reference"
            );
        }
        if !self.only_in_reference.is_empty() {
            tracing::warn!(
                target: TRACING_TARGET_OPERATOR,
                columns = ?self.only_in_reference,
                "Columns found in the reference but not in the input"
            );
        }
        if self.uid_missing {
            tracing::warn!(
                target: TRACING_TARGET_OPERATOR,
                uid_column,
                "Unique id column does not exist in both tables"
            );
            return;
        }

        for uid in &self.duplicate_uids {
            tracing::warn!(
                target: TRACING_TARGET_OPERATOR,
                uid = %uid,
                uid_column,
                "Unique id appears in more than one input row; later rows are not compared"
            );
        }
        for uid in &self.missing_rows {
            tracing::warn!(
                target: TRACING_TARGET_OPERATOR,
                uid = %uid,
                "Reference row not found in the input"
            );
        }
        for mismatch in &self.mismatches {
            tracing::warn!(
                target: TRACING_TARGET_OPERATOR,
                uid = %mismatch.uid,
                column = %mismatch.column,
                input = %mismatch.input,
                reference = %mismatch.reference,
                "Row differs from the reference"
            );
        }
        if self.is_consistent() {
            tracing::info!(
                target: TRACING_TARGET_OPERATOR,
                "All rows in the input are consistent with the reference in overlapping columns"
            );
        }

        if self.new_rows.is_empty() {
            tracing::info!(target: TRACING_TARGET_OPERATOR, "No new rows found in the input");
        } else {
            tracing::warn!(
                target: TRACING_TARGET_OPERATOR,
                rows = ?self.new_rows,
                "Rows present in the input but not in the reference"
            );
        }
    }
}

fn difference(left: &[String], right: &[String]) -> Vec<String> {
    left.iter()
        .filter(|column| !right.contains(column))
        .cloned()
        .collect()
}

/// Compares the incoming table against a reference and warns about drift.
///
/// Never alters the value and never fails on differences; only a non-table
/// input is an error.
#[derive(Debug, Clone)]
pub struct Compare {
    reference: Table,
    uid_column: String,
    ignore: Vec<String>,
}

impl Compare {
    /// Creates a comparator against `reference`, matching rows by `uid_column`.
    pub fn new(reference: Table, uid_column: impl Into<String>) -> Self {
        Self {
            reference,
            uid_column: uid_column.into(),
            ignore: Vec::new(),
        }
    }

    /// Excludes columns from cell comparison.
    pub fn ignore<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Returns the reference table.
    pub fn reference(&self) -> &Table {
        &self.reference
    }

    /// Computes the differences without logging.
    pub fn diff(&self, input: &Table) -> TableDiff {
        TableDiff::between(input, &self.reference, &self.uid_column, &self.ignore)
    }
}

impl Operator for Compare {
    fn description(&self) -> Option<&str> {
        Some("Compares the table against a reference and warns about differences.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let table = table_input(self.name(), input)?;
        self.diff(&table).log(&self.uid_column);
        Ok(Datum::Table(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Datum>>) -> Table {
        Table::from_rows(columns.iter().copied(), rows).unwrap()
    }

    fn reference() -> Table {
        table(
            &["uid", "a", "b"],
            vec![
                vec![Datum::from("x"), Datum::Int(1), Datum::Null],
                vec![Datum::from("y"), Datum::Int(2), Datum::Float(f64::NAN)],
                vec![Datum::from("z"), Datum::Int(3), Datum::Int(0)],
            ],
        )
    }

    #[test]
    fn test_identical_tables_are_consistent() {
        let diff = TableDiff::between(&reference(), &reference(), "uid", &[]);
        assert!(diff.is_consistent());
        assert_eq!(diff, TableDiff::default());
    }

    #[test]
    fn test_reports_every_kind_of_difference() {
        let input = table(
            &["uid", "a", "c"],
            vec![
                vec![Datum::from("x"), Datum::Int(10), Datum::Null],
                vec![Datum::from("y"), Datum::Int(2), Datum::Null],
                vec![Datum::from("w"), Datum::Int(4), Datum::Null],
            ],
        );

        let diff = TableDiff::between(&input, &reference(), "uid", &[]);

        assert_eq!(diff.only_in_input, vec!["c"]);
        assert_eq!(diff.only_in_reference, vec!["b"]);
        assert_eq!(diff.missing_rows, vec!["z"]);
        assert_eq!(diff.new_rows, vec!["w"]);
        assert_eq!(
            diff.mismatches,
            vec![CellMismatch {
                uid: "x".into(),
                column: "a".into(),
                input: Datum::Int(10),
                reference: Datum::Int(1),
            }]
        );
        assert!(!diff.is_consistent());
    }

    #[test]
    fn test_ignored_columns_are_skipped() {
        let mut input = reference();
        input
            .map_column("a", |cell| Ok(Datum::Int(cell.as_int().unwrap_or_default() + 1)))
            .unwrap();

        let compare = Compare::new(reference(), "uid").ignore(["a"]);
        assert!(compare.diff(&input).is_consistent());
    }

    #[test]
    fn test_duplicate_and_null_uids_are_reported() {
        let input = table(
            &["uid", "a", "b"],
            vec![
                vec![Datum::from("x"), Datum::Int(1), Datum::Null],
                vec![Datum::from("x"), Datum::Int(99), Datum::Null],
                vec![Datum::Null, Datum::Int(5), Datum::Null],
                vec![Datum::Null, Datum::Int(6), Datum::Null],
                vec![Datum::from("x"), Datum::Int(7), Datum::Null],
            ],
        );

        let diff = TableDiff::between(&input, &reference(), "uid", &[]);

        assert_eq!(diff.duplicate_uids, vec!["x", ""]);
        // Only the first "x" row is compared against the reference.
        assert!(diff.mismatches.is_empty());
        assert_eq!(diff.new_rows, vec![""]);
    }

    #[test]
    fn test_missing_uid_column() {
        let input = table(&["a"], vec![vec![Datum::Int(1)]]);
        let diff = TableDiff::between(&input, &reference(), "uid", &[]);
        assert!(diff.uid_missing);
        assert!(diff.mismatches.is_empty());
    }

    #[test]
    fn test_apply_returns_input_unchanged() {
        let input = table(&["uid", "a"], vec![vec![Datum::from("x"), Datum::Int(9)]]);
        let output = Compare::new(reference(), "uid")
            .apply(Datum::Table(input.clone()))
            .unwrap();
        assert_eq!(output, Datum::Table(input));
    }
}

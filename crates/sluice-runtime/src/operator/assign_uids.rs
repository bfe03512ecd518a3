//! Unique row identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

use sluice_core::{Datum, Operator, Result};
use uuid::Uuid;

use super::table_input;
use crate::TRACING_TARGET_OPERATOR;

/// Adds a uid column to a table, or fills the null cells of an existing one.
///
/// A newly added column numbers rows `0..n` and moves the counter to at least
/// `n`. Null cells of an existing column are filled from the counter, which
/// persists across applications, so rows added in later runs never reuse an
/// id. The default prefix is a fresh UUID followed by `" - "`.
#[derive(Debug)]
pub struct AssignUids {
    uid_column: String,
    prefix: String,
    counter: AtomicU64,
}

impl AssignUids {
    /// Creates an operator filling `uid_column`, counting from zero.
    pub fn new(uid_column: impl Into<String>) -> Self {
        Self {
            uid_column: uid_column.into(),
            prefix: format!("{} - ", Uuid::now_v7()),
            counter: AtomicU64::new(0),
        }
    }

    /// Replaces the uid prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the first number handed out when filling null uids.
    pub fn starting_at(self, start: u64) -> Self {
        self.counter.store(start, Ordering::SeqCst);
        self
    }

    /// Returns the next number to be handed out.
    pub fn next_number(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    fn uid(&self, number: u64) -> Datum {
        Datum::Text(format!("{}{number}", self.prefix))
    }

    fn next_uid(&self) -> Datum {
        self.uid(self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

impl Operator for AssignUids {
    fn description(&self) -> Option<&str> {
        Some("Assigns unique ids to rows that lack one.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let mut table = table_input(self.name(), input)?;

        let mut assigned = 0usize;
        if table.has_column(&self.uid_column) {
            table.map_column(&self.uid_column, |cell| {
                if cell.is_null() {
                    assigned += 1;
                    Ok(self.next_uid())
                } else {
                    Ok(cell.clone())
                }
            })?;
        } else {
            let rows = table.num_rows() as u64;
            let uids: Vec<Datum> = (0..rows).map(|number| self.uid(number)).collect();
            assigned = uids.len();
            table.push_column(self.uid_column.clone(), uids)?;
            self.counter.fetch_max(rows, Ordering::SeqCst);
        }

        tracing::debug!(
            target: TRACING_TARGET_OPERATOR,
            column = %self.uid_column,
            assigned,
            "Assigned uids"
        );
        Ok(Datum::Table(table))
    }
}

#[cfg(test)]
mod tests {
    use sluice_core::Table;

    use super::*;

    #[test]
    fn test_adds_missing_column() {
        let table = Table::from_rows(["a"], vec![vec![Datum::Int(1)], vec![Datum::Int(2)]]).unwrap();
        let operator = AssignUids::new("uid").with_prefix("row-");

        let output = operator.apply(Datum::Table(table)).unwrap();
        let output = output.as_table().unwrap();

        assert_eq!(output.columns(), ["a", "uid"]);
        assert_eq!(output.cell(0, "uid"), Some(&Datum::from("row-0")));
        assert_eq!(output.cell(1, "uid"), Some(&Datum::from("row-1")));
        assert_eq!(operator.next_number(), 2);
    }

    #[test]
    fn test_fills_null_uids_continuing_the_counter() {
        let operator = AssignUids::new("uid").with_prefix("row-").starting_at(5);
        let table = Table::from_rows(
            ["uid"],
            vec![vec![Datum::from("kept")], vec![Datum::Null], vec![Datum::Null]],
        )
        .unwrap();

        let output = operator.apply(Datum::Table(table)).unwrap();
        let uids: Vec<_> = output.as_table().unwrap().column("uid").unwrap().cloned().collect();

        assert_eq!(
            uids,
            vec![Datum::from("kept"), Datum::from("row-5"), Datum::from("row-6")]
        );
    }

    #[test]
    fn test_new_column_numbers_from_zero() {
        let operator = AssignUids::new("uid").with_prefix("row-").starting_at(5);
        let table = Table::from_rows(["a"], vec![vec![Datum::Int(1)], vec![Datum::Int(2)]]).unwrap();

        let output = operator.apply(Datum::Table(table)).unwrap();
        let uids: Vec<_> = output.as_table().unwrap().column("uid").unwrap().cloned().collect();

        assert_eq!(uids, vec![Datum::from("row-0"), Datum::from("row-1")]);
        assert_eq!(operator.next_number(), 5);
    }

    #[test]
    fn test_fills_after_new_column_do_not_reuse_ids() {
        let operator = AssignUids::new("uid").with_prefix("row-");
        let fresh = Table::from_rows(["a"], vec![vec![Datum::Int(1)], vec![Datum::Int(2)]]).unwrap();
        operator.apply(Datum::Table(fresh)).unwrap();

        let partial = Table::from_rows(["uid"], vec![vec![Datum::from("row-0")], vec![Datum::Null]])
            .unwrap();
        let output = operator.apply(Datum::Table(partial)).unwrap();

        assert_eq!(output.as_table().unwrap().cell(1, "uid"), Some(&Datum::from("row-2")));
    }

    #[test]
    fn test_default_prefix_is_unique_per_operator() {
        let first = AssignUids::new("uid");
        let second = AssignUids::new("uid");
        assert_ne!(first.prefix, second.prefix);
        assert!(first.prefix.ends_with(" - "));
    }
}

//! Row-wise table concatenation.

use sluice_core::{Boundary, DataMap, Datum, DatumKind, Error, Operator, Result, Table};

/// Stacks tables on top of each other.
///
/// Accepts a map of tables (the argument of a fan-in pipe) or a list of
/// tables. Columns are the union of all input columns in first-seen order;
/// cells a table does not define are null.
#[derive(Debug, Clone, Copy, Default)]
pub struct Concat;

impl Concat {
    fn records(&self, value: Datum, records: &mut Vec<DataMap>) -> Result<()> {
        match value {
            Datum::Table(table) => records.extend(table.records()),
            other => {
                return Err(Error::KindMismatch {
                    operator: self.name().to_owned(),
                    boundary: Boundary::Input,
                    expected: DatumKind::Table,
                    actual: other.kind(),
                });
            }
        }
        Ok(())
    }
}

impl Operator for Concat {
    fn description(&self) -> Option<&str> {
        Some("Stacks tables row-wise.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let tables: Vec<Datum> = match input {
            Datum::Map(map) => map.into_iter().map(|(_, value)| value).collect(),
            Datum::List(items) => items,
            other => {
                return Err(Error::KindMismatch {
                    operator: self.name().to_owned(),
                    boundary: Boundary::Input,
                    expected: DatumKind::Map,
                    actual: other.kind(),
                });
            }
        };

        let mut records = Vec::new();
        let mut columns: Vec<String> = Vec::new();
        for value in tables {
            if let Some(table) = value.as_table() {
                for column in table.columns() {
                    if !columns.contains(column) {
                        columns.push(column.clone());
                    }
                }
            }
            self.records(value, &mut records)?;
        }

        // Tables without rows still contribute their columns.
        let mut table = Table::new(columns)?;
        for mut record in records {
            let row = table
                .columns()
                .iter()
                .map(|column| record.remove(column).unwrap_or_default())
                .collect();
            table.push_row(row)?;
        }
        Ok(Datum::Table(table))
    }
}

//! Per-column mean shifting.

use serde::{Deserialize, Serialize};
use sluice_core::{Datum, Error, Operator, Result};

use super::table_input;

/// A delta added to every numeric cell of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnShift {
    /// Column to shift.
    pub column: String,
    /// Value added to each cell.
    pub delta: f64,
}

/// Shifts numeric columns by fixed deltas.
///
/// Null cells stay null; any other non-numeric cell is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    shifts: Vec<ColumnShift>,
}

impl Normalizer {
    /// Creates a normalizer from explicit shifts.
    pub fn new(shifts: Vec<ColumnShift>) -> Self {
        Self { shifts }
    }

    /// Creates a normalizer from parallel lists of columns and deltas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the lists differ in length.
    pub fn from_columns(columns: Vec<String>, deltas: Vec<f64>) -> Result<Self> {
        if columns.len() != deltas.len() {
            return Err(Error::configuration(format!(
                "{} columns given with {} deltas",
                columns.len(),
                deltas.len()
            )));
        }
        let shifts = columns
            .into_iter()
            .zip(deltas)
            .map(|(column, delta)| ColumnShift { column, delta })
            .collect();
        Ok(Self { shifts })
    }

    /// Returns the configured shifts.
    pub fn shifts(&self) -> &[ColumnShift] {
        &self.shifts
    }
}

impl Operator for Normalizer {
    fn description(&self) -> Option<&str> {
        Some("Adds a fixed delta to numeric columns.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let mut table = table_input(self.name(), input)?;
        for shift in &self.shifts {
            table.map_column(&shift.column, |cell| match cell {
                Datum::Null => Ok(Datum::Null),
                other => other
                    .as_float()
                    .map(|value| Datum::Float(value + shift.delta))
                    .ok_or_else(|| {
                        Error::failed(
                            self.name(),
                            format!("column {:?} holds non-numeric {}", shift.column, other.kind()),
                        )
                    }),
            })?;
        }
        Ok(Datum::Table(table))
    }
}

#[cfg(test)]
mod tests {
    use sluice_core::Table;

    use super::*;

    #[test]
    fn test_shifts_columns() {
        let table = Table::from_rows(
            ["a", "b", "c"],
            vec![
                vec![Datum::Int(1), Datum::Float(0.5), Datum::from("keep")],
                vec![Datum::Null, Datum::Float(1.5), Datum::from("keep")],
            ],
        )
        .unwrap();

        let normalizer =
            Normalizer::from_columns(vec!["a".into(), "b".into()], vec![1.0, -0.5]).unwrap();
        let output = normalizer.apply(Datum::Table(table)).unwrap();
        let output = output.as_table().unwrap();

        assert_eq!(output.cell(0, "a"), Some(&Datum::Float(2.0)));
        assert_eq!(output.cell(1, "a"), Some(&Datum::Null));
        assert_eq!(output.cell(1, "b"), Some(&Datum::Float(1.0)));
        assert_eq!(output.cell(0, "c"), Some(&Datum::from("keep")));
    }

    #[test]
    fn test_rejects_mismatched_lists() {
        assert!(Normalizer::from_columns(vec!["a".into()], vec![]).is_err());
    }

    #[test]
    fn test_rejects_text_cells_and_missing_columns() {
        let table = Table::from_rows(["a"], vec![vec![Datum::from("x")]]).unwrap();
        let shift = |column: &str| {
            Normalizer::new(vec![ColumnShift {
                column: column.into(),
                delta: 1.0,
            }])
        };

        assert!(matches!(
            shift("a").apply(Datum::Table(table.clone())),
            Err(Error::Failed { .. })
        ));
        assert!(matches!(
            shift("b").apply(Datum::Table(table)),
            Err(Error::MissingColumn { .. })
        ));
    }
}

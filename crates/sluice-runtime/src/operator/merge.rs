//! Keyed table joins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sluice_core::{Datum, Error, Operator, Result, Table};
use strum::{AsRefStr, Display, EnumString};

use super::table_input;
use crate::TRACING_TARGET_OPERATOR;

/// Which rows a [`Merge`] keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(Display, AsRefStr, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Rows whose key appears on both sides, in incoming order.
    #[default]
    Inner,
    /// Every incoming row, in incoming order.
    Left,
    /// Every row of the right table, in its order.
    Right,
    /// Every row of both sides: the left join, then unmatched right rows.
    Outer,
}

/// Suffixes appended to non-key columns present on both sides.
pub const DEFAULT_SUFFIXES: (&str, &str) = ("_x", "_y");

/// Joins the incoming table with a fixed right table on key columns.
///
/// Output columns are the incoming columns followed by the right table's
/// non-key columns. Keys match when their cells are identical, nulls and
/// NaNs included. A key matching several rows yields one output row per
/// pair. Cells without a partner row are null, except key cells, which
/// come from whichever side has the row.
///
/// ```rust
/// use sluice_core::prelude::*;
/// use sluice_runtime::operator::{JoinKind, Merge};
///
/// let prices = Table::from_rows(
///     ["name", "price"],
///     vec![vec![Datum::from("rose"), Datum::Int(12)]],
/// )
/// .unwrap();
/// let stock = Table::from_rows(
///     ["name", "stock"],
///     vec![vec![Datum::from("rose"), Datum::Int(3)]],
/// )
/// .unwrap();
///
/// let merge = Merge::new(stock, ["name"]).how(JoinKind::Left);
/// let output = merge.apply(Datum::Table(prices)).unwrap();
/// assert_eq!(output.as_table().unwrap().columns(), ["name", "price", "stock"]);
/// ```
#[derive(Debug, Clone)]
pub struct Merge {
    right: Table,
    on: Vec<String>,
    how: JoinKind,
    suffixes: (String, String),
}

/// Column positions of one merge.
struct Layout {
    left_width: usize,
    left_keys: Vec<usize>,
    right_keys: Vec<usize>,
    right_values: Vec<usize>,
}

impl Layout {
    fn joined(&self, left: Option<&[Datum]>, right: Option<&[Datum]>) -> Vec<Datum> {
        let mut row = Vec::with_capacity(self.left_width + self.right_values.len());
        for index in 0..self.left_width {
            let cell = match (left, right) {
                (Some(left), _) => left.get(index).cloned(),
                (None, Some(right)) => self
                    .left_keys
                    .iter()
                    .position(|key| *key == index)
                    .and_then(|position| right.get(self.right_keys[position]).cloned()),
                (None, None) => None,
            };
            row.push(cell.unwrap_or_default());
        }
        for index in &self.right_values {
            row.push(right.and_then(|right| right.get(*index).cloned()).unwrap_or_default());
        }
        row
    }
}

fn key_indices(table: &Table, on: &[String]) -> Result<Vec<usize>> {
    on.iter()
        .map(|column| {
            table
                .column_index(column)
                .ok_or_else(|| Error::missing_column(column.clone()))
        })
        .collect()
}

fn key_of(row: &[Datum], keys: &[usize]) -> Vec<String> {
    keys.iter()
        .map(|index| format!("{:?}", row.get(*index).unwrap_or(&Datum::Null)))
        .collect()
}

fn group_rows(table: &Table, keys: &[usize]) -> HashMap<Vec<String>, Vec<usize>> {
    let mut groups: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (index, row) in table.rows().iter().enumerate() {
        groups.entry(key_of(row, keys)).or_default().push(index);
    }
    groups
}

impl Merge {
    /// Creates an inner join with `right` on the `on` columns.
    pub fn new<I, S>(right: Table, on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            right,
            on: on.into_iter().map(Into::into).collect(),
            how: JoinKind::default(),
            suffixes: (DEFAULT_SUFFIXES.0.to_owned(), DEFAULT_SUFFIXES.1.to_owned()),
        }
    }

    /// Sets which rows are kept.
    pub fn how(mut self, how: JoinKind) -> Self {
        self.how = how;
        self
    }

    /// Sets the suffixes of overlapping non-key columns.
    pub fn suffixes(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.suffixes = (left.into(), right.into());
        self
    }

    /// Returns the right table.
    #[inline]
    pub fn right(&self) -> &Table {
        &self.right
    }

    fn columns(&self, left: &Table, layout: &Layout) -> Vec<String> {
        let mut columns = Vec::with_capacity(layout.left_width + layout.right_values.len());
        for column in left.columns() {
            if !self.on.contains(column) && self.right.has_column(column) {
                columns.push(format!("{column}{}", self.suffixes.0));
            } else {
                columns.push(column.clone());
            }
        }
        for index in &layout.right_values {
            let column = &self.right.columns()[*index];
            if left.has_column(column) {
                columns.push(format!("{column}{}", self.suffixes.1));
            } else {
                columns.push(column.clone());
            }
        }
        columns
    }
}

impl Operator for Merge {
    fn description(&self) -> Option<&str> {
        Some("Joins the table with a fixed table on key columns.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let left = table_input(self.name(), input)?;
        if self.on.is_empty() {
            return Err(Error::configuration("merge requires at least one key column"));
        }

        let right_keys = key_indices(&self.right, &self.on)?;
        let layout = Layout {
            left_width: left.num_columns(),
            left_keys: key_indices(&left, &self.on)?,
            right_values: (0..self.right.num_columns())
                .filter(|index| !right_keys.contains(index))
                .collect(),
            right_keys,
        };
        let mut output = Table::new(self.columns(&left, &layout))?;
        let right_rows = self.right.rows();

        match self.how {
            JoinKind::Inner | JoinKind::Left | JoinKind::Outer => {
                let groups = group_rows(&self.right, &layout.right_keys);
                let mut matched = vec![false; right_rows.len()];

                for row in left.rows().iter().map(Vec::as_slice) {
                    match groups.get(&key_of(row, &layout.left_keys)) {
                        Some(partners) => {
                            for partner in partners {
                                matched[*partner] = true;
                                output.push_row(
                                    layout.joined(Some(row), Some(right_rows[*partner].as_slice())),
                                )?;
                            }
                        }
                        None if self.how != JoinKind::Inner => {
                            output.push_row(layout.joined(Some(row), None))?;
                        }
                        None => {}
                    }
                }

                if self.how == JoinKind::Outer {
                    for (row, _) in right_rows.iter().zip(&matched).filter(|(_, seen)| !**seen) {
                        output.push_row(layout.joined(None, Some(row.as_slice())))?;
                    }
                }
            }
            JoinKind::Right => {
                let groups = group_rows(&left, &layout.left_keys);
                let left_rows = left.rows();

                for row in right_rows.iter().map(Vec::as_slice) {
                    match groups.get(&key_of(row, &layout.right_keys)) {
                        Some(partners) => {
                            for partner in partners {
                                output.push_row(
                                    layout.joined(Some(left_rows[*partner].as_slice()), Some(row)),
                                )?;
                            }
                        }
                        None => output.push_row(layout.joined(None, Some(row)))?,
                    }
                }
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_OPERATOR,
            how = %self.how,
            left = left.num_rows(),
            right = self.right.num_rows(),
            rows = output.num_rows(),
            "Tables merged"
        );
        Ok(Datum::Table(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> Table {
        Table::from_rows(
            ["name", "price"],
            vec![
                vec![Datum::from("rose"), Datum::Int(12)],
                vec![Datum::from("iris"), Datum::Int(30)],
                vec![Datum::from("lily"), Datum::Int(8)],
            ],
        )
        .unwrap()
    }

    fn stock() -> Table {
        Table::from_rows(
            ["name", "stock"],
            vec![
                vec![Datum::from("lily"), Datum::Int(5)],
                vec![Datum::from("rose"), Datum::Int(3)],
                vec![Datum::from("tulip"), Datum::Int(9)],
            ],
        )
        .unwrap()
    }

    fn merged(how: JoinKind) -> Table {
        Merge::new(stock(), ["name"])
            .how(how)
            .apply(Datum::Table(prices()))
            .unwrap()
            .into_table()
            .unwrap()
    }

    fn names(table: &Table) -> Vec<Datum> {
        table.column("name").unwrap().cloned().collect()
    }

    #[test]
    fn test_inner_keeps_matches_in_incoming_order() {
        let table = merged(JoinKind::Inner);
        assert_eq!(table.columns(), ["name", "price", "stock"]);
        assert_eq!(names(&table), [Datum::from("rose"), Datum::from("lily")]);
        assert_eq!(table.cell(0, "stock"), Some(&Datum::Int(3)));
        assert_eq!(table.cell(1, "stock"), Some(&Datum::Int(5)));
    }

    #[test]
    fn test_left_fills_missing_partners_with_null() {
        let table = merged(JoinKind::Left);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.cell(1, "name"), Some(&Datum::from("iris")));
        assert_eq!(table.cell(1, "stock"), Some(&Datum::Null));
    }

    #[test]
    fn test_right_follows_right_order() {
        let table = merged(JoinKind::Right);
        assert_eq!(
            names(&table),
            [Datum::from("lily"), Datum::from("rose"), Datum::from("tulip")]
        );
        assert_eq!(table.cell(2, "price"), Some(&Datum::Null));
        assert_eq!(table.cell(2, "stock"), Some(&Datum::Int(9)));
    }

    #[test]
    fn test_outer_appends_unmatched_right_rows() {
        let table = merged(JoinKind::Outer);
        assert_eq!(
            names(&table),
            [
                Datum::from("rose"),
                Datum::from("iris"),
                Datum::from("lily"),
                Datum::from("tulip")
            ]
        );
        assert_eq!(table.cell(3, "price"), Some(&Datum::Null));
    }

    #[test]
    fn test_overlapping_columns_get_suffixes() {
        let right = Table::from_rows(
            ["name", "price"],
            vec![vec![Datum::from("rose"), Datum::Int(10)]],
        )
        .unwrap();
        let table = Merge::new(right, ["name"])
            .suffixes("_old", "_new")
            .apply(Datum::Table(prices()))
            .unwrap()
            .into_table()
            .unwrap();

        assert_eq!(table.columns(), ["name", "price_old", "price_new"]);
        assert_eq!(table.row(0).unwrap(), [Datum::from("rose"), Datum::Int(12), Datum::Int(10)]);
    }

    #[test]
    fn test_repeated_keys_pair_every_row() {
        let right = Table::from_rows(
            ["name", "color"],
            vec![
                vec![Datum::from("rose"), Datum::from("red")],
                vec![Datum::from("rose"), Datum::from("white")],
            ],
        )
        .unwrap();
        let table = Merge::new(right, ["name"])
            .apply(Datum::Table(prices()))
            .unwrap()
            .into_table()
            .unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.cell(0, "color"), Some(&Datum::from("red")));
        assert_eq!(table.cell(1, "color"), Some(&Datum::from("white")));
    }

    #[test]
    fn test_null_keys_match_each_other() {
        let left = Table::from_rows(["key", "a"], vec![vec![Datum::Null, Datum::Int(1)]]).unwrap();
        let right = Table::from_rows(["key", "b"], vec![vec![Datum::Null, Datum::Int(2)]]).unwrap();
        let table = Merge::new(right, ["key"])
            .apply(Datum::Table(left))
            .unwrap()
            .into_table()
            .unwrap();

        assert_eq!(table.row(0).unwrap(), [Datum::Null, Datum::Int(1), Datum::Int(2)]);
    }

    #[test]
    fn test_missing_key_column_is_an_error() {
        let error = Merge::new(stock(), ["sku"])
            .apply(Datum::Table(prices()))
            .unwrap_err();
        assert!(matches!(error, Error::MissingColumn { ref column } if column == "sku"));
    }

    #[test]
    fn test_requires_key_columns() {
        let merge = Merge::new(stock(), Vec::<String>::new());
        assert!(matches!(
            merge.apply(Datum::Table(prices())),
            Err(Error::Configuration(_))
        ));
    }
}

//! In-memory tabular data.

use super::{DataMap, Datum, same_items};
use crate::error::{Error, Result};

/// A table of rows with named columns.
///
/// Every row holds exactly one cell per column, and column names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Datum>>,
}

impl Table {
    /// Creates an empty table with the given columns.
    ///
    /// # Errors
    ///
    /// Returns an error if a column name appears twice.
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        check_unique(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Creates a table from columns and rows.
    ///
    /// # Errors
    ///
    /// Returns an error if a column name appears twice or a row has the wrong width.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Datum>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Creates a table from records.
    ///
    /// Columns are the union of record keys in first-seen order; cells a
    /// record does not define are [`Datum::Null`].
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = DataMap>,
    {
        let records: Vec<DataMap> = records.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.iter().any(|column| column == key) {
                    columns.push(key.to_owned());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|column| record.remove(column).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Returns the column names.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows.
    #[inline]
    pub fn rows(&self) -> &[Vec<Datum>] {
        &self.rows
    }

    /// Returns the number of rows.
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns whether the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Returns whether the table has a column with the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns the row at `index`.
    pub fn row(&self, index: usize) -> Option<&[Datum]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Returns the cell at `row` in `column`.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Datum> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Returns an iterator over the cells of a column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumn`] if the column does not exist.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Datum>> {
        let index = self
            .column_index(name)
            .ok_or_else(|| Error::missing_column(name))?;
        Ok(self.rows.iter().filter_map(move |row| row.get(index)))
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row width differs from the column count.
    pub fn push_row(&mut self, row: Vec<Datum>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidTable(format!(
                "row has {} cells but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Appends a column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column exists or `values` has the wrong length.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Datum>) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(Error::InvalidTable(format!("column {name:?} already exists")));
        }
        if values.len() != self.rows.len() {
            return Err(Error::InvalidTable(format!(
                "column {name:?} has {} values but the table has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        self.columns.push(name);
        Ok(())
    }

    /// Replaces every cell of a column with the result of `f`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumn`] if the column does not exist, or the
    /// first error returned by `f`.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Datum) -> Result<Datum>,
    {
        let index = self
            .column_index(name)
            .ok_or_else(|| Error::missing_column(name))?;
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(index) {
                *cell = f(cell)?;
            }
        }
        Ok(())
    }

    /// Replaces all column names.
    ///
    /// # Errors
    ///
    /// Returns an error if the count differs or the new names are not unique.
    pub fn set_columns(&mut self, columns: Vec<String>) -> Result<()> {
        if columns.len() != self.columns.len() {
            return Err(Error::InvalidTable(format!(
                "expected {} column names, got {}",
                self.columns.len(),
                columns.len()
            )));
        }
        check_unique(&columns)?;
        self.columns = columns;
        Ok(())
    }

    /// Compares columns and cells with [`Datum::same_as`], so NaN cells in the
    /// same position match.
    pub fn same_as(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(&other.rows)
                .all(|(left, right)| same_items(left, right))
    }

    /// Returns an iterator over rows as records.
    pub fn records(&self) -> impl Iterator<Item = DataMap> + '_ {
        self.rows.iter().map(|row| {
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
    }
}

fn check_unique(columns: &[String]) -> Result<()> {
    for (index, column) in columns.iter().enumerate() {
        if columns.iter().skip(index + 1).any(|other| other == column) {
            return Err(Error::InvalidTable(format!("duplicate column {column:?}")));
        }
    }
    Ok(())
}

//! Delimited-text extraction.

use serde::{Deserialize, Serialize};
use sluice_core::{Datum, Error, Operator, Result, Table};

use super::read_text;
use crate::TRACING_TARGET_OPERATOR;
use crate::operator::{csv, path_input};

/// Parsing options of a [`CsvExtractor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field delimiter.
    pub delimiter: char,
    /// Whether the first record holds column names.
    ///
    /// Without a header, columns are named by their position.
    pub header: bool,
    /// Whether to type cells as integers, floats and booleans.
    ///
    /// Empty cells are null either way.
    pub infer_types: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            header: true,
            infer_types: true,
        }
    }
}

/// Reads the delimited-text file at the incoming path into a table.
#[derive(Debug, Clone, Default)]
pub struct CsvExtractor {
    options: CsvOptions,
}

impl CsvExtractor {
    /// Creates an extractor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor with explicit options.
    pub fn with_options(options: CsvOptions) -> Self {
        Self { options }
    }

    /// Parses delimited text into a table.
    ///
    /// # Errors
    ///
    /// Returns an error on unterminated quotes, duplicate column names or
    /// records whose width differs from the header.
    pub fn parse(&self, text: &str) -> Result<Table> {
        let mut records = csv::read_records(text, self.options.delimiter)
            .map_err(|message| Error::failed(self.name(), message))?
            .into_iter();

        let columns: Vec<String> = if self.options.header {
            records.next().unwrap_or_default()
        } else {
            let width = records.as_slice().first().map_or(0, Vec::len);
            (0..width).map(|index| index.to_string()).collect()
        };

        let mut table = Table::new(columns)?;
        for record in records {
            let row = record
                .iter()
                .map(|raw| match (self.options.infer_types, raw.is_empty()) {
                    (_, true) => Datum::Null,
                    (true, false) => csv::parse_cell(raw),
                    (false, false) => Datum::Text(raw.clone()),
                })
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }
}

impl Operator for CsvExtractor {
    fn description(&self) -> Option<&str> {
        Some("Reads a delimited-text file into a table.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let path = path_input(self.name(), &input)?;
        let table = self.parse(&read_text(&path)?)?;

        tracing::debug!(
            target: TRACING_TARGET_OPERATOR,
            path = %path.display(),
            rows = table.num_rows(),
            columns = table.num_columns(),
            "Extracted delimited text"
        );
        Ok(Datum::Table(table))
    }
}

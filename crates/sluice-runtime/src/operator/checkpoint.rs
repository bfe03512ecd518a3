//! Tabular snapshot sink.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sluice_core::{DataMap, Datum, Error, Operator, Result, Table};
use strum::{AsRefStr, Display, EnumString};

use super::{csv, table_input};
use crate::TRACING_TARGET_OPERATOR;

/// File format written by a [`Checkpoint`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(Display, AsRefStr, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CheckpointFormat {
    /// Delimited text.
    #[default]
    Csv,
    /// A JSON array of record objects.
    Json,
}

/// Formatting options of a [`Checkpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointOptions {
    /// Output format.
    pub format: CheckpointFormat,
    /// Field delimiter for [`CheckpointFormat::Csv`].
    pub delimiter: char,
    /// Whether to write a header row for [`CheckpointFormat::Csv`].
    pub header: bool,
}

impl Default for CheckpointOptions {
    fn default() -> Self {
        Self {
            format: CheckpointFormat::Csv,
            delimiter: ',',
            header: true,
        }
    }
}

/// Writes the incoming table to a file and passes it on unchanged.
///
/// Missing parent directories are created. The file is opened, written and
/// closed within a single application.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
    options: CheckpointOptions,
}

impl Checkpoint {
    /// Creates a CSV checkpoint writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, CheckpointOptions::default())
    }

    /// Creates a checkpoint with explicit formatting options.
    pub fn with_options(path: impl Into<PathBuf>, options: CheckpointOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    /// Returns the target path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the formatting options.
    pub fn options(&self) -> &CheckpointOptions {
        &self.options
    }

    fn write(&self, table: &Table) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| Error::io(parent, error))?;
        }

        let file = File::create(&self.path).map_err(|error| Error::io(&self.path, error))?;
        let writer = BufWriter::new(file);

        match self.options.format {
            CheckpointFormat::Csv => csv::write_records(
                writer,
                table.columns(),
                table.rows(),
                self.options.delimiter,
                self.options.header,
            )
            .map_err(|error| Error::io(&self.path, error)),
            CheckpointFormat::Json => {
                let mut writer = writer;
                let records: Vec<DataMap> = table.records().collect();
                serde_json::to_writer_pretty(&mut writer, &records)?;
                writer.flush().map_err(|error| Error::io(&self.path, error))
            }
        }
    }
}

impl Operator for Checkpoint {
    fn description(&self) -> Option<&str> {
        Some("Writes the table to a file and passes it on unchanged.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let table = table_input(self.name(), input)?;
        self.write(&table)?;

        tracing::info!(
            target: TRACING_TARGET_OPERATOR,
            path = %self.path.display(),
            format = %self.options.format,
            "Checkpoint written"
        );
        Ok(Datum::Table(table))
    }
}

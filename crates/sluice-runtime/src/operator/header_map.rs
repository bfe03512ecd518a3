//! Column renaming.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sluice_core::{Datum, Error, Operator, Result};

use super::table_input;

/// Renames table columns according to a mapping of old to new names.
///
/// With `complete` set (the default), every column of the incoming table must
/// have an entry in the mapping. Otherwise unmapped columns keep their names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMap {
    mapping: BTreeMap<String, String>,
    #[serde(default = "complete_by_default")]
    complete: bool,
}

fn complete_by_default() -> bool {
    true
}

impl HeaderMap {
    /// Creates a complete mapping.
    pub fn new<I, K, V>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mapping: mapping
                .into_iter()
                .map(|(old, new)| (old.into(), new.into()))
                .collect(),
            complete: true,
        }
    }

    /// Loads a mapping from a JSON object of old to new names.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a string to
    /// string object.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|error| Error::io(path, error))?;
        let mapping: BTreeMap<String, String> = serde_json::from_str(&text)?;
        Ok(Self {
            mapping,
            complete: true,
        })
    }

    /// Sets whether every column must be mapped.
    pub fn complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    /// Returns the new name for `column`.
    fn rename(&self, column: &str) -> Result<String> {
        match self.mapping.get(column) {
            Some(renamed) => Ok(renamed.clone()),
            None if self.complete => Err(Error::failed(
                self.name(),
                format!("no mapping for column {column:?}"),
            )),
            None => Ok(column.to_owned()),
        }
    }
}

impl Operator for HeaderMap {
    fn description(&self) -> Option<&str> {
        Some("Renames table columns.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let mut table = table_input(self.name(), input)?;
        let columns = table
            .columns()
            .iter()
            .map(|column| self.rename(column))
            .collect::<Result<Vec<_>>>()?;
        table.set_columns(columns)?;
        Ok(Datum::Table(table))
    }
}

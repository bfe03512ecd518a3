//! File extractors: path in, table out.

mod csv;
mod json;

pub use csv::{CsvExtractor, CsvOptions};
pub use json::{JsonExtractor, JsonOptions};
use sluice_core::{Error, Result};

/// Reads a whole file as text.
fn read_text(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|error| Error::io(path, error))
}

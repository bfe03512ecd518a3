//! Built-in operators.
//!
//! Sinks and comparators used by [`Pipe`](crate::pipe::Pipe) for automatic
//! checkpoints and comparisons, plus extractors and table transforms for
//! assembling tabular ETL pipelines.

mod assign_uids;
mod checkpoint;
mod compare;
mod concat;
mod csv;
mod extract;
mod featurizer;
mod header_map;
mod merge;
mod normalizer;

pub use assign_uids::AssignUids;
pub use checkpoint::{Checkpoint, CheckpointFormat, CheckpointOptions};
pub use compare::{CellMismatch, Compare, TableDiff};
pub use concat::Concat;
pub use extract::{CsvExtractor, CsvOptions, JsonExtractor, JsonOptions};
pub use featurizer::{FeatureRegistry, Featurizer, Features};
pub use header_map::HeaderMap;
pub use merge::{DEFAULT_SUFFIXES, JoinKind, Merge};
pub use normalizer::{ColumnShift, Normalizer};
use sluice_core::{Boundary, Datum, DatumKind, Error, Result, Table};

/// Unwraps a table input or reports a kind mismatch for `operator`.
fn table_input(operator: &str, input: Datum) -> Result<Table> {
    input.into_table().map_err(|other| Error::KindMismatch {
        operator: operator.to_owned(),
        boundary: Boundary::Input,
        expected: DatumKind::Table,
        actual: other.kind(),
    })
}

/// Unwraps a path input or reports a kind mismatch for `operator`.
fn path_input(operator: &str, input: &Datum) -> Result<std::path::PathBuf> {
    input
        .as_text()
        .map(std::path::PathBuf::from)
        .ok_or_else(|| Error::KindMismatch {
            operator: operator.to_owned(),
            boundary: Boundary::Input,
            expected: DatumKind::Text,
            actual: input.kind(),
        })
}

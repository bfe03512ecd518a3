//! Column-appending featurizers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sluice_core::{Datum, Error, Operator, Result, Table};

use super::table_input;

/// Named columns computed by a [`Featurizer`], in append order.
pub type Features = Vec<(String, Vec<Datum>)>;

type FeatureFn = dyn Fn(&Table) -> Result<Features> + Send + Sync;

/// Appends columns computed from the whole input table.
///
/// The feature function receives the input and returns the new columns, each
/// holding one value per input row. They are appended after the existing
/// columns in the order returned.
///
/// ```rust
/// use sluice_core::prelude::*;
/// use sluice_runtime::operator::Featurizer;
///
/// let doubled = Featurizer::new("Doubled", |table: &Table| {
///     let values = table
///         .column("price")?
///         .map(|cell| Datum::Int(cell.as_int().unwrap_or_default() * 2))
///         .collect();
///     Ok(vec![("double_price".to_owned(), values)])
/// });
///
/// let table = Table::from_rows(["price"], vec![vec![Datum::Int(4)]]).unwrap();
/// let output = doubled.apply(Datum::Table(table)).unwrap();
/// assert_eq!(output.as_table().unwrap().cell(0, "double_price"), Some(&Datum::Int(8)));
/// ```
#[derive(Clone)]
pub struct Featurizer {
    name: String,
    f: Arc<FeatureFn>,
}

impl Featurizer {
    /// Creates a featurizer named `name` computing its columns with `f`.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Table) -> Result<Features> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }
}

impl Operator for Featurizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        Some("Appends computed feature columns.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let mut table = table_input(&self.name, input)?;
        let features = (self.f)(&table)?;

        for (column, values) in features {
            if values.len() != table.num_rows() {
                return Err(Error::failed(
                    &self.name,
                    format!(
                        "computed {} values of {column:?} for a table of {} rows",
                        values.len(),
                        table.num_rows()
                    ),
                ));
            }
            table.push_column(column, values)?;
        }
        Ok(Datum::Table(table))
    }
}

impl fmt::Debug for Featurizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Featurizer").field("name", &self.name).finish()
    }
}

/// Featurizers available to pipeline definitions, by name.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    features: BTreeMap<String, Featurizer>,
}

impl FeatureRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a featurizer under its name, replacing any previous one.
    pub fn register(&mut self, featurizer: Featurizer) {
        self.features.insert(featurizer.name.clone(), featurizer);
    }

    /// Returns the featurizer registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Featurizer> {
        self.features.get(name)
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }
}

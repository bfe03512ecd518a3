//! JSON record extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sluice_core::{DataMap, Datum, Error, Operator, Result, Table};

use super::read_text;
use crate::TRACING_TARGET_OPERATOR;
use crate::operator::path_input;

/// Parsing options of a [`JsonExtractor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    /// Flattens nested objects and arrays into `separator`-joined columns.
    pub flatten: bool,
    /// Keeps arrays without nested objects as list cells when flattening.
    pub express_tensors: bool,
    /// Joins the keys of nested levels.
    pub separator: String,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            flatten: true,
            express_tensors: true,
            separator: "|".to_owned(),
        }
    }
}

/// Reads the JSON file at the incoming path into a table.
///
/// The document is a single record object or an array of them. When
/// flattening, `{"a": {"b": 1}, "c": [{"d": 2}]}` becomes the columns `a|b`
/// and `c|0|d`. Arrays holding no objects are "tensors": with
/// `express_tensors` they stay whole as list cells, otherwise every element
/// gets its own indexed column. Empty objects and arrays yield no column.
#[derive(Debug, Clone, Default)]
pub struct JsonExtractor {
    options: JsonOptions,
}

impl JsonExtractor {
    /// Creates an extractor with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor with explicit options.
    pub fn with_options(options: JsonOptions) -> Self {
        Self { options }
    }

    /// Converts a JSON document into a table.
    ///
    /// # Errors
    ///
    /// Returns an error if a record is not an object.
    pub fn parse(&self, document: Value) -> Result<Table> {
        let records = match document {
            Value::Array(records) => records,
            record => vec![record],
        };

        let records = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| match record {
                Value::Object(object) if self.options.flatten => {
                    let mut flat = DataMap::new();
                    for (key, value) in object {
                        self.flatten_into(&mut flat, key, value);
                    }
                    Ok(flat)
                }
                Value::Object(object) => Ok(object.into_iter().collect()),
                other => Err(Error::failed(
                    self.name(),
                    format!("record {index} is not an object but {}", Datum::from(other).kind()),
                )),
            })
            .collect::<Result<Vec<DataMap>>>()?;

        Ok(Table::from_records(records))
    }

    fn flatten_into(&self, flat: &mut DataMap, name: String, value: Value) {
        let separator = &self.options.separator;
        match value {
            Value::Array(items) if self.options.express_tensors && is_tensor(&items) => {
                if !items.is_empty() {
                    flat.insert(name, Datum::from(Value::Array(items)));
                }
            }
            Value::Array(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    self.flatten_into(flat, format!("{name}{separator}{index}"), item);
                }
            }
            Value::Object(object) => {
                for (key, item) in object {
                    self.flatten_into(flat, format!("{name}{separator}{key}"), item);
                }
            }
            scalar => {
                flat.insert(name, Datum::from(scalar));
            }
        }
    }
}

/// Returns whether an array holds no objects at any depth.
fn is_tensor(items: &[Value]) -> bool {
    items.iter().all(|item| match item {
        Value::Object(_) => false,
        Value::Array(nested) => is_tensor(nested),
        _ => true,
    })
}

impl Operator for JsonExtractor {
    fn description(&self) -> Option<&str> {
        Some("Reads JSON records into a table.")
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let path = path_input(self.name(), &input)?;
        let document: Value = serde_json::from_str(&read_text(&path)?)?;
        let table = self.parse(document)?;

        tracing::debug!(
            target: TRACING_TARGET_OPERATOR,
            path = %path.display(),
            rows = table.num_rows(),
            columns = table.num_columns(),
            "Extracted JSON records"
        );
        Ok(Datum::Table(table))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document() -> Value {
        json!([
            {"id": 1, "notes": {"top": "rose", "base": "musk"}, "scores": [[1, 2], [3, 4]], "tags": [{"k": "a"}]},
            {"id": 2, "notes": {"top": "iris"}, "scores": [], "extra": null}
        ])
    }

    #[test]
    fn test_flattens_and_expresses_tensors() {
        let table = JsonExtractor::new().parse(document()).unwrap();

        assert_eq!(
            table.columns(),
            ["id", "notes|top", "notes|base", "scores", "tags|0|k", "extra"]
        );
        assert_eq!(table.cell(0, "notes|base"), Some(&Datum::from("musk")));
        assert_eq!(table.cell(1, "notes|base"), Some(&Datum::Null));
        assert_eq!(
            table.cell(0, "scores"),
            Some(&Datum::List(vec![
                Datum::List(vec![Datum::Int(1), Datum::Int(2)]),
                Datum::List(vec![Datum::Int(3), Datum::Int(4)]),
            ]))
        );
        assert_eq!(table.cell(1, "scores"), Some(&Datum::Null));
    }

    #[test]
    fn test_flattens_tensors_when_disabled() {
        let extractor = JsonExtractor::with_options(JsonOptions {
            express_tensors: false,
            separator: ".".into(),
            ..JsonOptions::default()
        });

        let table = extractor.parse(json!({"v": [10, [20, 30]]})).unwrap();

        assert_eq!(table.columns(), ["v.0", "v.1.0", "v.1.1"]);
        assert_eq!(table.cell(0, "v.1.1"), Some(&Datum::Int(30)));
    }

    #[test]
    fn test_without_flattening_keeps_nested_values() {
        let extractor = JsonExtractor::with_options(JsonOptions {
            flatten: false,
            ..JsonOptions::default()
        });

        let table = extractor.parse(json!({"a": {"b": 1}})).unwrap();

        assert_eq!(table.columns(), ["a"]);
        assert!(table.cell(0, "a").unwrap().is_map());
    }

    #[test]
    fn test_rejects_scalar_records() {
        assert!(JsonExtractor::new().parse(json!([1, 2])).is_err());
    }

    #[test]
    fn test_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, document().to_string()).unwrap();

        let output = JsonExtractor::new()
            .apply(Datum::from(path.to_string_lossy().into_owned()))
            .unwrap();
        assert_eq!(output.as_table().unwrap().num_rows(), 2);
    }
}

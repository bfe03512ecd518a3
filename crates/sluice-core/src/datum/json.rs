//! Conversions between [`Datum`] and JSON.
//!
//! Objects become [`Datum::Map`], arrays [`Datum::List`]. Tables serialize as
//! an array of record objects.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use super::{DataMap, Datum};

impl From<Value> for Datum {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(number) => match number.as_i64() {
                Some(int) => Self::Int(int),
                None => number.as_f64().map_or(Self::Null, Self::Float),
            },
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(object) => Self::Map(object.into_iter().collect()),
        }
    }
}

impl From<&Datum> for Value {
    fn from(datum: &Datum) -> Self {
        match datum {
            Datum::Null => Self::Null,
            Datum::Bool(value) => Self::Bool(*value),
            Datum::Int(value) => Self::from(*value),
            // Non-finite floats have no JSON representation.
            Datum::Float(value) => Number::from_f64(*value).map_or(Self::Null, Self::Number),
            Datum::Text(text) => Self::String(text.clone()),
            Datum::List(items) => Self::Array(items.iter().map(Self::from).collect()),
            Datum::Table(table) => Self::Array(
                table
                    .records()
                    .map(|record| Self::Object(map_to_object(&record)))
                    .collect(),
            ),
            Datum::Map(map) => Self::Object(map_to_object(map)),
        }
    }
}

fn map_to_object(map: &DataMap) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.to_owned(), Value::from(value)))
        .collect()
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Map(map) => map.serialize(serializer),
            other => Value::from(other).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Datum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

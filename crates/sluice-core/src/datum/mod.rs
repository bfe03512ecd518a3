//! Dynamically-typed values flowing between operators.
//!
//! Every operator consumes and produces a [`Datum`]. Tabular data is carried
//! as [`Datum::Table`], and named bundles of values (the fan-in arguments and
//! fan-out results of pipes) as [`Datum::Map`].

mod json;
mod map;
mod table;

use std::fmt;

pub use map::DataMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
pub use table::Table;

/// The kind of a [`Datum`], used by kind-checked operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, AsRefStr, IntoStaticStr, EnumString)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DatumKind {
    /// Absence of a value.
    Null,
    /// A boolean.
    Bool,
    /// A signed 64-bit integer.
    Int,
    /// A 64-bit float.
    Float,
    /// A UTF-8 string.
    Text,
    /// An ordered list of values.
    List,
    /// A table of rows and named columns.
    Table,
    /// An ordered name to value mapping.
    Map,
}

/// A single value flowing through pipes and pipelines.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Datum {
    /// Absence of a value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A UTF-8 string.
    Text(String),
    /// An ordered list of values.
    List(Vec<Datum>),
    /// A table of rows and named columns.
    Table(Table),
    /// An ordered name to value mapping.
    Map(DataMap),
}

impl Datum {
    /// Returns the kind of this value.
    pub fn kind(&self) -> DatumKind {
        match self {
            Self::Null => DatumKind::Null,
            Self::Bool(_) => DatumKind::Bool,
            Self::Int(_) => DatumKind::Int,
            Self::Float(_) => DatumKind::Float,
            Self::Text(_) => DatumKind::Text,
            Self::List(_) => DatumKind::List,
            Self::Table(_) => DatumKind::Table,
            Self::Map(_) => DatumKind::Map,
        }
    }

    /// Returns whether this value is [`Datum::Null`].
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns whether this value is a table.
    #[inline]
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table(_))
    }

    /// Returns whether this value is a map.
    #[inline]
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as a float if it is numeric.
    ///
    /// Integers are widened to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Returns the string slice, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the list items, if this is a list.
    pub fn as_list(&self) -> Option<&[Datum]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the table, if this is one.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Returns the map, if this is one.
    pub fn as_map(&self) -> Option<&DataMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Structural equality that treats NaN floats in the same position as equal.
    ///
    /// The derived `PartialEq` follows IEEE semantics, under which a table
    /// holding a NaN cell never equals itself.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(left), Self::Float(right)) => {
                left == right || (left.is_nan() && right.is_nan())
            }
            (Self::List(left), Self::List(right)) => same_items(left, right),
            (Self::Table(left), Self::Table(right)) => left.same_as(right),
            (Self::Map(left), Self::Map(right)) => {
                left.len() == right.len()
                    && left.iter().all(|(key, value)| {
                        right.get(key).is_some_and(|other| value.same_as(other))
                    })
            }
            _ => self == other,
        }
    }

    /// Consumes the value and returns the table, if this is one.
    pub fn into_table(self) -> Result<Table, Self> {
        match self {
            Self::Table(table) => Ok(table),
            other => Err(other),
        }
    }

    /// Consumes the value and returns the map, if this is one.
    pub fn into_map(self) -> Result<DataMap, Self> {
        match self {
            Self::Map(map) => Ok(map),
            other => Err(other),
        }
    }
}

/// Compares two cell sequences with [`Datum::same_as`].
pub(crate) fn same_items(left: &[Datum], right: &[Datum]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(l, r)| l.same_as(r))
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Table(table) => write!(
                f,
                "<table {} rows x {} columns>",
                table.num_rows(),
                table.num_columns()
            ),
            Self::List(_) | Self::Map(_) => {
                write!(f, "{}", serde_json::Value::from(self))
            }
        }
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Datum {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<Datum>> for Datum {
    fn from(items: Vec<Datum>) -> Self {
        Self::List(items)
    }
}

impl From<Table> for Datum {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

impl From<DataMap> for Datum {
    fn from(map: DataMap) -> Self {
        Self::Map(map)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for operator checks.
pub const TRACING_TARGET: &str = "sluice_core::operator";

pub mod datum;
mod error;
pub mod operator;

#[doc(hidden)]
pub mod prelude;

pub use datum::{DataMap, Datum, DatumKind, Table};
pub use error::{Boundary, BoxedError, Error, Result};
pub use operator::{Operator, OperatorExt};

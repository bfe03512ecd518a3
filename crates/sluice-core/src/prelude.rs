//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use sluice_core::prelude::*;
//! ```

pub use crate::datum::{DataMap, Datum, DatumKind, Table};
pub use crate::error::{Error, Result};
pub use crate::operator::{
    FnOperator, KindChecked, KindPreserving, Operator, OperatorExt, Passthrough, from_fn,
};

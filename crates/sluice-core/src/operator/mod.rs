//! The operator contract.
//!
//! An [`Operator`] is a unit of data transformation with a single
//! [`apply`](Operator::apply) capability. Validation is layered on by wrapping
//! an operator in one of the decorators exposed through [`OperatorExt`]:
//!
//! - [`KindChecked`]: asserts the kind of the input and/or output.
//! - [`KindPreserving`]: asserts the output has the same kind as the input.
//! - [`Passthrough`]: asserts the output equals the input.
//!
//! # Example
//!
//! ```rust
//! use sluice_core::prelude::*;
//!
//! let increment = from_fn("Increment", |input: Datum| match input {
//!     Datum::Int(value) => Ok(Datum::Int(value + 1)),
//!     other => Ok(other),
//! })
//! .expect_input(DatumKind::Int);
//!
//! assert_eq!(increment.apply(Datum::Int(1)).unwrap(), Datum::Int(2));
//! assert!(increment.apply(Datum::from("one")).is_err());
//! ```

mod checked;
mod passthrough;

use std::fmt;
use std::sync::Arc;

pub use checked::{KindChecked, KindPreserving};
pub use passthrough::Passthrough;

use crate::datum::{Datum, DatumKind};
use crate::error::Result;

/// A unit of data transformation.
///
/// Operators are immutable once constructed and may be shared between
/// threads; operators that keep counters use interior mutability.
pub trait Operator: Send + Sync {
    /// Returns the display name used in logs and diagrams.
    ///
    /// Defaults to the unqualified type name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Returns a human-readable description of what the operator does.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Transforms `input` into a new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the transformation or one of its checks fails.
    fn apply(&self, input: Datum) -> Result<Datum>;
}

impl<O: Operator + ?Sized> Operator for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn description(&self) -> Option<&str> {
        (**self).description()
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        (**self).apply(input)
    }
}

impl<O: Operator + ?Sized> Operator for Arc<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn description(&self) -> Option<&str> {
        (**self).description()
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        (**self).apply(input)
    }
}

/// Strips the module path and generic arguments from a type name.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// An operator backed by a closure.
///
/// Created with [`from_fn`].
pub struct FnOperator<F> {
    name: String,
    description: Option<String>,
    f: F,
}

/// Creates an operator named `name` that applies `f`.
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnOperator<F>
where
    F: Fn(Datum) -> Result<Datum> + Send + Sync,
{
    FnOperator {
        name: name.into(),
        description: None,
        f,
    }
}

impl<F> FnOperator<F> {
    /// Attaches a description shown in pipeline diagrams.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl<F> Operator for FnOperator<F>
where
    F: Fn(Datum) -> Result<Datum> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        (self.f)(input)
    }
}

impl<F> fmt::Debug for FnOperator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Combinators available on every [`Operator`].
pub trait OperatorExt: Operator + Sized {
    /// Asserts the input is of `kind` before applying.
    fn expect_input(self, kind: DatumKind) -> KindChecked<Self> {
        KindChecked::new(self).expect_input(kind)
    }

    /// Asserts the output is of `kind` after applying.
    fn expect_output(self, kind: DatumKind) -> KindChecked<Self> {
        KindChecked::new(self).expect_output(kind)
    }

    /// Asserts the output is of the same kind as the input.
    fn preserve_kind(self) -> KindPreserving<Self> {
        KindPreserving::new(self)
    }

    /// Asserts the output equals the input.
    fn passthrough(self) -> Passthrough<Self> {
        Passthrough::new(self)
    }

    /// Boxes the operator for storage in a pipe.
    fn boxed(self) -> Box<dyn Operator>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<O: Operator> OperatorExt for O {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Double;

    impl Operator for Double {
        fn apply(&self, input: Datum) -> Result<Datum> {
            let value = input
                .as_int()
                .ok_or_else(|| Error::failed(self.name(), "expected an integer"))?;
            Ok(Datum::Int(value * 2))
        }
    }

    #[test]
    fn test_default_name_is_short_type_name() {
        assert_eq!(Double.name(), "Double");
        assert_eq!(Double.boxed().name(), "Double");
    }

    #[test]
    fn test_short_type_name_strips_generics() {
        assert_eq!(short_type_name("a::b::Wrapper<c::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_fn_operator() {
        let negate = from_fn("Negate", |input: Datum| {
            Ok(Datum::Int(-input.as_int().unwrap_or_default()))
        })
        .with_description("Flips the sign of an integer.");

        assert_eq!(negate.name(), "Negate");
        assert_eq!(negate.description(), Some("Flips the sign of an integer."));
        assert_eq!(negate.apply(Datum::Int(4)).unwrap(), Datum::Int(-4));
    }

    #[test]
    fn test_shared_operator() {
        let shared: Arc<dyn Operator> = Arc::new(Double);
        assert_eq!(shared.apply(Datum::Int(3)).unwrap(), Datum::Int(6));
        assert_eq!(shared.name(), "Double");
    }
}

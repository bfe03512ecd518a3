//! Value-preserving operator decorator.

use super::Operator;
use crate::datum::Datum;
use crate::error::{Error, Result};

/// Asserts an operator returns exactly the value it received.
///
/// Useful for side-effecting steps (snapshots, reports) that must not alter
/// the data flowing through a pipe. The input is cloned before the wrapped
/// operator runs; an output that is not [`Datum::same_as`] the input is an
/// [`Error::ValueChanged`]. NaN cells in the same position count as equal.
#[derive(Debug, Clone)]
pub struct Passthrough<O> {
    inner: O,
}

impl<O: Operator> Passthrough<O> {
    /// Wraps `inner`.
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    /// Returns the wrapped operator.
    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O: Operator> Operator for Passthrough<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> Option<&str> {
        self.inner.description()
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let expected = input.clone();
        let output = self.inner.apply(input)?;

        if !output.same_as(&expected) {
            return Err(Error::ValueChanged {
                operator: self.inner.name().to_owned(),
            });
        }

        Ok(output)
    }
}

//! Kind-asserting operator decorators.

use super::Operator;
use crate::TRACING_TARGET;
use crate::datum::{Datum, DatumKind};
use crate::error::{Boundary, Error, Result};

/// Asserts the kind of an operator's input and/or output.
///
/// Checks run before and after the wrapped operator. A failed check is an
/// [`Error::KindMismatch`].
#[derive(Debug, Clone)]
pub struct KindChecked<O> {
    inner: O,
    input: Option<DatumKind>,
    output: Option<DatumKind>,
}

impl<O: Operator> KindChecked<O> {
    /// Wraps `inner` without any assertion.
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            input: None,
            output: None,
        }
    }

    /// Asserts the input is of `kind`.
    pub fn expect_input(mut self, kind: DatumKind) -> Self {
        self.input = Some(kind);
        self
    }

    /// Asserts the output is of `kind`.
    pub fn expect_output(mut self, kind: DatumKind) -> Self {
        self.output = Some(kind);
        self
    }

    /// Returns the asserted input kind.
    pub fn input_kind(&self) -> Option<DatumKind> {
        self.input
    }

    /// Returns the asserted output kind.
    pub fn output_kind(&self) -> Option<DatumKind> {
        self.output
    }

    /// Returns the wrapped operator.
    pub fn inner(&self) -> &O {
        &self.inner
    }

    fn check(&self, boundary: Boundary, expected: Option<DatumKind>, value: &Datum) -> Result<()> {
        let Some(expected) = expected else {
            return Ok(());
        };

        let actual = value.kind();
        if actual == expected {
            return Ok(());
        }

        tracing::debug!(
            target: TRACING_TARGET,
            operator = self.inner.name(),
            boundary = %boundary,
            expected = %expected,
            actual = %actual,
            "Kind assertion failed"
        );

        Err(Error::KindMismatch {
            operator: self.inner.name().to_owned(),
            boundary,
            expected,
            actual,
        })
    }
}

impl<O: Operator> Operator for KindChecked<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> Option<&str> {
        self.inner.description()
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        self.check(Boundary::Input, self.input, &input)?;
        let output = self.inner.apply(input)?;
        self.check(Boundary::Output, self.output, &output)?;
        Ok(output)
    }
}

/// Asserts an operator returns a value of the same kind it received.
///
/// A failed check is an [`Error::KindChanged`].
#[derive(Debug, Clone)]
pub struct KindPreserving<O> {
    inner: O,
}

impl<O: Operator> KindPreserving<O> {
    /// Wraps `inner`.
    pub fn new(inner: O) -> Self {
        Self { inner }
    }

    /// Returns the wrapped operator.
    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O: Operator> Operator for KindPreserving<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> Option<&str> {
        self.inner.description()
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let input_kind = input.kind();
        let output = self.inner.apply(input)?;
        let output_kind = output.kind();

        if input_kind != output_kind {
            return Err(Error::KindChanged {
                operator: self.inner.name().to_owned(),
                input: input_kind,
                output: output_kind,
            });
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::DataMap;
    use crate::operator::{OperatorExt, from_fn};

    fn stringify() -> impl Operator {
        from_fn("Stringify", |input: Datum| Ok(Datum::Text(input.to_string())))
    }

    #[test]
    fn test_input_kind_checked_before_apply() {
        let operator = stringify().expect_input(DatumKind::Int);

        assert_eq!(operator.apply(Datum::Int(5)).unwrap(), Datum::from("5"));

        let error = operator.apply(Datum::Bool(true)).unwrap_err();
        assert!(matches!(
            error,
            Error::KindMismatch {
                boundary: Boundary::Input,
                expected: DatumKind::Int,
                actual: DatumKind::Bool,
                ..
            }
        ));
    }

    #[test]
    fn test_output_kind_checked_after_apply() {
        let operator = stringify()
            .expect_input(DatumKind::Int)
            .expect_output(DatumKind::Map);

        assert_eq!(operator.input_kind(), Some(DatumKind::Int));
        assert_eq!(operator.output_kind(), Some(DatumKind::Map));

        let error = operator.apply(Datum::Int(1)).unwrap_err();
        assert!(matches!(
            error,
            Error::KindMismatch {
                boundary: Boundary::Output,
                actual: DatumKind::Text,
                ..
            }
        ));
    }

    #[test]
    fn test_kind_preserving() {
        let operator = stringify().preserve_kind();

        assert!(operator.apply(Datum::from("already text")).is_ok());
        let error = operator.apply(Datum::Map(DataMap::new())).unwrap_err();
        assert!(matches!(
            error,
            Error::KindChanged {
                input: DatumKind::Map,
                output: DatumKind::Text,
                ..
            }
        ));
    }

    #[test]
    fn test_decorators_keep_inner_name() {
        let operator = stringify().preserve_kind().expect_input(DatumKind::Text);
        assert_eq!(operator.name(), "Stringify");
    }
}

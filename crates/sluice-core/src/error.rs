//! Operator error types.

use std::path::PathBuf;

use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

use crate::datum::DatumKind;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with the operator [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Side of an operator a kind assertion was checked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Boundary {
    /// The value handed to the operator.
    Input,
    /// The value returned by the operator.
    Output,
}

/// Errors raised while constructing or applying operators.
#[derive(Debug, Error)]
pub enum Error {
    /// An operator or pipe was configured inconsistently.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A declared input or output kind did not match the actual value.
    #[error("{operator} requires its {boundary} to be of kind {expected}, but got {actual}")]
    KindMismatch {
        /// Name of the operator performing the check.
        operator: String,
        /// Which side of the operator was checked.
        boundary: Boundary,
        /// Kind the operator declared.
        expected: DatumKind,
        /// Kind actually observed.
        actual: DatumKind,
    },

    /// A kind-preserving operator returned a value of another kind.
    #[error("{operator} requires that input and output are the same kind, got {input} -> {output}")]
    KindChanged {
        /// Name of the operator.
        operator: String,
        /// Kind of the input value.
        input: DatumKind,
        /// Kind of the output value.
        output: DatumKind,
    },

    /// A passthrough operator altered its input.
    #[error("output from passthrough operator {operator} changed from its input")]
    ValueChanged {
        /// Name of the operator.
        operator: String,
    },

    /// A table did not contain a required column.
    #[error("column {column:?} not found in table")]
    MissingColumn {
        /// Name of the missing column.
        column: String,
    },

    /// A table was constructed or modified inconsistently.
    #[error("invalid table: {0}")]
    InvalidTable(String),

    /// Operator logic failed.
    #[error("{operator} failed: {message}")]
    Failed {
        /// Name of the failing operator.
        operator: String,
        /// Human-readable failure description.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxedError>,
    },

    /// Reading or writing a file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File the operation targeted.
        path: PathBuf,
        /// Underlying i/o error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a [`Error::Failed`] error without a source.
    pub fn failed(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operator: operator.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a [`Error::Failed`] error wrapping an underlying cause.
    pub fn failed_with(
        operator: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Failed {
            operator: operator.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a [`Error::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a [`Error::MissingColumn`] error.
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    /// Creates an [`Error::Io`] error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns whether this error is a violation of an operator's kind or value contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::KindMismatch { .. } | Self::KindChanged { .. } | Self::ValueChanged { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mismatch_message() {
        let error = Error::KindMismatch {
            operator: "Sum".into(),
            boundary: Boundary::Input,
            expected: DatumKind::Map,
            actual: DatumKind::Int,
        };

        assert_eq!(
            error.to_string(),
            "Sum requires its input to be of kind map, but got int"
        );
        assert!(error.is_contract_violation());
    }

    #[test]
    fn test_failed_keeps_source() {
        let io = std::io::Error::other("disk full");
        let error = Error::failed_with("Checkpoint", "could not persist", io);

        assert!(std::error::Error::source(&error).is_some());
        assert!(!error.is_contract_violation());
    }
}

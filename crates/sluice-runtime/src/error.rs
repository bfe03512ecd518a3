//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while building or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Pipeline definition is invalid.
    #[error("invalid pipeline definition: {0}")]
    InvalidDefinition(String),

    /// Two pipes declared the same output codename.
    #[error("codename {name:?} is produced by both {first} and {second}")]
    DuplicateProducer {
        /// The contested codename.
        name: String,
        /// Pipe that declared it first.
        first: String,
        /// Pipe that declared it again.
        second: String,
    },

    /// An input is neither a raw input nor produced by any pipe.
    #[error("input {name:?} of pipe {pipe} is neither a raw input nor produced by any pipe")]
    UnresolvedInput {
        /// The missing codename.
        name: String,
        /// Pipe consuming it.
        pipe: String,
    },

    /// Pipes depend on each other's outputs.
    #[error("cyclic dependency between pipes: {}", cycle.join(" -> "))]
    CyclicDependency {
        /// Pipe names along the cycle.
        cycle: Vec<String>,
    },

    /// A pipe's result did not match its declared outputs.
    #[error("pipe {pipe} declared outputs {expected:?} but returned {found}")]
    FanOutMismatch {
        /// Pipe that produced the result.
        pipe: String,
        /// Declared output codenames.
        expected: Vec<String>,
        /// Description of what was returned instead.
        found: String,
    },

    /// A pipe or one of its steps failed.
    #[error(transparent)]
    Operator(#[from] sluice_core::Error),

    /// Reading a definition file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File the operation targeted.
        path: PathBuf,
        /// Underlying i/o error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Returns the operator error, if this failure originated inside a pipe.
    pub fn as_operator_error(&self) -> Option<&sluice_core::Error> {
        match self {
            Self::Operator(error) => Some(error),
            _ => None,
        }
    }
}

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod definition;
mod error;
pub mod operator;
pub mod pipe;
pub mod pipeline;

#[doc(hidden)]
pub mod prelude;

pub use error::{PipelineError, PipelineResult};

/// Tracing target for pipe execution.
pub const TRACING_TARGET_PIPE: &str = "sluice_runtime::pipe";

/// Tracing target for pipeline construction and resolution.
pub const TRACING_TARGET_PIPELINE: &str = "sluice_runtime::pipeline";

/// Tracing target for the built-in operators.
pub const TRACING_TARGET_OPERATOR: &str = "sluice_runtime::operator";

//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use sluice_runtime::prelude::*;
//! ```

pub use sluice_core::prelude::*;

pub use crate::definition::{PipeDefinition, PipelineDefinition, StepDefinition};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::operator::{
    AssignUids, Checkpoint, CheckpointFormat, CheckpointOptions, Compare, Concat, CsvExtractor,
    FeatureRegistry, Featurizer, HeaderMap, JoinKind, JsonExtractor, Merge, Normalizer, TableDiff,
};
pub use crate::pipe::{FileLogLevel, Pipe, PipeConfig, PipeConfigBuilder};
pub use crate::pipeline::{Codenames, PipeId, Pipeline, PipelineBuilder};

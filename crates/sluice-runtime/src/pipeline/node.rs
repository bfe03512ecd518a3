//! Pipe nodes of a pipeline.

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};

use super::Codenames;
use crate::pipe::Pipe;

/// Position of a pipe within its pipeline, in declaration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct PipeId(usize);

impl PipeId {
    /// Returns the declaration index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A pipe together with the codenames it consumes and produces.
#[derive(Debug)]
pub struct PipeNode {
    pub(super) pipe: Pipe,
    pub(super) inputs: Codenames,
    pub(super) outputs: Codenames,
}

impl PipeNode {
    /// Returns the pipe.
    #[inline]
    pub fn pipe(&self) -> &Pipe {
        &self.pipe
    }

    /// Returns the pipe's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.pipe.config().name
    }

    /// Returns the consumed codenames in declaration order.
    #[inline]
    pub fn inputs(&self) -> &Codenames {
        &self.inputs
    }

    /// Returns the produced codenames in declaration order.
    #[inline]
    pub fn outputs(&self) -> &Codenames {
        &self.outputs
    }
}

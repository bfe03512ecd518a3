//! Pipelines: dependency-resolving, memoized execution of pipes.
//!
//! Every pipe in a [`Pipeline`] declares the codenames it consumes and
//! produces. Codenames consumed but never produced are raw inputs, which the
//! caller supplies; codenames produced but never consumed are final outputs.
//! [`Pipeline::run`] resolves the producers of every final output depth
//! first, invoking each pipe at most once and memoizing its results, then
//! returns exactly the final outputs.
//!
//! Results persist across runs on the same instance: after a failure, a new
//! run resumes from the first unresolved pipe. [`Pipeline::reset`] discards
//! everything but the raw inputs.

mod builder;
mod codename;
mod graph;
mod node;
mod resolve;

use std::collections::HashMap;

pub use builder::PipelineBuilder;
pub use codename::Codenames;
pub use node::{PipeId, PipeNode};
use sluice_core::{DataMap, Datum};

use self::graph::DependencyGraph;
use self::resolve::Resolver;
use crate::TRACING_TARGET_PIPELINE;
use crate::error::{PipelineError, PipelineResult};

/// A set of pipes wired together by codenames.
///
/// Created with [`Pipeline::builder`].
#[derive(Debug)]
pub struct Pipeline {
    nodes: Vec<PipeNode>,
    producers: HashMap<String, PipeId>,
    raw_inputs: DataMap,
    all_inputs: Vec<String>,
    all_outputs: Vec<String>,
    inferred_raw_inputs: Vec<String>,
    inferred_final_outputs: Vec<String>,
    results: DataMap,
}

impl Pipeline {
    /// Returns a builder for declaring pipes and raw inputs.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Resolves every final output and returns them in inferred order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving; results memoized
    /// before the failure are kept for the next run.
    pub fn run(&mut self) -> PipelineResult<DataMap> {
        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            pipes = self.nodes.len(),
            final_outputs = ?self.inferred_final_outputs,
            "Running pipeline"
        );

        let mut resolver = Resolver::new(&self.nodes, &self.producers, &mut self.results);
        for name in &self.inferred_final_outputs {
            if let Some(producer) = self.producers.get(name) {
                if let Err(error) = resolver.resolve(*producer) {
                    tracing::error!(
                        target: TRACING_TARGET_PIPELINE,
                        codename = %name,
                        error = %error,
                        "Pipeline run failed"
                    );
                    return Err(error);
                }
            }
        }

        let outputs = self
            .inferred_final_outputs
            .iter()
            .map(|name| {
                self.results
                    .get(name)
                    .cloned()
                    .map(|value| (name.as_str(), value))
                    .ok_or_else(|| {
                        PipelineError::InvalidDefinition(format!(
                            "final output {name:?} was not produced"
                        ))
                    })
            })
            .collect::<PipelineResult<DataMap>>()?;

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            outputs = outputs.len(),
            memoized = self.results.len(),
            "Pipeline run completed"
        );
        Ok(outputs)
    }

    /// Returns the value of a codename, resolving its producer if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDefinition`] for a codename that is
    /// neither supplied nor produced, or any error raised while resolving.
    pub fn resolve(&mut self, name: &str) -> PipelineResult<Datum> {
        if let Some(value) = self.results.get(name) {
            return Ok(value.clone());
        }
        let producer = self.producers.get(name).copied().ok_or_else(|| {
            PipelineError::InvalidDefinition(format!("unknown codename {name:?}"))
        })?;

        self.resolve_pipe(producer)?;
        self.results.get(name).cloned().ok_or_else(|| {
            PipelineError::InvalidDefinition(format!("codename {name:?} was not produced"))
        })
    }

    /// Returns the result of a pipe, resolving its dependencies first.
    ///
    /// For a pipe with several outputs the result is a [`Datum::Map`].
    ///
    /// # Errors
    ///
    /// Returns any error raised while resolving.
    pub fn resolve_pipe(&mut self, id: PipeId) -> PipelineResult<Datum> {
        Resolver::new(&self.nodes, &self.producers, &mut self.results).resolve(id)
    }

    /// Checks that the pipeline can run, without running it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnresolvedInput`] for an inferred raw input
    /// that was not supplied, and [`PipelineError::CyclicDependency`] if pipes
    /// depend on each other.
    pub fn validate(&self) -> PipelineResult<()> {
        if let Some(name) = self
            .inferred_raw_inputs
            .iter()
            .find(|name| !self.raw_inputs.contains_key(name))
        {
            let pipe = self
                .consumers_of(name)
                .first()
                .and_then(|id| self.pipe(*id))
                .map(|node| node.name().to_owned())
                .unwrap_or_default();
            return Err(PipelineError::UnresolvedInput {
                name: name.clone(),
                pipe,
            });
        }
        self.topological_order().map(|_| ())
    }

    /// Orders pipes so that every producer precedes its consumers.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CyclicDependency`] if no such order exists.
    pub fn topological_order(&self) -> PipelineResult<Vec<PipeId>> {
        DependencyGraph::new(&self.nodes, &self.producers).topological_order()
    }

    /// Discards every memoized result except the raw inputs.
    pub fn reset(&mut self) {
        tracing::debug!(
            target: TRACING_TARGET_PIPELINE,
            discarded = self.results.len().saturating_sub(self.raw_inputs.len()),
            "Pipeline reset"
        );
        self.results = self.raw_inputs.clone();
    }

    /// Returns every memoized value, raw inputs included.
    #[inline]
    pub fn results(&self) -> &DataMap {
        &self.results
    }

    /// Returns the memoized value of a codename.
    pub fn result(&self, name: &str) -> Option<&Datum> {
        self.results.get(name)
    }

    /// Returns whether a codename has a memoized value.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.results.contains_key(name)
    }

    /// Returns the supplied raw inputs.
    #[inline]
    pub fn raw_inputs(&self) -> &DataMap {
        &self.raw_inputs
    }

    /// Returns codenames consumed but never produced, in first-appearance order.
    #[inline]
    pub fn inferred_raw_inputs(&self) -> &[String] {
        &self.inferred_raw_inputs
    }

    /// Returns codenames produced but never consumed, in first-appearance order.
    #[inline]
    pub fn inferred_final_outputs(&self) -> &[String] {
        &self.inferred_final_outputs
    }

    /// Returns every consumed codename in first-appearance order.
    #[inline]
    pub fn all_inputs(&self) -> &[String] {
        &self.all_inputs
    }

    /// Returns every produced codename in first-appearance order.
    #[inline]
    pub fn all_outputs(&self) -> &[String] {
        &self.all_outputs
    }

    /// Returns the pipes in declaration order.
    #[inline]
    pub fn pipes(&self) -> &[PipeNode] {
        &self.nodes
    }

    /// Returns a pipe by id.
    pub fn pipe(&self, id: PipeId) -> Option<&PipeNode> {
        self.nodes.get(id.index())
    }

    /// Returns the pipe producing a codename.
    pub fn producer_of(&self, name: &str) -> Option<PipeId> {
        self.producers.get(name).copied()
    }

    /// Returns the pipes consuming a codename, in declaration order.
    pub fn consumers_of(&self, name: &str) -> Vec<PipeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.inputs.iter().any(|input| input == name))
            .map(|(index, _)| PipeId::from(index))
            .collect()
    }

    /// Renders the pipeline as a Graphviz DOT digraph of codenames and pipes.
    pub fn to_dot(&self) -> String {
        let mut codenames: Vec<String> = Vec::new();
        let declared = self
            .all_inputs
            .iter()
            .chain(&self.all_outputs)
            .map(String::as_str)
            .chain(self.raw_inputs.keys());
        for name in declared {
            if !codenames.iter().any(|known| known == name) {
                codenames.push(name.to_owned());
            }
        }

        let raw: Vec<String> = codenames
            .iter()
            .filter(|name| !self.producers.contains_key(name.as_str()))
            .cloned()
            .collect();

        graph::to_dot(&self.nodes, &codenames, &raw, &self.inferred_final_outputs)
    }
}

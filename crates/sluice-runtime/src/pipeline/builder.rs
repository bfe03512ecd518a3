//! Pipeline construction.

use std::collections::HashMap;

use sluice_core::{DataMap, Datum};

use super::{Codenames, PipeId, PipeNode, Pipeline};
use crate::TRACING_TARGET_PIPELINE;
use crate::error::{PipelineError, PipelineResult};
use crate::pipe::Pipe;

/// Builder for [`Pipeline`].
///
/// ```rust
/// use sluice_core::prelude::*;
/// use sluice_runtime::pipe::Pipe;
/// use sluice_runtime::pipeline::Pipeline;
///
/// let double = Pipe::named("Double").then(from_fn("Double", |input: Datum| {
///     Ok(Datum::Int(input.as_int().unwrap_or_default() * 2))
/// }));
///
/// let mut pipeline = Pipeline::builder()
///     .pipe(double, "raw", "doubled")
///     .raw_input("raw", 21)
///     .build()
///     .unwrap();
///
/// let outputs = pipeline.run().unwrap();
/// assert_eq!(outputs.get("doubled"), Some(&Datum::Int(42)));
/// ```
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    nodes: Vec<PipeNode>,
    raw_inputs: DataMap,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a pipe consuming `inputs` and producing `outputs`.
    pub fn pipe(
        mut self,
        pipe: Pipe,
        inputs: impl Into<Codenames>,
        outputs: impl Into<Codenames>,
    ) -> Self {
        self.nodes.push(PipeNode {
            pipe,
            inputs: inputs.into(),
            outputs: outputs.into(),
        });
        self
    }

    /// Supplies the value of a raw input.
    pub fn raw_input(mut self, name: impl Into<String>, value: impl Into<Datum>) -> Self {
        self.raw_inputs.insert(name, value);
        self
    }

    /// Supplies several raw inputs.
    pub fn raw_inputs(mut self, inputs: DataMap) -> Self {
        self.raw_inputs.extend(inputs);
        self
    }

    /// Validates the declarations and builds the pipeline.
    ///
    /// Raw inputs that no pipe consumes, and inferred raw inputs that were not
    /// supplied, are logged as warnings. The latter fail at resolution time.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDefinition`] if a pipe declares no
    /// outputs or repeats a codename in its own inputs or outputs, and
    /// [`PipelineError::DuplicateProducer`] if two pipes produce the same
    /// codename.
    pub fn build(self) -> PipelineResult<Pipeline> {
        let Self { nodes, raw_inputs } = self;

        let mut producers: HashMap<String, PipeId> = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            check_node(node)?;
            for output in &node.outputs {
                if let Some(first) = producers.get(output) {
                    return Err(PipelineError::DuplicateProducer {
                        name: output.clone(),
                        first: nodes[first.index()].name().to_owned(),
                        second: node.name().to_owned(),
                    });
                }
                producers.insert(output.clone(), PipeId::from(index));
            }
        }

        let all_inputs = unique(nodes.iter().flat_map(|node| node.inputs.iter()));
        let all_outputs = unique(nodes.iter().flat_map(|node| node.outputs.iter()));
        let inferred_raw_inputs: Vec<String> = all_inputs
            .iter()
            .filter(|name| !producers.contains_key(name.as_str()))
            .cloned()
            .collect();
        let inferred_final_outputs: Vec<String> = all_outputs
            .iter()
            .filter(|name| !all_inputs.contains(*name))
            .cloned()
            .collect();

        for name in raw_inputs.keys() {
            if !inferred_raw_inputs.iter().any(|raw| raw == name) {
                tracing::warn!(
                    target: TRACING_TARGET_PIPELINE,
                    codename = name,
                    "Raw input is not consumed as a raw input by any pipe"
                );
            }
        }
        for name in &inferred_raw_inputs {
            if !raw_inputs.contains_key(name) {
                tracing::warn!(
                    target: TRACING_TARGET_PIPELINE,
                    codename = %name,
                    "Inferred raw input was not supplied"
                );
            }
        }

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            pipes = nodes.len(),
            raw_inputs = ?inferred_raw_inputs,
            final_outputs = ?inferred_final_outputs,
            "Pipeline built"
        );

        Ok(Pipeline {
            results: raw_inputs.clone(),
            nodes,
            producers,
            raw_inputs,
            all_inputs,
            all_outputs,
            inferred_raw_inputs,
            inferred_final_outputs,
        })
    }
}

fn check_node(node: &PipeNode) -> PipelineResult<()> {
    if node.outputs.is_empty() {
        return Err(PipelineError::InvalidDefinition(format!(
            "pipe {} declares no outputs",
            node.name()
        )));
    }
    if let Some(name) = node.inputs.first_duplicate() {
        return Err(PipelineError::InvalidDefinition(format!(
            "pipe {} declares input {name:?} twice",
            node.name()
        )));
    }
    if let Some(name) = node.outputs.first_duplicate() {
        return Err(PipelineError::InvalidDefinition(format!(
            "pipe {} declares output {name:?} twice",
            node.name()
        )));
    }
    Ok(())
}

/// Collects names in first-appearance order without repeats.
fn unique<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for name in names {
        if !seen.contains(name) {
            seen.push(name.clone());
        }
    }
    seen
}

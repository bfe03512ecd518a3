//! Depth-first, memoized resolution of pipes.

use std::collections::HashMap;

use sluice_core::{DataMap, Datum, Operator};

use super::{PipeId, PipeNode};
use crate::TRACING_TARGET_PIPELINE;
use crate::error::{PipelineError, PipelineResult};

/// Resolves pipes against a shared result cache.
///
/// Inputs missing from the cache are produced by resolving their producers
/// first, depth first in declaration order. Pending pipes live on an explicit
/// work stack rather than the call stack, so arbitrarily long chains resolve
/// without overflowing; a producer already on the stack is a cycle.
pub(super) struct Resolver<'a> {
    nodes: &'a [PipeNode],
    producers: &'a HashMap<String, PipeId>,
    results: &'a mut DataMap,
}

impl<'a> Resolver<'a> {
    pub fn new(
        nodes: &'a [PipeNode],
        producers: &'a HashMap<String, PipeId>,
        results: &'a mut DataMap,
    ) -> Self {
        Self {
            nodes,
            producers,
            results,
        }
    }

    /// Returns the result of a pipe, invoking it only if not yet memoized.
    pub fn resolve(&mut self, id: PipeId) -> PipelineResult<Datum> {
        let mut pending = vec![id];
        let mut resolved = Datum::Null;

        while let Some(&current) = pending.last() {
            let node = self.node(current)?;

            if let Some(cached) = self.cached(node) {
                tracing::debug!(
                    target: TRACING_TARGET_PIPELINE,
                    pipe = node.name(),
                    "Using memoized result"
                );
                pending.pop();
                resolved = cached;
                continue;
            }

            match self.missing_producer(node)? {
                Some(producer) => {
                    if let Some(position) = pending.iter().position(|id| *id == producer) {
                        return Err(self.cycle(&pending[position..], producer));
                    }
                    pending.push(producer);
                }
                None => {
                    resolved = self.execute(node)?;
                    pending.pop();
                }
            }
        }

        Ok(resolved)
    }

    /// Returns the producer of the first declared input missing from the cache.
    fn missing_producer(&self, node: &PipeNode) -> PipelineResult<Option<PipeId>> {
        let Some(input) = node
            .inputs
            .iter()
            .find(|input| !self.results.contains_key(input.as_str()))
        else {
            return Ok(None);
        };

        self.producers
            .get(input)
            .copied()
            .map(Some)
            .ok_or_else(|| PipelineError::UnresolvedInput {
                name: input.clone(),
                pipe: node.name().to_owned(),
            })
    }

    /// Names the pipes of a cycle, closing it with the re-entered pipe.
    fn cycle(&self, path: &[PipeId], reentered: PipeId) -> PipelineError {
        let cycle = path
            .iter()
            .chain(std::iter::once(&reentered))
            .filter_map(|id| self.nodes.get(id.index()))
            .map(|node| node.name().to_owned())
            .collect();
        PipelineError::CyclicDependency { cycle }
    }

    fn node(&self, id: PipeId) -> PipelineResult<&'a PipeNode> {
        let nodes = self.nodes;
        nodes
            .get(id.index())
            .ok_or_else(|| PipelineError::InvalidDefinition(format!("unknown pipe {id}")))
    }

    /// Returns the memoized result of a pipe if all its outputs are cached.
    fn cached(&self, node: &PipeNode) -> Option<Datum> {
        match node.outputs.as_slice() {
            [output] => self.results.get(output).cloned(),
            outputs => outputs
                .iter()
                .map(|output| Some((output.as_str(), self.results.get(output)?.clone())))
                .collect::<Option<DataMap>>()
                .map(Datum::Map),
        }
    }

    /// Invokes a pipe whose inputs are all cached and memoizes its result.
    fn execute(&mut self, node: &PipeNode) -> PipelineResult<Datum> {
        let argument = self.argument(node)?;

        tracing::debug!(
            target: TRACING_TARGET_PIPELINE,
            pipe = node.name(),
            inputs = ?node.inputs.as_slice(),
            outputs = ?node.outputs.as_slice(),
            "Invoking pipe"
        );
        let output = node.pipe.apply(argument)?;

        self.store(node, output)
    }

    /// Assembles the value handed to a pipe from the cache.
    ///
    /// Values are cloned, so a pipe never mutates a value another consumer
    /// will read.
    fn argument(&self, node: &PipeNode) -> PipelineResult<Datum> {
        let lookup = |name: &String| {
            self.results
                .get(name)
                .cloned()
                .ok_or_else(|| PipelineError::UnresolvedInput {
                    name: name.clone(),
                    pipe: node.name().to_owned(),
                })
        };

        match node.inputs.as_slice() {
            [input] => lookup(input),
            inputs => inputs
                .iter()
                .map(|input| lookup(input).map(|value| (input.as_str(), value)))
                .collect::<PipelineResult<DataMap>>()
                .map(Datum::Map),
        }
    }

    /// Memoizes a pipe's result under its declared outputs.
    fn store(&mut self, node: &PipeNode, output: Datum) -> PipelineResult<Datum> {
        match node.outputs.as_slice() {
            [name] => {
                self.results.insert_if_absent(name.as_str(), output.clone());
                Ok(output)
            }
            names => {
                let map = match output {
                    Datum::Map(map)
                        if map.len() == names.len()
                            && names.iter().all(|name| map.contains_key(name)) =>
                    {
                        map
                    }
                    other => {
                        return Err(PipelineError::FanOutMismatch {
                            pipe: node.name().to_owned(),
                            expected: names.to_vec(),
                            found: describe(&other),
                        });
                    }
                };

                for (name, value) in map.iter() {
                    self.results.insert_if_absent(name, value.clone());
                }
                Ok(Datum::Map(map))
            }
        }
    }
}

fn describe(value: &Datum) -> String {
    match value {
        Datum::Map(map) => format!("a map with keys {:?}", map.keys().collect::<Vec<_>>()),
        other => format!("a single {} value", other.kind()),
    }
}

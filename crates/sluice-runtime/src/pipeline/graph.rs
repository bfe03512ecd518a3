//! Graph views of a pipeline's declarations.

use std::collections::HashMap;
use std::fmt;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use super::{PipeId, PipeNode};
use crate::error::{PipelineError, PipelineResult};

/// Pipe-to-pipe dependencies, one edge per consumed codename.
pub(super) struct DependencyGraph<'a> {
    nodes: &'a [PipeNode],
    graph: DiGraph<PipeId, &'a str>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(nodes: &'a [PipeNode], producers: &HashMap<String, PipeId>) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), nodes.len());
        for index in 0..nodes.len() {
            graph.add_node(PipeId::from(index));
        }
        for (consumer, node) in nodes.iter().enumerate() {
            for input in &node.inputs {
                if let Some(producer) = producers.get(input) {
                    graph.add_edge(
                        NodeIndex::new(producer.index()),
                        NodeIndex::new(consumer),
                        input.as_str(),
                    );
                }
            }
        }
        Self { nodes, graph }
    }

    /// Orders pipes so every producer precedes its consumers.
    pub fn topological_order(&self) -> PipelineResult<Vec<PipeId>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|index| self.graph[index]).collect())
            .map_err(|_| self.cycle_error())
    }

    fn cycle_error(&self) -> PipelineError {
        let mut members = tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| match component.as_slice() {
                [single] => self.graph.contains_edge(*single, *single),
                component => !component.is_empty(),
            })
            .unwrap_or_default();
        members.sort();

        let mut cycle: Vec<String> = members
            .iter()
            .filter_map(|index| self.nodes.get(self.graph[*index].index()))
            .map(|node| node.name().to_owned())
            .collect();
        if let Some(first) = cycle.first().cloned() {
            cycle.push(first);
        }
        PipelineError::CyclicDependency { cycle }
    }
}

/// Role of a codename in the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodenameRole {
    Raw,
    Intermediate,
    Final,
}

/// Node of the bipartite codename/pipe diagram.
#[derive(Debug, Clone)]
enum DiagramNode {
    Codename { name: String, role: CodenameRole },
    Pipe { name: String },
}

impl DiagramNode {
    fn attributes(&self) -> String {
        match self {
            Self::Codename {
                role: CodenameRole::Raw,
                ..
            } => "shape=ellipse, style=dashed".to_owned(),
            Self::Codename {
                role: CodenameRole::Intermediate,
                ..
            } => "shape=ellipse".to_owned(),
            Self::Codename {
                role: CodenameRole::Final,
                ..
            } => "shape=ellipse, peripheries=2".to_owned(),
            Self::Pipe { .. } => "shape=box".to_owned(),
        }
    }
}

impl fmt::Display for DiagramNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codename { name, .. } | Self::Pipe { name } => f.write_str(name),
        }
    }
}

/// Renders codenames and pipes as a Graphviz DOT digraph.
///
/// Raw inputs are dashed, final outputs double-circled and pipes boxed.
pub(super) fn to_dot(
    nodes: &[PipeNode],
    codenames: &[String],
    raw: &[String],
    finals: &[String],
) -> String {
    let mut graph: DiGraph<DiagramNode, &str> = DiGraph::new();

    let mut indices: HashMap<&str, NodeIndex> = HashMap::new();
    for name in codenames {
        let role = if raw.contains(name) {
            CodenameRole::Raw
        } else if finals.contains(name) {
            CodenameRole::Final
        } else {
            CodenameRole::Intermediate
        };
        let index = graph.add_node(DiagramNode::Codename {
            name: name.clone(),
            role,
        });
        indices.insert(name.as_str(), index);
    }

    for node in nodes {
        let pipe = graph.add_node(DiagramNode::Pipe {
            name: node.name().to_owned(),
        });
        for input in &node.inputs {
            if let Some(codename) = indices.get(input.as_str()) {
                graph.add_edge(*codename, pipe, "");
            }
        }
        for output in &node.outputs {
            if let Some(codename) = indices.get(output.as_str()) {
                graph.add_edge(pipe, *codename, "");
            }
        }
    }

    let dot = Dot::with_attr_getters(
        &graph,
        &[Config::EdgeNoLabel],
        &|_, _| String::new(),
        &|_, (_, node)| node.attributes(),
    );
    format!("{dot}")
}

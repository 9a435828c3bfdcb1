// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::layer::JobLayer;
use crate::errors::{DagSubmitError, Result};

/// DAG of job layers.
///
/// Edge direction: parent -> child. Every instance of a child layer waits for
/// every instance of each parent layer.
///
/// Nodes in the petgraph structure are indices into `layers`, which keeps
/// registration order available for deterministic output.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    layers: Vec<JobLayer>,
    by_name: HashMap<String, usize>,
    edges: DiGraphMap<usize, ()>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer. Names must be unique within the graph.
    pub fn add_layer(&mut self, layer: JobLayer) -> Result<()> {
        if self.by_name.contains_key(layer.name()) {
            return Err(DagSubmitError::Graph(format!(
                "layer '{}' is already part of the graph",
                layer.name()
            )));
        }

        let idx = self.layers.len();
        debug!(layer = %layer.name(), idx, "registering layer");
        self.by_name.insert(layer.name().to_string(), idx);
        self.edges.add_node(idx);
        self.layers.push(layer);
        Ok(())
    }

    /// Add `parent -> child`, refusing unknown layers and cycles.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        let p = self.index_of(parent)?;
        let c = self.index_of(child)?;

        if p == c {
            return Err(DagSubmitError::Graph(format!(
                "layer '{parent}' cannot depend on itself"
            )));
        }

        // If the child already reaches the parent, the new edge closes a loop.
        if has_path_connecting(&self.edges, c, p, None) {
            return Err(DagSubmitError::Graph(format!(
                "edge '{parent}' -> '{child}' would create a cycle"
            )));
        }

        debug!(parent, child, "adding layer edge");
        self.edges.add_edge(p, c, ());
        Ok(())
    }

    /// Re-check acyclicity, e.g. after building a graph by other means.
    pub fn validate(&self) -> Result<()> {
        match toposort(&self.edges, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(DagSubmitError::Graph(format!(
                "cycle detected in workflow graph involving layer '{}'",
                self.layers[cycle.node_id()].name()
            ))),
        }
    }

    pub fn layer(&self, name: &str) -> Option<&JobLayer> {
        self.by_name.get(name).map(|&idx| &self.layers[idx])
    }

    /// Layers in registration order.
    pub fn layers(&self) -> impl Iterator<Item = &JobLayer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// `(parent, child)` name pairs, ordered by registration index.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(usize, usize)> = self
            .edges
            .all_edges()
            .map(|(p, c, _)| (p, c))
            .collect();
        pairs.sort_unstable();
        pairs
            .into_iter()
            .map(|(p, c)| (self.layers[p].name(), self.layers[c].name()))
            .collect()
    }

    pub fn parents_of(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Incoming)
    }

    pub fn children_of(&self, name: &str) -> Vec<&str> {
        self.neighbours(name, Direction::Outgoing)
    }

    /// Layers ordered so that every parent precedes its children.
    ///
    /// Among layers that are ready at the same time, the one registered first
    /// comes first, so the order is stable for a given construction sequence.
    pub fn topological_order(&self) -> Vec<&JobLayer> {
        let mut in_degree: Vec<usize> = (0..self.layers.len())
            .map(|idx| self.edges.neighbors_directed(idx, Direction::Incoming).count())
            .collect();

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(idx, _)| idx)
            .collect();

        let mut order = Vec::with_capacity(self.layers.len());
        while let Some(idx) = ready.pop_first() {
            order.push(&self.layers[idx]);
            for child in self.edges.neighbors_directed(idx, Direction::Outgoing) {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.insert(child);
                }
            }
        }
        order
    }

    fn neighbours(&self, name: &str, dir: Direction) -> Vec<&str> {
        let Some(&idx) = self.by_name.get(name) else {
            return Vec::new();
        };
        let mut found: Vec<usize> = self.edges.neighbors_directed(idx, dir).collect();
        found.sort_unstable();
        found.into_iter().map(|i| self.layers[i].name()).collect()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.by_name.get(name).copied().ok_or_else(|| {
            DagSubmitError::Graph(format!("layer '{name}' is not registered in the graph"))
        })
    }
}

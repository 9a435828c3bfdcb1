// src/dag/mod.rs

//! Job graph data model.
//!
//! - [`template`] holds immutable submit templates with `$(var)` placeholders.
//! - [`layer`] groups job instances that share a template.
//! - [`graph`] is the DAG of layers, with cycle checks on insertion.
//! - [`workflow`] assembles the process/merge graph for a dataset.

pub mod graph;
pub mod layer;
pub mod template;
pub mod workflow;

pub use graph::WorkflowGraph;
pub use layer::{JobLayer, JobVariableSet, OutputNaming, merge_layer, process_layer};
pub use template::JobTemplate;
pub use workflow::{MergeStage, WorkflowBuilder};

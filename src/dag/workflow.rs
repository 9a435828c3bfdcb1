// src/dag/workflow.rs

//! Assembly of the dataset workflow: a per-file process layer, optionally
//! followed by a single merge job.

use std::sync::Arc;

use tracing::info;

use crate::dag::graph::WorkflowGraph;
use crate::dag::layer::{OutputNaming, merge_layer, process_layer};
use crate::dag::template::JobTemplate;
use crate::dataset::InputFile;
use crate::errors::Result;

/// Whether the workflow ends in an aggregation step.
#[derive(Debug, Clone)]
pub enum MergeStage {
    Disabled,
    Enabled {
        template: Arc<JobTemplate>,
        /// Name of the merged artifact, e.g. `demo-skim.root`.
        output_file: String,
    },
}

/// Builds the [`WorkflowGraph`] for one dataset.
///
/// ```ignore
/// let graph = WorkflowBuilder::new("demo", process_template)
///     .naming(OutputNaming::default())
///     .merge(MergeStage::Enabled { template, output_file: "demo-skim.root".into() })
///     .build(&inputs)?;
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    dataset: String,
    process: Arc<JobTemplate>,
    naming: OutputNaming,
    merge: MergeStage,
}

impl WorkflowBuilder {
    pub fn new(dataset: impl Into<String>, process: Arc<JobTemplate>) -> Self {
        Self {
            dataset: dataset.into(),
            process,
            naming: OutputNaming::default(),
            merge: MergeStage::Disabled,
        }
    }

    pub fn naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn merge(mut self, merge: MergeStage) -> Self {
        self.merge = merge;
        self
    }

    pub fn build(self, inputs: &[InputFile]) -> Result<WorkflowGraph> {
        let process = process_layer(&self.dataset, inputs, self.process, &self.naming)?;
        let process_name = process.name().to_string();

        let merge = match self.merge {
            MergeStage::Disabled => None,
            MergeStage::Enabled {
                template,
                output_file,
            } => Some(merge_layer(&self.dataset, &process, template, &output_file)?),
        };

        let mut graph = WorkflowGraph::new();
        graph.add_layer(process)?;

        if let Some(merge) = merge {
            let merge_name = merge.name().to_string();
            graph.add_layer(merge)?;
            graph.add_edge(&process_name, &merge_name)?;
        }

        info!(
            dataset = %self.dataset,
            layers = graph.len(),
            jobs = graph.layers().map(|l| l.instances().len()).sum::<usize>(),
            "assembled workflow graph"
        );
        Ok(graph)
    }
}

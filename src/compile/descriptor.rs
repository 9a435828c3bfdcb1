// src/compile/descriptor.rs

//! Text rendering for the DAG input file and per-layer submit files.
//!
//! Everything here is pure: same graph in, same bytes out. Paths written into
//! the descriptors are relative to the artifact directory.

use std::fmt::Write as _;

use crate::dag::{JobLayer, WorkflowGraph};
use crate::errors::{DagSubmitError, Result};

/// File name of the graph-level descriptor inside the artifact directory.
pub const DAG_FILE_NAME: &str = "dagfile.dag";

/// File name of a layer's submit description.
pub fn submit_file_name(layer: &JobLayer) -> String {
    format!("{}.sub", layer.name())
}

/// Check that every instance of `layer` binds every template placeholder.
pub fn check_bindings(layer: &JobLayer) -> Result<()> {
    for (idx, vars) in layer.instances().iter().enumerate() {
        if let Err(missing) = layer.template().render(vars) {
            return Err(DagSubmitError::Compilation(format!(
                "layer '{}', instance {idx}: directive '{}' references unbound variable '{}'",
                layer.name(),
                missing.directive,
                missing.variable
            )));
        }
    }
    Ok(())
}

/// Render the DAGMan input file.
///
/// Layers appear in topological order; each instance gets a `JOB` and a
/// `VARS` line, and each layer edge becomes one `PARENT ... CHILD ...` line
/// naming every node on both sides.
pub fn render_dag(graph: &WorkflowGraph) -> Result<String> {
    let mut out = String::new();
    out.push_str("# generated by dagsubmit; do not edit\n");

    for layer in graph.topological_order() {
        let submit = submit_file_name(layer);
        out.push('\n');
        for (idx, vars) in layer.instances().iter().enumerate() {
            let node = layer.node_name(idx);
            let _ = writeln!(out, "JOB {node} {submit}");
            if vars.is_empty() {
                continue;
            }
            out.push_str("VARS ");
            out.push_str(&node);
            for (name, value) in vars.iter() {
                let _ = write!(out, " {name}=\"{}\"", escape_value(layer, idx, value)?);
            }
            out.push('\n');
        }
    }

    let edges = graph.edges();
    if !edges.is_empty() {
        out.push('\n');
    }
    for (parent, child) in edges {
        let (Some(parent), Some(child)) = (graph.layer(parent), graph.layer(child)) else {
            continue;
        };
        let _ = writeln!(
            out,
            "PARENT {} CHILD {}",
            node_list(parent),
            node_list(child)
        );
    }

    Ok(out)
}

fn node_list(layer: &JobLayer) -> String {
    (0..layer.instances().len())
        .map(|idx| layer.node_name(idx))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a `VARS` value: backslashes and double quotes are escaped, line
/// breaks cannot be represented at all.
fn escape_value(layer: &JobLayer, idx: usize, value: &str) -> Result<String> {
    if value.contains(['\n', '\r']) {
        return Err(DagSubmitError::Compilation(format!(
            "layer '{}', instance {idx}: variable value contains a line break",
            layer.name()
        )));
    }
    Ok(value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dag::{JobTemplate, JobVariableSet};

    fn layer(name: &str, instances: Vec<JobVariableSet>) -> JobLayer {
        let template = Arc::new(
            JobTemplate::new(name)
                .with("executable", format!("{name}.sh"))
                .with("arguments", "$(value)"),
        );
        JobLayer::new(name, template, instances).unwrap()
    }

    #[test]
    fn dag_lists_jobs_vars_and_edges() {
        let mut graph = WorkflowGraph::new();
        graph
            .add_layer(layer(
                "process",
                vec![
                    JobVariableSet::from_pairs([("value", "a")]),
                    JobVariableSet::from_pairs([("value", "say \"hi\"")]),
                ],
            ))
            .unwrap();
        graph
            .add_layer(layer("merge", vec![JobVariableSet::from_pairs([("value", "all")])]))
            .unwrap();
        graph.add_edge("process", "merge").unwrap();

        let text = render_dag(&graph).unwrap();
        assert_eq!(
            text,
            "# generated by dagsubmit; do not edit\n\
             \n\
             JOB process:0 process.sub\n\
             VARS process:0 value=\"a\"\n\
             JOB process:1 process.sub\n\
             VARS process:1 value=\"say \\\"hi\\\"\"\n\
             \n\
             JOB merge:0 merge.sub\n\
             VARS merge:0 value=\"all\"\n\
             \n\
             PARENT process:0 process:1 CHILD merge:0\n"
        );
    }

    #[test]
    fn unbound_placeholder_is_a_compilation_error() {
        let l = layer("process", vec![JobVariableSet::from_pairs([("other", "x")])]);
        let err = check_bindings(&l).unwrap_err();
        match err {
            DagSubmitError::Compilation(msg) => assert!(msg.contains("'value'")),
            other => panic!("expected Compilation error, got {other:?}"),
        }
    }

    #[test]
    fn line_breaks_in_values_are_rejected() {
        let mut graph = WorkflowGraph::new();
        graph
            .add_layer(layer("process", vec![JobVariableSet::from_pairs([("value", "a\nb")])]))
            .unwrap();
        assert!(matches!(
            render_dag(&graph),
            Err(DagSubmitError::Compilation(_))
        ));
    }
}

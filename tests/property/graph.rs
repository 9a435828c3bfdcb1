// tests/property/graph.rs

use std::collections::HashMap;

use dagsubmit::dag::{JobLayer, JobVariableSet, WorkflowGraph};
use dagsubmit_test_utils::builders::template;
use proptest::prelude::*;

fn layer(name: &str) -> JobLayer {
    JobLayer::new(
        name,
        template(name, "run.sh", "$(n)"),
        vec![JobVariableSet::from_pairs([("n", name)])],
    )
    .unwrap()
}

proptest! {
    /// Whatever edges are attempted, accepted ones never form a cycle and the
    /// topological order puts every parent before its children.
    #[test]
    fn accepted_edges_stay_acyclic(
        n in 2usize..8,
        attempts in prop::collection::vec((0usize..8, 0usize..8), 0..40),
    ) {
        let names: Vec<String> = (0..n).map(|i| format!("l{i}")).collect();
        let mut graph = WorkflowGraph::new();
        for name in &names {
            graph.add_layer(layer(name)).unwrap();
        }

        for (a, b) in attempts {
            let (a, b) = (a % n, b % n);
            let _ = graph.add_edge(&names[a], &names[b]);
        }

        prop_assert!(graph.validate().is_ok());

        let order: HashMap<&str, usize> = graph
            .topological_order()
            .into_iter()
            .enumerate()
            .map(|(pos, l)| (l.name(), pos))
            .collect();
        prop_assert_eq!(order.len(), n);
        for (parent, child) in graph.edges() {
            prop_assert!(order[parent] < order[child]);
        }
    }
}

// tests/property/layers.rs

use std::collections::HashSet;
use std::path::Path;

use dagsubmit::dag::{MergeStage, OutputNaming, WorkflowBuilder, process_layer};
use dagsubmit_test_utils::builders::{input_files, template};
use proptest::prelude::*;

proptest! {
    #[test]
    fn n_inputs_give_n_distinct_instances(n in 1usize..200) {
        let inputs = input_files(Path::new("/data/demo/delphesstep"), n);
        let layer = process_layer(
            "demo",
            &inputs,
            template("process", "process.sh", "$(input_file)"),
            &OutputNaming::default(),
        ).unwrap();

        prop_assert_eq!(layer.instances().len(), n);
        let distinct: HashSet<_> = layer.instances().iter().collect();
        prop_assert_eq!(distinct.len(), n);

        let outputs: HashSet<&str> = layer.values_of("output_file").collect();
        prop_assert_eq!(outputs.len(), n);
    }

    #[test]
    fn merge_collects_every_process_output(n in 1usize..50) {
        let inputs = input_files(Path::new("/data/demo/delphesstep"), n);
        let graph = WorkflowBuilder::new("demo", template("process", "process.sh", "$(input_file)"))
            .merge(MergeStage::Enabled {
                template: template("merge", "merge.sh", "$(input_files)"),
                output_file: "demo-skim.root".to_string(),
            })
            .build(&inputs)
            .unwrap();

        let merge = graph.layer("merge").unwrap();
        prop_assert_eq!(merge.instances().len(), 1);
        let joined = merge.instances()[0].get("input_files").unwrap();
        prop_assert_eq!(joined.split(", ").count(), n);
        prop_assert_eq!(graph.edges(), vec![("process", "merge")]);
    }
}

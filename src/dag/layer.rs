// src/dag/layer.rs

//! Job layers: a template plus one variable set per job instance.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::dag::template::JobTemplate;
use crate::dataset::InputFile;
use crate::errors::{DagSubmitError, Result};

/// Per-instance variable bindings (`name -> value`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobVariableSet(BTreeMap<String, String>);

impl JobVariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Naming policy for per-file outputs.
///
/// Tokens: `{dataset}`, `{index}`, `{stem}` (input file name up to the first
/// dot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    pattern: String,
}

impl OutputNaming {
    pub const DEFAULT_PATTERN: &'static str = "{dataset}-{index}.root";

    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn output_for(&self, dataset: &str, input: &InputFile) -> String {
        self.pattern
            .replace("{dataset}", dataset)
            .replace("{index}", &input.index.to_string())
            .replace("{stem}", &input.stem())
    }
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATTERN)
    }
}

/// A homogeneous group of jobs sharing one template.
#[derive(Debug, Clone)]
pub struct JobLayer {
    name: String,
    template: Arc<JobTemplate>,
    instances: Vec<JobVariableSet>,
}

impl JobLayer {
    /// Build a layer, rejecting empty or ambiguous instance lists.
    pub fn new(
        name: impl Into<String>,
        template: Arc<JobTemplate>,
        instances: Vec<JobVariableSet>,
    ) -> Result<Self> {
        let name = name.into();
        validate_layer_name(&name)?;

        if instances.is_empty() {
            return Err(DagSubmitError::Validation(format!(
                "layer '{name}' has no job instances"
            )));
        }

        let mut seen = HashSet::with_capacity(instances.len());
        for (idx, vars) in instances.iter().enumerate() {
            if !seen.insert(vars) {
                return Err(DagSubmitError::Validation(format!(
                    "layer '{name}': instance {idx} repeats the variable set of an earlier instance"
                )));
            }
        }

        debug!(layer = %name, instances = instances.len(), "built job layer");
        Ok(Self {
            name,
            template,
            instances,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &JobTemplate {
        &self.template
    }

    pub fn instances(&self) -> &[JobVariableSet] {
        &self.instances
    }

    /// Node name of instance `idx` in the compiled DAG.
    pub fn node_name(&self, idx: usize) -> String {
        format!("{}:{}", self.name, idx)
    }

    /// Values bound to `variable` across all instances, in instance order.
    pub fn values_of<'a>(&'a self, variable: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.instances.iter().filter_map(move |v| v.get(variable))
    }
}

fn validate_layer_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DagSubmitError::Validation(
            "layer name must not be empty".to_string(),
        ));
    }
    if name.chars().any(|c| c.is_whitespace() || c == ':' || c == '/') {
        return Err(DagSubmitError::Validation(format!(
            "layer name '{name}' must not contain whitespace, ':' or '/'"
        )));
    }
    Ok(())
}

/// The per-file processing layer: one instance per input.
///
/// Each instance binds `dataset`, `input_file`, `index` and `output_file`.
pub fn process_layer(
    dataset: &str,
    inputs: &[InputFile],
    template: Arc<JobTemplate>,
    naming: &OutputNaming,
) -> Result<JobLayer> {
    if inputs.is_empty() {
        return Err(DagSubmitError::Validation(format!(
            "dataset '{dataset}' has no input files to process"
        )));
    }

    let instances = inputs
        .iter()
        .map(|input| {
            JobVariableSet::from_pairs([
                ("dataset", dataset.to_string()),
                ("input_file", input.path.to_string_lossy().into_owned()),
                ("index", input.index.to_string()),
                ("output_file", naming.output_for(dataset, input)),
            ])
        })
        .collect();

    JobLayer::new("process", template, instances)
}

/// The aggregation layer: a single instance fed by every output of `upstream`.
///
/// Binds `dataset`, `output_file` and `input_files` (all upstream
/// `output_file` values joined with `", "`).
pub fn merge_layer(
    dataset: &str,
    upstream: &JobLayer,
    template: Arc<JobTemplate>,
    output_file: &str,
) -> Result<JobLayer> {
    let outputs: Vec<&str> = upstream.values_of("output_file").collect();
    if outputs.is_empty() {
        return Err(DagSubmitError::Validation(format!(
            "layer '{}' produces no outputs to merge",
            upstream.name()
        )));
    }

    let vars = JobVariableSet::from_pairs([
        ("dataset", dataset.to_string()),
        ("input_files", outputs.join(", ")),
        ("output_file", output_file.to_string()),
    ]);

    JobLayer::new("merge", template, vec![vars])
}

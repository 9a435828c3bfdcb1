// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::dag::{JobTemplate, OutputNaming};
use crate::submit::CondorTools;

/// Configuration as read from a TOML file, before validation.
///
/// Every section is optional; the defaults reproduce the standard
/// Delphes skim workflow:
///
/// ```toml
/// [workflow]
/// merge = true
/// input_pattern = "*.root*"
/// output_pattern = "{dataset}-{index}.root"
/// merge_output = "{dataset}-skim.root"
///
/// [process]
/// executable = "process.sh"
/// arguments = "$(dataset) $(input_file) $(index)"
///
/// [merge.attributes]
/// "+ProjectName" = '"snowmass21.energy"'
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub workflow: WorkflowSection,

    /// Tool names for the HTCondor command-line backend.
    #[serde(default)]
    pub scheduler: CondorTools,

    /// Overrides for the per-file process template.
    #[serde(default)]
    pub process: TemplateConfig,

    /// Overrides for the merge template.
    #[serde(default)]
    pub merge: TemplateConfig,
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    /// Add the merge layer after the process layer.
    #[serde(default = "default_true")]
    pub merge: bool,

    /// File-name glob selecting input files inside the dataset.
    #[serde(default = "default_input_pattern")]
    pub input_pattern: String,

    /// Naming policy for per-file outputs (`{dataset}`, `{index}`, `{stem}`).
    #[serde(default = "default_output_pattern")]
    pub output_pattern: String,

    /// Name of the merged output (`{dataset}`).
    #[serde(default = "default_merge_output")]
    pub merge_output: String,

    /// Where relative `executable` paths are copied from.
    #[serde(default = "default_executables_dir")]
    pub executables_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_input_pattern() -> String {
    "*.root*".to_string()
}

fn default_output_pattern() -> String {
    OutputNaming::DEFAULT_PATTERN.to_string()
}

fn default_merge_output() -> String {
    "{dataset}-skim.root".to_string()
}

fn default_executables_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            merge: default_true(),
            input_pattern: default_input_pattern(),
            output_pattern: default_output_pattern(),
            merge_output: default_merge_output(),
            executables_dir: default_executables_dir(),
        }
    }
}

impl WorkflowSection {
    pub fn naming(&self) -> OutputNaming {
        OutputNaming::new(&self.output_pattern)
    }

    pub fn merge_output_for(&self, dataset: &str) -> String {
        self.merge_output.replace("{dataset}", dataset)
    }
}

/// `[process]` / `[merge]` template sections.
///
/// Unset fields fall back to the built-in template for that layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateConfig {
    pub executable: Option<String>,
    pub arguments: Option<String>,
    pub log: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub stream_output: Option<bool>,
    pub stream_error: Option<bool>,
    pub transfer_input_files: Option<String>,

    /// Any other submit commands or custom attributes (`+Name = value`).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

const PROJECT_NAME: &str = "\"snowmass21.energy\"";

impl TemplateConfig {
    /// Built-in template for the per-file process layer.
    pub fn process_defaults() -> Self {
        Self {
            executable: Some("process.sh".to_string()),
            arguments: Some("$(dataset) $(input_file) $(index)".to_string()),
            log: Some("condor-process-$(Cluster).log".to_string()),
            output: Some("condor-process-$(Cluster).out".to_string()),
            error: Some("condor-process-$(Cluster).err".to_string()),
            stream_output: Some(true),
            stream_error: Some(true),
            transfer_input_files: None,
            attributes: BTreeMap::from([(
                "+ProjectName".to_string(),
                PROJECT_NAME.to_string(),
            )]),
        }
    }

    /// Built-in template for the merge layer.
    pub fn merge_defaults() -> Self {
        Self {
            executable: Some("merge.sh".to_string()),
            arguments: Some("$(output_file)".to_string()),
            log: Some("condor-$(Cluster)-merge.log".to_string()),
            output: Some("condor-$(Cluster)-merge.out".to_string()),
            error: Some("condor-$(Cluster)-merge.err".to_string()),
            stream_output: Some(true),
            stream_error: Some(true),
            transfer_input_files: Some("$(input_files)".to_string()),
            attributes: BTreeMap::from([(
                "+ProjectName".to_string(),
                PROJECT_NAME.to_string(),
            )]),
        }
    }

    /// Field-wise overlay: values set in `self` win over `base`.
    pub fn over(self, base: TemplateConfig) -> TemplateConfig {
        let mut attributes = base.attributes;
        attributes.extend(self.attributes);
        TemplateConfig {
            executable: self.executable.or(base.executable),
            arguments: self.arguments.or(base.arguments),
            log: self.log.or(base.log),
            output: self.output.or(base.output),
            error: self.error.or(base.error),
            stream_output: self.stream_output.or(base.stream_output),
            stream_error: self.stream_error.or(base.stream_error),
            transfer_input_files: self.transfer_input_files.or(base.transfer_input_files),
            attributes,
        }
    }

    pub fn to_template(&self, name: &str) -> JobTemplate {
        let mut template = JobTemplate::new(name);
        let strings = [
            ("executable", &self.executable),
            ("arguments", &self.arguments),
            ("log", &self.log),
            ("output", &self.output),
            ("error", &self.error),
            ("transfer_input_files", &self.transfer_input_files),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                template = template.with(key, value.clone());
            }
        }
        let streams = [
            ("stream_output", self.stream_output),
            ("stream_error", self.stream_error),
        ];
        for (key, value) in streams {
            if let Some(flag) = value {
                template = template.with(key, if flag { "True" } else { "False" });
            }
        }
        for (key, value) in &self.attributes {
            template = template.with(key.clone(), value.clone());
        }
        template
    }
}

/// Validated configuration; construct through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub workflow: WorkflowSection,
    pub scheduler: CondorTools,
    pub process: Arc<JobTemplate>,
    pub merge: Arc<JobTemplate>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        workflow: WorkflowSection,
        scheduler: CondorTools,
        process: JobTemplate,
        merge: JobTemplate,
    ) -> Self {
        Self {
            workflow,
            scheduler,
            process: Arc::new(process),
            merge: Arc::new(merge),
        }
    }
}

// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile, TemplateConfig, WorkflowSection};
use crate::dag::JobTemplate;
use crate::errors::{DagSubmitError, Result};

/// Variables bound on every process-layer instance.
pub const PROCESS_VARIABLES: &[&str] = &["dataset", "input_file", "index", "output_file"];

/// Variables bound on the merge-layer instance.
pub const MERGE_VARIABLES: &[&str] = &["dataset", "input_files", "output_file"];

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DagSubmitError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let process = raw
            .process
            .over(TemplateConfig::process_defaults())
            .to_template("process");
        let merge = raw
            .merge
            .over(TemplateConfig::merge_defaults())
            .to_template("merge");

        validate_workflow(&raw.workflow)?;
        validate_template(&process, PROCESS_VARIABLES)?;
        if raw.workflow.merge {
            validate_template(&merge, MERGE_VARIABLES)?;
        }

        Ok(ConfigFile::new_unchecked(
            raw.workflow,
            raw.scheduler,
            process,
            merge,
        ))
    }
}

fn validate_workflow(workflow: &WorkflowSection) -> Result<()> {
    Glob::new(&workflow.input_pattern).map_err(|e| {
        DagSubmitError::Config(format!(
            "[workflow].input_pattern '{}' is not a valid glob: {e}",
            workflow.input_pattern
        ))
    })?;

    // Without the index two inputs could map to the same output.
    if !workflow.output_pattern.contains("{index}") {
        return Err(DagSubmitError::Config(format!(
            "[workflow].output_pattern '{}' must contain {{index}}",
            workflow.output_pattern
        )));
    }

    if workflow.merge && workflow.merge_output.trim().is_empty() {
        return Err(DagSubmitError::Config(
            "[workflow].merge_output must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_template(template: &JobTemplate, bound: &[&str]) -> Result<()> {
    match template.executable() {
        Some(exe) if !exe.trim().is_empty() => {}
        _ => {
            return Err(DagSubmitError::Config(format!(
                "[{}].executable must be set",
                template.name()
            )));
        }
    }

    for name in template.placeholders() {
        if !bound.contains(&name.as_str()) {
            return Err(DagSubmitError::Config(format!(
                "[{}] references $({name}), which is not bound for this layer (available: {})",
                template.name(),
                bound.join(", ")
            )));
        }
    }
    Ok(())
}

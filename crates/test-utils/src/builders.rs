#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dagsubmit::cli::{CliArgs, DEFAULT_BASE_PATH};
use dagsubmit::config::{ConfigFile, RawConfigFile};
use dagsubmit::dag::JobTemplate;
use dagsubmit::dataset::InputFile;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn without_merge(mut self) -> Self {
        self.config.workflow.merge = false;
        self
    }

    pub fn executables_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workflow.executables_dir = dir.into();
        self
    }

    pub fn output_pattern(mut self, pattern: &str) -> Self {
        self.config.workflow.output_pattern = pattern.to_string();
        self
    }

    pub fn process_arguments(mut self, args: &str) -> Self {
        self.config.process.arguments = Some(args.to_string());
        self
    }

    pub fn process_attribute(mut self, key: &str, value: &str) -> Self {
        self.config
            .process
            .attributes
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `CliArgs`, starting from the parser defaults.
pub struct CliArgsBuilder {
    args: CliArgs,
}

impl CliArgsBuilder {
    pub fn new(dataset: &str) -> Self {
        Self {
            args: CliArgs {
                dataset: dataset.to_string(),
                base_path: PathBuf::from(DEFAULT_BASE_PATH),
                delphes_suffix: "delphesstep".to_string(),
                dry_run: false,
                wait: false,
                no_merge: false,
                config: None,
                output_dir: None,
                log_level: None,
            },
        }
    }

    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.args.base_path = path.into();
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.args.output_dir = Some(path.into());
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.args.dry_run = true;
        self
    }

    pub fn wait(mut self) -> Self {
        self.args.wait = true;
        self
    }

    pub fn no_merge(mut self) -> Self {
        self.args.no_merge = true;
        self
    }

    pub fn build(self) -> CliArgs {
        self.args
    }
}

/// `n` input files named `events_<i>.root` under `dir`.
pub fn input_files(dir: &Path, n: usize) -> Vec<InputFile> {
    (0..n)
        .map(|index| InputFile {
            index,
            path: dir.join(format!("events_{index}.root")),
        })
        .collect()
}

/// A minimal template with an executable and arguments.
pub fn template(name: &str, executable: &str, arguments: &str) -> Arc<JobTemplate> {
    Arc::new(
        JobTemplate::new(name)
            .with("executable", executable)
            .with("arguments", arguments),
    )
}

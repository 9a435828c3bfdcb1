// tests/integration/config_errors.rs

use std::io::Write;

use dagsubmit::config::{load_and_validate, load_or_default};
use dagsubmit::errors::DagSubmitError;
use tempfile::NamedTempFile;

#[test]
fn unknown_placeholder_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[process]
arguments = "$(input_file) $(tag)"
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(DagSubmitError::Config(msg)) => {
            assert!(msg.contains("[process]"), "{msg}");
            assert!(msg.contains("tag"), "{msg}");
        }
        Err(e) => panic!("Expected Config error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn empty_executable_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[merge]
executable = "  "
"#
    )
    .unwrap();

    let result = load_and_validate(file.path());
    assert!(
        matches!(
            result,
            Err(DagSubmitError::Config(ref msg)) if msg.contains("[merge].executable")
        ),
        "got {result:?}"
    );
}

#[test]
fn bad_glob_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[workflow]
input_pattern = "*.root[" 
"#
    )
    .unwrap();

    assert!(matches!(
        load_and_validate(file.path()),
        Err(DagSubmitError::Config(_))
    ));
}

#[test]
fn invalid_toml_returns_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[workflow\nmerge = true").unwrap();

    assert!(matches!(
        load_and_validate(file.path()),
        Err(DagSubmitError::Toml(_))
    ));
}

#[test]
fn explicit_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_or_default(Some(&dir.path().join("Dagsubmit.toml")));
    assert!(matches!(result, Err(DagSubmitError::Io(_))));
}

#[test]
fn partial_sections_keep_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[workflow]
merge = false
output_pattern = "{{stem}}-{{index}}.skim.root"

[scheduler]
submit = "/opt/condor/bin/condor_submit"

[process]
executable = "run.sh"

[process.attributes]
request_memory = "2GB"
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert!(!cfg.workflow.merge);
    assert_eq!(cfg.workflow.input_pattern, "*.root*");
    assert_eq!(cfg.scheduler.submit, "/opt/condor/bin/condor_submit");
    assert_eq!(cfg.scheduler.release, "condor_release");
    assert_eq!(cfg.process.executable(), Some("run.sh"));
    assert_eq!(cfg.process.get("arguments"), Some("$(dataset) $(input_file) $(index)"));
    assert_eq!(cfg.process.get("request_memory"), Some("2GB"));
    assert_eq!(cfg.process.get("+ProjectName"), Some("\"snowmass21.energy\""));
}

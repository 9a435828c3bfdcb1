// src/errors.rs

//! Crate-wide error type.
//!
//! Every stage of the pipeline reports failures through [`DagSubmitError`];
//! nothing is retried or silently recovered.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DagSubmitError {
    /// Empty or otherwise invalid inputs to layer construction.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate layers, unknown edge endpoints, cycles.
    #[error("Graph error: {0}")]
    Graph(String),

    /// Unresolved placeholders or failures writing the DAG directory.
    #[error("Compilation error: {0}")]
    Compilation(String),

    /// The scheduler rejected the transaction.
    #[error("Submission error: {0}")]
    Submission(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown dataset; carries the names that do exist.
    #[error("Dataset not found: '{name}' (valid datasets: {})", .valid.join(", "))]
    NotFound { name: String, valid: Vec<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DagSubmitError>;

//! Error types for ykubeedit
//!
//! Only directory-level, configuration and prompt failures surface as
//! [`KubeEditError`]. Per-file and per-resource failures are carried as values
//! inside scan reports and batch results so one bad manifest never stops a run.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-level error returned by command entry points
#[derive(Debug, Error)]
pub enum KubeEditError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The interactive prompt could not be rendered (no TTY, terminal I/O failure)
    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Fatal failures while enumerating the manifest tree
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Cannot read directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Failures loading or saving one manifest file
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize YAML for {path}: {message}")]
    Emit { path: PathBuf, message: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures applying a change to a single resource
#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("{kind} {name} not found in {path}")]
    ResourceNotFound {
        kind: String,
        name: String,
        path: PathBuf,
    },

    #[error("{kind} {name} cannot be edited: {violations}")]
    InvalidStructure {
        kind: String,
        name: String,
        violations: String,
    },
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    ParsingFailed { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, KubeEditError>;

//! Error types for schema directory loading, object files and persistence.
//!
//! Provides a unified error type covering I/O, serialization, schema
//! compilation, submission loading, transport decoding and record lookup.

use std::path::PathBuf;

use mlspec_core::{CompileError, LoadError, TransportError};
use thiserror::Error;

/// Errors that can occur during loader and store operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A schema definition failed to compile.
    #[error("schema compile error: {0}")]
    CompileError(#[from] CompileError),

    /// A submission could not be validated at all.
    #[error("load error: {0}")]
    LoadError(#[from] LoadError),

    /// The transport encoding could not be decoded.
    #[error("transport error: {0}")]
    TransportError(#[from] TransportError),

    /// A schema directory contained no candidate files.
    #[error("no schema files found in {}", .0.display())]
    NoCandidateFiles(PathBuf),

    /// A schema file lacks the entries needed to name and load it.
    #[error("schema file is missing required entries: {}", .0.join(", "))]
    MissingSchemaEntries(Vec<&'static str>),

    /// A store has no record with the given id.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// Loader configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results with [`DatabaseError`].
pub type Result<T> = std::result::Result<T, DatabaseError>;

//! Error types for schema compilation, registry lookup and submission loading.
//!
//! Compile-time errors ([`CompileError`]) are raised while turning a schema
//! definition into a registered schema and always prevent registration.
//! Per-field submission problems are not errors in this sense; they are
//! accumulated into a [`ValidationErrorReport`](crate::ValidationErrorReport).
//! [`LoadError`] covers the failures that stop a validation call outright.

use thiserror::Error;

use crate::constraint::ConstraintError;
use crate::types::UnknownTypeError;

/// Errors raised while compiling a schema definition.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The definition text is not valid YAML.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The definition (or a nested `schema`) is not a mapping.
    #[error("schema definition must be a mapping of field names to field specs")]
    NotAMapping,

    /// A meta entry needed to name the schema is missing.
    #[error("schema definition has no '{0}.meta' entry")]
    MissingMeta(&'static str),

    /// A field has no spec mapping at all (usually an indentation error).
    #[error("field '{field}' has no attributes; could it be an indentation error?")]
    MalformedField { field: String },

    /// A field spec has no `type` key.
    #[error("field '{field}' does not declare a type")]
    MissingType { field: String },

    /// A field names a type outside the fixed set.
    #[error("field '{field}': {source}")]
    UnknownType {
        field: String,
        source: UnknownTypeError,
    },

    /// `required` or `empty` is not a boolean.
    #[error("field '{field}': '{key}' must be a boolean, got '{value}'")]
    InvalidFlag {
        field: String,
        key: &'static str,
        value: String,
    },

    /// `allowed` is not a list of scalars.
    #[error("field '{field}': 'allowed' must be a list of scalar values")]
    InvalidAllowed { field: String },

    /// `regex` does not compile.
    #[error("field '{field}': the regex '{pattern}' does not appear to be a valid regex: {source}")]
    InvalidRegex {
        field: String,
        pattern: String,
        source: regex::Error,
    },

    /// A constraint was attached to a non-numeric field.
    #[error("field '{field}': constraints are only supported on int and float fields, not '{field_type}'")]
    InvalidConstraintTarget { field: String, field_type: String },

    /// The constraint expression was rejected.
    #[error("field '{field}': {source}")]
    InvalidConstraint {
        field: String,
        source: ConstraintError,
    },

    /// A `nested` field has no inline `schema` mapping.
    #[error("nested field '{field}' has no 'schema' mapping")]
    NestedWithoutSchema { field: String },

    /// The declared base schema is not registered yet.
    #[error("base schema '{base}' is not registered; it must be compiled before '{schema}'")]
    BaseSchemaNotFound { base: String, schema: String },

    /// Two schemas produced by one compile would share a name.
    #[error("schema name '{0}' is produced more than once by one definition")]
    DuplicateSchemaName(String),
}

/// Registry lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("schema '{0}' is not registered")]
    NotFound(String),
}

/// Failures that stop a validation call before any field is checked, or
/// while resolving a nested schema.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The submission text is not valid YAML.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The submission is not a mapping.
    #[error("submission must be a mapping of field names to values")]
    NotAMapping,

    /// No explicit schema was given and the submission lacks
    /// `schema_version`/`schema_type`.
    #[error(
        "not enough information to determine a schema name: submission needs 'schema_version' and 'schema_type'"
    )]
    SchemaNameUndetermined,

    /// The target schema or a nested sub-schema is not registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Failures encoding or decoding the transport form of an object.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded content is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Failures building an [`ObjectDraft`](crate::ObjectDraft).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("'{0}' is not a valid semantic version")]
    InvalidVersion(String),

    #[error("schema '{schema}' has no field '{path}'")]
    UnknownField { schema: String, path: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

//! Submission validation.
//!
//! [`Validator`] checks a raw submission against a registered schema, field
//! by field, and either produces a [`ValidatedObject`] or a
//! [`ValidationErrorReport`]. Every field is checked even after an earlier
//! one fails, so the report lists all problems at once, keyed by dotted
//! field path (`connection.endpoint`).
//!
//! Calls that cannot start (bad YAML, a non-mapping submission, an unknown
//! schema name, or a missing nested sub-schema) fail with [`LoadError`]
//! instead.
//!
//! # Example
//!
//! ```
//! use mlspec_core::*;
//!
//! let registry = SchemaRegistry::new();
//! registry
//!     .compiler()
//!     .compile_str(
//!         "mlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: base\nschema_version:\n  type: semver\nschema_type:\n  type: string\nrun_id:\n  type: uuid\n  required: True\n",
//!         None,
//!     )
//!     .unwrap();
//!
//! let loaded = registry
//!     .validator()
//!     .load("schema_version: 0.0.1\nschema_type: base\nrun_id: not-a-uuid\n")
//!     .unwrap();
//! assert!(loaded.object.is_none());
//! assert_eq!(loaded.errors.messages("run_id"), vec!["'not-a-uuid' is not a valid UUID."]);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::error::LoadError;
use crate::object::ValidatedObject;
use crate::registry::SchemaRegistry;
use crate::schema::{FieldKind, Schema};
use crate::types::{CoercionError, Value, cast_to_string};

/// Submission key that names the target schema directly.
pub const SCHEMA_NAME_KEY: &str = "schema_name";

/// Problem with a single field of a submission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// A required field is absent.
    #[error("Missing data for required field.")]
    Missing,
    /// A non-nullable field is explicitly null.
    #[error("Field may not be null.")]
    Null,
    /// The submission has a field the schema does not declare.
    #[error("Unknown field.")]
    Unknown,
    /// A nested field's value is not a mapping.
    #[error("Not a valid mapping type.")]
    NotAMapping,
    /// The value failed type coercion, `allowed`, `regex` or `constraint`.
    #[error(transparent)]
    Malformed(#[from] CoercionError),
}

impl FieldError {
    /// `true` for missing and null-on-required errors.
    pub fn is_presence_error(&self) -> bool {
        matches!(self, FieldError::Missing | FieldError::Null)
    }
}

/// Per-field errors from one validation call, keyed by dotted path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrorReport {
    errors: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, error: FieldError) {
        self.errors.entry(path.into()).or_default().push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failing field paths.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, path: &str) -> Option<&[FieldError]> {
        self.errors.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.errors.contains_key(path)
    }

    /// Rendered messages for one path; empty if the path has no errors.
    pub fn messages(&self, path: &str) -> Vec<String> {
        self.get(path)
            .map(|errors| errors.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Failing paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldError])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for ValidationErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, errors) in &self.errors {
            if !first {
                writeln!(f)?;
            }
            first = false;
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            write!(f, "{path}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrorReport {}

impl Serialize for ValidationErrorReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.errors.len()))?;
        for (path, errors) in &self.errors {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            map.serialize_entry(path, &messages)?;
        }
        map.end()
    }
}

/// Result of a validation call: exactly one of `object` or a non-empty
/// `errors` is meaningful.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub object: Option<ValidatedObject>,
    pub errors: ValidationErrorReport,
}

impl Loaded {
    pub fn is_valid(&self) -> bool {
        self.object.is_some()
    }

    pub fn into_result(self) -> Result<ValidatedObject, ValidationErrorReport> {
        self.object.ok_or(self.errors)
    }
}

/// Handling of submission keys the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFields {
    /// Report each as a [`FieldError::Unknown`].
    #[default]
    Raise,
    /// Drop them silently.
    Exclude,
}

/// Raw submission input.
#[derive(Debug, Clone)]
pub enum Submission {
    /// YAML (or JSON) text.
    Text(String),
    /// An already-parsed value.
    Value(Value),
}

impl Submission {
    fn into_value(self) -> Result<Value, LoadError> {
        match self {
            Submission::Text(text) => {
                let yaml: serde_yaml::Value = serde_yaml::from_str(&text)?;
                Ok(Value::from(yaml))
            }
            Submission::Value(value) => Ok(value),
        }
    }
}

impl From<&str> for Submission {
    fn from(text: &str) -> Self {
        Submission::Text(text.to_string())
    }
}

impl From<String> for Submission {
    fn from(text: String) -> Self {
        Submission::Text(text)
    }
}

impl From<&String> for Submission {
    fn from(text: &String) -> Self {
        Submission::Text(text.clone())
    }
}

impl From<Value> for Submission {
    fn from(value: Value) -> Self {
        Submission::Value(value)
    }
}

impl From<serde_yaml::Value> for Submission {
    fn from(value: serde_yaml::Value) -> Self {
        Submission::Value(value.into())
    }
}

impl From<serde_json::Value> for Submission {
    fn from(value: serde_json::Value) -> Self {
        Submission::Value(value.into())
    }
}

/// Which schema to validate against.
#[derive(Debug, Clone)]
pub enum SchemaTarget<'a> {
    /// A registered name.
    Name(&'a str),
    /// A schema already in hand.
    Schema(Arc<Schema>),
}

impl<'a> From<&'a str> for SchemaTarget<'a> {
    fn from(name: &'a str) -> Self {
        SchemaTarget::Name(name)
    }
}

impl From<Arc<Schema>> for SchemaTarget<'_> {
    fn from(schema: Arc<Schema>) -> Self {
        SchemaTarget::Schema(schema)
    }
}

impl From<&Arc<Schema>> for SchemaTarget<'_> {
    fn from(schema: &Arc<Schema>) -> Self {
        SchemaTarget::Schema(Arc::clone(schema))
    }
}

/// Validates submissions against schemas in a [`SchemaRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct Validator<'r> {
    registry: &'r SchemaRegistry,
    unknown: UnknownFields,
}

impl<'r> Validator<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            unknown: UnknownFields::default(),
        }
    }

    /// Sets how undeclared submission keys are handled.
    pub fn unknown_fields(mut self, unknown: UnknownFields) -> Self {
        self.unknown = unknown;
        self
    }

    /// Validates, deriving the schema from the submission's
    /// `schema_version` and `schema_type`.
    pub fn load(&self, submission: impl Into<Submission>) -> Result<Loaded, LoadError> {
        self.validate_and_load(None, submission)
    }

    /// Validates against an explicit schema.
    pub fn load_as<'a>(
        &self,
        target: impl Into<SchemaTarget<'a>>,
        submission: impl Into<Submission>,
    ) -> Result<Loaded, LoadError> {
        self.validate_and_load(Some(target.into()), submission)
    }

    /// Validates a submission.
    ///
    /// An explicit `target` takes precedence. Otherwise a `schema_name` key
    /// in the submission is used verbatim, and failing that the name is
    /// built from the submission's `schema_version` and `schema_type`. A
    /// routing `schema_name` key the schema does not declare is dropped
    /// before validation.
    pub fn validate_and_load(
        &self,
        target: Option<SchemaTarget<'_>>,
        submission: impl Into<Submission>,
    ) -> Result<Loaded, LoadError> {
        let Value::Map(mut raw) = submission.into().into_value()? else {
            return Err(LoadError::NotAMapping);
        };

        let schema = match target {
            Some(SchemaTarget::Name(name)) => self.registry.lookup(name)?,
            Some(SchemaTarget::Schema(schema)) => schema,
            None => {
                let schema = self.registry.lookup(&self.derive_name(&raw)?)?;
                if schema.field(SCHEMA_NAME_KEY).is_none() {
                    raw.remove(SCHEMA_NAME_KEY);
                }
                schema
            }
        };

        let mut errors = ValidationErrorReport::new();
        let fields = self.validate_map(&schema, &raw, "", &mut errors)?;

        debug!(
            schema = %schema.name(),
            errors = errors.len(),
            "Validated submission"
        );

        let object = errors
            .is_empty()
            .then(|| ValidatedObject::new(schema.name(), schema.version().map(str::to_string), fields));
        Ok(Loaded { object, errors })
    }

    fn derive_name(&self, raw: &BTreeMap<String, Value>) -> Result<String, LoadError> {
        let field = |key: &str| {
            raw.get(key)
                .filter(|v| !v.is_null())
                .and_then(|v| cast_to_string(v).ok())
        };
        if let Some(name) = field(SCHEMA_NAME_KEY) {
            return Ok(name);
        }
        match (field("schema_version"), field("schema_type")) {
            (Some(version), Some(schema_type)) => {
                Ok(self.registry.canonical_name(&version, &schema_type))
            }
            _ => Err(LoadError::SchemaNameUndetermined),
        }
    }

    fn validate_map(
        &self,
        schema: &Schema,
        raw: &BTreeMap<String, Value>,
        prefix: &str,
        errors: &mut ValidationErrorReport,
    ) -> Result<BTreeMap<String, Value>, LoadError> {
        let mut out = BTreeMap::new();

        for field in schema.fields() {
            let path = join_path(prefix, field.name());
            let value = match raw.get(field.name()) {
                None => {
                    if field.is_required() {
                        errors.push(path, FieldError::Missing);
                    }
                    continue;
                }
                Some(Value::Null) => {
                    if field.is_nullable() {
                        out.insert(field.name().to_string(), Value::Null);
                    } else {
                        errors.push(path, FieldError::Null);
                    }
                    continue;
                }
                Some(value) => value,
            };

            match field.kind() {
                FieldKind::Scalar(coercer) => match coercer.coerce(value) {
                    Ok(typed) => {
                        out.insert(field.name().to_string(), typed);
                    }
                    Err(error) => errors.push(path, FieldError::Malformed(error)),
                },
                FieldKind::Nested { schema: sub_name } => {
                    let sub = self.registry.lookup(sub_name)?;
                    match value {
                        Value::Map(inner) => {
                            let nested = self.validate_map(&sub, inner, &path, errors)?;
                            out.insert(field.name().to_string(), Value::Map(nested));
                        }
                        _ => errors.push(path, FieldError::NotAMapping),
                    }
                }
            }
        }

        if self.unknown == UnknownFields::Raise {
            for key in raw.keys() {
                if schema.field(key).is_none() {
                    errors.push(join_path(prefix, key), FieldError::Unknown);
                }
            }
        }

        Ok(out)
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

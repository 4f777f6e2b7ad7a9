//! Declarative schema definitions.
//!
//! A definition is a YAML mapping from field name to field spec. Entries
//! whose spec contains a `meta` key describe the schema itself rather than a
//! field; three of them are recognised:
//!
//! ```yaml
//! mlspec_schema_version:
//!   meta: 0.0.1
//! mlspec_schema_type:
//!   meta: datapath
//! mlspec_base_type:          # optional, single-level inheritance
//!   meta: base
//!
//! data_store:
//!   type: string
//!   required: True
//! connection:
//!   type: nested
//!   schema:
//!     endpoint:
//!       type: URI
//!       required: True
//! ```
//!
//! Parsing checks the shape of every field spec (missing spec, missing type,
//! non-boolean flags, malformed `allowed`, nested field without `schema`)
//! but does not resolve types; that is the compiler's job.

use serde_yaml::{Mapping, Value as Yaml};

use crate::error::CompileError;
use crate::types::parse_bool;

/// Meta entry naming the schema version.
pub const SCHEMA_VERSION_META: &str = "mlspec_schema_version";
/// Meta entry naming the schema type.
pub const SCHEMA_TYPE_META: &str = "mlspec_schema_type";
/// Meta entry naming the base schema type to inherit from.
pub const BASE_TYPE_META: &str = "mlspec_base_type";
/// Type key marking an inline sub-schema.
pub const NESTED_TYPE: &str = "nested";

/// A parsed, not yet compiled schema definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDefinition {
    /// `mlspec_schema_version.meta`
    pub schema_version: Option<String>,
    /// `mlspec_schema_type.meta`
    pub schema_type: Option<String>,
    /// `mlspec_base_type.meta`
    pub base_type: Option<String>,
    /// Field specs in definition order.
    pub fields: Vec<(String, FieldSpec)>,
}

/// One field of a [`SchemaDefinition`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSpec {
    /// Raw `type` key, resolved by the compiler.
    pub type_name: String,
    /// `required` flag (defaults to `false`).
    pub required: bool,
    /// `empty` flag; `None` when not given.
    pub empty: Option<bool>,
    /// Enumerated allowed values.
    pub allowed: Option<Vec<String>>,
    /// Regex the value must match.
    pub regex: Option<String>,
    /// Numeric constraint expression.
    pub constraint: Option<String>,
    /// Inline sub-schema for `nested` fields.
    pub schema: Option<SchemaDefinition>,
}

impl FieldSpec {
    /// Returns `true` when the field declares an inline sub-schema.
    pub fn is_nested(&self) -> bool {
        self.type_name.trim().eq_ignore_ascii_case(NESTED_TYPE)
    }
}

impl SchemaDefinition {
    /// Parses a definition from YAML text.
    ///
    /// # Examples
    ///
    /// ```
    /// use mlspec_core::SchemaDefinition;
    ///
    /// let def = SchemaDefinition::from_yaml(
    ///     "mlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: base\nrun_id:\n  type: uuid\n  required: True\n",
    /// )
    /// .unwrap();
    /// assert_eq!(def.schema_version.as_deref(), Some("0.0.1"));
    /// assert_eq!(def.fields.len(), 1);
    /// assert!(def.fields[0].1.required);
    /// ```
    pub fn from_yaml(text: &str) -> Result<Self, CompileError> {
        let value: Yaml = serde_yaml::from_str(text)?;
        Self::from_value(value)
    }

    /// Parses a definition from an already-loaded YAML value.
    pub fn from_value(value: Yaml) -> Result<Self, CompileError> {
        match value {
            Yaml::Mapping(mapping) => parse_definition(mapping, ""),
            _ => Err(CompileError::NotAMapping),
        }
    }

    /// Looks up a field spec by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, spec)| spec)
    }

    /// Returns the names of the minimum entries a schema file must carry
    /// that are absent from `value`.
    ///
    /// A loadable schema file needs `mlspec_schema_version.meta`,
    /// `mlspec_schema_type.meta`, and `schema_version` / `schema_type`
    /// fields. An empty result means the file has all of them.
    pub fn missing_minimum_fields(value: &Yaml) -> Vec<&'static str> {
        let Yaml::Mapping(mapping) = value else {
            return vec![
                "mlspec_schema_version.meta",
                "mlspec_schema_type.meta",
                "schema_version",
                "schema_type",
            ];
        };

        let has_meta = |key: &str| {
            mapping
                .get(key)
                .and_then(Yaml::as_mapping)
                .is_some_and(|m| m.contains_key("meta"))
        };

        let mut missing = Vec::new();
        if !has_meta(SCHEMA_VERSION_META) {
            missing.push("mlspec_schema_version.meta");
        }
        if !has_meta(SCHEMA_TYPE_META) {
            missing.push("mlspec_schema_type.meta");
        }
        if !mapping.contains_key("schema_version") {
            missing.push("schema_version");
        }
        if !mapping.contains_key("schema_type") {
            missing.push("schema_type");
        }
        missing
    }
}

fn parse_definition(mapping: Mapping, prefix: &str) -> Result<SchemaDefinition, CompileError> {
    let mut definition = SchemaDefinition::default();

    for (key, value) in mapping {
        let name = scalar_to_string(&key).ok_or(CompileError::NotAMapping)?;
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };

        let spec = match value {
            Yaml::Mapping(spec) => spec,
            _ => return Err(CompileError::MalformedField { field: path }),
        };

        if let Some(meta) = spec.get("meta") {
            let meta = scalar_to_string(meta);
            match name.as_str() {
                SCHEMA_VERSION_META => definition.schema_version = meta,
                SCHEMA_TYPE_META => definition.schema_type = meta,
                BASE_TYPE_META => definition.base_type = meta,
                _ => {}
            }
            continue;
        }

        let field = parse_field(spec, &path)?;
        definition.fields.push((name, field));
    }

    Ok(definition)
}

fn parse_field(spec: Mapping, path: &str) -> Result<FieldSpec, CompileError> {
    let type_name = match spec.get("type") {
        None | Some(Yaml::Null) => {
            return Err(CompileError::MissingType {
                field: path.to_string(),
            });
        }
        Some(value) => scalar_to_string(value).ok_or_else(|| CompileError::MalformedField {
            field: path.to_string(),
        })?,
    };

    let mut field = FieldSpec {
        type_name,
        required: parse_flag(&spec, "required", path)?.unwrap_or(false),
        empty: parse_flag(&spec, "empty", path)?,
        ..FieldSpec::default()
    };

    if let Some(allowed) = spec.get("allowed") {
        let invalid = || CompileError::InvalidAllowed {
            field: path.to_string(),
        };
        let items = allowed.as_sequence().ok_or_else(invalid)?;
        field.allowed = Some(
            items
                .iter()
                .map(|item| scalar_to_string(item).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()?,
        );
    }

    field.regex = spec.get("regex").and_then(scalar_to_string);
    field.constraint = spec.get("constraint").and_then(scalar_to_string);

    if field.is_nested() {
        match spec.get("schema") {
            Some(Yaml::Mapping(inner)) => {
                field.schema = Some(parse_definition(inner.clone(), path)?);
            }
            Some(Yaml::Null) | None => {
                return Err(CompileError::NestedWithoutSchema {
                    field: path.to_string(),
                });
            }
            Some(_) => return Err(CompileError::NotAMapping),
        }
    }

    Ok(field)
}

fn parse_flag(spec: &Mapping, key: &'static str, path: &str) -> Result<Option<bool>, CompileError> {
    let Some(value) = spec.get(key) else {
        return Ok(None);
    };
    let parsed = match value {
        Yaml::Bool(b) => Some(*b),
        other => scalar_to_string(other).and_then(|s| parse_bool(&s)),
    };
    parsed.map(Some).ok_or_else(|| CompileError::InvalidFlag {
        field: path.to_string(),
        key,
        value: scalar_to_string(value).unwrap_or_else(|| format!("{value:?}")),
    })
}

fn scalar_to_string(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Tagged(tagged) => scalar_to_string(&tagged.value),
        Yaml::Null | Yaml::Sequence(_) | Yaml::Mapping(_) => None,
    }
}

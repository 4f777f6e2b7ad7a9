//! Compiled schemas and canonical schema naming.
//!
//! A [`Schema`] is the immutable result of compiling a
//! [`SchemaDefinition`](crate::SchemaDefinition): a name plus an ordered map
//! of resolved [`Field`]s. Nested fields refer to their sub-schema by name;
//! the sub-schema itself lives in the same
//! [`SchemaRegistry`](crate::SchemaRegistry).

use std::collections::BTreeMap;

use crate::types::FieldCoercer;

/// Builds the canonical registry name for a schema.
///
/// The version has `-` and `.` replaced by `_`, the type is lower-cased,
/// and an optional prefix is prepended with an underscore separator.
///
/// # Examples
///
/// ```
/// use mlspec_core::canonical_name;
///
/// assert_eq!(canonical_name("0.0.1", "datapath", None), "0_0_1_datapath");
/// assert_eq!(canonical_name("1.0.0-rc.1", "Base", None), "1_0_0_rc_1_base");
/// assert_eq!(canonical_name("0.0.1", "base", Some("acme")), "acme_0_0_1_base");
/// ```
pub fn canonical_name(version: &str, schema_type: &str, prefix: Option<&str>) -> String {
    let version = version.trim().replace(['-', '.'], "_");
    let schema_type = schema_type.trim().to_lowercase();
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}_{version}_{schema_type}"),
        _ => format!("{version}_{schema_type}"),
    }
}

/// Builds the registry name of a nested field's sub-schema.
///
/// # Examples
///
/// ```
/// use mlspec_core::sub_schema_name;
///
/// assert_eq!(sub_schema_name("0_0_1_datapath", "Connection"), "0_0_1_datapath_connection");
/// ```
pub fn sub_schema_name(parent: &str, field: &str) -> String {
    format!("{parent}_{}", field.to_lowercase())
}

/// How a field's value is checked.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A scalar or list value checked by a coercer.
    Scalar(FieldCoercer),
    /// A mapping validated against the named sub-schema.
    Nested { schema: String },
}

/// A resolved field of a compiled schema.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: FieldKind,
    required: bool,
    nullable: bool,
    inherited_from: Option<String>,
}

impl Field {
    /// Creates a field. A required field is never nullable.
    pub fn new(name: impl Into<String>, kind: FieldKind, required: bool, nullable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            nullable: nullable && !required,
            inherited_from: None,
        }
    }

    /// Marks the field as carried over from the named base schema.
    pub fn inherited(mut self, base: impl Into<String>) -> Self {
        self.inherited_from = Some(base.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether an explicit null is accepted.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Name of the base schema this field came from, if inherited.
    pub fn inherited_from(&self) -> Option<&str> {
        self.inherited_from.as_deref()
    }

    /// Sub-schema name for nested fields.
    pub fn nested_schema(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Nested { schema } => Some(schema),
            FieldKind::Scalar(_) => None,
        }
    }
}

/// An immutable compiled schema.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    version: Option<String>,
    schema_type: Option<String>,
    base_type: Option<String>,
    fields: BTreeMap<String, Field>,
}

impl Schema {
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        schema_type: Option<String>,
        base_type: Option<String>,
        fields: BTreeMap<String, Field>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            schema_type,
            base_type,
            fields,
        }
    }

    /// Registry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn schema_type(&self) -> Option<&str> {
        self.schema_type.as_deref()
    }

    pub fn base_type(&self) -> Option<&str> {
        self.base_type.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    #[test]
    fn test_canonical_name_normalizes_version_and_type() {
        assert_eq!(canonical_name("0.0.1", "DataPath", None), "0_0_1_datapath");
        assert_eq!(canonical_name(" 2.1.0-beta ", " base ", None), "2_1_0_beta_base");
        assert_eq!(canonical_name("0.0.1", "base", Some("")), "0_0_1_base");
    }

    #[test]
    fn test_required_field_is_never_nullable() {
        let field = Field::new(
            "run_id",
            FieldKind::Scalar(FieldCoercer::new(FieldType::Uuid)),
            true,
            true,
        );
        assert!(field.is_required());
        assert!(!field.is_nullable());
    }

    #[test]
    fn test_nested_schema_accessor() {
        let field = Field::new(
            "connection",
            FieldKind::Nested {
                schema: "0_0_1_datapath_connection".into(),
            },
            false,
            true,
        );
        assert_eq!(field.nested_schema(), Some("0_0_1_datapath_connection"));
        assert_eq!(field.inherited_from(), None);
        assert_eq!(field.inherited("0_0_1_base").inherited_from(), Some("0_0_1_base"));
    }
}

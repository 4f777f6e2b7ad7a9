//! Schema compilation.
//!
//! [`SchemaCompiler`] turns a [`SchemaDefinition`] into a registered
//! [`Schema`]. Compilation is staged: the top-level schema and every inline
//! nested schema are built first, and only when all of them compile are they
//! inserted into the registry in one step. A definition that fails leaves the
//! registry untouched.
//!
//! Field resolution rules:
//!
//! - `allowed` or `regex` reduce the effective type to `string`; `allowed`
//!   wins when both are present.
//! - `constraint` is only accepted on an effective `int` or `float` field.
//! - A field is nullable unless it is required or declares `empty: false`.
//! - With `mlspec_base_type`, every field of the base schema is inherited and
//!   the derived definition's own fields shadow them.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::constraint::Constraint;
use crate::definition::{FieldSpec, SCHEMA_TYPE_META, SCHEMA_VERSION_META, SchemaDefinition};
use crate::error::CompileError;
use crate::merge::merge_inherited;
use crate::registry::SchemaRegistry;
use crate::schema::{Field, FieldKind, Schema, sub_schema_name};
use crate::types::{FieldCoercer, FieldType};

/// Compiles definitions into a [`SchemaRegistry`].
///
/// # Examples
///
/// ```
/// use mlspec_core::*;
///
/// let registry = SchemaRegistry::new();
/// let schema = registry
///     .compiler()
///     .compile_str(
///         "mlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: base\nrun_id:\n  type: uuid\n  required: True\n",
///         None,
///     )
///     .unwrap();
///
/// assert_eq!(schema.name(), "0_0_1_base");
/// assert!(registry.contains("0_0_1_base"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SchemaCompiler<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> SchemaCompiler<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Parses and compiles YAML definition text.
    pub fn compile_str(&self, text: &str, name: Option<&str>) -> Result<Arc<Schema>, CompileError> {
        let definition = SchemaDefinition::from_yaml(text)?;
        self.compile(&definition, name)
    }

    /// Compiles a definition and registers it with its nested schemas.
    ///
    /// When `name` is `None` the canonical name is built from the
    /// definition's version and type meta entries. If a schema with the
    /// resulting name is already registered, the resident schema is
    /// returned and nothing is replaced.
    pub fn compile(
        &self,
        definition: &SchemaDefinition,
        name: Option<&str>,
    ) -> Result<Arc<Schema>, CompileError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.name_for(definition)?,
        };
        if let Ok(existing) = self.registry.lookup(&name) {
            debug!(schema = %name, "Schema already registered, keeping resident definition");
            return Ok(existing);
        }

        let (nested, top) = self.stage_parts(definition, name)?;
        let count = nested.len() + 1;
        let registration = self.registry.register_group(nested, top);

        debug!(schemas = count, "Registered compiled schemas");
        Ok(registration.into_schema())
    }

    /// Compiles a definition without registering anything.
    ///
    /// Returns every schema the definition produces, nested sub-schemas
    /// first and the top-level schema last.
    pub fn stage(
        &self,
        definition: &SchemaDefinition,
        name: Option<&str>,
    ) -> Result<Vec<Schema>, CompileError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.name_for(definition)?,
        };
        let (mut staged, top) = self.stage_parts(definition, name)?;
        staged.push(top);
        Ok(staged)
    }

    /// Compiles the nested sub-schemas and the top-level schema separately.
    fn stage_parts(
        &self,
        definition: &SchemaDefinition,
        name: String,
    ) -> Result<(Vec<Schema>, Schema), CompileError> {
        let (base, inherited) = self.resolve_base(definition, &name)?;

        let mut staged = Vec::new();
        let own = self.compile_fields(definition, &name, &mut staged)?;
        let fields = match &inherited {
            Some(base_schema) => merge_inherited(base_schema, own),
            None => own,
        };

        debug!(
            schema = %name,
            base = ?base,
            fields = fields.len(),
            nested = staged.len(),
            "Compiled schema"
        );

        let top = Schema::new(
            name,
            definition.schema_version.clone(),
            definition.schema_type.clone(),
            definition.base_type.clone(),
            fields,
        );

        let mut seen = HashSet::new();
        for schema in staged.iter().chain(std::iter::once(&top)) {
            if !seen.insert(schema.name()) {
                return Err(CompileError::DuplicateSchemaName(schema.name().to_string()));
            }
        }

        Ok((staged, top))
    }

    /// Canonical name for a definition, from its meta entries.
    pub fn name_for(&self, definition: &SchemaDefinition) -> Result<String, CompileError> {
        let version = definition
            .schema_version
            .as_deref()
            .ok_or(CompileError::MissingMeta(SCHEMA_VERSION_META))?;
        let schema_type = definition
            .schema_type
            .as_deref()
            .ok_or(CompileError::MissingMeta(SCHEMA_TYPE_META))?;
        Ok(self.registry.canonical_name(version, schema_type))
    }

    fn resolve_base(
        &self,
        definition: &SchemaDefinition,
        name: &str,
    ) -> Result<(Option<String>, Option<Arc<Schema>>), CompileError> {
        let Some(base_type) = definition.base_type.as_deref() else {
            return Ok((None, None));
        };
        let version = definition
            .schema_version
            .as_deref()
            .ok_or(CompileError::MissingMeta(SCHEMA_VERSION_META))?;

        let base_name = self.registry.canonical_name(version, base_type);
        let base = self
            .registry
            .lookup(&base_name)
            .map_err(|_| CompileError::BaseSchemaNotFound {
                base: base_name.clone(),
                schema: name.to_string(),
            })?;
        Ok((Some(base_name), Some(base)))
    }

    fn compile_fields(
        &self,
        definition: &SchemaDefinition,
        schema_name: &str,
        staged: &mut Vec<Schema>,
    ) -> Result<BTreeMap<String, Field>, CompileError> {
        let mut fields = BTreeMap::new();
        for (field_name, spec) in &definition.fields {
            let field = self.compile_field(definition, schema_name, field_name, spec, staged)?;
            fields.insert(field_name.clone(), field);
        }
        Ok(fields)
    }

    fn compile_field(
        &self,
        parent: &SchemaDefinition,
        schema_name: &str,
        field_name: &str,
        spec: &FieldSpec,
        staged: &mut Vec<Schema>,
    ) -> Result<Field, CompileError> {
        let nullable = !spec.required && spec.empty.unwrap_or(true);

        if spec.is_nested() {
            let inner = spec
                .schema
                .as_ref()
                .ok_or_else(|| CompileError::NestedWithoutSchema {
                    field: field_name.to_string(),
                })?;
            let sub_name = sub_schema_name(schema_name, field_name);

            let fields = self.compile_fields(inner, &sub_name, staged)?;
            debug!(schema = %sub_name, parent = %schema_name, "Staged nested schema");
            staged.push(Schema::new(
                sub_name.clone(),
                parent.schema_version.clone(),
                None,
                None,
                fields,
            ));

            return Ok(Field::new(
                field_name,
                FieldKind::Nested { schema: sub_name },
                spec.required,
                nullable,
            ));
        }

        let declared: FieldType =
            spec.type_name
                .parse()
                .map_err(|source| CompileError::UnknownType {
                    field: field_name.to_string(),
                    source,
                })?;

        let pattern = spec
            .regex
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| CompileError::InvalidRegex {
                    field: field_name.to_string(),
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;

        let effective = if spec.allowed.is_some() || pattern.is_some() {
            FieldType::String
        } else {
            declared
        };

        let mut coercer = FieldCoercer::new(effective);
        if let Some(allowed) = &spec.allowed {
            coercer = coercer.with_allowed(allowed.clone());
        } else if let Some(pattern) = pattern {
            coercer = coercer.with_pattern(pattern);
        }

        if let Some(expression) = spec.constraint.as_deref() {
            if !effective.is_numeric() {
                return Err(CompileError::InvalidConstraintTarget {
                    field: field_name.to_string(),
                    field_type: effective.name().to_string(),
                });
            }
            let constraint =
                Constraint::compile(expression).map_err(|source| CompileError::InvalidConstraint {
                    field: field_name.to_string(),
                    source,
                })?;
            coercer = coercer.with_constraint(constraint);
        }

        Ok(Field::new(
            field_name,
            FieldKind::Scalar(coercer),
            spec.required,
            nullable,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    const BASE: &str = r#"
mlspec_schema_version:
    meta: 0.0.1
mlspec_schema_type:
    meta: base
schema_version:
  type: semver
  required: True
schema_type:
  type: allowed_schema_types
  required: True
run_id:
  type: uuid
  required: True
"#;

    fn registry_with_base() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry.compiler().compile_str(BASE, None).unwrap();
        registry
    }

    #[test]
    fn test_allowed_and_regex_reduce_to_string() {
        let registry = SchemaRegistry::new();
        let schema = registry
            .compiler()
            .compile_str(
                "a:\n  type: int\n  allowed: [1, 2]\nb:\n  type: float\n  regex: '[a-z]+'\n",
                Some("mods"),
            )
            .unwrap();

        for name in ["a", "b"] {
            match schema.field(name).unwrap().kind() {
                FieldKind::Scalar(c) => assert_eq!(c.field_type(), FieldType::String),
                FieldKind::Nested { .. } => panic!("expected scalar"),
            }
        }
    }

    #[test]
    fn test_constraint_requires_numeric_field() {
        let registry = SchemaRegistry::new();
        let err = registry
            .compiler()
            .compile_str("a:\n  type: string\n  constraint: 'x > 1'\n", Some("c"))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidConstraintTarget { field, .. } if field == "a"));
        assert!(!registry.contains("c"));
    }

    #[test]
    fn test_constraint_on_allowed_int_is_rejected() {
        let registry = SchemaRegistry::new();
        let err = registry
            .compiler()
            .compile_str(
                "a:\n  type: int\n  allowed: [1, 2]\n  constraint: 'x > 1'\n",
                Some("c"),
            )
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidConstraintTarget { .. }));
    }

    #[test]
    fn test_bad_constraint_is_reported_with_field() {
        let registry = SchemaRegistry::new();
        let err = registry
            .compiler()
            .compile_str("a:\n  type: int\n  constraint: 'y > 1'\n", Some("c"))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidConstraint { field, .. } if field == "a"));
    }

    #[test]
    fn test_invalid_regex_fails_compile() {
        let registry = SchemaRegistry::new();
        let err = registry
            .compiler()
            .compile_str("a:\n  type: string\n  regex: '(unclosed'\n", Some("r"))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidRegex { .. }));
    }

    #[test]
    fn test_unknown_type() {
        let registry = SchemaRegistry::new();
        let err = registry
            .compiler()
            .compile_str("a:\n  type: tensor\n", Some("t"))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownType { field, .. } if field == "a"));
    }

    #[test]
    fn test_nullability_rules() {
        let registry = SchemaRegistry::new();
        let schema = registry
            .compiler()
            .compile_str(
                "a:\n  type: int\nb:\n  type: int\n  empty: false\nc:\n  type: int\n  required: true\n  empty: true\n",
                Some("n"),
            )
            .unwrap();
        assert!(schema.field("a").unwrap().is_nullable());
        assert!(!schema.field("b").unwrap().is_nullable());
        assert!(!schema.field("c").unwrap().is_nullable());
    }

    #[test]
    fn test_nested_schema_registered_under_derived_name() {
        let registry = SchemaRegistry::new();
        let schema = registry
            .compiler()
            .compile_str(
                "mlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: datapath\nConnection:\n  type: nested\n  schema:\n    endpoint:\n      type: URI\n      required: True\n",
                None,
            )
            .unwrap();

        assert_eq!(schema.name(), "0_0_1_datapath");
        assert!(Arc::ptr_eq(&schema, &registry.lookup("0_0_1_datapath").unwrap()));
        assert_eq!(
            schema.field("Connection").unwrap().nested_schema(),
            Some("0_0_1_datapath_connection")
        );
        let sub = registry.lookup("0_0_1_datapath_connection").unwrap();
        assert!(sub.field("endpoint").unwrap().is_required());

        let definition =
            SchemaDefinition::from_yaml("a:\n  type: nested\n  schema:\n    b:\n      type: int\n")
                .unwrap();
        let scratch = SchemaRegistry::new();
        let staged = scratch.compiler().stage(&definition, Some("top")).unwrap();
        assert!(scratch.is_empty());
        let names: Vec<&str> = staged.iter().map(Schema::name).collect();
        assert_eq!(names, vec!["top_a", "top"]);
    }

    #[test]
    fn test_failing_nested_field_registers_nothing() {
        let registry = SchemaRegistry::new();
        let err = registry
            .compiler()
            .compile_str(
                "conn:\n  type: nested\n  schema:\n    endpoint:\n      type: nope\n",
                Some("p"),
            )
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownType { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_inherits_base_fields() {
        let registry = registry_with_base();
        let schema = registry
            .compiler()
            .compile_str(
                "mlspec_base_type:\n  meta: base\nmlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: datapath\ndata_store:\n  type: string\n  required: True\n",
                None,
            )
            .unwrap();

        assert_eq!(schema.name(), "0_0_1_datapath");
        assert_eq!(schema.base_type(), Some("base"));
        let run_id = schema.field("run_id").unwrap();
        assert!(run_id.is_required());
        assert_eq!(run_id.inherited_from(), Some("0_0_1_base"));
        assert!(schema.field("data_store").is_some());
    }

    #[test]
    fn test_missing_base_fails() {
        let registry = SchemaRegistry::new();
        let err = registry
            .compiler()
            .compile_str(
                "mlspec_base_type:\n  meta: base\nmlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: datapath\n",
                None,
            )
            .unwrap_err();
        assert!(
            matches!(err, CompileError::BaseSchemaNotFound { base, schema } if base == "0_0_1_base" && schema == "0_0_1_datapath")
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_meta_without_explicit_name() {
        let registry = SchemaRegistry::new();
        let err = registry
            .compiler()
            .compile_str("a:\n  type: int\n", None)
            .unwrap_err();
        assert!(matches!(err, CompileError::MissingMeta(SCHEMA_VERSION_META)));
    }

    #[test]
    fn test_duplicate_staged_name() {
        let registry = SchemaRegistry::new();
        let err = registry
            .compiler()
            .compile_str(
                "x:\n  type: nested\n  schema:\n    y:\n      type: nested\n      schema:\n        a:\n          type: int\nx_y:\n  type: nested\n  schema:\n    b:\n      type: int\n",
                Some("t"),
            )
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateSchemaName(name) if name == "t_x_y"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_compile_is_idempotent() {
        let registry = registry_with_base();
        let first = registry.lookup("0_0_1_base").unwrap();
        let again = registry
            .compiler()
            .compile_str(&BASE.replace("run_id", "other_id"), None)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert!(again.field("other_id").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_explicit_name_wins_over_meta() {
        let registry = SchemaRegistry::new();
        let schema = registry.compiler().compile_str(BASE, Some("custom")).unwrap();
        assert_eq!(schema.name(), "custom");
        assert!(!registry.contains("0_0_1_base"));
    }
}

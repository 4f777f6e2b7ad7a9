//! Base-schema field inheritance.
//!
//! A derived schema starts from every field of its base and then applies its
//! own fields on top. The derived side always wins on a name collision, and
//! inherited nested fields keep pointing at the base's sub-schema.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use mlspec_core::*;
//!
//! let mut base_fields = BTreeMap::new();
//! base_fields.insert(
//!     "run_id".to_string(),
//!     Field::new("run_id", FieldKind::Scalar(FieldCoercer::new(FieldType::Uuid)), true, false),
//! );
//! let base = Schema::new("0_0_1_base", Some("0.0.1".into()), Some("base".into()), None, base_fields);
//!
//! let mut own = BTreeMap::new();
//! own.insert(
//!     "data_store".to_string(),
//!     Field::new("data_store", FieldKind::Scalar(FieldCoercer::new(FieldType::String)), true, false),
//! );
//!
//! let merged = merge_inherited(&base, own);
//! assert_eq!(merged.len(), 2);
//! assert_eq!(merged["run_id"].inherited_from(), Some("0_0_1_base"));
//! ```

use std::collections::BTreeMap;

use crate::schema::{Field, Schema};

/// Merges a base schema's fields under a derived schema's own fields.
///
/// Fields defined by the derived schema shadow inherited fields of the same
/// name. Inherited fields are tagged with the base schema's name.
pub fn merge_inherited(base: &Schema, own: BTreeMap<String, Field>) -> BTreeMap<String, Field> {
    let mut merged: BTreeMap<String, Field> = base
        .fields()
        .map(|field| {
            let origin = field.inherited_from().unwrap_or(base.name()).to_string();
            (field.name().to_string(), field.clone().inherited(origin))
        })
        .collect();

    for (name, field) in own {
        merged.insert(name, field);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;
    use crate::types::{FieldCoercer, FieldType};

    fn scalar(name: &str, field_type: FieldType, required: bool) -> Field {
        Field::new(name, FieldKind::Scalar(FieldCoercer::new(field_type)), required, !required)
    }

    fn base() -> Schema {
        let mut fields = BTreeMap::new();
        fields.insert("run_id".into(), scalar("run_id", FieldType::Uuid, true));
        fields.insert("note".into(), scalar("note", FieldType::String, false));
        fields.insert(
            "conn".into(),
            Field::new(
                "conn",
                FieldKind::Nested {
                    schema: "0_0_1_base_conn".into(),
                },
                false,
                true,
            ),
        );
        Schema::new("0_0_1_base", None, None, None, fields)
    }

    #[test]
    fn test_derived_field_shadows_inherited() {
        let mut own = BTreeMap::new();
        own.insert("note".into(), scalar("note", FieldType::Int, true));

        let merged = merge_inherited(&base(), own);
        let note = &merged["note"];
        assert!(note.is_required());
        assert_eq!(note.inherited_from(), None);
        match note.kind() {
            FieldKind::Scalar(c) => assert_eq!(c.field_type(), FieldType::Int),
            FieldKind::Nested { .. } => panic!("expected scalar"),
        }
    }

    #[test]
    fn test_inherited_nested_field_keeps_base_sub_schema() {
        let merged = merge_inherited(&base(), BTreeMap::new());
        assert_eq!(merged["conn"].nested_schema(), Some("0_0_1_base_conn"));
        assert_eq!(merged["conn"].inherited_from(), Some("0_0_1_base"));
    }

    #[test]
    fn test_origin_survives_two_hops() {
        let mid = Schema::new("0_0_1_mid", None, None, None, merge_inherited(&base(), BTreeMap::new()));
        let merged = merge_inherited(&mid, BTreeMap::new());
        assert_eq!(merged["run_id"].inherited_from(), Some("0_0_1_base"));
    }
}

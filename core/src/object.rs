//! Validated objects, object drafts and the transport encoding.
//!
//! A [`ValidatedObject`] only exists after a successful validation call. It
//! remembers the schema it was checked against and exports back to YAML or
//! JSON text that validates again to an equal object.
//!
//! An [`ObjectDraft`] is the other direction: an empty, schema-shaped stub
//! whose slots are filled in by hand and then submitted for validation.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde::Serialize;

use crate::error::{DraftError, LoadError, TransportError};
use crate::registry::SchemaRegistry;
use crate::schema::FieldKind;
use crate::types::{FieldType, Value};
use crate::validate::{Loaded, Validator};

/// A submission that passed validation, with typed field values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedObject {
    #[serde(skip)]
    schema_name: String,
    #[serde(skip)]
    schema_version: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl ValidatedObject {
    pub(crate) fn new(
        schema_name: impl Into<String>,
        schema_version: Option<String>,
        fields: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            schema_version,
            fields,
        }
    }

    /// Name of the schema the object was validated against.
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn schema_version(&self) -> Option<&str> {
        self.schema_version.as_deref()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Looks up a value by dotted path, descending into nested mappings.
    ///
    /// # Examples
    ///
    /// ```
    /// use mlspec_core::*;
    ///
    /// let registry = SchemaRegistry::new();
    /// registry
    ///     .compiler()
    ///     .compile_str("conn:\n  type: nested\n  schema:\n    port:\n      type: int\n", Some("s"))
    ///     .unwrap();
    /// let object = registry
    ///     .validator()
    ///     .load_as("s", "conn:\n  port: '8080'\n")
    ///     .unwrap()
    ///     .into_result()
    ///     .unwrap();
    /// assert_eq!(object.get_path("conn.port"), Some(&Value::Int(8080)));
    /// assert_eq!(object.get_path("conn.host"), None);
    /// ```
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, Value> {
        self.fields
    }

    /// The field values as a single mapping value.
    pub fn to_value(&self) -> Value {
        Value::Map(self.fields.clone())
    }

    /// Exports the field values as YAML text.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Exports the field values as JSON text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Exports to YAML and wraps it in URL-safe base64 for transport.
    pub fn encode_for_transport(&self) -> Result<String, TransportError> {
        Ok(URL_SAFE.encode(self.to_yaml()?.as_bytes()))
    }
}

/// Unwraps the transport form back into YAML text.
///
/// # Examples
///
/// ```
/// use mlspec_core::decode_transport;
///
/// assert_eq!(decode_transport("YTogMQo=").unwrap(), "a: 1\n");
/// assert!(decode_transport("not base64!").is_err());
/// ```
pub fn decode_transport(encoded: &str) -> Result<String, TransportError> {
    let bytes = URL_SAFE.decode(encoded.trim())?;
    Ok(String::from_utf8(bytes)?)
}

/// One slot of an [`ObjectDraft`].
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Not yet set.
    Absent,
    /// Set to a raw value.
    Present(Value),
    /// A nested field, itself a draft.
    Nested(ObjectDraft),
}

/// A schema-shaped stub filled in by hand before validation.
///
/// # Examples
///
/// ```
/// use mlspec_core::*;
///
/// let registry = SchemaRegistry::new();
/// registry
///     .compiler()
///     .compile_str(
///         "mlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: base\nschema_version:\n  type: semver\nschema_type:\n  type: string\nrun_id:\n  type: uuid\n  required: True\n",
///         None,
///     )
///     .unwrap();
///
/// let mut draft = ObjectDraft::for_type(&registry, "0.0.1", "base").unwrap();
/// let loaded = draft.submit(&registry.validator()).unwrap();
/// assert!(loaded.errors.contains("run_id"));
///
/// draft.set("run_id", "6a2f41a3-c54c-fce8-32d2-0324e1c32e22").unwrap();
/// assert!(draft.submit(&registry.validator()).unwrap().is_valid());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDraft {
    schema_name: String,
    slots: BTreeMap<String, Slot>,
}

impl ObjectDraft {
    /// Builds an empty draft for a registered schema.
    pub fn for_schema(registry: &SchemaRegistry, name: &str) -> Result<Self, DraftError> {
        let schema = registry.lookup(name)?;
        let mut slots = BTreeMap::new();
        for field in schema.fields() {
            let slot = match field.kind() {
                FieldKind::Scalar(_) => Slot::Absent,
                FieldKind::Nested { schema } => Slot::Nested(Self::for_schema(registry, schema)?),
            };
            slots.insert(field.name().to_string(), slot);
        }
        Ok(Self {
            schema_name: schema.name().to_string(),
            slots,
        })
    }

    /// Builds a draft from a schema version and type.
    ///
    /// The version must be a valid semantic version. The draft's
    /// `schema_version` and `schema_type` slots are pre-filled when the
    /// schema declares them.
    pub fn for_type(
        registry: &SchemaRegistry,
        version: &str,
        schema_type: &str,
    ) -> Result<Self, DraftError> {
        FieldType::Semver
            .coerce(&Value::from(version))
            .map_err(|_| DraftError::InvalidVersion(version.to_string()))?;

        let name = registry.canonical_name(version, schema_type);
        let mut draft = Self::for_schema(registry, &name)?;
        for (key, value) in [("schema_version", version), ("schema_type", schema_type)] {
            if let Some(slot) = draft.slots.get_mut(key) {
                if matches!(slot, Slot::Absent) {
                    *slot = Slot::Present(Value::from(value));
                }
            }
        }
        Ok(draft)
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// Looks up a slot by dotted path.
    pub fn slot(&self, path: &str) -> Option<&Slot> {
        let (head, rest) = split_path(path);
        let slot = self.slots.get(head)?;
        match (rest, slot) {
            (None, slot) => Some(slot),
            (Some(rest), Slot::Nested(inner)) => inner.slot(rest),
            (Some(_), _) => None,
        }
    }

    /// Sets a slot by dotted path.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<(), DraftError> {
        let value = value.into();
        let schema = self.schema_name.clone();
        let unknown = || DraftError::UnknownField {
            schema: schema.clone(),
            path: path.to_string(),
        };

        let (head, rest) = split_path(path);
        let slot = self.slots.get_mut(head).ok_or_else(&unknown)?;
        match (rest, slot) {
            (Some(rest), Slot::Nested(inner)) => inner.set(rest, value).map_err(|_| unknown()),
            (Some(_), _) => Err(unknown()),
            (None, slot) => {
                *slot = Slot::Present(value);
                Ok(())
            }
        }
    }

    /// Resets a slot to absent; nested slots are reset to an empty draft.
    pub fn clear(&mut self, path: &str) {
        let (head, rest) = split_path(path);
        let Some(slot) = self.slots.get_mut(head) else {
            return;
        };
        match (rest, slot) {
            (Some(rest), Slot::Nested(inner)) => inner.clear(rest),
            (Some(_), _) => {}
            (None, Slot::Nested(inner)) => inner.reset(),
            (None, slot) => *slot = Slot::Absent,
        }
    }

    fn reset(&mut self) {
        for slot in self.slots.values_mut() {
            match slot {
                Slot::Nested(inner) => inner.reset(),
                other => *other = Slot::Absent,
            }
        }
    }

    /// Field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    fn is_untouched(&self) -> bool {
        self.slots.values().all(|slot| match slot {
            Slot::Absent => true,
            Slot::Present(_) => false,
            Slot::Nested(inner) => inner.is_untouched(),
        })
    }

    /// The set slots as a submission mapping.
    ///
    /// Absent slots are omitted, and a nested draft with nothing set is
    /// treated as absent.
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        for (name, slot) in &self.slots {
            match slot {
                Slot::Absent => {}
                Slot::Present(value) => {
                    map.insert(name.clone(), value.clone());
                }
                Slot::Nested(inner) if inner.is_untouched() => {}
                Slot::Nested(inner) => {
                    map.insert(name.clone(), inner.to_value());
                }
            }
        }
        Value::Map(map)
    }

    /// Validates the draft against its schema.
    pub fn submit(&self, validator: &Validator<'_>) -> Result<Loaded, LoadError> {
        validator.load_as(self.schema_name.as_str(), self.to_value())
    }
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
mlspec_schema_version:
    meta: 0.0.1
mlspec_schema_type:
    meta: datapath
schema_version:
  type: semver
  required: True
schema_type:
  type: allowed_schema_types
  required: True
run_date:
  type: datetime
  required: True
connection:
  type: nested
  schema:
    endpoint:
      type: URI
      required: True
    access_key_id:
      type: string
"#;

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry.compiler().compile_str(SCHEMA, None).unwrap();
        registry
    }

    #[test]
    fn test_export_round_trip() {
        let registry = registry();
        let object = registry
            .validator()
            .load(
                "schema_version: 0.0.1\nschema_type: datapath\nrun_date: 1970-01-01 00:00:00.00000\nconnection:\n  endpoint: http://s3.amazon.com/bucket\n  access_key_id: '1234'\n",
            )
            .unwrap()
            .into_result()
            .unwrap();

        let yaml = object.to_yaml().unwrap();
        let again = registry.validator().load(yaml).unwrap().into_result().unwrap();
        assert_eq!(object, again);
        assert_eq!(
            again.get_path("connection.access_key_id"),
            Some(&Value::String("1234".into()))
        );

        let json = object.to_json().unwrap();
        let from_json = registry.validator().load(json).unwrap().into_result().unwrap();
        assert_eq!(object, from_json);
    }

    #[test]
    fn test_transport_round_trip() {
        let registry = registry();
        let object = registry
            .validator()
            .load("schema_version: 0.0.1\nschema_type: datapath\nrun_date: 2020-03-04T05:06:07\n")
            .unwrap()
            .into_result()
            .unwrap();

        let encoded = object.encode_for_transport().unwrap();
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        let decoded = decode_transport(&encoded).unwrap();
        assert_eq!(decoded, object.to_yaml().unwrap());
    }

    #[test]
    fn test_schema_identity_is_not_exported() {
        let registry = registry();
        let object = registry
            .validator()
            .load("schema_version: 0.0.1\nschema_type: datapath\nrun_date: 2020-03-04\n")
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(object.schema_name(), "0_0_1_datapath");
        assert_eq!(object.schema_version(), Some("0.0.1"));
        assert!(!object.to_yaml().unwrap().contains("0_0_1_datapath"));
    }

    #[test]
    fn test_draft_reports_nested_required_field() {
        let registry = registry();
        let mut draft = ObjectDraft::for_type(&registry, "0.0.1", "datapath").unwrap();
        draft.set("run_date", "2020-03-04").unwrap();
        draft.set("connection.access_key_id", "AKIA").unwrap();

        let loaded = draft.submit(&registry.validator()).unwrap();
        assert_eq!(
            loaded.errors.messages("connection.endpoint"),
            vec!["Missing data for required field."]
        );

        draft.set("connection.endpoint", "http://example.com").unwrap();
        assert!(draft.submit(&registry.validator()).unwrap().is_valid());
    }

    #[test]
    fn test_untouched_nested_draft_is_omitted() {
        let registry = registry();
        let mut draft = ObjectDraft::for_type(&registry, "0.0.1", "datapath").unwrap();
        draft.set("run_date", "2020-03-04").unwrap();
        assert!(draft.submit(&registry.validator()).unwrap().is_valid());

        draft.set("connection.access_key_id", "AKIA").unwrap();
        draft.clear("connection");
        assert!(draft.submit(&registry.validator()).unwrap().is_valid());
    }

    #[test]
    fn test_draft_errors() {
        let registry = registry();
        assert_eq!(
            ObjectDraft::for_type(&registry, "0.0.x", "datapath").unwrap_err(),
            DraftError::InvalidVersion("0.0.x".into())
        );
        assert!(matches!(
            ObjectDraft::for_type(&registry, "9.9.9", "datapath").unwrap_err(),
            DraftError::Registry(_)
        ));

        let mut draft = ObjectDraft::for_schema(&registry, "0_0_1_datapath").unwrap();
        assert!(matches!(
            draft.set("connection.nope", 1i64).unwrap_err(),
            DraftError::UnknownField { path, .. } if path == "connection.nope"
        ));
        assert!(draft.set("run_date.inner", 1i64).is_err());
        assert_eq!(draft.slot("connection.endpoint"), Some(&Slot::Absent));
    }
}

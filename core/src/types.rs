//! Field types, submitted values and coercion.
//!
//! This module defines the closed set of semantic field types a schema may
//! declare ([`FieldType`]), the value model that submissions are converted
//! into before validation ([`Value`]), and the resolved per-field coercer
//! ([`FieldCoercer`]) that a compiled schema attaches to each scalar field.
//!
//! Dispatch is a `match` over [`FieldType`], so adding a type is a
//! compile-time exhaustive change rather than a new entry in a lookup table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::constraint::Constraint;

/// Format used when a [`Value::DateTime`] is exported back to text.
pub const DATETIME_EXPORT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)                  # major.minor.patch
        (?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)
            (?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?   # pre-release
        (?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$               # build metadata
        ",
    )
    .expect("static regex must compile")
});

static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.~/\-]+$").expect("static regex must compile"));

static BUCKET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9.\-]{1,61}[a-z0-9]$").expect("static regex must compile")
});

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}$").expect("static regex must compile"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^[A-Za-z0-9.!\#$%&'*+/=?^_`{|}~-]+
        @
        [A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?
        (?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$
        ",
    )
    .expect("static regex must compile")
});

const TRUTHY: &[&str] = &["true", "t", "yes", "y", "on", "1"];
const FALSY: &[&str] = &["false", "f", "no", "n", "off", "0"];

/// Semantic type of a schema field.
///
/// Type keys in schema definitions are matched case-insensitively, so
/// `URI` and `uri` both resolve to [`FieldType::Uri`].
///
/// # Examples
///
/// ```
/// use mlspec_core::FieldType;
///
/// let ty: FieldType = "URI".parse().unwrap();
/// assert_eq!(ty, FieldType::Uri);
/// assert!("tensor".parse::<FieldType>().is_err());
/// assert!(FieldType::Int.is_numeric());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Any value, kept as submitted.
    String,
    /// Whole number (`i64`).
    Int,
    /// Floating point number.
    Float,
    /// `true`/`false` and the usual yes/no spellings.
    Boolean,
    /// Untyped list.
    List,
    /// List whose elements are cast to strings.
    ListStrings,
    /// Untyped mapping.
    Dict,
    /// Hyphenated UUID.
    Uuid,
    /// `MAJOR.MINOR.PATCH` semantic version with optional pre-release/build.
    Semver,
    /// ISO-8601-ish timestamp.
    DateTime,
    /// Absolute URI (scheme required).
    Uri,
    /// POSIX-safe path.
    Path,
    /// Object-storage bucket name.
    Bucket,
    /// Email address.
    Email,
    /// Schema-type discriminator, checked indirectly through registry lookup.
    AllowedSchemaTypes,
    /// List of `[key, value]` string pairs.
    Tags,
    /// List of `[name, [dim, ...]]` tensor shape entries.
    ListOfTensorShapes,
}

/// Returned when a schema names a type outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no field type named '{0}'")]
pub struct UnknownTypeError(pub String);

impl FieldType {
    /// Every supported type, in declaration order.
    pub const ALL: [FieldType; 17] = [
        FieldType::String,
        FieldType::Int,
        FieldType::Float,
        FieldType::Boolean,
        FieldType::List,
        FieldType::ListStrings,
        FieldType::Dict,
        FieldType::Uuid,
        FieldType::Semver,
        FieldType::DateTime,
        FieldType::Uri,
        FieldType::Path,
        FieldType::Bucket,
        FieldType::Email,
        FieldType::AllowedSchemaTypes,
        FieldType::Tags,
        FieldType::ListOfTensorShapes,
    ];

    /// Returns the lower-case key used for this type in schema definitions.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::List => "list",
            FieldType::ListStrings => "list_strings",
            FieldType::Dict => "dict",
            FieldType::Uuid => "uuid",
            FieldType::Semver => "semver",
            FieldType::DateTime => "datetime",
            FieldType::Uri => "uri",
            FieldType::Path => "path",
            FieldType::Bucket => "bucket",
            FieldType::Email => "email",
            FieldType::AllowedSchemaTypes => "allowed_schema_types",
            FieldType::Tags => "tags",
            FieldType::ListOfTensorShapes => "list_of_tensor_shapes",
        }
    }

    /// Returns `true` for the types a constraint may be attached to.
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }

    /// Coerces a raw value into this type.
    ///
    /// Values that already carry the target representation (a parsed
    /// [`Value::DateTime`] or [`Value::Uuid`]) pass through unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use mlspec_core::{FieldType, Value};
    ///
    /// let v = FieldType::Int.coerce(&Value::String("42".into())).unwrap();
    /// assert_eq!(v, Value::Int(42));
    /// assert!(FieldType::Boolean.coerce(&Value::String("maybe".into())).is_err());
    /// ```
    pub fn coerce(self, value: &Value) -> Result<Value, CoercionError> {
        match self {
            FieldType::String | FieldType::AllowedSchemaTypes => Ok(value.clone()),
            FieldType::Int => coerce_int(value),
            FieldType::Float => coerce_float(value),
            FieldType::Boolean => coerce_bool(value),
            FieldType::List => match value {
                Value::List(items) => Ok(Value::List(items.clone())),
                _ => Err(CoercionError::NotAList),
            },
            FieldType::ListStrings => coerce_list(value, |item| cast_to_string(item).map(Value::String)),
            FieldType::Dict => match value {
                Value::Map(map) => Ok(Value::Map(map.clone())),
                _ => Err(CoercionError::NotADict),
            },
            FieldType::Uuid => coerce_uuid(value),
            FieldType::Semver => {
                let text = cast_to_string(value)?;
                if SEMVER_RE.is_match(&text) {
                    Ok(Value::String(text))
                } else {
                    Err(CoercionError::InvalidSemVer(text))
                }
            }
            FieldType::DateTime => coerce_datetime(value),
            FieldType::Uri => coerce_uri(value),
            FieldType::Path => {
                let text = expect_string(value)?;
                if PATH_RE.is_match(text) {
                    Ok(Value::String(text.to_string()))
                } else {
                    Err(CoercionError::InvalidPath(text.to_string()))
                }
            }
            FieldType::Bucket => {
                let text = expect_string(value)?;
                if is_bucket_name(text) {
                    Ok(Value::String(text.to_string()))
                } else {
                    Err(CoercionError::InvalidBucket(text.to_string()))
                }
            }
            FieldType::Email => {
                let text = expect_string(value)?;
                if EMAIL_RE.is_match(text) {
                    Ok(Value::String(text.to_string()))
                } else {
                    Err(CoercionError::InvalidEmail(text.to_string()))
                }
            }
            FieldType::Tags => coerce_list(value, |item| match item {
                Value::List(pair) if pair.len() == 2 => Ok(Value::List(vec![
                    Value::String(cast_to_string(&pair[0])?),
                    Value::String(cast_to_string(&pair[1])?),
                ])),
                _ => Err(CoercionError::UnexpectedShape {
                    expected: "a [key, value] pair",
                }),
            }),
            FieldType::ListOfTensorShapes => coerce_list(value, |item| match item {
                Value::List(entry) if entry.len() == 2 => Ok(Value::List(vec![
                    Value::String(cast_to_string(&entry[0])?),
                    coerce_list(&entry[1], coerce_int)?,
                ])),
                _ => Err(CoercionError::UnexpectedShape {
                    expected: "a [name, [dimensions]] entry",
                }),
            }),
        }
    }
}

impl FromStr for FieldType {
    type Err = UnknownTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        FieldType::ALL
            .into_iter()
            .find(|ty| ty.name() == key)
            .ok_or(UnknownTypeError(key))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a single submitted value was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("Not a valid string.")]
    NotAString,
    #[error("Not a valid integer.")]
    NotAnInteger,
    #[error("Not a valid number.")]
    NotANumber,
    #[error("Not a valid boolean.")]
    NotABoolean,
    #[error("'{0}' is not a valid UUID.")]
    InvalidUuid(String),
    #[error("'{0}' is not a valid semantic version.")]
    InvalidSemVer(String),
    #[error("'{0}' is not a valid datetime.")]
    InvalidDateTime(String),
    #[error("'{0}' is not a valid URI.")]
    InvalidUri(String),
    #[error("'{0}' is not a valid path.")]
    InvalidPath(String),
    #[error("'{0}' is not a valid bucket name.")]
    InvalidBucket(String),
    #[error("'{0}' is not a valid email address.")]
    InvalidEmail(String),
    #[error("Not a valid list.")]
    NotAList,
    #[error("Not a valid mapping type.")]
    NotADict,
    #[error("Must be one of: {}.", .allowed.join(", "))]
    NotAllowed { value: String, allowed: Vec<String> },
    #[error("String does not match expected pattern '{pattern}'.")]
    NoRegexMatch { pattern: String },
    #[error("Value does not satisfy constraint '{constraint}'.")]
    ConstraintViolated { constraint: String },
    #[error("Expected {expected}.")]
    UnexpectedShape { expected: &'static str },
    #[error("Invalid element at index {index}: {source}")]
    InvalidElement {
        index: usize,
        source: Box<CoercionError>,
    },
}

/// A submitted or validated value.
///
/// Raw submissions are converted into `Value` before validation; coercion
/// then produces typed variants such as [`Value::Uuid`] and
/// [`Value::DateTime`]. Serializing a `Value` emits plain YAML/JSON scalars,
/// so a validated object exports to text that validates again unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Uuid(Uuid),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the string slice for [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric value of [`Value::Int`] and [`Value::Float`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the mapping for [`Value::Map`].
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(f)) => Value::Float(f),
                (None, None) => Value::String(n.to_string()),
            },
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_yaml::Value::Mapping(mapping) => Value::Map(
                mapping
                    .into_iter()
                    .map(|(k, v)| (yaml_key_to_string(k), Value::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(f)) => Value::Float(f),
                (None, None) => Value::String(n.to_string()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Uuid(u) => serializer.collect_str(u),
            Value::DateTime(dt) => serializer.collect_str(&dt.format(DATETIME_EXPORT_FORMAT)),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
        }
    }
}

/// Resolved validator for one scalar field of a compiled schema.
///
/// Built by the schema compiler from a field's declared type plus its
/// `allowed`, `regex` and `constraint` modifiers. An `allowed` list takes
/// precedence over a `regex`; both reduce the field to a string check.
#[derive(Debug, Clone)]
pub struct FieldCoercer {
    field_type: FieldType,
    allowed: Option<Vec<String>>,
    pattern: Option<Regex>,
    constraint: Option<Constraint>,
}

impl FieldCoercer {
    /// Creates a coercer for a bare field type.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            allowed: None,
            pattern: None,
            constraint: None,
        }
    }

    /// Restricts accepted values to an enumerated set.
    pub fn with_allowed(mut self, allowed: Vec<String>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Requires values to match `pattern` at the start of the string.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Narrows a numeric field with a compiled constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Returns the effective field type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the enumerated allowed values, if any.
    pub fn allowed(&self) -> Option<&[String]> {
        self.allowed.as_deref()
    }

    /// Returns the constraint, if any.
    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    /// Coerces a non-null raw value.
    pub fn coerce(&self, value: &Value) -> Result<Value, CoercionError> {
        if let Some(allowed) = &self.allowed {
            let text = cast_to_string(value)?;
            if allowed.iter().any(|a| *a == text) {
                return Ok(Value::String(text));
            }
            return Err(CoercionError::NotAllowed {
                value: text,
                allowed: allowed.clone(),
            });
        }

        if let Some(pattern) = &self.pattern {
            let text = cast_to_string(value)?;
            let matches_at_start = pattern.find(&text).is_some_and(|m| m.start() == 0);
            if matches_at_start {
                return Ok(Value::String(text));
            }
            return Err(CoercionError::NoRegexMatch {
                pattern: pattern.as_str().to_string(),
            });
        }

        let typed = self.field_type.coerce(value)?;

        if let Some(constraint) = &self.constraint {
            let holds = match typed {
                Value::Int(i) => constraint.check_int(i),
                Value::Float(f) => constraint.check(f),
                _ => true,
            };
            if !holds {
                return Err(CoercionError::ConstraintViolated {
                    constraint: constraint.source().to_string(),
                });
            }
        }

        Ok(typed)
    }
}

/// Casts a scalar to its string form; lists, mappings and null are rejected.
pub fn cast_to_string(value: &Value) -> Result<String, CoercionError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Uuid(u) => Ok(u.to_string()),
        Value::DateTime(dt) => Ok(dt.format(DATETIME_EXPORT_FORMAT).to_string()),
        Value::Null | Value::List(_) | Value::Map(_) => Err(CoercionError::NotAString),
    }
}

/// Parses the timestamp shapes accepted by [`FieldType::DateTime`].
///
/// Offsets are normalised to UTC; a bare date becomes midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    const OFFSET_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
    ];
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    let text = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.naive_utc());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn expect_string(value: &Value) -> Result<&str, CoercionError> {
    value.as_str().ok_or(CoercionError::NotAString)
}

fn coerce_list(
    value: &Value,
    element: impl Fn(&Value) -> Result<Value, CoercionError>,
) -> Result<Value, CoercionError> {
    let Value::List(items) = value else {
        return Err(CoercionError::NotAList);
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            element(item).map_err(|e| CoercionError::InvalidElement {
                index,
                source: Box::new(e),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

fn coerce_int(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Ok(Value::Int(*f as i64))
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| CoercionError::NotAnInteger),
        _ => Err(CoercionError::NotAnInteger),
    }
}

fn coerce_float(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Float(f) if f.is_finite() => Ok(Value::Float(*f)),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(CoercionError::NotANumber),
        },
        _ => Err(CoercionError::NotANumber),
    }
}

fn coerce_bool(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Int(1) => Ok(Value::Bool(true)),
        Value::Int(0) => Ok(Value::Bool(false)),
        Value::String(s) => parse_bool(s)
            .map(Value::Bool)
            .ok_or(CoercionError::NotABoolean),
        _ => Err(CoercionError::NotABoolean),
    }
}

/// Parses the strtobool spellings (`yes`/`no`, `on`/`off`, `1`/`0`, ...).
pub fn parse_bool(raw: &str) -> Option<bool> {
    let lowered = raw.trim().to_ascii_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSY.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn coerce_uuid(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Uuid(u) => Ok(Value::Uuid(*u)),
        Value::String(s) => {
            let text = s.trim();
            // Only the canonical 8-4-4-4-12 form; `Uuid::try_parse` also takes
            // simple, braced and urn forms.
            if text.len() != 36 {
                return Err(CoercionError::InvalidUuid(s.clone()));
            }
            Uuid::try_parse(text)
                .map(Value::Uuid)
                .map_err(|_| CoercionError::InvalidUuid(s.clone()))
        }
        other => Err(CoercionError::InvalidUuid(
            cast_to_string(other).unwrap_or_default(),
        )),
    }
}

fn coerce_datetime(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
        Value::String(s) => parse_datetime(s)
            .map(Value::DateTime)
            .ok_or_else(|| CoercionError::InvalidDateTime(s.clone())),
        other => Err(CoercionError::InvalidDateTime(
            cast_to_string(other).unwrap_or_default(),
        )),
    }
}

fn coerce_uri(value: &Value) -> Result<Value, CoercionError> {
    let text = match value {
        Value::String(s) => s.as_str(),
        other => {
            return Err(CoercionError::InvalidUri(
                cast_to_string(other).unwrap_or_default(),
            ));
        }
    };
    match url::Url::parse(text) {
        Ok(_) => Ok(Value::String(text.to_string())),
        Err(_) => Err(CoercionError::InvalidUri(text.to_string())),
    }
}

fn is_bucket_name(text: &str) -> bool {
    BUCKET_RE.is_match(text) && !IPV4_RE.is_match(text) && !text.contains("..")
}

fn yaml_key_to_string(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

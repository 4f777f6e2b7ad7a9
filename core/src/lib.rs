//! Schema registry and object validation for ML pipeline metadata.
//!
//! This crate turns declarative YAML schema definitions into compiled
//! schemas and validates submitted objects against them:
//!
//! - [`SchemaDefinition`]: a parsed definition with meta entries (version, type,
//!   optional base type) plus field specs.
//! - [`SchemaCompiler`]: resolves field types, `allowed`/`regex`/`constraint`
//!   modifiers, inline nested schemas and base-schema inheritance, then
//!   registers the result.
//! - [`SchemaRegistry`]: an explicit, thread-safe name-to-schema map with
//!   insert-if-absent registration and dependency-ordered
//!   [`populate`](SchemaRegistry::populate).
//! - [`Validator`]: checks a submission field by field, accumulating every
//!   problem into a [`ValidationErrorReport`] or producing a
//!   [`ValidatedObject`].
//! - [`Constraint`]: a sandboxed numeric predicate over a single variable
//!   `x`, parsed into a tiny AST and never evaluated as code.
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
//!         r#"
//! mlspec_schema_version:
//!   meta: 0.0.1
//! mlspec_schema_type:
//!   meta: trainer
//! schema_version:
//!   type: semver
//!   required: True
//! schema_type:
//!   type: allowed_schema_types
//!   required: True
//! epochs:
//!   type: int
//!   required: True
//!   constraint: "x >= 1"
//! "#,
//!         None,
//!     )
//!     .unwrap();
//!
//! let loaded = registry
//!     .validator()
//!     .load("schema_version: 0.0.1\nschema_type: trainer\nepochs: '10'\n")
//!     .unwrap();
//! let object = loaded.into_result().unwrap();
//! assert_eq!(object.get("epochs"), Some(&Value::Int(10)));
//!
//! let loaded = registry
//!     .validator()
//!     .load("schema_version: 0.0.1\nschema_type: trainer\nepochs: 0\n")
//!     .unwrap();
//! assert!(loaded.errors.contains("epochs"));
//! ```

mod compile;
mod constraint;
mod definition;
mod error;
mod merge;
mod object;
mod registry;
mod schema;
mod types;
mod validate;

pub use compile::SchemaCompiler;
pub use constraint::{CONSTRAINT_VARIABLE, Constraint, ConstraintError};
pub use definition::{
    BASE_TYPE_META, FieldSpec, NESTED_TYPE, SCHEMA_TYPE_META, SCHEMA_VERSION_META, SchemaDefinition,
};
pub use error::{CompileError, DraftError, LoadError, RegistryError, TransportError};
pub use merge::merge_inherited;
pub use object::{ObjectDraft, Slot, ValidatedObject, decode_transport};
pub use registry::{PopulateFailure, PopulateReport, Registration, SchemaRegistry};
pub use schema::{Field, FieldKind, Schema, canonical_name, sub_schema_name};
pub use types::*;
pub use validate::{
    FieldError, Loaded, SCHEMA_NAME_KEY, SchemaTarget, Submission, UnknownFields,
    ValidationErrorReport, Validator,
};

//! The schema registry.
//!
//! [`SchemaRegistry`] is an explicit, shareable name-to-schema map. There is
//! no process-wide instance: callers create one, populate it, and pass it to
//! the compiler and validator. Lookups take a read lock and hand out
//! [`Arc<Schema>`] clones; registration is insert-if-absent, so registering a
//! name twice keeps the first schema.
//!
//! # Example
//!
//! ```
//! use mlspec_core::*;
//!
//! let base = SchemaDefinition::from_yaml(
//!     "mlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: base\nrun_id:\n  type: uuid\n",
//! )
//! .unwrap();
//! let derived = SchemaDefinition::from_yaml(
//!     "mlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: datapath\nmlspec_base_type:\n  meta: base\nendpoint:\n  type: uri\n",
//! )
//! .unwrap();
//!
//! // Order does not matter: base-less definitions compile first.
//! let registry = SchemaRegistry::new();
//! let report = registry.populate(vec![derived, base]);
//! assert!(report.is_clean());
//! assert_eq!(registry.names(), vec!["0_0_1_base", "0_0_1_datapath"]);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::compile::SchemaCompiler;
use crate::definition::SchemaDefinition;
use crate::error::{CompileError, RegistryError};
use crate::schema::{Schema, canonical_name};
use crate::validate::Validator;

/// Outcome of inserting one schema.
#[derive(Debug, Clone)]
pub enum Registration {
    /// The schema was new and is now resident.
    Inserted(Arc<Schema>),
    /// A schema with the same name was already resident and was kept.
    AlreadyPresent(Arc<Schema>),
}

impl Registration {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Registration::Inserted(_))
    }

    /// The resident schema for the name.
    pub fn into_schema(self) -> Arc<Schema> {
        match self {
            Registration::Inserted(schema) | Registration::AlreadyPresent(schema) => schema,
        }
    }
}

/// Name-keyed store of compiled schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
    prefix: Option<String>,
    terminal_types: BTreeSet<String>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a prefix applied to every canonical name built by this registry.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Marks schema types that [`populate`](Self::populate) compiles in a
    /// final tier, after every other definition.
    pub fn with_terminal_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.terminal_types = types
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Canonical name for `version` and `schema_type` under this registry's prefix.
    pub fn canonical_name(&self, version: &str, schema_type: &str) -> String {
        canonical_name(version, schema_type, self.prefix.as_deref())
    }

    /// Inserts `schema` under its name unless the name is taken.
    pub fn register(&self, schema: Schema) -> Registration {
        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        Self::insert_locked(&mut schemas, schema)
    }

    /// Inserts a schema together with its nested sub-schemas under a single
    /// write lock, returning the registration of `top`.
    pub fn register_group(&self, nested: Vec<Schema>, top: Schema) -> Registration {
        let mut resident = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        for schema in nested {
            Self::insert_locked(&mut resident, schema);
        }
        Self::insert_locked(&mut resident, top)
    }

    fn insert_locked(schemas: &mut HashMap<String, Arc<Schema>>, schema: Schema) -> Registration {
        match schemas.get(schema.name()) {
            Some(existing) => {
                debug!(schema = %schema.name(), "Schema already registered, skipping");
                Registration::AlreadyPresent(Arc::clone(existing))
            }
            None => {
                let schema = Arc::new(schema);
                schemas.insert(schema.name().to_string(), Arc::clone(&schema));
                Registration::Inserted(schema)
            }
        }
    }

    /// Looks up a schema by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<Schema>, RegistryError> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// A compiler that registers into this registry.
    pub fn compiler(&self) -> SchemaCompiler<'_> {
        SchemaCompiler::new(self)
    }

    /// A validator that resolves schemas from this registry.
    pub fn validator(&self) -> Validator<'_> {
        Validator::new(self)
    }

    /// Compiles a batch of definitions in dependency-safe order.
    ///
    /// Definitions are partitioned into three tiers compiled in sequence:
    /// those without a base type, those with a base type, and finally
    /// those whose schema type is a configured terminal type. Definitions
    /// whose canonical name is already registered are skipped. A failing
    /// definition is logged and recorded in the report; the rest of the
    /// batch still compiles.
    pub fn populate<I>(&self, definitions: I) -> PopulateReport
    where
        I: IntoIterator<Item = SchemaDefinition>,
    {
        let mut plain = Vec::new();
        let mut derived = Vec::new();
        let mut terminal = Vec::new();

        for (index, definition) in definitions.into_iter().enumerate() {
            if self.is_terminal(&definition) {
                terminal.push((index, definition));
            } else if definition.base_type.is_some() {
                derived.push((index, definition));
            } else {
                plain.push((index, definition));
            }
        }

        debug!(
            plain = plain.len(),
            derived = derived.len(),
            terminal = terminal.len(),
            "Partitioned schema definitions"
        );

        let mut report = PopulateReport::default();
        for (index, definition) in plain.into_iter().chain(derived).chain(terminal) {
            self.populate_one(index, &definition, &mut report);
        }

        info!(
            registered = report.registered.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Populated schema registry"
        );

        report
    }

    fn is_terminal(&self, definition: &SchemaDefinition) -> bool {
        definition
            .schema_type
            .as_deref()
            .is_some_and(|t| self.terminal_types.contains(&t.trim().to_lowercase()))
    }

    fn populate_one(&self, index: usize, definition: &SchemaDefinition, report: &mut PopulateReport) {
        let compiler = self.compiler();
        let name = match compiler.name_for(definition) {
            Ok(name) => name,
            Err(error) => {
                warn!(index, error = %error, "Cannot name schema definition");
                report.failures.push(PopulateFailure {
                    index,
                    name: None,
                    error,
                });
                return;
            }
        };

        if self.contains(&name) {
            debug!(schema = %name, "Schema already registered, skipping");
            report.skipped.push(name);
            return;
        }

        match compiler.compile(definition, Some(&name)) {
            Ok(_) => report.registered.push(name),
            Err(error) => {
                warn!(schema = %name, index, error = %error, "Failed to compile schema");
                report.failures.push(PopulateFailure {
                    index,
                    name: Some(name),
                    error,
                });
            }
        }
    }
}

/// One definition that failed during [`SchemaRegistry::populate`].
#[derive(Debug)]
pub struct PopulateFailure {
    /// Position of the definition in the input batch.
    pub index: usize,
    /// Canonical name, when it could be built.
    pub name: Option<String>,
    pub error: CompileError,
}

/// Summary of a [`SchemaRegistry::populate`] run.
#[derive(Debug, Default)]
pub struct PopulateReport {
    /// Newly registered top-level schema names, in compile order.
    pub registered: Vec<String>,
    /// Names that were already registered.
    pub skipped: Vec<String>,
    pub failures: Vec<PopulateFailure>,
}

impl PopulateReport {
    /// Returns `true` when no definition failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

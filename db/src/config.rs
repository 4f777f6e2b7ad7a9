//! Loader configuration.
//!
//! Defines the YAML-serializable configuration that controls where schema
//! files are read from, which files count as schemas, and how the registry
//! built from them names and orders schemas.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! schema_dirs:
//!   - schemas/
//! extensions:
//!   - yaml
//!   - yml
//! recursive: true
//! terminal_types:
//!   - workflow
//! schema_prefix: null
//! unknown_fields: raise
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use mlspec_core::{SchemaRegistry, UnknownFields, Validator};
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, Result};

/// Handling of undeclared submission keys, as written in config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldsPolicy {
    #[default]
    Raise,
    Exclude,
}

impl From<UnknownFieldsPolicy> for UnknownFields {
    fn from(policy: UnknownFieldsPolicy) -> Self {
        match policy {
            UnknownFieldsPolicy::Raise => UnknownFields::Raise,
            UnknownFieldsPolicy::Exclude => UnknownFields::Exclude,
        }
    }
}

/// Top-level loader configuration.
///
/// # Examples
///
/// ```
/// use mlspec_db::LoaderConfig;
///
/// let config: LoaderConfig = serde_yaml::from_str("version: '1.0'\nschema_dirs: [schemas]\n").unwrap();
/// assert_eq!(config.extensions, vec!["yaml", "yml"]);
/// assert!(config.recursive);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Directories scanned for schema files.
    #[serde(default)]
    pub schema_dirs: Vec<PathBuf>,
    /// File extensions treated as schema files, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Descend into subdirectories.
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    /// Schema types compiled after every other definition.
    #[serde(default)]
    pub terminal_types: Vec<String>,
    /// Prefix for canonical schema names.
    #[serde(default)]
    pub schema_prefix: Option<String>,
    /// Handling of undeclared submission keys.
    #[serde(default)]
    pub unknown_fields: UnknownFieldsPolicy,
}

fn default_extensions() -> Vec<String> {
    vec!["yaml".to_string(), "yml".to_string()]
}

fn default_recursive() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            schema_dirs: Vec::new(),
            extensions: default_extensions(),
            recursive: default_recursive(),
            terminal_types: Vec::new(),
            schema_prefix: None,
            unknown_fields: UnknownFieldsPolicy::default(),
        }
    }
}

impl LoaderConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DatabaseError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks the configuration for values the loader cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(DatabaseError::InvalidConfig(
                "extensions must not be empty".to_string(),
            ));
        }
        if let Some(ext) = self.extensions.iter().find(|e| e.trim().is_empty() || e.starts_with('.')) {
            return Err(DatabaseError::InvalidConfig(format!(
                "extension '{ext}' must be non-empty and given without a leading dot"
            )));
        }
        Ok(())
    }

    /// Returns `true` if `path` has one of the configured extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Builds an empty registry with this configuration's prefix and
    /// terminal types.
    pub fn registry(&self) -> SchemaRegistry {
        let registry = SchemaRegistry::new().with_terminal_types(&self.terminal_types);
        match &self.schema_prefix {
            Some(prefix) => registry.with_prefix(prefix.clone()),
            None => registry,
        }
    }

    /// Builds a validator over `registry` honouring the unknown-field policy.
    pub fn validator<'r>(&self, registry: &'r SchemaRegistry) -> Validator<'r> {
        registry.validator().unknown_fields(self.unknown_fields.into())
    }
}

//! Bulk loading of schema files from directories.
//!
//! [`SchemaLoader`] scans one or more directories for schema files, reads and
//! parses them in parallel, and hands the parsed definitions to
//! [`SchemaRegistry::populate`], which compiles them in dependency-safe
//! order. A file that cannot be read, parsed or compiled is logged and
//! recorded in the [`AppendReport`]; the rest of the directory still loads.
//!
//! # Loading patterns
//!
//! ```no_run
//! use mlspec_core::SchemaRegistry;
//! use mlspec_db::{LoaderConfig, SchemaLoader, append_dir};
//!
//! // Default configuration: *.yaml and *.yml, recursive
//! let registry = SchemaRegistry::new();
//! let report = append_dir(&registry, "schemas/").unwrap();
//! println!("{} schemas registered", report.registered.len());
//!
//! // From a configuration file
//! let config = LoaderConfig::load("mlspec.yml").unwrap();
//! let registry = config.registry();
//! let loader = SchemaLoader::new(config).unwrap();
//! let report = loader.append_configured(&registry).unwrap();
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.path.display(), failure.error);
//! }
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use mlspec_core::{SchemaDefinition, SchemaRegistry};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::error::{DatabaseError, Result};

/// One schema file that failed to load.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: DatabaseError,
}

/// Summary of loading one or more schema directories.
#[derive(Debug, Default)]
pub struct AppendReport {
    /// Number of candidate files found.
    pub files: usize,
    /// Newly registered schema names, in compile order.
    pub registered: Vec<String>,
    /// Schema names that were already registered.
    pub skipped: Vec<String>,
    /// Files that could not be read, parsed or compiled.
    pub failures: Vec<FileFailure>,
}

impl AppendReport {
    /// Returns `true` when every candidate file loaded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn extend(&mut self, other: AppendReport) {
        self.files += other.files;
        self.registered.extend(other.registered);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }
}

/// Loads schema directories into a registry according to a [`LoaderConfig`].
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    config: LoaderConfig,
}

impl SchemaLoader {
    /// Creates a loader after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidConfig`] if the configuration is
    /// rejected by [`LoaderConfig::validate`].
    pub fn new(config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads every directory listed in the configuration.
    ///
    /// A directory without candidate files fails the whole call, like
    /// [`append_dir`](Self::append_dir).
    pub fn append_configured(&self, registry: &SchemaRegistry) -> Result<AppendReport> {
        let mut report = AppendReport::default();
        for dir in &self.config.schema_dirs {
            report.extend(self.append_dir(registry, dir)?);
        }
        Ok(report)
    }

    /// Loads every schema file under `dir` into `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoCandidateFiles`] when the directory holds
    /// no file with a configured extension, or [`DatabaseError::IoError`]
    /// when the directory itself cannot be read. Per-file problems are
    /// collected in the report instead.
    pub fn append_dir(&self, registry: &SchemaRegistry, dir: impl AsRef<Path>) -> Result<AppendReport> {
        let dir = dir.as_ref();
        let paths = self.collect_schema_files(dir)?;
        if paths.is_empty() {
            return Err(DatabaseError::NoCandidateFiles(dir.to_path_buf()));
        }

        debug!(dir = %dir.display(), files = paths.len(), "Collected schema files");

        let parsed: Vec<(PathBuf, Result<SchemaDefinition>)> = paths
            .into_par_iter()
            .map(|path| {
                let result = read_definition(&path);
                (path, result)
            })
            .collect();

        let mut report = AppendReport {
            files: parsed.len(),
            ..AppendReport::default()
        };
        let mut definitions = Vec::new();
        let mut origins = Vec::new();

        for (path, result) in parsed {
            match result {
                Ok(definition) => {
                    definitions.push(definition);
                    origins.push(path);
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "Failed to read schema file");
                    report.failures.push(FileFailure { path, error });
                }
            }
        }

        let populated = registry.populate(definitions);
        report.registered = populated.registered;
        report.skipped = populated.skipped;

        for failure in populated.failures {
            let path = origins.get(failure.index).cloned().unwrap_or_default();
            warn!(path = %path.display(), error = %failure.error, "Failed to compile schema file");
            report.failures.push(FileFailure {
                path,
                error: DatabaseError::CompileError(failure.error),
            });
        }

        info!(
            dir = %dir.display(),
            files = report.files,
            registered = report.registered.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Appended schema directory"
        );

        Ok(report)
    }

    /// Lists the candidate schema files under `dir`, sorted.
    pub fn collect_schema_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = BTreeSet::new();
        self.collect_into(dir, &mut paths)?;
        Ok(paths.into_iter().collect())
    }

    fn collect_into(&self, dir: &Path, paths: &mut BTreeSet<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                if self.config.recursive {
                    self.collect_into(&path, paths)?;
                }
                continue;
            }

            if self.config.matches_extension(&path) {
                paths.insert(path);
            }
        }
        Ok(())
    }
}

/// Loads every schema file under `dir` with the default configuration.
pub fn append_dir(registry: &SchemaRegistry, dir: impl AsRef<Path>) -> Result<AppendReport> {
    SchemaLoader::new(LoaderConfig::default())?.append_dir(registry, dir)
}

fn read_definition(path: &Path) -> Result<SchemaDefinition> {
    let text = fs::read_to_string(path)?;
    let value: serde_yaml::Value = serde_yaml::from_str(&text)?;

    let missing = SchemaDefinition::missing_minimum_fields(&value);
    if !missing.is_empty() {
        return Err(DatabaseError::MissingSchemaEntries(missing));
    }

    Ok(SchemaDefinition::from_value(value)?)
}

//! Schema directory loading, object files and persistence for mlspec schemas.
//!
//! This crate provides the file-system surroundings of [`mlspec_core`]:
//! bulk-loading a directory of schema definitions into a registry, reading
//! submissions from files, writing validated objects back, and handing
//! objects to a storage backend in their transport encoding.
//!
//! # Quick start
//!
//! ```no_run
//! use mlspec_core::SchemaRegistry;
//! use mlspec_db::{append_dir, load_object, save_object};
//!
//! let registry = SchemaRegistry::new();
//! let report = append_dir(&registry, "schemas/").unwrap();
//! for failure in &report.failures {
//!     eprintln!("skipped {}: {}", failure.path.display(), failure.error);
//! }
//!
//! let loaded = load_object("runs/datapath.yaml", &registry.validator()).unwrap();
//! match loaded.into_result() {
//!     Ok(object) => save_object("runs/datapath.validated.yaml", &object).unwrap(),
//!     Err(report) => eprintln!("{report}"),
//! }
//! ```

mod config;
mod error;
mod loader;
mod object_io;
mod store;

pub use config::{LoaderConfig, UnknownFieldsPolicy};
pub use error::{DatabaseError, Result};
pub use loader::{AppendReport, FileFailure, SchemaLoader, append_dir};
pub use object_io::{load_object, load_object_as, save_object};
pub use store::{MemoryStore, ObjectStore, RecordKey, StoredRecord, persist, restore};

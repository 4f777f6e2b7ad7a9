//! Reading submissions from files and writing validated objects back out.

use std::io::{BufWriter, Write};
use std::path::Path;

use mlspec_core::{Loaded, ValidatedObject, Validator};

use crate::error::Result;

/// Reads a submission file and validates it.
///
/// The schema is derived from the submission's `schema_version` and
/// `schema_type` fields.
///
/// # Errors
///
/// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot be
/// read, or [`LoadError`](crate::DatabaseError::LoadError) if validation
/// cannot start. Field-level problems are in the returned [`Loaded`].
pub fn load_object(path: impl AsRef<Path>, validator: &Validator<'_>) -> Result<Loaded> {
    let text = std::fs::read_to_string(path)?;
    Ok(validator.load(text)?)
}

/// Reads a submission file and validates it against a named schema.
pub fn load_object_as(
    path: impl AsRef<Path>,
    validator: &Validator<'_>,
    schema: &str,
) -> Result<Loaded> {
    let text = std::fs::read_to_string(path)?;
    Ok(validator.load_as(schema, text)?)
}

/// Writes the YAML export of `object` to `path`.
pub fn save_object(path: impl AsRef<Path>, object: &ValidatedObject) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_yaml::to_writer(&mut writer, object)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mlspec_core::SchemaRegistry;

    use super::*;
    use crate::error::DatabaseError;

    const SCHEMA: &str = "mlspec_schema_version:\n  meta: 0.0.1\nmlspec_schema_type:\n  meta: base\nschema_version:\n  type: semver\nschema_type:\n  type: string\nrun_date:\n  type: datetime\n  required: True\n";

    #[test]
    fn test_save_then_load() {
        let registry = SchemaRegistry::new();
        registry.compiler().compile_str(SCHEMA, None).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.yaml");
        std::fs::write(
            &input,
            "schema_version: 0.0.1\nschema_type: base\nrun_date: 1970-01-01 00:00:00.00000\n",
        )
        .unwrap();

        let object = load_object(&input, &registry.validator())
            .unwrap()
            .into_result()
            .unwrap();

        let output = dir.path().join("out.yaml");
        save_object(&output, &object).unwrap();
        let again = load_object_as(&output, &registry.validator(), "0_0_1_base")
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(again, object);
    }

    #[test]
    fn test_missing_file() {
        let registry = SchemaRegistry::new();
        let err = load_object("/nonexistent/object.yaml", &registry.validator()).unwrap_err();
        assert!(matches!(err, DatabaseError::IoError(_)));
    }

    #[test]
    fn test_undetermined_schema() {
        let registry = SchemaRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.yaml");
        std::fs::write(&input, "run_date: 2020-01-01\n").unwrap();
        let err = load_object(&input, &registry.validator()).unwrap_err();
        assert!(matches!(err, DatabaseError::LoadError(_)));
    }
}

use chrono::NaiveDate;
use mlspec_core::{
    CompileError, Constraint, ConstraintError, FieldError, LoadError, SchemaDefinition,
    SchemaRegistry, UnknownFields, Value,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const BASE: &str = r#"
mlspec_schema_version:
    meta: 0.0.1
mlspec_schema_type:
    meta: base
schema_version:
  type: semver
  required: True
run_id:
  type: uuid
  required: True
run_date:
  type: datetime
  required: True
"#;

const DATAPATH: &str = r#"
mlspec_base_type:
    meta: base
mlspec_schema_version:
    meta: 0.0.1
mlspec_schema_type:
    meta: datapath
data_store:
  type: string
  required: True
connection:
  type: nested
  schema:
    endpoint:
      type: URI
      required: True
"#;

const VALID_BASE: &str = r#"
schema_version: "0.0.1"
run_id: f4bd7cee-42f9-4f29-a21e-3f78a9bad121
run_date: "1970-01-01 00:00:00.00000"
"#;

fn base_registry() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    registry.compiler().compile_str(BASE, None).unwrap();
    registry
}

fn epoch() -> Value {
    Value::DateTime(
        NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    )
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_valid_base_submission_coerces_epoch() {
    let registry = base_registry();
    let object = registry
        .validator()
        .load_as("0_0_1_base", VALID_BASE)
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(object.get("run_date"), Some(&epoch()));
    assert_eq!(object.get("schema_version"), Some(&Value::String("0.0.1".into())));
}

#[test]
fn test_missing_required_field_is_single_error() {
    let registry = base_registry();
    let submission = VALID_BASE.replace("run_date: \"1970-01-01 00:00:00.00000\"\n", "");
    let loaded = registry
        .validator()
        .load_as("0_0_1_base", submission)
        .unwrap();

    assert!(loaded.object.is_none());
    assert_eq!(loaded.errors.len(), 1);
    assert_eq!(loaded.errors.get("run_date"), Some(&[FieldError::Missing][..]));
    assert_eq!(
        loaded.errors.messages("run_date"),
        vec!["Missing data for required field."]
    );
}

#[test]
fn test_derived_before_base_fails() {
    let registry = SchemaRegistry::new();
    let err = registry.compiler().compile_str(DATAPATH, None).unwrap_err();
    assert!(matches!(err, CompileError::BaseSchemaNotFound { ref base, .. } if base == "0_0_1_base"));
    assert!(registry.is_empty());

    registry.compiler().compile_str(BASE, None).unwrap();
    let datapath = registry.compiler().compile_str(DATAPATH, None).unwrap();
    assert!(datapath.field("run_id").is_some());
}

#[test]
fn test_invalid_regex_fails_at_compile_time() {
    let registry = SchemaRegistry::new();
    let err = registry
        .compiler()
        .compile_str("all_letters:\n  type: string\n  regex: '['\n", Some("letters"))
        .unwrap_err();
    assert!(matches!(err, CompileError::InvalidRegex { ref field, .. } if field == "all_letters"));
    assert!(!registry.contains("letters"));
}

#[test]
fn test_constraint_threshold() {
    let registry = SchemaRegistry::new();
    registry
        .compiler()
        .compile_str("num:\n  type: int\n  constraint: 'x >= 1000'\n", Some("op"))
        .unwrap();

    let rejected = registry.validator().load_as("op", "num: 999\n").unwrap();
    assert_eq!(rejected.errors.len(), 1);
    assert!(rejected.errors.contains("num"));

    let accepted = registry.validator().load_as("op", "num: 1000\n").unwrap();
    assert_eq!(accepted.into_result().unwrap().get("num"), Some(&Value::Int(1000)));
}

#[test]
fn test_nested_null_reports_dotted_path() {
    let registry = base_registry();
    registry.compiler().compile_str(DATAPATH, None).unwrap();

    let submission = format!("{VALID_BASE}data_store: store\nconnection:\n  endpoint: null\n");
    let loaded = registry
        .validator()
        .load_as("0_0_1_datapath", submission)
        .unwrap();

    let paths: Vec<&str> = loaded.errors.paths().collect();
    assert_eq!(paths, vec!["connection.endpoint"]);
    assert_eq!(
        loaded.errors.get("connection.endpoint"),
        Some(&[FieldError::Null][..])
    );
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_registration_is_idempotent() {
    let registry = base_registry();
    let before = registry.names();
    let again = registry.compiler().compile_str(BASE, None).unwrap();
    assert_eq!(again.name(), "0_0_1_base");
    assert_eq!(registry.names(), before);

    let definitions = vec![
        SchemaDefinition::from_yaml(BASE).unwrap(),
        SchemaDefinition::from_yaml(DATAPATH).unwrap(),
    ];
    registry.populate(definitions.clone());
    let after_first = registry.names();
    let report = registry.populate(definitions);
    assert!(report.is_clean());
    assert!(report.registered.is_empty());
    assert_eq!(registry.names(), after_first);
}

#[test]
fn test_populate_accepts_any_order() {
    let registry = SchemaRegistry::new();
    let report = registry.populate(vec![
        SchemaDefinition::from_yaml(DATAPATH).unwrap(),
        SchemaDefinition::from_yaml(BASE).unwrap(),
    ]);
    assert!(report.is_clean());
    assert_eq!(
        registry.names(),
        vec!["0_0_1_base", "0_0_1_datapath", "0_0_1_datapath_connection"]
    );
}

#[test]
fn test_errors_accumulate_without_short_circuit() {
    let registry = base_registry();
    let submission = "schema_version: 0.0.x\nrun_id: a0xbf86c-90bc-4869-8851-b200c7ad3ccd\nrun_date: xxxx\n";
    let loaded = registry.validator().load_as("0_0_1_base", submission).unwrap();
    assert_eq!(loaded.errors.len(), 3);
    assert!(loaded.errors.iter().all(|(_, errors)| errors.len() == 1));
}

#[test]
fn test_export_revalidates_to_equal_object() {
    let registry = base_registry();
    registry.compiler().compile_str(DATAPATH, None).unwrap();
    let submission = format!(
        "{VALID_BASE}data_store: store\nconnection:\n  endpoint: https://s3.us-west-2.amazonaws.com/mybucket/puppy.jpg\n"
    );

    let object = registry
        .validator()
        .load_as("0_0_1_datapath", submission)
        .unwrap()
        .into_result()
        .unwrap();

    for exported in [object.to_yaml().unwrap(), object.to_json().unwrap()] {
        let again = registry
            .validator()
            .load_as("0_0_1_datapath", exported)
            .unwrap();
        assert!(again.errors.is_empty());
        assert_eq!(again.object.as_ref(), Some(&object));
    }
}

#[test]
fn test_non_finite_floats_are_rejected() {
    let registry = SchemaRegistry::new();
    registry
        .compiler()
        .compile_str("score:\n  type: float\n", Some("scored"))
        .unwrap();

    for raw in [".nan", ".inf", "-.inf", "'nan'"] {
        let loaded = registry
            .validator()
            .load_as("scored", format!("score: {raw}\n"))
            .unwrap();
        assert_eq!(loaded.errors.messages("score"), vec!["Not a valid number."], "{raw}");
    }

    let object = registry
        .validator()
        .load_as("scored", "score: 0.25\n")
        .unwrap()
        .into_result()
        .unwrap();
    let again = registry
        .validator()
        .load_as("scored", object.to_json().unwrap())
        .unwrap();
    assert_eq!(again.object.as_ref(), Some(&object));
}

#[test]
fn test_constraint_sandboxing() {
    assert!(Constraint::compile("__import__('os').system('x')").is_err());
    assert!(matches!(
        Constraint::compile("1 > 0"),
        Err(ConstraintError::NoVariable(_))
    ));
    assert!(matches!(
        Constraint::compile("x > y"),
        Err(ConstraintError::TooManyVariables(_))
    ));
    let nested = format!("{}x{} > 1", "(".repeat(10_000), ")".repeat(10_000));
    assert!(matches!(
        Constraint::compile(&nested),
        Err(ConstraintError::Parse { .. })
    ));
}

#[test]
fn test_unknown_fields_modes() {
    let registry = base_registry();
    let submission = format!("{VALID_BASE}surprise: 1\n");

    let strict = registry
        .validator()
        .load_as("0_0_1_base", submission.as_str())
        .unwrap();
    assert_eq!(strict.errors.get("surprise"), Some(&[FieldError::Unknown][..]));

    let lenient = registry
        .validator()
        .unknown_fields(UnknownFields::Exclude)
        .load_as("0_0_1_base", submission.as_str())
        .unwrap();
    assert!(lenient.is_valid());
}

#[test]
fn test_derived_name_requires_version_and_type() {
    let registry = base_registry();
    let err = registry.validator().load(VALID_BASE).unwrap_err();
    assert!(matches!(err, LoadError::SchemaNameUndetermined));
}

use std::fs;
use std::path::Path;

use patchguard_core::SchemaNode;
use patchguard_validate::{JsonSchemaShapeCheck, OpKind, PatchError, ValidateOptions, Validator, validate};
use serde_json::{Value, json};

fn load_json(path: &Path) -> Value {
    let contents =
        fs::read_to_string(path).unwrap_or_else(|_| panic!("missing json at {}", path.display()));
    serde_json::from_str(&contents).expect("parse json")
}

fn article_schema() -> SchemaNode {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../patchguard-core/tests/golden/article.schema.json");
    SchemaNode::from_json(load_json(&path)).expect("parse article schema")
}

fn golden_patch(name: &str) -> Value {
    load_json(&Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/golden").join(name))
}

#[test]
fn valid_patch_is_normalized() {
    let schema = article_schema();
    let patch = golden_patch("valid.patch.json");

    let outcome = validate(&patch, &schema, &ValidateOptions::default());
    assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error);
    assert_eq!(outcome.value.len(), 9);
    assert_eq!(outcome.value[0].value, Some(json!(42)));
    assert_eq!(outcome.value[4].value, Some(json!(true)));
    assert_eq!(outcome.value[6].op, OpKind::Copy);
}

#[test]
fn invalid_patch_stops_at_first_failure_by_default() {
    let schema = article_schema();
    let patch = golden_patch("invalid.patch.json");

    let outcome = validate(&patch, &schema, &ValidateOptions::default());
    let error = outcome.error.expect("patch must fail");
    assert!(matches!(error, PatchError::InvalidValue { .. }));
    assert_eq!(error.path(), Some("id"));
    assert_eq!(outcome.value.len(), 1);
    assert_eq!(outcome.value[0].value, Some(json!(4.5)));
}

#[test]
fn invalid_patch_collects_every_failure() {
    let schema = article_schema();
    let patch = golden_patch("invalid.patch.json");
    let options = ValidateOptions::default().abort_early(false);

    let outcome = validate(&patch, &schema, &options);
    let error = outcome.error.expect("patch must fail");
    let codes: Vec<&str> = error.errors().iter().map(PatchError::code).collect();
    assert_eq!(
        codes,
        vec!["invalid_value", "unknown_path", "required_removal", "malformed_operation"]
    );
    assert_eq!(outcome.value.len(), 2);
    assert_eq!(outcome.value[1].op, OpKind::Remove);
}

#[test]
fn json_schema_shape_check_agrees_on_golden_patches() {
    let schema = article_schema();
    let shape = JsonSchemaShapeCheck::new().expect("compile operation schema");
    let validator = Validator::new().with_shape_check(shape);
    let options = ValidateOptions::default().abort_early(false);

    let valid = validator.validate(&golden_patch("valid.patch.json"), &schema, &options);
    assert!(valid.is_ok());

    let invalid = validator.validate(&golden_patch("invalid.patch.json"), &schema, &options);
    let error = invalid.error.expect("patch must fail");
    assert_eq!(error.errors().len(), 4);
    assert_eq!(error.errors()[3].code(), "malformed_operation");
}

#[test]
fn report_serializes_nested_issues() {
    let schema = article_schema();
    let options = ValidateOptions::default().abort_early(false);
    let outcome = validate(&golden_patch("invalid.patch.json"), &schema, &options);

    let report = serde_json::to_value(outcome.report()).expect("serialize report");
    assert_eq!(report["valid"], json!(false));
    assert_eq!(report["error"]["code"], json!("aggregate"));
    assert_eq!(report["error"]["errors"][1]["path"], json!("coordinates.0"));
    assert_eq!(report["error"]["errors"][2]["from"], json!("id"));
}

use patchguard_core::SchemaNode;
use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::Operation;
use crate::options::ValidateOptions;

/// Emit the JSON Schema for schema documents (`*.schema.json`).
pub fn schema_json_schema() -> RootSchema {
    schema_for!(SchemaNode)
}

/// Emit the JSON Schema for validation options.
pub fn options_json_schema() -> RootSchema {
    schema_for!(ValidateOptions)
}

/// Emit the JSON Schema derived from the typed [`Operation`].
///
/// This describes the wire form only; per-kind required fields are expressed
/// by [`operation_json_schema`](crate::shape::operation_json_schema).
pub fn typed_operation_json_schema() -> RootSchema {
    schema_for!(Operation)
}

//! JSON Patch validation against a document schema.
//!
//! Operations are checked against the shape of a document, never against a
//! document instance: each pointer is resolved to the schema node governing
//! it, and carried values are checked by a [`RuleEngine`](patchguard_core::RuleEngine).

pub mod errors;
pub mod model;
pub mod options;
pub mod schema;
pub mod shape;
pub mod validate;

pub use errors::{
    OpContext, PatchError, PathSide, ShapeCheckError, ValidationIssue, ValidationReport,
};
pub use model::{OpKind, Operation};
pub use options::ValidateOptions;
pub use schema::{options_json_schema, schema_json_schema, typed_operation_json_schema};
pub use shape::{JsonSchemaShapeCheck, RequiredFields, ShapeCheck, operation_json_schema};
pub use validate::{
    OperationOutcome, Outcome, Validator, validate, validate_operation, validate_operations,
    validate_with_callback,
};

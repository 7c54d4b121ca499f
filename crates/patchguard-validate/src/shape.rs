//! Structural checks for raw operation objects.
//!
//! A shape check only verifies that an operation carries the fields its kind
//! requires; it knows nothing about the document schema.

use jsonschema::JSONSchema;
use patchguard_core::pointer::is_pointer;
use serde_json::{Value, json};

use crate::errors::{Result, ShapeCheckError};
use crate::model::OpKind;

/// Verifies that a raw operation object is well formed.
pub trait ShapeCheck {
    /// Returns a human readable reason when the operation is malformed.
    fn check(&self, operation: &Value) -> std::result::Result<(), String>;
}

impl<S: ShapeCheck + ?Sized> ShapeCheck for &S {
    fn check(&self, operation: &Value) -> std::result::Result<(), String> {
        (**self).check(operation)
    }
}

/// Shape check driven by [`OpKind::required_fields`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredFields;

impl ShapeCheck for RequiredFields {
    fn check(&self, operation: &Value) -> std::result::Result<(), String> {
        let Some(object) = operation.as_object() else {
            return Err("operation must be an object".to_string());
        };

        let kind = match object.get("op") {
            Some(Value::String(op)) => op.parse::<OpKind>()?,
            Some(_) => return Err("\"op\" must be a string".to_string()),
            None => return Err("\"op\" is required".to_string()),
        };

        for field in kind.required_fields() {
            if !object.contains_key(*field) {
                return Err(format!("\"{field}\" is required for {kind} operations"));
            }
        }

        for field in ["path", "from"] {
            match object.get(field) {
                None => {}
                Some(Value::String(pointer)) if is_pointer(pointer) => {}
                Some(Value::String(pointer)) => {
                    return Err(format!(
                        "\"{field}\" must be a JSON pointer, found '{pointer}'"
                    ));
                }
                Some(_) => return Err(format!("\"{field}\" must be a string")),
            }
        }

        Ok(())
    }
}

/// Shape check backed by [`operation_json_schema`].
pub struct JsonSchemaShapeCheck {
    compiled: JSONSchema,
}

impl JsonSchemaShapeCheck {
    pub fn new() -> Result<Self> {
        Self::from_schema(&operation_json_schema())
    }

    /// Compile a custom operation schema.
    pub fn from_schema(schema: &Value) -> Result<Self> {
        let compiled =
            JSONSchema::compile(schema).map_err(|err| ShapeCheckError::Schema(err.to_string()))?;
        Ok(Self { compiled })
    }
}

impl ShapeCheck for JsonSchemaShapeCheck {
    fn check(&self, operation: &Value) -> std::result::Result<(), String> {
        if let Err(errors) = self.compiled.validate(operation) {
            let reasons: Vec<String> = errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{path}: {error}")
                    }
                })
                .collect();
            return Err(reasons.join("; "));
        }
        Ok(())
    }
}

/// JSON Schema (draft 7) describing a well formed JSON Patch operation.
pub fn operation_json_schema() -> Value {
    let pointer = json!({ "type": "string", "pattern": "^(/[\\s\\S]*)?$" });
    let ops: Vec<&str> = OpKind::ALL.iter().map(|kind| kind.as_str()).collect();

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Operation",
        "type": "object",
        "required": ["op"],
        "properties": {
            "op": { "type": "string", "enum": ops },
            "path": pointer,
            "from": pointer,
            "value": {}
        },
        "allOf": [
            {
                "if": { "properties": { "op": { "enum": ["add", "replace", "test"] } } },
                "then": { "required": ["path", "value"] }
            },
            {
                "if": { "properties": { "op": { "const": "remove" } } },
                "then": { "required": ["path"] }
            },
            {
                "if": { "properties": { "op": { "enum": ["copy", "move"] } } },
                "then": { "required": ["from", "path"] }
            }
        ]
    })
}

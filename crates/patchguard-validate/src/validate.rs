use patchguard_core::{NodeRef, RuleEngine, SchemaNode, StandardEngine, resolve};
use serde_json::Value;
use tracing::{debug, trace};

use crate::errors::{OpContext, PatchError, PathSide, ValidationIssue, ValidationReport};
use crate::model::{OpKind, Operation};
use crate::options::ValidateOptions;
use crate::shape::{RequiredFields, ShapeCheck};

/// Result of validating one operation.
///
/// `value` is the normalized operation. It is still present when only the
/// value failed validation, so callers can inspect the coerced form.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub error: Option<PatchError>,
    pub value: Option<Operation>,
}

impl OperationOutcome {
    fn passed(operation: Operation) -> Self {
        Self {
            error: None,
            value: Some(operation),
        }
    }

    fn failed(error: PatchError) -> Self {
        Self {
            error: Some(error),
            value: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of validating a whole patch.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub error: Option<PatchError>,
    /// Normalized operations in processing order.
    pub value: Vec<Operation>,
}

impl Outcome {
    fn rejected(error: PatchError) -> Self {
        Self {
            error: Some(error),
            value: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<Operation>, PatchError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.value),
        }
    }

    pub fn report(&self) -> ValidationReport {
        ValidationReport {
            valid: self.is_ok(),
            error: self.error.as_ref().map(ValidationIssue::from),
            operations: self.value.clone(),
        }
    }
}

/// Validates patches against a schema with a rule engine and a shape check.
#[derive(Debug, Clone, Default)]
pub struct Validator<E = StandardEngine, S = RequiredFields> {
    engine: E,
    shape: S,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E, S> Validator<E, S>
where
    E: RuleEngine,
    S: ShapeCheck,
{
    pub fn with_parts(engine: E, shape: S) -> Self {
        Self { engine, shape }
    }

    /// Swap the rule engine.
    pub fn with_engine<E2: RuleEngine>(self, engine: E2) -> Validator<E2, S> {
        Validator {
            engine,
            shape: self.shape,
        }
    }

    /// Swap the shape check.
    pub fn with_shape_check<S2: ShapeCheck>(self, shape: S2) -> Validator<E, S2> {
        Validator {
            engine: self.engine,
            shape,
        }
    }

    /// Validate a single raw operation.
    ///
    /// The normalized operation carries only `op`, `path`, `from` and `value`;
    /// any other members of the raw object are dropped.
    ///
    /// An `add` to the append marker (`/list/-`) is validated like an add at
    /// any index: array items are checked by content, not position.
    pub fn validate_operation(
        &self,
        schema: &SchemaNode,
        options: &ValidateOptions,
        raw: &Value,
    ) -> OperationOutcome {
        if let Err(reason) = self.shape.check(raw) {
            debug!(event = "operation_malformed", reason = %reason);
            return OperationOutcome::failed(PatchError::MalformedOperation { reason });
        }

        let operation: Operation = match serde_json::from_value(raw.clone()) {
            Ok(operation) => operation,
            Err(err) => {
                return OperationOutcome::failed(PatchError::MalformedOperation {
                    reason: err.to_string(),
                });
            }
        };

        if !options.allowed_ops.contains(&operation.op) {
            debug!(event = "operation_disallowed", op = %operation.op);
            return OperationOutcome::failed(PatchError::DisallowedOperation {
                context: OpContext::from(&operation),
            });
        }

        let Some(target) = resolve(schema, &operation.path) else {
            if options.allow_unknown {
                debug!(event = "unknown_path_passed", path = %operation.path);
                return OperationOutcome::passed(operation);
            }
            return OperationOutcome::failed(PatchError::UnknownPath {
                side: PathSide::Target,
                pointer: operation.path.clone(),
                context: OpContext::from(&operation),
            });
        };

        let source = match operation.from.as_deref() {
            Some(from) => match resolve(schema, from) {
                Some(node) => Some(node),
                None if options.allow_unknown => {
                    debug!(event = "unknown_path_passed", from = %from);
                    None
                }
                None => {
                    return OperationOutcome::failed(PatchError::UnknownPath {
                        side: PathSide::Source,
                        pointer: from.to_string(),
                        context: OpContext::from(&operation),
                    });
                }
            },
            None => None,
        };

        trace!(
            event = "paths_resolved",
            op = %operation.op,
            path = %operation.path,
            append = operation.is_append()
        );

        let engine_options = options.engine_options();

        let removed = match operation.op {
            OpKind::Move => source
                .and_then(NodeRef::rule)
                .map(|rule| (PathSide::Source, rule)),
            OpKind::Remove => target.rule().map(|rule| (PathSide::Target, rule)),
            _ => None,
        };
        if let Some((side, rule)) = removed {
            let validated = self.engine.validate(None, rule, &engine_options);
            if let Some(violation) = validated.error {
                let pointer = match side {
                    PathSide::Source => operation.from.clone().unwrap_or_default(),
                    PathSide::Target => operation.path.clone(),
                };
                debug!(event = "required_removal", side = %side, pointer = %pointer);
                return OperationOutcome::failed(PatchError::RequiredRemoval {
                    side,
                    pointer,
                    context: OpContext::from(&operation),
                    violation,
                });
            }
        }

        let (Some(rule), Some(value)) = (target.rule(), operation.value.as_ref()) else {
            return OperationOutcome::passed(operation);
        };

        let validated = self.engine.validate(Some(value), rule, &engine_options);
        let context = OpContext::from(&operation);
        let normalized = Operation {
            value: validated.value.or(operation.value),
            ..operation
        };

        match validated.error {
            Some(violation) => {
                debug!(event = "value_rejected", path = %normalized.path, reason = %violation.message);
                OperationOutcome {
                    error: Some(PatchError::InvalidValue { context, violation }),
                    value: Some(normalized),
                }
            }
            None => OperationOutcome::passed(normalized),
        }
    }

    /// Validate a patch: an array of operations or a single operation object.
    pub fn validate(&self, patch: &Value, schema: &SchemaNode, options: &ValidateOptions) -> Outcome {
        let operations: Vec<&Value> = match patch {
            Value::Array(items) if !items.is_empty() => items.iter().collect(),
            Value::Object(_) => vec![patch],
            Value::Array(_) => {
                return Outcome::rejected(PatchError::MalformedPatch {
                    reason: "patch is empty".to_string(),
                });
            }
            Value::Null => {
                return Outcome::rejected(PatchError::MalformedPatch {
                    reason: "patch is missing".to_string(),
                });
            }
            other => {
                return Outcome::rejected(PatchError::MalformedPatch {
                    reason: format!(
                        "expected an operation or an array of operations, found {}",
                        json_type(other)
                    ),
                });
            }
        };

        let mut errors = Vec::new();
        let mut value = Vec::with_capacity(operations.len());

        for (index, raw) in operations.into_iter().enumerate() {
            let outcome = self.validate_operation(schema, options, raw);
            if let Some(operation) = outcome.value {
                value.push(operation);
            }
            if let Some(error) = outcome.error {
                debug!(event = "operation_failed", index = index, code = error.code());
                errors.push(error);
                if options.abort_early {
                    break;
                }
            }
        }

        debug!(
            event = "patch_validated",
            operations = value.len(),
            errors = errors.len()
        );

        Outcome {
            error: PatchError::aggregate(errors),
            value,
        }
    }

    /// Validate typed operations.
    pub fn validate_operations(
        &self,
        operations: &[Operation],
        schema: &SchemaNode,
        options: &ValidateOptions,
    ) -> Outcome {
        match serde_json::to_value(operations) {
            Ok(patch) => self.validate(&patch, schema, options),
            Err(err) => Outcome::rejected(PatchError::MalformedPatch {
                reason: err.to_string(),
            }),
        }
    }

    /// Validate a patch and hand the outcome to `callback` before returning.
    pub fn validate_with_callback<F, R>(
        &self,
        patch: &Value,
        schema: &SchemaNode,
        options: &ValidateOptions,
        callback: F,
    ) -> R
    where
        F: FnOnce(Option<PatchError>, Vec<Operation>) -> R,
    {
        let Outcome { error, value } = self.validate(patch, schema, options);
        callback(error, value)
    }
}

/// Validate one operation with the bundled engine and shape check.
pub fn validate_operation(
    schema: &SchemaNode,
    options: &ValidateOptions,
    operation: &Value,
) -> OperationOutcome {
    Validator::new().validate_operation(schema, options, operation)
}

/// Validate a patch with the bundled engine and shape check.
pub fn validate(patch: &Value, schema: &SchemaNode, options: &ValidateOptions) -> Outcome {
    Validator::new().validate(patch, schema, options)
}

/// Validate typed operations with the bundled engine and shape check.
pub fn validate_operations(
    operations: &[Operation],
    schema: &SchemaNode,
    options: &ValidateOptions,
) -> Outcome {
    Validator::new().validate_operations(operations, schema, options)
}

/// Validate a patch and deliver the outcome through `callback`.
pub fn validate_with_callback<F, R>(
    patch: &Value,
    schema: &SchemaNode,
    options: &ValidateOptions,
    callback: F,
) -> R
where
    F: FnOnce(Option<PatchError>, Vec<Operation>) -> R,
{
    Validator::new().validate_with_callback(patch, schema, options, callback)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

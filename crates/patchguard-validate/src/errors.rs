use std::fmt;

use patchguard_core::{Violation, dotted};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::{OpKind, Operation};

/// Which pointer of an operation an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSide {
    /// The `path` of the operation.
    Target,
    /// The `from` of a `copy` or `move`.
    Source,
}

impl fmt::Display for PathSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSide::Target => f.write_str("target"),
            PathSide::Source => f.write_str("source"),
        }
    }
}

/// Operation details attached to an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpContext {
    pub op: OpKind,
    /// Target location as a dotted accessor.
    pub path: String,
    /// Source location as a dotted accessor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl From<&Operation> for OpContext {
    fn from(operation: &Operation) -> Self {
        Self {
            op: operation.op,
            path: dotted(&operation.path),
            from: operation.from.as_deref().map(dotted),
            value: operation.value.clone(),
        }
    }
}

/// Why a patch or one of its operations was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    /// The patch is not a non-empty list of operations (or a single operation).
    #[error("invalid patch: {reason}")]
    MalformedPatch { reason: String },
    /// The operation lacks fields required by its kind.
    #[error("malformed operation: {reason}")]
    MalformedOperation { reason: String },
    #[error("operation \"{}\" is not allowed", .context.op)]
    DisallowedOperation { context: OpContext },
    /// A pointer does not match any location in the schema.
    #[error("invalid path \"{pointer}\": {side} location is not defined by the schema")]
    UnknownPath {
        side: PathSide,
        pointer: String,
        context: OpContext,
    },
    /// The value does not satisfy the rule at the target location.
    #[error("invalid value for \"{}\": {}", .context.path, .violation.message)]
    InvalidValue {
        context: OpContext,
        violation: Violation,
    },
    /// Removing the value would leave a required location empty.
    #[error("cannot remove \"{pointer}\": {}", .violation.message)]
    RequiredRemoval {
        side: PathSide,
        pointer: String,
        context: OpContext,
        violation: Violation,
    },
    /// Several operations failed; errors are in input order.
    #[error("{} operations failed validation", .errors.len())]
    Aggregate { errors: Vec<PatchError> },
}

impl PatchError {
    /// Fold collected errors: none, the single error itself, or an aggregate.
    pub fn aggregate(mut errors: Vec<PatchError>) -> Option<PatchError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(PatchError::Aggregate { errors }),
        }
    }

    /// Stable identifier of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            PatchError::MalformedPatch { .. } => "malformed_patch",
            PatchError::MalformedOperation { .. } => "malformed_operation",
            PatchError::DisallowedOperation { .. } => "disallowed_operation",
            PatchError::UnknownPath { .. } => "unknown_path",
            PatchError::InvalidValue { .. } => "invalid_value",
            PatchError::RequiredRemoval { .. } => "required_removal",
            PatchError::Aggregate { .. } => "aggregate",
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn context(&self) -> Option<&OpContext> {
        match self {
            PatchError::DisallowedOperation { context }
            | PatchError::UnknownPath { context, .. }
            | PatchError::InvalidValue { context, .. }
            | PatchError::RequiredRemoval { context, .. } => Some(context),
            PatchError::MalformedPatch { .. }
            | PatchError::MalformedOperation { .. }
            | PatchError::Aggregate { .. } => None,
        }
    }

    pub fn op(&self) -> Option<OpKind> {
        self.context().map(|context| context.op)
    }

    /// Dotted target path of the failing operation.
    pub fn path(&self) -> Option<&str> {
        self.context().map(|context| context.path.as_str())
    }

    /// Dotted source path of the failing operation.
    pub fn from(&self) -> Option<&str> {
        self.context().and_then(|context| context.from.as_deref())
    }

    pub fn value(&self) -> Option<&Value> {
        self.context().and_then(|context| context.value.as_ref())
    }

    /// Rule engine failure behind a value or removal error.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            PatchError::InvalidValue { violation, .. }
            | PatchError::RequiredRemoval { violation, .. } => Some(violation),
            _ => None,
        }
    }

    /// Sub-errors of an aggregate; empty for every other kind.
    pub fn errors(&self) -> &[PatchError] {
        match self {
            PatchError::Aggregate { errors } => errors,
            _ => &[],
        }
    }
}

/// Serializable view of a [`PatchError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<OpKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<Violation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationIssue>,
}

impl From<&PatchError> for ValidationIssue {
    fn from(error: &PatchError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.message(),
            op: error.op(),
            path: error.path().map(str::to_string),
            from: error.from().map(str::to_string),
            value: error.value().cloned(),
            violation: error.violation().cloned(),
            errors: error.errors().iter().map(ValidationIssue::from).collect(),
        }
    }
}

/// Serializable summary of a batch validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationIssue>,
    /// Normalized operations produced before validation stopped.
    pub operations: Vec<Operation>,
}

/// Errors raised while building a shape check.
#[derive(Debug, Error)]
pub enum ShapeCheckError {
    #[error("schema error: {0}")]
    Schema(String),
}

/// Result type for shape check construction.
pub type Result<T> = std::result::Result<T, ShapeCheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown(pointer: &str) -> PatchError {
        let operation = Operation::remove(pointer);
        PatchError::UnknownPath {
            side: PathSide::Target,
            pointer: pointer.to_string(),
            context: OpContext::from(&operation),
        }
    }

    #[test]
    fn aggregate_unwraps_single_error() {
        assert_eq!(PatchError::aggregate(Vec::new()), None);
        assert_eq!(
            PatchError::aggregate(vec![unknown("/a")]),
            Some(unknown("/a"))
        );

        let aggregate =
            PatchError::aggregate(vec![unknown("/a"), unknown("/b")]).expect("two errors");
        assert_eq!(aggregate.errors().len(), 2);
        assert_eq!(aggregate.code(), "aggregate");
        assert_eq!(aggregate.message(), "2 operations failed validation");
    }

    #[test]
    fn exposes_dotted_context() {
        let error = unknown("/author/emails/0");
        assert_eq!(error.path(), Some("author.emails.0"));
        assert_eq!(error.op(), Some(OpKind::Remove));
        assert!(error.message().contains("invalid path"));
    }

    #[test]
    fn issue_mirrors_error() {
        let aggregate = PatchError::Aggregate {
            errors: vec![unknown("/a"), unknown("/b")],
        };
        let issue = ValidationIssue::from(&aggregate);
        assert_eq!(issue.errors.len(), 2);
        assert_eq!(issue.errors[1].path.as_deref(), Some("b"));
    }
}

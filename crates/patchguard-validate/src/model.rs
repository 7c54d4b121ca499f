use std::fmt;
use std::str::FromStr;

use patchguard_core::pointer;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Kind of a JSON Patch operation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
    Copy,
    Move,
    Test,
}

impl OpKind {
    /// Every operation kind, in declaration order.
    pub const ALL: [OpKind; 6] = [
        OpKind::Add,
        OpKind::Remove,
        OpKind::Replace,
        OpKind::Copy,
        OpKind::Move,
        OpKind::Test,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Replace => "replace",
            OpKind::Copy => "copy",
            OpKind::Move => "move",
            OpKind::Test => "test",
        }
    }

    /// Fields an operation of this kind must carry besides `op`.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            OpKind::Add | OpKind::Replace | OpKind::Test => &["path", "value"],
            OpKind::Remove => &["path"],
            OpKind::Copy | OpKind::Move => &["from", "path"],
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        OpKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown operation '{value}'"))
    }
}

/// A single JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Operation {
    pub op: OpKind,
    /// Target location (JSON Pointer).
    pub path: String,
    /// Source location for `copy` and `move` (JSON Pointer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Operation value; a present `null` is kept as `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Value>")]
    pub value: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Operation {
    pub fn new(op: OpKind, path: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
            from: None,
            value: None,
        }
    }

    pub fn add(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(OpKind::Add, path).with_value(value)
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::new(OpKind::Remove, path)
    }

    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(OpKind::Replace, path).with_value(value)
    }

    pub fn copy(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(OpKind::Copy, path).with_from(from)
    }

    pub fn move_to(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(OpKind::Move, path).with_from(from)
    }

    pub fn test(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(OpKind::Test, path).with_value(value)
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Whether this is an `add` targeting the array append marker `-`.
    pub fn is_append(&self) -> bool {
        self.op == OpKind::Add && pointer::is_append(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn present_null_value_is_kept() {
        let op: Operation =
            serde_json::from_value(json!({ "op": "add", "path": "/a", "value": null }))
                .expect("decode operation");
        assert_eq!(op.value, Some(Value::Null));

        let op: Operation = serde_json::from_value(json!({ "op": "remove", "path": "/a" }))
            .expect("decode operation");
        assert_eq!(op.value, None);
    }

    #[test]
    fn serializes_wire_form() {
        let op = Operation::move_to("/a", "/b");
        assert_eq!(
            serde_json::to_value(&op).expect("encode operation"),
            json!({ "op": "move", "path": "/b", "from": "/a" })
        );
    }

    #[test]
    fn parses_kinds() {
        assert_eq!("copy".parse::<OpKind>(), Ok(OpKind::Copy));
        assert!("patch".parse::<OpKind>().is_err());
    }
}

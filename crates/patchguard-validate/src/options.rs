use std::collections::{BTreeMap, BTreeSet};

use patchguard_core::EngineOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::OpKind;

/// Options for patch validation.
///
/// Keys that are not recognized here land in `extra` and are forwarded to the
/// rule engine untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ValidateOptions {
    /// Stop after the first failing operation.
    pub abort_early: bool,
    /// Operation kinds accepted by the validator.
    pub allowed_ops: BTreeSet<OpKind>,
    /// Let operations on locations unknown to the schema pass through.
    pub allow_unknown: bool,
    /// Let the rule engine coerce values (ex.: `"4"` into `4`).
    pub convert: bool,
    /// Rule engine options passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            abort_early: true,
            allowed_ops: OpKind::ALL.into_iter().collect(),
            allow_unknown: false,
            convert: true,
            extra: BTreeMap::new(),
        }
    }
}

impl ValidateOptions {
    pub fn abort_early(mut self, abort_early: bool) -> Self {
        self.abort_early = abort_early;
        self
    }

    pub fn allow_unknown(mut self, allow_unknown: bool) -> Self {
        self.allow_unknown = allow_unknown;
        self
    }

    pub fn convert(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }

    pub fn allowed_ops<I>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = OpKind>,
    {
        self.allowed_ops = ops.into_iter().collect();
        self
    }

    /// Options forwarded to the rule engine; `allowed_ops` stays behind.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            abort_early: self.abort_early,
            allow_unknown: self.allow_unknown,
            convert: self.convert,
            extra: self.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_accept_every_operation() {
        let options = ValidateOptions::default();
        assert!(options.abort_early);
        assert!(options.convert);
        assert!(!options.allow_unknown);
        assert_eq!(options.allowed_ops.len(), 6);
    }

    #[test]
    fn unknown_keys_are_forwarded_without_allowed_ops() {
        let options: ValidateOptions = serde_json::from_value(json!({
            "allowed_ops": ["add"],
            "convert": false,
            "strip_unknown": true
        }))
        .expect("decode options");

        assert_eq!(options.allowed_ops, BTreeSet::from([OpKind::Add]));
        assert!(options.abort_early);

        let engine = options.engine_options();
        assert!(!engine.convert);
        assert_eq!(engine.extra.get("strip_unknown"), Some(&json!(true)));
        assert!(!engine.extra.contains_key("allowed_ops"));
    }
}

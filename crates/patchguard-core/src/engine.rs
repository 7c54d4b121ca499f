//! Value validation and coercion against [`Rule`]s.
//!
//! [`RuleEngine`] is the seam between patch validation and whatever checks
//! concrete values. [`StandardEngine`] is the bundled implementation.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::schema::{Presence, Rule, RuleKind};

/// Options understood by a rule engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Stop at the first violation instead of collecting all of them.
    pub abort_early: bool,
    /// Accept object keys that the rule does not declare.
    pub allow_unknown: bool,
    /// Coerce values into the declared kind where possible.
    pub convert: bool,
    /// Engine-specific options passed through untouched.
    pub extra: BTreeMap<String, Value>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            abort_early: true,
            allow_unknown: false,
            convert: true,
            extra: BTreeMap::new(),
        }
    }
}

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationDetail {
    /// Stable identifier of the failed constraint (ex.: `number.base`).
    pub code: String,
    pub message: String,
    /// Location inside the validated value.
    pub path: Vec<String>,
}

/// Failure reported by a rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub message: String,
    pub details: Vec<ViolationDetail>,
}

impl Violation {
    pub fn from_details(details: Vec<ViolationDetail>) -> Self {
        let message = details
            .iter()
            .map(|detail| detail.message.as_str())
            .collect::<Vec<_>>()
            .join(". ");
        Self { message, details }
    }
}

/// Result of validating one value: the normalized value plus an optional failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    /// Normalized value; `None` when the location stays absent.
    pub value: Option<Value>,
    pub error: Option<Violation>,
}

impl Validated {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Capability that checks and normalizes a value against a rule.
///
/// `value` is `None` when the location is absent, which lets callers ask
/// whether a rule tolerates removal.
pub trait RuleEngine {
    fn validate(&self, value: Option<&Value>, rule: &Rule, options: &EngineOptions) -> Validated;
}

impl<E: RuleEngine + ?Sized> RuleEngine for &E {
    fn validate(&self, value: Option<&Value>, rule: &Rule, options: &EngineOptions) -> Validated {
        (**self).validate(value, rule, options)
    }
}

/// Bundled rule engine with presence, type, bound and conversion checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEngine;

impl RuleEngine for StandardEngine {
    fn validate(&self, value: Option<&Value>, rule: &Rule, options: &EngineOptions) -> Validated {
        let mut walk = Walk {
            options,
            details: Vec::new(),
        };
        let mut path = Vec::new();
        let value = walk.visit(value, rule, &mut path);
        let error = if walk.details.is_empty() {
            None
        } else {
            Some(Violation::from_details(walk.details))
        };
        Validated { value, error }
    }
}

struct Walk<'o> {
    options: &'o EngineOptions,
    details: Vec<ViolationDetail>,
}

impl Walk<'_> {
    fn stopped(&self) -> bool {
        self.options.abort_early && !self.details.is_empty()
    }

    fn report(&mut self, path: &[String], code: &str, message: String) {
        self.details.push(ViolationDetail {
            code: code.to_string(),
            message,
            path: path.to_vec(),
        });
    }

    fn visit(&mut self, value: Option<&Value>, rule: &Rule, path: &mut Vec<String>) -> Option<Value> {
        let label = label_for(path);

        let Some(value) = value else {
            if rule.presence == Presence::Required {
                self.report(path, "any.required", format!("{label} is required"));
                return None;
            }
            return rule.default.clone();
        };

        if rule.presence == Presence::Forbidden {
            self.report(path, "any.unknown", format!("{label} is not allowed"));
            return Some(value.clone());
        }

        if value.is_null() {
            if !(rule.nullable || rule.kind == RuleKind::Any || rule.valid.contains(value)) {
                self.report(
                    path,
                    &format!("{}.base", rule.kind),
                    format!("{label} must be a {}", rule.kind),
                );
            }
            return Some(Value::Null);
        }

        let errors_before = self.details.len();
        let normalized = match rule.kind {
            RuleKind::Any => value.clone(),
            RuleKind::Boolean => self.boolean(value, &label, path),
            RuleKind::Number => self.number(value, rule, &label, path),
            RuleKind::String => self.string(value, rule, &label, path),
            RuleKind::Object => self.object(value, rule, &label, path),
            RuleKind::Array => self.array(value, rule, &label, path),
        };

        if self.details.len() == errors_before
            && !rule.valid.is_empty()
            && !rule.valid.contains(&normalized)
        {
            let allowed = rule
                .valid
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            self.report(path, "any.only", format!("{label} must be one of [{allowed}]"));
        }

        Some(normalized)
    }

    fn boolean(&mut self, value: &Value, label: &str, path: &[String]) -> Value {
        match value {
            Value::Bool(_) => value.clone(),
            Value::String(text) if self.options.convert && text.eq_ignore_ascii_case("true") => {
                Value::Bool(true)
            }
            Value::String(text) if self.options.convert && text.eq_ignore_ascii_case("false") => {
                Value::Bool(false)
            }
            _ => {
                self.report(path, "boolean.base", format!("{label} must be a boolean"));
                value.clone()
            }
        }
    }

    fn number(&mut self, value: &Value, rule: &Rule, label: &str, path: &[String]) -> Value {
        let number = match value {
            Value::Number(number) => integral(number),
            Value::String(text) if self.options.convert => match parse_number(text.trim()) {
                Some(number) => number,
                None => {
                    self.report(path, "number.base", format!("{label} must be a number"));
                    return value.clone();
                }
            },
            _ => {
                self.report(path, "number.base", format!("{label} must be a number"));
                return value.clone();
            }
        };

        let numeric = number.as_f64().unwrap_or(f64::NAN);
        if rule.integer && numeric.fract() != 0.0 {
            self.report(path, "number.integer", format!("{label} must be an integer"));
        }
        if let Some(min) = rule.min
            && numeric < min
        {
            self.report(
                path,
                "number.min",
                format!("{label} must be greater than or equal to {min}"),
            );
        }
        if let Some(max) = rule.max
            && numeric > max
        {
            self.report(
                path,
                "number.max",
                format!("{label} must be less than or equal to {max}"),
            );
        }

        Value::Number(number)
    }

    fn string(&mut self, value: &Value, rule: &Rule, label: &str, path: &[String]) -> Value {
        let Value::String(text) = value else {
            self.report(path, "string.base", format!("{label} must be a string"));
            return value.clone();
        };

        let length = text.chars().count() as f64;
        if let Some(min) = rule.min
            && length < min
        {
            self.report(
                path,
                "string.min",
                format!("{label} length must be at least {min} characters long"),
            );
        }
        if let Some(max) = rule.max
            && length > max
        {
            self.report(
                path,
                "string.max",
                format!("{label} length must be less than or equal to {max} characters long"),
            );
        }
        if let Some(pattern) = &rule.pattern {
            match Regex::new(pattern) {
                Ok(regex) if regex.is_match(text) => {}
                Ok(_) => self.report(
                    path,
                    "string.pattern.base",
                    format!("{label} with value \"{text}\" fails to match the required pattern: {pattern}"),
                ),
                Err(err) => self.report(
                    path,
                    "string.pattern.invalid",
                    format!("{label} has an invalid pattern: {err}"),
                ),
            }
        }

        value.clone()
    }

    fn object(&mut self, value: &Value, rule: &Rule, label: &str, path: &mut Vec<String>) -> Value {
        let Value::Object(fields) = value else {
            self.report(path, "object.base", format!("{label} must be of type object"));
            return value.clone();
        };

        let mut normalized = Map::new();
        for (name, child) in &rule.keys {
            if self.stopped() {
                if let Some(field) = fields.get(name) {
                    normalized.insert(name.clone(), field.clone());
                }
                continue;
            }
            path.push(name.clone());
            if let Some(child_value) = self.visit(fields.get(name), child, path) {
                normalized.insert(name.clone(), child_value);
            }
            path.pop();
        }

        // An object rule without declared keys accepts any keys.
        let open = rule.keys.is_empty() || rule.unknown || self.options.allow_unknown;
        for (name, field) in fields {
            if rule.keys.contains_key(name) {
                continue;
            }
            if !open && !self.stopped() {
                path.push(name.clone());
                let field_label = label_for(path);
                self.report(path, "object.unknown", format!("{field_label} is not allowed"));
                path.pop();
            }
            normalized.insert(name.clone(), field.clone());
        }

        Value::Object(normalized)
    }

    fn array(&mut self, value: &Value, rule: &Rule, label: &str, path: &mut Vec<String>) -> Value {
        let Value::Array(elements) = value else {
            self.report(path, "array.base", format!("{label} must be an array"));
            return value.clone();
        };

        let length = elements.len() as f64;
        if let Some(min) = rule.min
            && length < min
        {
            self.report(
                path,
                "array.min",
                format!("{label} must contain at least {min} items"),
            );
        }
        if let Some(max) = rule.max
            && length > max
        {
            self.report(
                path,
                "array.max",
                format!("{label} must contain less than or equal to {max} items"),
            );
        }

        let mut normalized = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            if self.stopped() {
                normalized.extend(elements[index..].iter().cloned());
                break;
            }
            path.push(index.to_string());
            let item = match rule.items.as_slice() {
                [] => element.clone(),
                [single] => self
                    .visit(Some(element), single, path)
                    .unwrap_or_else(|| element.clone()),
                alternatives => self.first_match(element, alternatives, path),
            };
            normalized.push(item);
            path.pop();
        }

        Value::Array(normalized)
    }

    fn first_match(&mut self, element: &Value, alternatives: &[Rule], path: &mut Vec<String>) -> Value {
        for alternative in alternatives {
            let mut scratch = Walk {
                options: self.options,
                details: Vec::new(),
            };
            let candidate = scratch.visit(Some(element), alternative, path);
            if scratch.details.is_empty() {
                return candidate.unwrap_or_else(|| element.clone());
            }
        }
        let label = label_for(path);
        self.report(
            path,
            "array.includes",
            format!("{label} does not match any of the allowed types"),
        );
        element.clone()
    }
}

fn label_for(path: &[String]) -> String {
    if path.is_empty() {
        "\"value\"".to_string()
    } else {
        format!("\"{}\"", path.join("."))
    }
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(integer) = text.parse::<i64>() {
        return Some(Number::from(integer));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(|number| integral(&number))
}

/// Collapse a float with no fractional part into its integer form (`4.0` to `4`).
fn integral(number: &Number) -> Number {
    match number.as_f64() {
        Some(float)
            if number.is_f64()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float < i64::MAX as f64 =>
        {
            Number::from(float as i64)
        }
        _ => number.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(value: Option<Value>, rule: &Rule) -> Validated {
        StandardEngine.validate(value.as_ref(), rule, &EngineOptions::default())
    }

    #[test]
    fn converts_numeric_strings() {
        let validated = check(Some(json!("4")), &Rule::number());
        assert!(validated.is_ok());
        assert_eq!(validated.value, Some(json!(4)));

        let again = check(validated.value, &Rule::number());
        assert_eq!(again.value, Some(json!(4)));
    }

    #[test]
    fn conversion_can_be_disabled() {
        let options = EngineOptions {
            convert: false,
            ..EngineOptions::default()
        };
        let validated = StandardEngine.validate(Some(&json!("4")), &Rule::number(), &options);
        let error = validated.error.expect("string must be rejected");
        assert_eq!(error.details[0].code, "number.base");
        assert_eq!(validated.value, Some(json!("4")));
    }

    #[test]
    fn absent_values_respect_presence() {
        let required = check(None, &Rule::string().required());
        assert_eq!(
            required.error.map(|error| error.message),
            Some("\"value\" is required".to_string())
        );

        let optional = check(None, &Rule::string());
        assert!(optional.is_ok());
        assert_eq!(optional.value, None);

        let defaulted = check(None, &Rule::string().default_value("draft"));
        assert_eq!(defaulted.value, Some(json!("draft")));
    }

    #[test]
    fn null_needs_nullable() {
        assert!(!check(Some(Value::Null), &Rule::string()).is_ok());
        assert!(check(Some(Value::Null), &Rule::string().nullable()).is_ok());
        assert!(check(Some(Value::Null), &Rule::any()).is_ok());
    }

    #[test]
    fn object_children_are_normalized_and_checked() {
        let rule = Rule::object()
            .key("id", Rule::number().required())
            .key("flag", Rule::boolean());
        let validated = check(Some(json!({ "id": "7", "flag": "TRUE" })), &rule);
        assert!(validated.is_ok());
        assert_eq!(validated.value, Some(json!({ "id": 7, "flag": true })));

        let missing = check(Some(json!({ "flag": true })), &rule);
        let error = missing.error.expect("id is required");
        assert_eq!(error.details[0].path, vec!["id".to_string()]);
        assert_eq!(error.message, "\"id\" is required");
    }

    #[test]
    fn unknown_keys_follow_options() {
        let rule = Rule::object().key("id", Rule::number());
        assert!(!check(Some(json!({ "id": 1, "extra": true })), &rule).is_ok());

        let options = EngineOptions {
            allow_unknown: true,
            ..EngineOptions::default()
        };
        let validated =
            StandardEngine.validate(Some(&json!({ "id": 1, "extra": true })), &rule, &options);
        assert!(validated.is_ok());
    }

    #[test]
    fn collects_all_violations_without_abort_early() {
        let rule = Rule::object()
            .key("a", Rule::number())
            .key("b", Rule::string());
        let options = EngineOptions {
            abort_early: false,
            ..EngineOptions::default()
        };
        let validated =
            StandardEngine.validate(Some(&json!({ "a": "x", "b": 1 })), &rule, &options);
        assert_eq!(validated.error.map(|error| error.details.len()), Some(2));

        let aborted = check(Some(json!({ "a": "x", "b": 1 })), &rule);
        assert_eq!(aborted.error.map(|error| error.details.len()), Some(1));
    }

    #[test]
    fn array_items_and_alternatives() {
        let homogeneous = Rule::array().item(Rule::number());
        let validated = check(Some(json!(["1", 2])), &homogeneous);
        assert_eq!(validated.value, Some(json!([1, 2])));

        let alternatives = Rule::array().item(Rule::boolean()).item(Rule::string());
        assert!(check(Some(json!([true, "x"])), &alternatives).is_ok());
        assert!(!check(Some(json!([{}])), &alternatives).is_ok());
    }

    #[test]
    fn string_bounds_and_pattern() {
        let rule = Rule::string().min(2.0).max(4.0).pattern("^[a-z]+$");
        assert!(check(Some(json!("abc")), &rule).is_ok());
        assert!(!check(Some(json!("a")), &rule).is_ok());
        assert!(!check(Some(json!("abcde")), &rule).is_ok());
        assert!(!check(Some(json!("AB")), &rule).is_ok());
    }

    #[test]
    fn valid_list_is_checked_after_conversion() {
        let rule = Rule::number().valid([1, 2]);
        assert!(check(Some(json!("2")), &rule).is_ok());
        assert!(!check(Some(json!(3)), &rule).is_ok());
    }

    #[test]
    fn integral_floats_match_integer_valid_values() {
        let rule = Rule::number().valid([json!(4)]);
        for input in [json!("4.0"), json!(4.0), json!("4e0")] {
            let validated = check(Some(input.clone()), &rule);
            assert!(validated.is_ok(), "rejected {input}");
            assert_eq!(validated.value, Some(json!(4)));
        }

        let fractional = check(Some(json!("4.5")), &Rule::number());
        assert_eq!(fractional.value, Some(json!(4.5)));
    }

    #[test]
    fn abort_early_keeps_remaining_declared_fields() {
        let rule = Rule::object()
            .key("age", Rule::number())
            .key("name", Rule::string());
        let validated = check(Some(json!({ "age": "x", "name": "Ann" })), &rule);

        let error = validated.error.expect("age must be rejected");
        assert_eq!(error.message, "\"age\" must be a number");
        assert_eq!(validated.value, Some(json!({ "age": "x", "name": "Ann" })));
    }

    #[test]
    fn forbidden_rejects_presence() {
        let rule = Rule::any().forbidden();
        assert!(check(None, &rule).is_ok());
        assert!(!check(Some(json!(1)), &rule).is_ok());
    }
}

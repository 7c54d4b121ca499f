use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::{Presence, Rule, RuleKind, SchemaNode};

/// Validate internal consistency of a schema tree.
///
/// This checks:
/// - `pattern` compiles and is only used on string rules
/// - `integer` is only used on number rules
/// - `keys`/`unknown` are only used on object rules, `items` only on array rules
/// - `min` does not exceed `max`, and length bounds are non-negative
/// - required rules do not also declare a default
pub fn validate_schema(node: &SchemaNode) -> Result<()> {
    let mut path = Vec::new();
    validate_node(node, &mut path)
}

fn validate_node(node: &SchemaNode, path: &mut Vec<String>) -> Result<()> {
    match node {
        SchemaNode::Rule(rule) => validate_rule(rule, path),
        SchemaNode::Container(children) => {
            for (name, child) in children {
                path.push(name.clone());
                validate_node(child, path)?;
                path.pop();
            }
            Ok(())
        }
    }
}

fn validate_rule(rule: &Rule, path: &mut Vec<String>) -> Result<()> {
    let location = render(path);

    if let Some(pattern) = &rule.pattern {
        if rule.kind != RuleKind::String {
            return Err(Error::InvalidSchema(format!(
                "pattern is only supported on string rules: {location}"
            )));
        }
        Regex::new(pattern).map_err(|err| {
            Error::InvalidSchema(format!("invalid pattern at {location}: {err}"))
        })?;
    }

    if rule.integer && rule.kind != RuleKind::Number {
        return Err(Error::InvalidSchema(format!(
            "integer is only supported on number rules: {location}"
        )));
    }

    if (!rule.keys.is_empty() || rule.unknown) && rule.kind != RuleKind::Object {
        return Err(Error::InvalidSchema(format!(
            "keys are only supported on object rules: {location}"
        )));
    }

    if !rule.items.is_empty() && rule.kind != RuleKind::Array {
        return Err(Error::InvalidSchema(format!(
            "items are only supported on array rules: {location}"
        )));
    }

    if let (Some(min), Some(max)) = (rule.min, rule.max)
        && min > max
    {
        return Err(Error::InvalidSchema(format!(
            "min {min} exceeds max {max}: {location}"
        )));
    }

    if matches!(rule.kind, RuleKind::String | RuleKind::Array)
        && [rule.min, rule.max].into_iter().flatten().any(|bound| bound < 0.0)
    {
        return Err(Error::InvalidSchema(format!(
            "length bounds must be non-negative: {location}"
        )));
    }

    if rule.presence == Presence::Required && rule.default.is_some() {
        return Err(Error::InvalidSchema(format!(
            "required rule cannot declare a default: {location}"
        )));
    }

    for (name, child) in &rule.keys {
        path.push(name.clone());
        validate_rule(child, path)?;
        path.pop();
    }

    for (index, item) in rule.items.iter().enumerate() {
        path.push(format!("items[{index}]"));
        validate_rule(item, path)?;
        path.pop();
    }

    Ok(())
}

fn render(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_mixed_tree() {
        let schema = SchemaNode::container([
            ("id", SchemaNode::from(Rule::number().integer().required())),
            (
                "tags",
                SchemaNode::from(Rule::array().item(Rule::string().pattern("^[a-z]+$"))),
            ),
        ]);
        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn rejects_bad_pattern_with_location() {
        let schema = SchemaNode::container([(
            "meta",
            SchemaNode::from(Rule::object().key("slug", Rule::string().pattern("(unclosed"))),
        )]);
        let err = validate_schema(&schema).expect_err("pattern must fail");
        assert!(err.to_string().contains("meta.slug"));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let schema = SchemaNode::from(Rule::number().min(5.0).max(1.0));
        assert!(validate_schema(&schema).is_err());
    }

    #[test]
    fn rejects_misplaced_keys() {
        let schema = SchemaNode::from(Rule::string().key("nested", Rule::any()));
        assert!(validate_schema(&schema).is_err());
    }

    #[test]
    fn rejects_required_with_default() {
        let schema = SchemaNode::from(Rule::string().required().default_value("x"));
        assert!(validate_schema(&schema).is_err());
    }
}

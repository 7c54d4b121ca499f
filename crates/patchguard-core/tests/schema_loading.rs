use std::fs;
use std::path::Path;

use patchguard_core::{NodeRef, Rule, RuleKind, SchemaNode, resolve};
use schemars::schema_for;

fn load_article_schema() -> SchemaNode {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/golden/article.schema.json");
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("missing schema at {}", path.display()));
    SchemaNode::from_json_str(&contents).expect("parse article schema")
}

#[test]
fn golden_schema_loads_as_container_of_rules() {
    let schema = load_article_schema();

    let SchemaNode::Container(children) = &schema else {
        panic!("top level should be a plain container");
    };
    assert_eq!(children.len(), 9);
    assert!(matches!(children.get("metadata"), Some(SchemaNode::Container(_))));
    assert_eq!(
        children.get("id").and_then(SchemaNode::as_rule),
        Some(&Rule::number().integer().required())
    );
}

#[test]
fn golden_schema_resolves_nested_locations() {
    let schema = load_article_schema();

    let name = resolve(&schema, "/author/name").and_then(NodeRef::rule);
    assert_eq!(name.map(|rule| rule.kind), Some(RuleKind::String));
    assert!(name.is_some_and(Rule::is_required));

    let reviewer = resolve(&schema, "/metadata/reviewers/0/name").and_then(NodeRef::rule);
    assert!(reviewer.is_some());

    assert!(resolve(&schema, "/coordinates/0").is_none());
    assert!(resolve(&schema, "/attachments/0").is_none());
    assert!(matches!(
        resolve(&schema, "/metadata"),
        Some(NodeRef::Container(_))
    ));
}

#[test]
fn invalid_rule_definitions_are_rejected() {
    let err = SchemaNode::from_json(serde_json::json!({
        "slug": { "type": "string", "pattern": "([" }
    }))
    .expect_err("pattern should not compile");
    assert!(err.to_string().contains("slug"));

    let err = SchemaNode::from_json(serde_json::json!({
        "slug": { "type": "string", "minimum": 3 }
    }))
    .expect_err("unknown rule field");
    assert!(err.to_string().starts_with("json error"));
}

#[test]
fn json_schema_describes_rules() {
    let generated = schema_for!(SchemaNode);
    assert!(generated.definitions.contains_key("Rule"));
    assert!(generated.definitions.contains_key("RuleKind"));
}

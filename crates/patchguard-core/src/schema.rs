use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::validation::validate_schema;

/// A node of the document schema tree.
///
/// A map carrying a string `type` decodes as a [`Rule`]; any other map is a
/// plain container whose entries are nested schema nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SchemaNode {
    /// Declarative rule checked by a rule engine.
    Rule(Rule),
    /// Plain mapping from field name to child node.
    Container(BTreeMap<String, SchemaNode>),
}

impl SchemaNode {
    /// Build a plain container from `(name, node)` pairs.
    pub fn container<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        SchemaNode::Container(
            children
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
        )
    }

    /// Decode a schema tree from JSON and check its invariants.
    pub fn from_json(value: Value) -> Result<Self> {
        let node: SchemaNode = serde_json::from_value(value)?;
        validate_schema(&node)?;
        Ok(node)
    }

    /// Decode a schema tree from a JSON string and check its invariants.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let node: SchemaNode = serde_json::from_str(text)?;
        validate_schema(&node)?;
        Ok(node)
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            SchemaNode::Rule(rule) => Some(rule),
            SchemaNode::Container(_) => None,
        }
    }
}

impl From<Rule> for SchemaNode {
    fn from(rule: Rule) -> Self {
        SchemaNode::Rule(rule)
    }
}

/// Value kind declared by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Any,
    Boolean,
    Number,
    String,
    Object,
    Array,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Any => "any",
            RuleKind::Boolean => "boolean",
            RuleKind::Number => "number",
            RuleKind::String => "string",
            RuleKind::Object => "object",
            RuleKind::Array => "array",
        };
        f.write_str(name)
    }
}

/// Whether a value must, may, or must not be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    #[default]
    Optional,
    Required,
    Forbidden,
}

impl Presence {
    fn is_optional(&self) -> bool {
        matches!(self, Presence::Optional)
    }
}

/// Declarative constraint for one location of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Declared value kind.
    #[serde(rename = "type")]
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Presence::is_optional")]
    pub presence: Presence,
    /// Value substituted when the location is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Closed list of accepted values (checked after conversion).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub valid: Vec<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// Lower bound: numeric value for numbers, length for strings and arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound: numeric value for numbers, length for strings and arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub integer: bool,
    /// Regular expression strings must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Named children of an object rule.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, Rule>,
    /// Accept keys not declared in `keys`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unknown: bool,
    /// Item rules of an array rule; several entries are alternatives.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Rule>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Rule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            presence: Presence::Optional,
            default: None,
            valid: Vec::new(),
            nullable: false,
            min: None,
            max: None,
            integer: false,
            pattern: None,
            keys: BTreeMap::new(),
            unknown: false,
            items: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self::new(RuleKind::Any)
    }

    pub fn boolean() -> Self {
        Self::new(RuleKind::Boolean)
    }

    pub fn number() -> Self {
        Self::new(RuleKind::Number)
    }

    pub fn string() -> Self {
        Self::new(RuleKind::String)
    }

    pub fn object() -> Self {
        Self::new(RuleKind::Object)
    }

    pub fn array() -> Self {
        Self::new(RuleKind::Array)
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.presence = Presence::Forbidden;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn valid<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.valid.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn min(mut self, bound: f64) -> Self {
        self.min = Some(bound);
        self
    }

    pub fn max(mut self, bound: f64) -> Self {
        self.max = Some(bound);
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Declare a named child of an object rule.
    pub fn key(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.keys.insert(name.into(), rule);
        self
    }

    pub fn unknown(mut self, allow: bool) -> Self {
        self.unknown = allow;
        self
    }

    /// Append an item rule to an array rule.
    pub fn item(mut self, rule: Rule) -> Self {
        self.items.push(rule);
        self
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Named child of an object rule.
    pub fn child(&self, name: &str) -> Option<&Rule> {
        self.keys.get(name)
    }

    /// The item rule of a homogeneous array, i.e. one declaring exactly one item rule.
    pub fn single_item(&self) -> Option<&Rule> {
        match self.items.as_slice() {
            [item] => Some(item),
            _ => None,
        }
    }
}

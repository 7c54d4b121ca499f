//! JSON Pointer helpers and the schema pointer resolver.
//!
//! The resolver walks the type-level structure of a [`SchemaNode`] tree and
//! never looks at a document instance. Array rules can therefore only be
//! indexed when they are homogeneous: with exactly one item rule every
//! element index (and the append marker `-`) maps to that rule, otherwise
//! the location is unknown.

use std::collections::BTreeMap;

use crate::schema::{Rule, RuleKind, SchemaNode};

/// Borrowed view of a resolved schema node.
///
/// Children of object rules are rules themselves, so the resolver hands out
/// either a rule or a plain container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Rule(&'a Rule),
    Container(&'a BTreeMap<String, SchemaNode>),
}

impl<'a> NodeRef<'a> {
    /// The rule governing this location, if the node is a rule.
    pub fn rule(self) -> Option<&'a Rule> {
        match self {
            NodeRef::Rule(rule) => Some(rule),
            NodeRef::Container(_) => None,
        }
    }

    /// Owned copy of the node.
    pub fn to_node(self) -> SchemaNode {
        match self {
            NodeRef::Rule(rule) => SchemaNode::Rule(rule.clone()),
            NodeRef::Container(children) => SchemaNode::Container(children.clone()),
        }
    }

    fn child(self, segment: &str) -> Option<NodeRef<'a>> {
        match self {
            NodeRef::Container(children) => children.get(segment).map(NodeRef::from),
            NodeRef::Rule(rule) if rule.kind == RuleKind::Array => {
                rule.single_item().map(NodeRef::Rule)
            }
            NodeRef::Rule(rule) => rule.child(segment).map(NodeRef::Rule),
        }
    }
}

impl<'a> From<&'a SchemaNode> for NodeRef<'a> {
    fn from(node: &'a SchemaNode) -> Self {
        match node {
            SchemaNode::Rule(rule) => NodeRef::Rule(rule),
            SchemaNode::Container(children) => NodeRef::Container(children),
        }
    }
}

/// Resolve `pointer` to the schema node governing it.
///
/// `""` and `"/"` resolve to the whole schema. `None` means the schema does
/// not recognize the location, or `pointer` is not rooted at `/`.
pub fn resolve<'a>(schema: &'a SchemaNode, pointer: &str) -> Option<NodeRef<'a>> {
    if !is_pointer(pointer) {
        return None;
    }
    let mut cursor = NodeRef::from(schema);
    for segment in segments(pointer) {
        cursor = cursor.child(&segment)?;
    }
    Some(cursor)
}

/// Decoded reference tokens of `pointer`, without the root.
pub fn segments(pointer: &str) -> Vec<String> {
    let mut tokens = pointer.split('/');
    tokens.next();
    let tokens: Vec<&str> = tokens.collect();
    if tokens == [""] {
        return Vec::new();
    }
    tokens.into_iter().map(unescape).collect()
}

/// Render `pointer` as a dotted accessor (`/a/0/b` becomes `a.0.b`).
pub fn dotted(pointer: &str) -> String {
    segments(pointer).join(".")
}

/// Whether `pointer` has JSON Pointer syntax: empty, or rooted at `/`.
pub fn is_pointer(pointer: &str) -> bool {
    pointer.is_empty() || pointer.starts_with('/')
}

/// Whether the last token of `pointer` is the array append marker `-`.
pub fn is_append(pointer: &str) -> bool {
    pointer.rsplit('/').next() == Some("-") && pointer.contains('/')
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

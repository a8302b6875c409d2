//! The markup-as-data grammar: a node is a string, a number, or an array
//! `[tag-token, {attributes}?, child*]`.

mod tag;

pub use tag::{normalize, Tag};

use crate::error::CompileError;
use serde_json::{Map, Value};

/// A container node split into its parts. Borrowed from the raw markup.
#[derive(Debug, Clone)]
pub struct Element<'a> {
    /// The tag as written, after normalization.
    pub name: &'a str,
    pub classes: Vec<&'a str>,
    pub attrs: Option<&'a Map<String, Value>>,
    pub children: &'a [Value],
    pub raw: &'a Value,
}

impl<'a> Element<'a> {
    /// Splits `[tag, {attrs}?, child*]`.
    pub fn parse(node: &'a Value) -> Result<Element<'a>, CompileError> {
        let items = match node {
            Value::Array(items) => items,
            _ => return Err(CompileError::invalid_node("expected a tagged array", node)),
        };
        let (token, rest) = match items.split_first() {
            Some((Value::String(token), rest)) => (token.as_str(), rest),
            Some(_) => {
                return Err(CompileError::invalid_node(
                    "the first element must be a tag name",
                    node,
                ))
            }
            None => return Err(CompileError::invalid_node("empty element", node)),
        };
        let (name, classes) = normalize(token);
        let (attrs, children) = match rest.split_first() {
            Some((Value::Object(map), children)) => (Some(map), children),
            _ => (None, rest),
        };
        Ok(Element {
            name,
            classes,
            attrs,
            children,
            raw: node,
        })
    }

    pub fn tag(&self) -> Result<Tag, CompileError> {
        Tag::parse(self.name).ok_or_else(|| CompileError::UnknownTag {
            tag: self.name.to_string(),
            node: self.raw.to_string(),
        })
    }

    /// The single string child of elements like `reference` and `annotation`.
    pub fn text_child(&self) -> Option<&'a str> {
        match self.children {
            [Value::String(s)] => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Leaf text of a string or number node.
pub fn leaf_text(node: &Value) -> Option<String> {
    match node {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The primary tag of a container node, if it is one.
pub fn tag_of(node: &Value) -> Option<Tag> {
    match node {
        Value::Array(items) => items
            .first()
            .and_then(Value::as_str)
            .and_then(|token| Tag::parse(normalize(token).0)),
        _ => None,
    }
}

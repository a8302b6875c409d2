//! The immutable attribute map that flows top-down through a markup tree.

use crate::color::Color;
use serde_json::{Map, Value};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Attributes that describe a single element and never flow into its children.
///
/// Structural options (table headers, list numbering flags, image sources)
/// would otherwise be re-applied by every nested element of the same kind.
pub const LOCAL_ATTRIBUTES: &[&str] = &[
    "base64",
    "colspan",
    "dingbat-number",
    "dingbats",
    "first-line-indent",
    "greek",
    "handle",
    "header",
    "height",
    "id",
    "indent",
    "keep-together",
    "leading",
    "lettered",
    "num-cols",
    "numbered",
    "roman",
    "rowspan",
    "scale",
    "spacing-after",
    "spacing-before",
    "symbol",
    "target",
    "title",
    "type",
    "widths",
    "width",
    "xscale",
    "yscale",
];

/// An immutable mapping from attribute name to value.
///
/// Cloning is cheap; every merge produces a fresh context and leaves the
/// receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleContext {
    attrs: Arc<Map<String, Value>>,
}

impl StyleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            attrs: Arc::new(normalize_keys(map)),
        }
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Returns a new context with every key of `overlay` written over this one.
    pub fn merge(&self, overlay: &Map<String, Value>) -> StyleContext {
        if overlay.is_empty() {
            return self.clone();
        }
        let mut merged = (*self.attrs).clone();
        for (key, value) in overlay {
            merged.insert(strip_keyword(key).to_string(), value.clone());
        }
        Self {
            attrs: Arc::new(merged),
        }
    }

    pub fn with(&self, key: &str, value: impl Into<Value>) -> StyleContext {
        let mut merged = (*self.attrs).clone();
        merged.insert(key.to_string(), value.into());
        Self {
            attrs: Arc::new(merged),
        }
    }

    pub fn without(&self, keys: &[&str]) -> StyleContext {
        if !keys.iter().any(|k| self.attrs.contains_key(*k)) {
            return self.clone();
        }
        let mut trimmed = (*self.attrs).clone();
        for key in keys {
            trimmed.remove(*key);
        }
        Self {
            attrs: Arc::new(trimmed),
        }
    }

    /// The context children inherit: this one minus [`LOCAL_ATTRIBUTES`].
    pub fn inheritable(&self) -> StyleContext {
        self.without(LOCAL_ATTRIBUTES)
    }

    pub fn f32(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(value_as_f32)
    }

    pub fn u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.as_u64()).and_then(|n| u32::try_from(n).ok())
    }

    /// Attribute truthiness: anything but `false`/`null`/absent counts as set.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(v) if !matches!(v, Value::Bool(false) | Value::Null))
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).map(strip_keyword)
    }

    pub fn color(&self, key: &str) -> Option<Color> {
        self.get(key).and_then(Color::from_value)
    }

    pub fn map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }
}

impl Hash for StyleContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_map(&self.attrs, state);
    }
}

/// Reads a numeric attribute; numeric strings such as `"12"` are accepted.
pub fn value_as_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

/// Keyword-style names may carry a leading `:`; both spellings are equivalent.
pub fn strip_keyword(name: &str) -> &str {
    name.strip_prefix(':').unwrap_or(name)
}

pub(crate) fn normalize_keys(map: Map<String, Value>) -> Map<String, Value> {
    if !map.keys().any(|k| k.starts_with(':')) {
        return map;
    }
    map.into_iter()
        .map(|(k, v)| (strip_keyword(&k).to_string(), v))
        .collect()
}

/// Feeds a JSON value into `state` structurally.
///
/// Every variant is prefixed by its own discriminant byte so that, for example,
/// the string `"1"` and the number `1` never produce the same stream. Object
/// keys are visited in sorted order, which makes the result independent of
/// insertion order.
pub fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            if let Some(i) = n.as_i64() {
                i.hash(state);
            } else if let Some(u) = n.as_u64() {
                u.hash(state);
            } else if let Some(f) = n.as_f64() {
                f.to_bits().hash(state);
            }
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            hash_map(map, state);
        }
    }
}

fn hash_map<H: Hasher>(map: &Map<String, Value>, state: &mut H) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();
    keys.len().hash(state);
    for key in keys {
        key.hash(state);
        hash_value(&map[key.as_str()], state);
    }
}

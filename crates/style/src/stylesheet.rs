//! Class-based stylesheets and the cascade that combines them with ambient
//! and inline attributes.

use crate::context::{normalize_keys, strip_keyword, StyleContext};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Maps a class name to the attribute map it contributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    classes: HashMap<String, Map<String, Value>>,
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: &str, attrs: Map<String, Value>) {
        self.classes
            .insert(strip_keyword(class).to_string(), normalize_keys(attrs));
    }

    /// Looks up a class by name; a leading `:` is ignored.
    pub fn get(&self, class: &str) -> Option<&Map<String, Value>> {
        self.classes.get(strip_keyword(class))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl<'de> Deserialize<'de> for Stylesheet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: HashMap<String, Map<String, Value>> = HashMap::deserialize(deserializer)?;
        let mut sheet = Stylesheet::new();
        for (class, attrs) in raw {
            sheet.insert(&class, attrs);
        }
        Ok(sheet)
    }
}

/// Computes the context for one element.
///
/// Starts from `ambient`, merges each class of `classes` in declared order
/// (later classes win on conflicting keys), then merges `inline` over the
/// result. Classes missing from the stylesheet contribute nothing.
pub fn resolve(
    ambient: &StyleContext,
    stylesheet: &Stylesheet,
    classes: &[&str],
    inline: Option<&Map<String, Value>>,
) -> StyleContext {
    let mut resolved = ambient.clone();
    for class in classes {
        match stylesheet.get(class) {
            Some(attrs) => resolved = resolved.merge(attrs),
            None => log::debug!("Class '{}' is not defined in the stylesheet", class),
        }
    }
    if let Some(inline) = inline {
        resolved = resolved.merge(inline);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn sheet() -> Stylesheet {
        serde_json::from_value(json!({
            "title": {"size": 20, "style": "bold", "color": [1, 1, 1]},
            ":muted": {"color": [128, 128, 128]},
            "small": {"size": 8}
        }))
        .unwrap()
    }

    #[test]
    fn later_class_wins_on_conflicts() {
        let ambient = StyleContext::from_map(map(json!({"size": 10, "family": "courier"})));
        let resolved = resolve(&ambient, &sheet(), &["title", "small"], None);
        assert_eq!(resolved.f32("size"), Some(8.0));
        assert_eq!(resolved.str("style"), Some("bold"));
        assert_eq!(resolved.str("family"), Some("courier"));

        let reversed = resolve(&ambient, &sheet(), &["small", "title"], None);
        assert_eq!(reversed.f32("size"), Some(20.0));
    }

    #[test]
    fn inline_attributes_win_over_every_class() {
        let inline = map(json!({"size": 33, "color": [5, 6, 7]}));
        let resolved = resolve(
            &StyleContext::new(),
            &sheet(),
            &["title", "muted", "small"],
            Some(&inline),
        );
        for (key, value) in &inline {
            assert_eq!(resolved.get(key), Some(value));
        }
    }

    #[test]
    fn unknown_classes_are_ignored() {
        let ambient = StyleContext::from_map(map(json!({"size": 10})));
        let resolved = resolve(&ambient, &sheet(), &["nope"], None);
        assert_eq!(resolved, ambient);
    }
}

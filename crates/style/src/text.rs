use crate::context::strip_keyword;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

impl Alignment {
    pub fn parse(name: &str) -> Option<Self> {
        match strip_keyword(name).to_ascii_lowercase().as_str() {
            "left" => Some(Alignment::Left),
            "center" | "centre" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            "justified" | "justify" => Some(Alignment::Justified),
            _ => None,
        }
    }

    /// Parses `name`, falling back to `default` with a warning.
    pub fn parse_or(name: Option<&str>, default: Alignment) -> Alignment {
        match name {
            None => default,
            Some(name) => Alignment::parse(name).unwrap_or_else(|| {
                log::warn!("Unknown alignment '{}', using {:?}", name, default);
                default
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VerticalAlignment {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl VerticalAlignment {
    pub fn parse_or(name: Option<&str>, default: VerticalAlignment) -> VerticalAlignment {
        match name.map(|n| strip_keyword(n).to_ascii_lowercase()) {
            None => default,
            Some(n) => match n.as_str() {
                "top" => VerticalAlignment::Top,
                "middle" | "center" => VerticalAlignment::Middle,
                "bottom" => VerticalAlignment::Bottom,
                _ => {
                    log::warn!("Unknown vertical alignment '{}', using {:?}", n, default);
                    default
                }
            },
        }
    }
}

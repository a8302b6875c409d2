//! Page sizes, orientation and margins.
use crate::context::strip_keyword;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::hash::{Hash, Hasher};

pub const DEFAULT_MARGIN: f32 = 36.0;

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Hash for Margins {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.top.to_bits().hash(state);
        self.right.to_bits().hash(state);
        self.bottom.to_bits().hash(state);
        self.left.to_bits().hash(state);
    }
}

impl Eq for Margins {}

impl Default for Margins {
    fn default() -> Self {
        Margins::all(DEFAULT_MARGIN)
    }
}

impl Margins {
    pub fn all(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

/// Named page presets, in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSize {
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
    A7,
    A8,
    A9,
    A10,
    B0,
    B1,
    B2,
    B3,
    B4,
    B5,
    Letter,
    Legal,
    Ledger,
    Tabloid,
    Executive,
    Note,
    HalfLetter,
    Postcard,
    Custom { width: f32, height: f32 },
}

impl Eq for PageSize {}

impl Hash for PageSize {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (w, h) = self.dimensions_pt();
        w.to_bits().hash(state);
        h.to_bits().hash(state);
    }
}

impl PageSize {
    pub fn from_name(name: &str) -> Option<PageSize> {
        let size = match strip_keyword(name).to_ascii_lowercase().as_str() {
            "a0" => PageSize::A0,
            "a1" => PageSize::A1,
            "a2" => PageSize::A2,
            "a3" => PageSize::A3,
            "a4" => PageSize::A4,
            "a5" => PageSize::A5,
            "a6" => PageSize::A6,
            "a7" => PageSize::A7,
            "a8" => PageSize::A8,
            "a9" => PageSize::A9,
            "a10" => PageSize::A10,
            "b0" => PageSize::B0,
            "b1" => PageSize::B1,
            "b2" => PageSize::B2,
            "b3" => PageSize::B3,
            "b4" => PageSize::B4,
            "b5" => PageSize::B5,
            "letter" => PageSize::Letter,
            "legal" => PageSize::Legal,
            "ledger" => PageSize::Ledger,
            "tabloid" => PageSize::Tabloid,
            "executive" => PageSize::Executive,
            "note" => PageSize::Note,
            "half-letter" => PageSize::HalfLetter,
            "postcard" => PageSize::Postcard,
            _ => return None,
        };
        Some(size)
    }

    /// Width and height in portrait orientation.
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            PageSize::A0 => (2384.0, 3370.0),
            PageSize::A1 => (1684.0, 2384.0),
            PageSize::A2 => (1191.0, 1684.0),
            PageSize::A3 => (842.0, 1191.0),
            PageSize::A4 => (595.0, 842.0),
            PageSize::A5 => (420.0, 595.0),
            PageSize::A6 => (298.0, 420.0),
            PageSize::A7 => (210.0, 298.0),
            PageSize::A8 => (147.0, 210.0),
            PageSize::A9 => (105.0, 147.0),
            PageSize::A10 => (74.0, 105.0),
            PageSize::B0 => (2834.0, 4008.0),
            PageSize::B1 => (2004.0, 2834.0),
            PageSize::B2 => (1417.0, 2004.0),
            PageSize::B3 => (1000.0, 1417.0),
            PageSize::B4 => (708.0, 1000.0),
            PageSize::B5 => (498.0, 708.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Ledger => (1224.0, 792.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Executive => (522.0, 756.0),
            PageSize::Note => (540.0, 720.0),
            PageSize::HalfLetter => (396.0, 612.0),
            PageSize::Postcard => (283.0, 416.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

impl<'de> Deserialize<'de> for PageSize {
    /// Accepts a preset name or an explicit `[width, height]` pair. Unknown
    /// names fall back to A4.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(name) => Ok(PageSize::from_name(&name).unwrap_or_else(|| {
                log::warn!("Unknown page size '{}', using A4", name);
                PageSize::A4
            })),
            Value::Array(pair) if pair.len() == 2 => {
                let width = pair[0].as_f64();
                let height = pair[1].as_f64();
                match (width, height) {
                    (Some(w), Some(h)) => Ok(PageSize::Custom {
                        width: w as f32,
                        height: h as f32,
                    }),
                    _ => Err(de::Error::custom("page size dimensions must be numbers")),
                }
            }
            other => Err(de::Error::custom(format!("invalid page size: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Resolved page dimensions plus margins, fixed for the whole build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
}

impl PageGeometry {
    /// Landscape swaps the axes so the long edge runs horizontally.
    pub fn new(size: PageSize, orientation: Orientation, margins: Margins) -> Self {
        let (w, h) = size.dimensions_pt();
        let (width, height) = match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (w.max(h), w.min(h)),
        };
        Self {
            width,
            height,
            margins,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margins.left - self.margins.right
    }

    pub fn content_height(&self) -> f32 {
        self.height - self.margins.top - self.margins.bottom
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry::new(PageSize::A4, Orientation::Portrait, Margins::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn landscape_rotates_the_page() {
        let geometry = PageGeometry::new(PageSize::A4, Orientation::Landscape, Margins::all(10.0));
        assert_eq!((geometry.width, geometry.height), (842.0, 595.0));
        assert_eq!(geometry.content_width(), 822.0);
    }

    #[test]
    fn page_size_deserializes_presets_and_pairs() {
        let letter: PageSize = serde_json::from_value(json!(":letter")).unwrap();
        assert_eq!(letter, PageSize::Letter);
        let custom: PageSize = serde_json::from_value(json!([200, 300])).unwrap();
        assert_eq!(custom.dimensions_pt(), (200.0, 300.0));
        let unknown: PageSize = serde_json::from_value(json!("napkin")).unwrap();
        assert_eq!(unknown, PageSize::A4);
    }
}

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// An opaque RGB color. Markup writes colors as `[r, g, b]` triples.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn gray(value: u8) -> Self {
        Self { r: value, g: value, b: value }
    }

    /// Components scaled to the `0.0..=1.0` range PDF color operators expect.
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    /// Reads a color from an attribute value: `[r, g, b]` or `"#RRGGBB"`.
    pub fn from_value(value: &Value) -> Option<Color> {
        match value {
            Value::Array(parts) if parts.len() == 3 => {
                let mut channels = [0u8; 3];
                for (slot, part) in channels.iter_mut().zip(parts) {
                    let n = part.as_f64()?;
                    *slot = n.clamp(0.0, 255.0) as u8;
                }
                Some(Color::rgb(channels[0], channels[1], channels[2]))
            }
            Value::String(s) => Self::parse_hex(s).ok(),
            _ => None,
        }
    }

    /// Parse a hex color string (#RGB or #RRGGBB format)
    fn parse_hex(s: &str) -> Result<Color, String> {
        let s = s.trim();
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("Color must start with #, got: {}", s))?;

        let channel = |digits: &str| {
            u8::from_str_radix(digits, 16).map_err(|e| format!("Invalid color component: {}", e))
        };
        match hex.len() {
            3 => Ok(Color {
                r: channel(&hex[0..1].repeat(2))?,
                g: channel(&hex[1..2].repeat(2))?,
                b: channel(&hex[2..3].repeat(2))?,
            }),
            6 => Ok(Color {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            _ => Err(format!(
                "Invalid hex color length: expected 3 or 6, got {}",
                hex.len()
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Color::from_value(&value)
            .ok_or_else(|| de::Error::custom(format!("invalid color: {}", value)))
    }
}

use crate::color::Color;
use crate::context::{strip_keyword, value_as_f32, StyleContext};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::hash::{Hash, Hasher};

pub const DEFAULT_FONT_SIZE: f32 = 10.0;

/// The standard PDF font families every viewer ships.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    Courier,
    #[default]
    Helvetica,
    TimesRoman,
    Symbol,
    ZapfDingbats,
}

impl FontFamily {
    pub fn parse(name: &str) -> Option<Self> {
        match strip_keyword(name).to_ascii_lowercase().as_str() {
            "courier" => Some(FontFamily::Courier),
            "helvetica" => Some(FontFamily::Helvetica),
            "times" | "times-roman" => Some(FontFamily::TimesRoman),
            "symbol" => Some(FontFamily::Symbol),
            "zapfdingbats" | "zapf-dingbats" => Some(FontFamily::ZapfDingbats),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
    BoldItalic,
    Underline,
    Strikethru,
}

impl FontStyle {
    pub fn parse(name: &str) -> Option<Self> {
        match strip_keyword(name).to_ascii_lowercase().as_str() {
            "normal" => Some(FontStyle::Normal),
            "bold" => Some(FontStyle::Bold),
            "italic" => Some(FontStyle::Italic),
            "bold-italic" => Some(FontStyle::BoldItalic),
            "underline" => Some(FontStyle::Underline),
            "strikethru" | "line-through" => Some(FontStyle::Strikethru),
            _ => None,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }
}

/// A fully resolved font: what a text run is drawn with.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Font {
    pub family: FontFamily,
    pub size: f32,
    pub style: FontStyle,
    pub color: Color,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: FontFamily::default(),
            size: DEFAULT_FONT_SIZE,
            style: FontStyle::default(),
            color: Color::BLACK,
        }
    }
}

impl Eq for Font {}

impl Hash for Font {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family.hash(state);
        self.size.to_bits().hash(state);
        self.style.hash(state);
        self.color.hash(state);
    }
}

impl Font {
    /// Resolves the font described by the flat `family`/`size`/`style`/`color`
    /// attributes of a context.
    pub fn from_context(context: &StyleContext) -> Font {
        Font::default().overridden_by(context.attrs())
    }

    /// Applies whichever font attributes `attrs` carries over this font.
    ///
    /// Unknown family or style names keep the current value.
    pub fn overridden_by(mut self, attrs: &Map<String, Value>) -> Font {
        if let Some(name) = attrs.get("family").and_then(Value::as_str) {
            match FontFamily::parse(name) {
                Some(family) => self.family = family,
                None => log::warn!("Unknown font family '{}', keeping {:?}", name, self.family),
            }
        }
        if let Some(size) = attrs.get("size").and_then(value_as_f32) {
            self.size = size;
        }
        // `style` doubles as a nested font map on anchors and headings; only
        // the string form names a font style.
        if let Some(name) = attrs.get("style").and_then(Value::as_str) {
            match FontStyle::parse(name) {
                Some(style) => self.style = style,
                None => log::warn!("Unknown font style '{}', keeping {:?}", name, self.style),
            }
        }
        if let Some(color) = attrs.get("color").and_then(Color::from_value) {
            self.color = color;
        }
        self
    }

    pub fn with_size(mut self, size: f32) -> Font {
        self.size = size;
        self
    }

    pub fn with_style(mut self, style: FontStyle) -> Font {
        self.style = style;
        self
    }

    /// The base font name of the matching standard Type1 font.
    pub fn postscript_name(&self) -> &'static str {
        let bold = self.style.is_bold();
        let italic = self.style.is_italic();
        match (self.family, bold, italic) {
            (FontFamily::Courier, false, false) => "Courier",
            (FontFamily::Courier, true, false) => "Courier-Bold",
            (FontFamily::Courier, false, true) => "Courier-Oblique",
            (FontFamily::Courier, true, true) => "Courier-BoldOblique",
            (FontFamily::Helvetica, false, false) => "Helvetica",
            (FontFamily::Helvetica, true, false) => "Helvetica-Bold",
            (FontFamily::Helvetica, false, true) => "Helvetica-Oblique",
            (FontFamily::Helvetica, true, true) => "Helvetica-BoldOblique",
            (FontFamily::TimesRoman, false, false) => "Times-Roman",
            (FontFamily::TimesRoman, true, false) => "Times-Bold",
            (FontFamily::TimesRoman, false, true) => "Times-Italic",
            (FontFamily::TimesRoman, true, true) => "Times-BoldItalic",
            (FontFamily::Symbol, _, _) => "Symbol",
            (FontFamily::ZapfDingbats, _, _) => "ZapfDingbats",
        }
    }
}

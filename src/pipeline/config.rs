// src/pipeline/config.rs
use crate::error::PipelineError;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use sheaf_style::{
    strip_keyword, Alignment, Font, FontFamily, Margins, Orientation, PageGeometry, PageSize,
    StyleContext, Stylesheet,
};
use sheaf_traits::{DocumentInfo, RunningFooter};

pub const DEFAULT_FOOTER_SEPARATOR: &str = " / ";
pub const DEFAULT_FOOTER_SIZE: f32 = 10.0;

/// Document metadata: the map that opens every document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DocumentConfig {
    pub size: PageSize,
    #[serde(deserialize_with = "lenient_orientation")]
    pub orientation: Orientation,
    pub left_margin: Option<f32>,
    pub right_margin: Option<f32>,
    pub top_margin: Option<f32>,
    pub bottom_margin: Option<f32>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    /// A single custom `[name, value]` entry for the document information.
    pub doc_header: Option<(String, String)>,
    /// Text drawn at the top of every page after the letterhead.
    pub header: Option<String>,
    /// Items rendered before the header is attached, so only the first page carries them.
    pub letterhead: Vec<Value>,
    pub footer: FooterSetting,
    /// Stamp the true page total into the footer with a second pass.
    pub pages: bool,
    /// Ambient style every top-level item starts from.
    pub font_style: Map<String, Value>,
    #[serde(rename = "register-system-fonts?")]
    pub register_system_fonts: bool,
    pub stylesheet: Stylesheet,
    pub references: Map<String, Value>,
    /// Names of registered page events to attach to the engine.
    pub page_events: Vec<String>,
}

fn lenient_orientation<'de, D>(deserializer: D) -> Result<Orientation, D::Error>
where
    D: Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(match name.as_deref().map(strip_keyword) {
        None | Some("portrait") => Orientation::Portrait,
        Some("landscape") => Orientation::Landscape,
        Some(other) => {
            log::warn!("Unknown orientation '{}', using portrait", other);
            Orientation::Portrait
        }
    })
}

impl DocumentConfig {
    /// Reads metadata from a JSON map; keys may carry a leading `:`.
    pub fn from_value(value: &Value) -> Result<Self, PipelineError> {
        let map = value
            .as_object()
            .ok_or_else(|| PipelineError::Config(format!("document metadata must be a map, got {}", value)))?;
        let normalized: Map<String, Value> = map
            .iter()
            .map(|(k, v)| (strip_keyword(k).to_string(), v.clone()))
            .collect();
        Ok(serde_json::from_value(Value::Object(normalized))?)
    }

    /// Size, then orientation, then margins.
    pub fn geometry(&self) -> PageGeometry {
        let defaults = Margins::default();
        let margins = Margins {
            top: self.top_margin.unwrap_or(defaults.top),
            right: self.right_margin.unwrap_or(defaults.right),
            bottom: self.bottom_margin.unwrap_or(defaults.bottom),
            left: self.left_margin.unwrap_or(defaults.left),
        };
        PageGeometry::new(self.size, self.orientation, margins)
    }

    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            title: self.title.clone(),
            subject: self.subject.clone(),
            author: self.author.clone(),
            creator: self.creator.clone(),
            custom: self.doc_header.clone(),
        }
    }

    /// The context every top-level item compiles in: `font-style` plus the
    /// page geometry images need to fit themselves.
    pub fn ambient_context(&self, geometry: &PageGeometry) -> StyleContext {
        let page = json!({
            "page-width": geometry.width,
            "page-height": geometry.height,
            "left-margin": geometry.margins.left,
            "right-margin": geometry.margins.right,
            "top-margin": geometry.margins.top,
            "bottom-margin": geometry.margins.bottom,
        });
        let base = StyleContext::from_map(self.font_style.clone());
        match page {
            Value::Object(page) => base.merge(&page),
            _ => base,
        }
    }
}

/// The `footer` key: `false`, a bare text, or a full description.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FooterSetting {
    Enabled(bool),
    Text(String),
    Custom(FooterSpec),
}

impl Default for FooterSetting {
    fn default() -> Self {
        FooterSetting::Enabled(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FooterSpec {
    pub text: String,
    pub align: Option<String>,
    pub start_page: u32,
    pub page_numbers: bool,
    pub footer_separator: String,
    pub size: Option<f32>,
}

impl Default for FooterSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            align: None,
            start_page: 1,
            page_numbers: true,
            footer_separator: DEFAULT_FOOTER_SEPARATOR.to_string(),
            size: None,
        }
    }
}

impl FooterSetting {
    /// `None` when the footer is switched off.
    pub fn layout(&self) -> Option<FooterLayout> {
        let spec = match self {
            FooterSetting::Enabled(false) => return None,
            FooterSetting::Enabled(true) => FooterSpec::default(),
            FooterSetting::Text(text) => FooterSpec {
                text: text.clone(),
                ..FooterSpec::default()
            },
            FooterSetting::Custom(spec) => spec.clone(),
        };
        Some(FooterLayout {
            text: spec.text,
            align: Alignment::parse_or(spec.align.as_deref(), Alignment::Right),
            start_page: spec.start_page.max(1),
            page_numbers: spec.page_numbers,
            separator: spec.footer_separator,
            font: Font {
                family: FontFamily::Helvetica,
                size: spec.size.unwrap_or(DEFAULT_FOOTER_SIZE),
                ..Font::default()
            },
        })
    }
}

/// A footer with every default filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterLayout {
    pub text: String,
    pub align: Alignment,
    pub start_page: u32,
    pub page_numbers: bool,
    pub separator: String,
    pub font: Font,
}

impl FooterLayout {
    /// Footer text for `page`; the total is only known in the stamping pass.
    pub fn label(&self, page: u32, total: Option<u32>) -> String {
        if !self.page_numbers {
            return self.text.clone();
        }
        let number = match total {
            Some(total) => format!("{}{}{}", page, self.separator, total),
            None => page.to_string(),
        };
        if self.text.is_empty() {
            number
        } else {
            format!("{} {}", self.text, number)
        }
    }

    pub fn applies_to(&self, page: u32) -> bool {
        page >= self.start_page
    }

    pub fn running_footer(&self) -> RunningFooter {
        RunningFooter {
            text: self.text.clone(),
            align: self.align,
            page_numbers: self.page_numbers,
            start_page: self.start_page,
            font: self.font,
        }
    }
}

/// How the finished document reaches its destination. Chosen once per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStrategy {
    /// The engine writes straight to the destination; footers show page numbers only.
    DirectWrite,
    /// The engine writes to memory, then every page is stamped knowing the total.
    BufferThenStamp,
}

impl OutputStrategy {
    pub fn resolve(config: &DocumentConfig, page_stamps: usize) -> Self {
        let total_footer = config.pages && config.footer.layout().is_some();
        if total_footer || page_stamps > 0 {
            OutputStrategy::BufferThenStamp
        } else {
            OutputStrategy::DirectWrite
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(value: Value) -> DocumentConfig {
        DocumentConfig::from_value(&value).unwrap()
    }

    #[test]
    fn defaults_are_a4_portrait_with_numbered_footer() {
        let c = config(json!({}));
        let geometry = c.geometry();
        assert_eq!((geometry.width, geometry.height), (595.0, 842.0));
        assert_eq!(geometry.margins, Margins::all(36.0));
        let footer = c.footer.layout().unwrap();
        assert!(footer.page_numbers);
        assert_eq!(footer.separator, " / ");
        assert_eq!(footer.start_page, 1);
        assert_eq!(footer.font.size, 10.0);
        assert_eq!(OutputStrategy::resolve(&c, 0), OutputStrategy::DirectWrite);
    }

    #[test]
    fn metadata_keys_accept_keyword_spelling() {
        let c = config(json!({
            ":size": "letter",
            ":orientation": ":landscape",
            ":left-margin": 10,
            ":title": "Report",
            ":doc-header": ["Department", "Finance"],
            ":register-system-fonts?": true
        }));
        let geometry = c.geometry();
        assert_eq!((geometry.width, geometry.height), (792.0, 612.0));
        assert_eq!(geometry.margins.left, 10.0);
        assert_eq!(geometry.margins.right, 36.0);
        assert!(c.register_system_fonts);
        let info = c.info();
        assert_eq!(info.title.as_deref(), Some("Report"));
        assert_eq!(info.custom, Some(("Department".into(), "Finance".into())));
    }

    #[test]
    fn unknown_orientation_falls_back_to_portrait() {
        assert_eq!(config(json!({"orientation": "diagonal"})).orientation, Orientation::Portrait);
    }

    #[test]
    fn footer_forms() {
        assert!(config(json!({"footer": false})).footer.layout().is_none());
        let text = config(json!({"footer": "Page"})).footer.layout().unwrap();
        assert_eq!(text.label(2, Some(3)), "Page 2 / 3");
        assert_eq!(text.label(2, None), "Page 2");

        let custom = config(json!({
            "footer": {"text": "p.", "align": "center", "start-page": 2,
                       "footer-separator": " of ", "size": 8}
        }))
        .footer
        .layout()
        .unwrap();
        assert_eq!(custom.align, Alignment::Center);
        assert_eq!(custom.label(4, Some(9)), "p. 4 of 9");
        assert!(!custom.applies_to(1));
        assert!(custom.applies_to(2));
        assert_eq!(custom.font.size, 8.0);

        let plain = config(json!({"footer": {"text": "Draft", "page-numbers": false}}))
            .footer
            .layout()
            .unwrap();
        assert_eq!(plain.label(1, Some(5)), "Draft");

        let bare = FooterSetting::default().layout().unwrap();
        assert_eq!(bare.label(1, Some(2)), "1 / 2");
    }

    #[test]
    fn strategy_is_resolved_from_pages_and_stamps() {
        assert_eq!(
            OutputStrategy::resolve(&config(json!({"pages": true})), 0),
            OutputStrategy::BufferThenStamp
        );
        assert_eq!(
            OutputStrategy::resolve(&config(json!({"pages": true, "footer": false})), 0),
            OutputStrategy::DirectWrite
        );
        assert_eq!(
            OutputStrategy::resolve(&config(json!({})), 1),
            OutputStrategy::BufferThenStamp
        );
    }

    #[test]
    fn ambient_context_carries_page_geometry() {
        let c = config(json!({"font-style": {"size": 12}, "top-margin": 50}));
        let context = c.ambient_context(&c.geometry());
        assert_eq!(context.f32("size"), Some(12.0));
        assert_eq!(context.f32("page-width"), Some(595.0));
        assert_eq!(context.f32("top-margin"), Some(50.0));
    }

    #[test]
    fn metadata_must_be_a_map() {
        assert!(matches!(
            DocumentConfig::from_value(&json!(["paragraph"])),
            Err(PipelineError::Config(_))
        ));
    }
}

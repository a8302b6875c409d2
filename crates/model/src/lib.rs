//! Document Model
//!
//! The compiled, renderer-ready tree the markup compiler produces and the
//! document engine consumes. Every container owns its children; the only
//! sharing happens through the `Arc` payloads of cached variants (images,
//! charts, vector graphics and resolved references), which point at the single
//! compiled instance held by the build's content cache.

mod list;

pub use list::{to_roman, ListKind};

use sheaf_style::{Alignment, Color, Font, FontFamily, VerticalAlignment};
use std::sync::Arc;

// --- Shared Types ---

/// Reference-counted immutable bytes, used for image payloads.
pub type SharedData = Arc<Vec<u8>>;

// --- Main Node Enum ---

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A run of text drawn with one font.
    Text(TextRun),
    Paragraph(Paragraph),
    Phrase(Phrase),
    List(List),
    Table(Table),
    /// A table with explicit relative column widths.
    GridTable(Table),
    Cell(Cell),
    GridCell(Cell),
    Image(Arc<Image>),
    Chart(Arc<Drawable>),
    VectorGraphic(Arc<Drawable>),
    Anchor(Anchor),
    Annotation(Annotation),
    Chapter(Chapter),
    Section(Section),
    /// A horizontal divider line.
    Line(Line),
    Spacer(Spacer),
    Subscript(TextRun),
    Superscript(TextRun),
    Rectangle(Rectangle),
    /// A named reference resolved against the document's reference table.
    Reference(Reference),
}

impl Node {
    /// Returns a string identifier for the node type.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Text(_) => "text",
            Node::Paragraph(_) => "paragraph",
            Node::Phrase(_) => "phrase",
            Node::List(_) => "list",
            Node::Table(_) => "table",
            Node::GridTable(_) => "grid-table",
            Node::Cell(_) => "cell",
            Node::GridCell(_) => "grid-cell",
            Node::Image(_) => "image",
            Node::Chart(_) => "chart",
            Node::VectorGraphic(_) => "vector-graphic",
            Node::Anchor(_) => "anchor",
            Node::Annotation(_) => "annotation",
            Node::Chapter(_) => "chapter",
            Node::Section(_) => "section",
            Node::Line(_) => "line",
            Node::Spacer(_) => "spacer",
            Node::Subscript(_) => "subscript",
            Node::Superscript(_) => "superscript",
            Node::Rectangle(_) => "rectangle",
            Node::Reference(_) => "reference",
        }
    }

    /// Concatenates all text reachable from this node, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(run) | Node::Subscript(run) | Node::Superscript(run) => {
                out.push_str(&run.text)
            }
            Node::Paragraph(p) => p.children.iter().for_each(|c| c.collect_text(out)),
            Node::Phrase(p) => p.children.iter().for_each(|c| c.collect_text(out)),
            Node::List(list) => list.items.iter().for_each(|i| i.node().collect_text(out)),
            Node::Table(table) | Node::GridTable(table) => {
                for cell in table.header.iter().chain(table.rows.iter().flatten()) {
                    cell.content.collect_text(out);
                }
            }
            Node::Cell(cell) | Node::GridCell(cell) => cell.content.collect_text(out),
            Node::Anchor(anchor) => anchor.content.node().collect_text(out),
            Node::Annotation(a) => out.push_str(&a.text),
            Node::Chapter(c) => {
                c.title.collect_text(out);
                c.children.iter().for_each(|n| n.collect_text(out));
            }
            Node::Section(s) => {
                s.title.collect_text(out);
                s.children.iter().for_each(|n| n.collect_text(out));
            }
            Node::Reference(r) => r.target.collect_text(out),
            Node::Image(_)
            | Node::Chart(_)
            | Node::VectorGraphic(_)
            | Node::Line(_)
            | Node::Spacer(_)
            | Node::Rectangle(_) => {}
        }
    }
}

// --- Text ---

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font: Font,
    pub background: Option<Color>,
}

impl TextRun {
    pub fn new(text: impl Into<String>, font: Font) -> Self {
        Self {
            text: text.into(),
            font,
            background: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub children: Vec<Node>,
    pub font: Font,
    pub align: Alignment,
    /// Baseline-to-baseline distance; `None` lets the engine derive it from the font.
    pub leading: Option<f32>,
    pub indent: f32,
    pub first_line_indent: f32,
    pub spacing_before: f32,
    pub spacing_after: f32,
    pub keep_together: bool,
}

impl Paragraph {
    pub fn new(children: Vec<Node>, font: Font) -> Self {
        Self {
            children,
            font,
            align: Alignment::Left,
            leading: None,
            indent: 0.0,
            first_line_indent: 0.0,
            spacing_before: 0.0,
            spacing_after: 0.0,
            keep_together: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Phrase {
    pub children: Vec<Node>,
    pub font: Font,
    pub leading: Option<f32>,
}

// --- Lists ---

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub kind: ListKind,
    pub lowercase: bool,
    pub indent: f32,
    pub font: Font,
    pub items: Vec<ListItem>,
}

/// Each list entry is wrapped either as a bare chunk (text input) or as a phrase.
#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    Chunk(Node),
    Phrase(Node),
}

impl ListItem {
    pub fn node(&self) -> &Node {
        match self {
            ListItem::Chunk(node) | ListItem::Phrase(node) => node,
        }
    }
}

// --- Tables ---

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: usize,
    /// Relative column widths, one per column when present.
    pub widths: Option<Vec<f32>>,
    /// Header cells; a single cell spans every column.
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
    /// Table width as a percentage of the available width.
    pub width_percent: f32,
    pub align: Alignment,
    pub border: bool,
    pub padding: f32,
    pub spacing: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub content: Box<Node>,
    pub colspan: usize,
    pub rowspan: usize,
    pub align: Alignment,
    pub valign: VerticalAlignment,
    pub background: Option<Color>,
    pub border: bool,
    pub padding: f32,
}

impl Cell {
    pub fn new(content: Node) -> Self {
        Self {
            content: Box::new(content),
            colspan: 1,
            rowspan: 1,
            align: Alignment::Left,
            valign: VerticalAlignment::Top,
            background: None,
            border: true,
            padding: 2.0,
        }
    }
}

// --- Graphics ---

/// Where an image's bytes came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOrigin {
    Handle(String),
    Base64,
    Bytes,
    Path(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub data: SharedData,
    /// Lowercase format extension (`png`, `jpg`, ...).
    pub format: String,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Final drawn size in points after fit-to-page scaling and overrides.
    pub width: f32,
    pub height: f32,
    pub align: Alignment,
    pub origin: ImageOrigin,
}

/// Output of an external element renderer (charts, SVG, custom graphics).
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub width: f32,
    pub height: f32,
    pub content: DrawableContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawableContent {
    /// Encoded raster image bytes.
    Raster { data: SharedData, format: String },
    /// PDF content-stream operators drawn in a `width` x `height` box with
    /// the origin at its lower-left corner.
    Vector(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub dotted: bool,
    pub gap: f32,
    pub line_width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spacer {
    pub lines: u32,
    pub leading: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub width: f32,
    pub height: f32,
    pub color: Option<Color>,
    pub border: Color,
}

// --- Links and structure ---

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    /// Named destination other anchors can jump to.
    pub id: Option<String>,
    /// External URL or `#name` of an internal destination.
    pub target: Option<String>,
    pub content: AnchorContent,
}

/// The four ways an anchor's label can be built, chosen by which of
/// `style` and `leading` the markup supplies.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorContent {
    LeadingAndFont { leading: f32, font: Font, text: Box<Node> },
    Leading { leading: f32, content: Box<Node> },
    Font { font: Font, text: Box<Node> },
    Plain(Box<Node>),
}

impl AnchorContent {
    pub fn node(&self) -> &Node {
        match self {
            AnchorContent::LeadingAndFont { text, .. } | AnchorContent::Font { text, .. } => text,
            AnchorContent::Leading { content, .. } | AnchorContent::Plain(content) => content,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub number: u32,
    pub title: Box<Node>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Dotted number path (`[1, 2]` renders as `1.2.`); empty when unnumbered.
    pub number: Vec<u32>,
    pub title: Box<Node>,
    pub indent: f32,
    pub children: Vec<Node>,
}

impl Section {
    pub fn label(&self) -> String {
        self.number.iter().map(|n| format!("{}.", n)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub id: String,
    pub target: Arc<Node>,
}

/// Font family an engine should use for list labels that are glyph codes
/// rather than latin text.
pub fn label_family(kind: &ListKind) -> Option<FontFamily> {
    match kind {
        ListKind::Greek => Some(FontFamily::Symbol),
        ListKind::Dingbat { .. } | ListKind::DingbatNumber { .. } => Some(FontFamily::ZapfDingbats),
        _ => None,
    }
}

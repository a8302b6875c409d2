use sheaf_style::strip_keyword;

/// Every tag the compiler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Chunk,
    Heading,
    Paragraph,
    Phrase,
    List,
    Table,
    GridTable,
    Cell,
    GridCell,
    Image,
    Chart,
    Svg,
    Graphics,
    Anchor,
    Annotation,
    Chapter,
    Section,
    Line,
    Spacer,
    Subscript,
    Superscript,
    Rectangle,
    Reference,
    PageBreak,
    ClearDoublePage,
}

impl Tag {
    pub fn parse(name: &str) -> Option<Tag> {
        let tag = match name {
            "chunk" => Tag::Chunk,
            "heading" => Tag::Heading,
            "paragraph" => Tag::Paragraph,
            "phrase" => Tag::Phrase,
            "list" => Tag::List,
            "table" => Tag::Table,
            "pdf-table" | "grid-table" => Tag::GridTable,
            "cell" => Tag::Cell,
            "pdf-cell" | "grid-cell" => Tag::GridCell,
            "image" => Tag::Image,
            "chart" => Tag::Chart,
            "svg" => Tag::Svg,
            "graphics" => Tag::Graphics,
            "anchor" => Tag::Anchor,
            "annotation" => Tag::Annotation,
            "chapter" => Tag::Chapter,
            "section" => Tag::Section,
            "line" => Tag::Line,
            "spacer" => Tag::Spacer,
            "subscript" => Tag::Subscript,
            "superscript" => Tag::Superscript,
            "rectangle" => Tag::Rectangle,
            "reference" => Tag::Reference,
            "pagebreak" => Tag::PageBreak,
            "clear-double-page" => Tag::ClearDoublePage,
            _ => return None,
        };
        Some(tag)
    }

    /// Directives steer the assembler and never become document nodes.
    pub fn is_directive(self) -> bool {
        matches!(self, Tag::PageBreak | Tag::ClearDoublePage)
    }
}

/// Splits a tag token into its primary tag and ordered class list.
///
/// `":paragraph.title.muted"` yields `("paragraph", ["title", "muted"])`.
/// A token with an empty primary or an empty class segment is malformed and
/// is returned whole, without classes.
pub fn normalize(token: &str) -> (&str, Vec<&str>) {
    let token = strip_keyword(token);
    let mut parts = token.split('.');
    let primary = parts.next().unwrap_or_default();
    let classes: Vec<&str> = parts.map(strip_keyword).collect();
    if primary.is_empty() || classes.iter().any(|c| c.is_empty()) {
        return (token, Vec::new());
    }
    (primary, classes)
}

//! A flow-layout document engine that writes PDF through lopdf.
//!
//! Content is stacked top to bottom inside the page margins. Text wraps
//! greedily on whitespace, tables are laid out row by row, and a page break
//! happens whenever the next line or block does not fit.

use crate::metrics::StandardFontMetrics;
use crate::writer::{write_document, JpegImage, Link, NamedDestination, Note, PageCanvas};
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use sheaf_model::{
    label_family, Cell, Chapter, Drawable, DrawableContent, Image, List, ListItem, Node,
    Paragraph, Section, Table,
};
use sheaf_pdf_composer::{encode_latin1, font_resource_name, Overlay};
use sheaf_style::{Alignment, Color, Font, FontStyle, PageGeometry, VerticalAlignment};
use sheaf_traits::{
    DocumentEngine, DocumentInfo, EngineError, PageEvent, PageInfo, RunningFooter, TextMeasure,
};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// Distance of header and footer baselines from the page edge.
const FURNITURE_OFFSET: f32 = 20.0;
const LINE_HEIGHT_FACTOR: f32 = 1.2;
const DEFAULT_LIST_INDENT: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Configuring,
    Open,
    Closed,
}

/// Style shared by a run of inline text.
#[derive(Debug, Clone, PartialEq)]
struct RunStyle {
    font: Font,
    rise: f32,
    background: Option<Color>,
    link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind {
    Word,
    Space,
    Break,
    /// Zero-width marker for a named destination.
    Mark,
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    style: usize,
    width: f32,
    kind: TokenKind,
}

/// Inline content flattened into measurable tokens.
#[derive(Debug, Default)]
struct InlineRun {
    styles: Vec<RunStyle>,
    tokens: Vec<Token>,
}

#[derive(Debug)]
struct LineBox {
    tokens: Vec<usize>,
    width: f32,
    height: f32,
    max_size: f32,
    last: bool,
}

/// Block-level layout options for one paragraph.
#[derive(Debug, Clone, Copy)]
struct Flow {
    align: Alignment,
    leading: Option<f32>,
    first_line_indent: f32,
}

impl Default for Flow {
    fn default() -> Self {
        Self {
            align: Alignment::Left,
            leading: None,
            first_line_indent: 0.0,
        }
    }
}

pub struct LopdfEngine {
    geometry: PageGeometry,
    info: DocumentInfo,
    footer: Option<RunningFooter>,
    header: Option<String>,
    events: Vec<Arc<dyn PageEvent>>,
    metrics: StandardFontMetrics,
    state: State,
    finished: Vec<PageCanvas>,
    page: PageCanvas,
    /// PDF y coordinate of the top of the remaining space on the page.
    cursor: f32,
    /// Extra left offset of nested content (lists, sections).
    inset: f32,
    destinations: HashMap<String, NamedDestination>,
}

impl Default for LopdfEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfEngine {
    pub fn new() -> Self {
        let geometry = PageGeometry::default();
        Self {
            geometry,
            info: DocumentInfo::default(),
            footer: None,
            header: None,
            events: Vec::new(),
            metrics: StandardFontMetrics,
            state: State::Configuring,
            finished: Vec::new(),
            page: PageCanvas::new(1),
            cursor: geometry.height - geometry.margins.top,
            inset: 0.0,
            destinations: HashMap::new(),
        }
    }

    fn require_open(&self) -> Result<(), EngineError> {
        match self.state {
            State::Open => Ok(()),
            State::Configuring => Err(EngineError::State("document is not open".into())),
            State::Closed => Err(EngineError::State("document is already closed".into())),
        }
    }

    fn left(&self) -> f32 {
        self.geometry.margins.left + self.inset
    }

    fn available_width(&self) -> f32 {
        (self.geometry.content_width() - self.inset).max(1.0)
    }

    fn remaining(&self) -> f32 {
        self.cursor - self.geometry.margins.bottom
    }

    fn full_height(&self) -> f32 {
        self.geometry.content_height()
    }

    // --- Page lifecycle ---

    fn start_page(&mut self, number: u32) {
        self.page = PageCanvas::new(number);
        self.cursor = self.geometry.height - self.geometry.margins.top;
        if let Some(header) = self.header.clone() {
            let font = Font::default();
            let width = self.metrics.text_width(&header, &font);
            let x = (self.geometry.width - width) / 2.0;
            let y = self.geometry.height - FURNITURE_OFFSET;
            self.draw_text(&header, &font, x, y);
        }
    }

    fn finish_page(&mut self) {
        let number = self.page.number;
        let mut overlay = Overlay::new();

        if let Some(footer) = &self.footer {
            if number >= footer.start_page {
                let text = if footer.page_numbers {
                    if footer.text.is_empty() {
                        number.to_string()
                    } else {
                        format!("{} {}", footer.text, number)
                    }
                } else {
                    footer.text.clone()
                };
                let width = self.metrics.text_width(&text, &footer.font);
                let x = match footer.align {
                    Alignment::Left | Alignment::Justified => FURNITURE_OFFSET,
                    Alignment::Center => (self.geometry.width - width) / 2.0,
                    Alignment::Right => self.geometry.width - FURNITURE_OFFSET - width,
                };
                overlay.text(
                    &text,
                    footer.font.postscript_name(),
                    footer.font.size,
                    x,
                    FURNITURE_OFFSET,
                    footer.font.color.to_unit(),
                );
            }
        }

        let info = PageInfo {
            number,
            total: None,
            width: self.geometry.width,
            height: self.geometry.height,
        };
        for event in &self.events {
            event.on_page(&info, &mut overlay);
        }

        if !overlay.is_empty() {
            let (ops, fonts) = overlay.into_parts();
            self.page.push(Operation::new("q", vec![]));
            self.page.ops.extend(ops);
            self.page.push(Operation::new("Q", vec![]));
            self.page.fonts.extend(fonts);
        }

        let next = PageCanvas::new(number + 1);
        let done = std::mem::replace(&mut self.page, next);
        log::debug!("Finished page {}", number);
        self.finished.push(done);
    }

    fn break_page(&mut self) {
        let next = self.page.number + 1;
        self.finish_page();
        self.start_page(next);
    }

    /// Moves to a new page when `needed` does not fit in the remaining space
    /// and the current page already has something on it.
    fn ensure_space(&mut self, needed: f32) {
        if needed > self.remaining() && self.page.has_content {
            self.break_page();
        }
    }

    // --- Drawing primitives ---

    fn draw_text(&mut self, text: &str, font: &Font, x: f32, y: f32) {
        let base = font.postscript_name();
        self.page.fonts.insert(base.to_string());
        let [r, g, b] = font.color.to_unit();
        self.page.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_resource_name(base).into_bytes()), font.size.into()],
            ),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_latin1(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let [r, g, b] = color.to_unit();
        self.page.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color, width: f32) {
        let [r, g, b] = color.to_unit();
        self.page.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("w", vec![width.into()]),
            Operation::new("RG", vec![r.into(), g.into(), b.into()]),
            Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color, dash: Option<(f32, f32)>) {
        let [r, g, b] = color.to_unit();
        self.page.push(Operation::new("q", vec![]));
        self.page.push(Operation::new("w", vec![width.into()]));
        self.page.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
        if let Some((on, off)) = dash {
            self.page.push(Operation::new(
                "d",
                vec![Object::Array(vec![on.into(), off.into()]), 0.into()],
            ));
        }
        self.page.ops.extend([
            Operation::new("m", vec![from.0.into(), from.1.into()]),
            Operation::new("l", vec![to.0.into(), to.1.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    // --- Inline layout ---

    fn style_index(run: &mut InlineRun, style: RunStyle) -> usize {
        match run.styles.iter().position(|s| *s == style) {
            Some(index) => index,
            None => {
                run.styles.push(style);
                run.styles.len() - 1
            }
        }
    }

    fn push_text(&self, run: &mut InlineRun, text: &str, style: RunStyle) {
        let font = style.font;
        let index = Self::style_index(run, style);
        let mut word = String::new();
        let flush = |word: &mut String, run: &mut InlineRun| {
            if !word.is_empty() {
                let width = self.metrics.text_width(word, &font);
                run.tokens.push(Token {
                    text: std::mem::take(word),
                    style: index,
                    width,
                    kind: TokenKind::Word,
                });
            }
        };
        for c in text.chars() {
            match c {
                '\n' => {
                    flush(&mut word, run);
                    run.tokens.push(Token {
                        text: String::new(),
                        style: index,
                        width: 0.0,
                        kind: TokenKind::Break,
                    });
                }
                c if c.is_whitespace() => {
                    flush(&mut word, run);
                    run.tokens.push(Token {
                        text: " ".to_string(),
                        style: index,
                        width: self.metrics.text_width(" ", &font),
                        kind: TokenKind::Space,
                    });
                }
                c => word.push(c),
            }
        }
        flush(&mut word, run);
    }

    /// Flattens an inline node. Returns `false` when the node is block-level.
    fn collect_inline(&self, node: &Node, link: Option<&str>, run: &mut InlineRun) -> bool {
        let style = |font: Font, rise: f32, background: Option<Color>| RunStyle {
            font,
            rise,
            background,
            link: link.map(str::to_string),
        };
        match node {
            Node::Text(t) => self.push_text(run, &t.text, style(t.font, 0.0, t.background)),
            Node::Subscript(t) => {
                self.push_text(run, &t.text, style(t.font, -t.font.size * 0.3, t.background))
            }
            Node::Superscript(t) => {
                self.push_text(run, &t.text, style(t.font, t.font.size * 0.4, t.background))
            }
            Node::Phrase(p) => {
                for child in &p.children {
                    if !self.collect_inline(child, link, run) {
                        // Block content inside a phrase keeps its text.
                        let text = child.text_content();
                        self.push_text(run, &text, style(p.font, 0.0, None));
                    }
                }
            }
            Node::Anchor(anchor) => {
                if let Some(id) = &anchor.id {
                    let index = Self::style_index(run, style(Font::default(), 0.0, None));
                    run.tokens.push(Token {
                        text: id.clone(),
                        style: index,
                        width: 0.0,
                        kind: TokenKind::Mark,
                    });
                }
                let target = anchor.target.as_deref().or(link);
                if !self.collect_inline(anchor.content.node(), target, run) {
                    let text = anchor.content.node().text_content();
                    self.push_text(run, &text, style(Font::default(), 0.0, None));
                }
            }
            Node::Reference(r) => return self.collect_inline(&r.target, link, run),
            _ => return false,
        }
        true
    }

    fn break_lines(&self, run: &InlineRun, width: f32, flow: &Flow) -> Vec<LineBox> {
        let mut lines = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut current_width = 0.0;

        let close = |current: &mut Vec<usize>, current_width: &mut f32, lines: &mut Vec<LineBox>| {
            while let Some(&last) = current.last() {
                if run.tokens[last].kind == TokenKind::Space {
                    *current_width -= run.tokens[last].width;
                    current.pop();
                } else {
                    break;
                }
            }
            let max_size = current
                .iter()
                .map(|i| run.styles[run.tokens[*i].style].font.size)
                .fold(0.0_f32, f32::max);
            let max_size = if max_size > 0.0 {
                max_size
            } else {
                run.styles.first().map(|s| s.font.size).unwrap_or(10.0)
            };
            let height = flow.leading.unwrap_or(max_size * LINE_HEIGHT_FACTOR);
            lines.push(LineBox {
                tokens: std::mem::take(current),
                width: *current_width,
                height,
                max_size,
                last: false,
            });
            *current_width = 0.0;
        };

        for (i, token) in run.tokens.iter().enumerate() {
            match token.kind {
                TokenKind::Break => {
                    close(&mut current, &mut current_width, &mut lines);
                    if let Some(line) = lines.last_mut() {
                        line.last = true;
                    }
                }
                TokenKind::Space => {
                    if !current.is_empty() {
                        current.push(i);
                        current_width += token.width;
                    }
                }
                TokenKind::Mark => current.push(i),
                TokenKind::Word => {
                    let indent = if lines.is_empty() { flow.first_line_indent } else { 0.0 };
                    let has_word = current
                        .iter()
                        .any(|j| run.tokens[*j].kind == TokenKind::Word);
                    if has_word && current_width + token.width > width - indent {
                        close(&mut current, &mut current_width, &mut lines);
                    }
                    current.push(i);
                    current_width += token.width;
                }
            }
        }
        if !current.is_empty() {
            close(&mut current, &mut current_width, &mut lines);
        }
        if let Some(line) = lines.last_mut() {
            line.last = true;
        }
        lines
    }

    fn draw_line_box(&mut self, run: &InlineRun, line: &LineBox, x0: f32, width: f32, top: f32, align: Alignment) {
        let baseline = top - line.height + line.max_size * 0.25;
        let slack = (width - line.width).max(0.0);
        let spaces = line
            .tokens
            .iter()
            .filter(|i| run.tokens[**i].kind == TokenKind::Space)
            .count();
        let (mut x, stretch) = match align {
            Alignment::Left => (x0, 0.0),
            Alignment::Center => (x0 + slack / 2.0, 0.0),
            Alignment::Right => (x0 + slack, 0.0),
            Alignment::Justified if !line.last && spaces > 0 => (x0, slack / spaces as f32),
            Alignment::Justified => (x0, 0.0),
        };

        // Group consecutive tokens of one style into a single text run.
        let mut pending: Option<(usize, String, f32, f32)> = None;
        for &index in &line.tokens {
            let token = &run.tokens[index];
            match token.kind {
                TokenKind::Mark => {
                    self.destinations.insert(
                        token.text.clone(),
                        NamedDestination {
                            page_index: self.finished.len(),
                            x,
                            y: top,
                        },
                    );
                    continue;
                }
                TokenKind::Break => continue,
                TokenKind::Space if stretch > 0.0 => {
                    if let Some((style, text, start, w)) = pending.take() {
                        self.draw_run(run, style, &text, start, baseline, w);
                    }
                    x += token.width + stretch;
                    continue;
                }
                _ => {}
            }
            let same_style = matches!(&pending, Some((style, ..)) if *style == token.style);
            if same_style {
                if let Some((_, text, _, w)) = pending.as_mut() {
                    text.push_str(&token.text);
                    *w += token.width;
                }
            } else {
                if let Some((style, text, start, w)) = pending.take() {
                    self.draw_run(run, style, &text, start, baseline, w);
                }
                pending = Some((token.style, token.text.clone(), x, token.width));
            }
            x += token.width;
        }
        if let Some((style, text, start, w)) = pending {
            self.draw_run(run, style, &text, start, baseline, w);
        }
    }

    fn draw_run(&mut self, run: &InlineRun, style: usize, text: &str, x: f32, baseline: f32, width: f32) {
        let style = &run.styles[style];
        let font = style.font;
        if let Some(background) = style.background {
            self.fill_rect(x, baseline - font.size * 0.25, width, font.size * LINE_HEIGHT_FACTOR, background);
        }
        self.draw_text(text, &font, x, baseline + style.rise);
        match font.style {
            FontStyle::Underline => {
                self.stroke_line((x, baseline - 1.5), (x + width, baseline - 1.5), 0.5, font.color, None)
            }
            FontStyle::Strikethru => {
                let y = baseline + font.size * 0.3;
                self.stroke_line((x, y), (x + width, y), 0.5, font.color, None)
            }
            _ => {}
        }
        if let Some(target) = &style.link {
            self.page.links.push(Link {
                rect: [x, baseline - font.size * 0.25, x + width, baseline + font.size * 0.9],
                target: target.clone(),
            });
        }
    }

    /// Lays out inline content as flowing lines, breaking pages between lines.
    fn flow_inline(&mut self, run: &InlineRun, flow: &Flow) {
        if run.tokens.is_empty() {
            return;
        }
        let width = self.available_width();
        let lines = self.break_lines(run, width, flow);
        for (i, line) in lines.iter().enumerate() {
            self.ensure_space(line.height);
            let indent = if i == 0 { flow.first_line_indent } else { 0.0 };
            let top = self.cursor;
            let x0 = self.left() + indent;
            self.draw_line_box(run, line, x0, width - indent, top, flow.align);
            self.cursor -= line.height;
            self.page.has_content = true;
        }
    }

    // --- Blocks ---

    fn add_block(&mut self, node: &Node) -> Result<(), EngineError> {
        match node {
            Node::Paragraph(p) => self.add_paragraph(p),
            Node::List(list) => self.add_list(list),
            Node::Table(table) | Node::GridTable(table) => self.add_table(table),
            Node::Cell(cell) | Node::GridCell(cell) => self.add_block(&cell.content),
            Node::Image(image) => self.add_image(image),
            Node::Chart(drawable) | Node::VectorGraphic(drawable) => self.add_drawable(drawable),
            Node::Chapter(chapter) => self.add_chapter(chapter),
            Node::Section(section) => self.add_section(section),
            Node::Annotation(a) => {
                self.page.notes.push(Note {
                    x: self.left(),
                    y: self.cursor,
                    title: a.title.clone(),
                    text: a.text.clone(),
                });
                self.page.has_content = true;
                Ok(())
            }
            Node::Line(line) => {
                let height = line.line_width + 8.0;
                self.ensure_space(height);
                let y = self.cursor - height / 2.0;
                let dash = line.dotted.then_some((line.line_width.max(1.0), line.gap));
                let right = self.geometry.width - self.geometry.margins.right;
                self.stroke_line((self.left(), y), (right, y), line.line_width, line.color, dash);
                self.cursor -= height;
                self.page.has_content = true;
                Ok(())
            }
            Node::Spacer(spacer) => {
                let height = spacer.lines as f32 * spacer.leading;
                if height > self.remaining() && self.page.has_content {
                    self.break_page();
                } else {
                    self.cursor -= height;
                }
                self.page.has_content = true;
                Ok(())
            }
            Node::Rectangle(rect) => {
                self.ensure_space(rect.height);
                let y = self.cursor - rect.height;
                if let Some(color) = rect.color {
                    self.fill_rect(self.left(), y, rect.width, rect.height, color);
                }
                self.stroke_rect(self.left(), y, rect.width, rect.height, rect.border, 1.0);
                self.cursor -= rect.height;
                self.page.has_content = true;
                Ok(())
            }
            Node::Reference(r) => self.add_block(&r.target),
            inline => {
                let mut run = InlineRun::default();
                self.collect_inline(inline, None, &mut run);
                self.flow_inline(&run, &Flow::default());
                Ok(())
            }
        }
    }

    fn add_paragraph(&mut self, p: &Paragraph) -> Result<(), EngineError> {
        if self.page.has_content {
            self.cursor -= p.spacing_before;
        }
        let flow = Flow {
            align: p.align,
            leading: p.leading,
            first_line_indent: p.first_line_indent,
        };
        self.inset += p.indent;

        if p.keep_together {
            let mut run = InlineRun::default();
            if p.children.iter().all(|c| self.collect_inline(c, None, &mut run)) {
                let height: f32 = self
                    .break_lines(&run, self.available_width(), &flow)
                    .iter()
                    .map(|l| l.height)
                    .sum();
                if height <= self.full_height() {
                    self.ensure_space(height);
                }
            }
        }

        let mut run = InlineRun::default();
        for child in &p.children {
            if !self.collect_inline(child, None, &mut run) {
                self.flow_inline(&run, &flow);
                run = InlineRun::default();
                self.add_block(child)?;
            }
        }
        self.flow_inline(&run, &flow);

        self.inset -= p.indent;
        self.cursor -= p.spacing_after;
        Ok(())
    }

    fn add_list(&mut self, list: &List) -> Result<(), EngineError> {
        let indent = if list.indent > 0.0 { list.indent } else { DEFAULT_LIST_INDENT };
        let mut label_font = list.font;
        if let Some(family) = label_family(&list.kind) {
            label_font.family = family;
        }
        for (i, item) in list.items.iter().enumerate() {
            let label = list.kind.label(i + 1, list.lowercase);
            let line_height = label_font.size * LINE_HEIGHT_FACTOR;
            self.ensure_space(line_height);
            let label_x = self.left();
            let baseline = self.cursor - line_height + label_font.size * 0.25;
            let page_before = self.page.number;
            self.draw_text(&label, &label_font, label_x, baseline);

            self.inset += indent;
            let result = match item {
                ListItem::Chunk(node) | ListItem::Phrase(node) => self.add_block(node),
            };
            self.inset -= indent;
            result?;

            // An item without text still takes its label's line.
            if self.page.number == page_before && self.cursor > baseline - label_font.size * 0.25 {
                self.cursor = baseline - label_font.size * 0.25;
            }
            self.page.has_content = true;
        }
        Ok(())
    }

    fn column_widths(&self, table: &Table, total: f32) -> Vec<f32> {
        let columns = table.columns.max(1);
        match &table.widths {
            Some(widths) if widths.len() == columns && widths.iter().sum::<f32>() > 0.0 => {
                let sum: f32 = widths.iter().sum();
                widths.iter().map(|w| w / sum * total).collect()
            }
            _ => vec![total / columns as f32; columns],
        }
    }

    fn cell_run(&self, cell: &Cell) -> InlineRun {
        let mut run = InlineRun::default();
        if !self.collect_inline(&cell.content, None, &mut run) {
            // Nested blocks inside a cell are reduced to their text.
            let text = cell.content.text_content();
            self.push_text(&mut run, &text, RunStyle {
                font: first_font(&cell.content).unwrap_or_default(),
                rise: 0.0,
                background: None,
                link: None,
            });
        }
        run
    }

    fn add_row(&mut self, table: &Table, cells: &[Cell], x0: f32, widths: &[f32]) {
        let mut placed = Vec::new();
        let mut column = 0;
        for cell in cells {
            if column >= widths.len() {
                break;
            }
            let span = cell.colspan.max(1).min(widths.len() - column);
            let width: f32 = widths[column..column + span].iter().sum();
            let x = x0 + widths[..column].iter().sum::<f32>();
            let run = self.cell_run(cell);
            let flow = Flow {
                align: cell.align,
                ..Flow::default()
            };
            let lines = self.break_lines(&run, (width - 2.0 * cell.padding).max(1.0), &flow);
            let content_height: f32 = lines.iter().map(|l| l.height).sum();
            placed.push((cell, x, width, run, lines, content_height));
            column += span;
        }
        let row_height = placed
            .iter()
            .map(|p| p.5 + 2.0 * p.0.padding)
            .fold(0.0_f32, f32::max)
            .max(table.padding * 2.0 + 1.0);

        let top = self.cursor;
        let bottom = top - row_height;
        for (cell, x, width, run, lines, content_height) in &placed {
            if let Some(background) = cell.background {
                self.fill_rect(*x, bottom, *width, row_height, background);
            }
            if cell.border && table.border {
                self.stroke_rect(*x, bottom, *width, row_height, Color::BLACK, 0.5);
            }
            let free = row_height - 2.0 * cell.padding - content_height;
            let mut line_top = top
                - cell.padding
                - match cell.valign {
                    VerticalAlignment::Top => 0.0,
                    VerticalAlignment::Middle => free / 2.0,
                    VerticalAlignment::Bottom => free,
                };
            let inner = (width - 2.0 * cell.padding).max(1.0);
            for line in lines {
                self.draw_line_box(run, line, x + cell.padding, inner, line_top, cell.align);
                line_top -= line.height;
            }
        }
        self.cursor = bottom;
        self.page.has_content = true;
    }

    fn row_height_estimate(&self, cells: &[Cell], widths: &[f32]) -> f32 {
        let mut column = 0;
        let mut height = 0.0_f32;
        for cell in cells {
            if column >= widths.len() {
                break;
            }
            let span = cell.colspan.max(1).min(widths.len() - column);
            let width: f32 = widths[column..column + span].iter().sum();
            let run = self.cell_run(cell);
            let lines = self.break_lines(&run, (width - 2.0 * cell.padding).max(1.0), &Flow::default());
            let h: f32 = lines.iter().map(|l| l.height).sum::<f32>() + 2.0 * cell.padding;
            height = height.max(h);
            column += span;
        }
        height
    }

    fn add_table(&mut self, table: &Table) -> Result<(), EngineError> {
        let available = self.available_width();
        let total = available * (table.width_percent / 100.0).clamp(0.01, 1.0);
        let x0 = match table.align {
            Alignment::Left | Alignment::Justified => self.left(),
            Alignment::Center => self.left() + (available - total) / 2.0,
            Alignment::Right => self.left() + available - total,
        };
        let widths = self.column_widths(table, total);

        if !table.header.is_empty() {
            let needed = self.row_height_estimate(&table.header, &widths);
            self.ensure_space(needed);
            self.add_row(table, &table.header, x0, &widths);
        }
        for row in &table.rows {
            let needed = self.row_height_estimate(row, &widths);
            if needed > self.remaining() && self.page.has_content {
                self.break_page();
                // Header rows repeat on every page the table spans.
                if !table.header.is_empty() {
                    self.add_row(table, &table.header, x0, &widths);
                }
            }
            self.add_row(table, row, x0, &widths);
        }
        self.cursor -= table.spacing;
        Ok(())
    }

    fn block_x(&self, width: f32, align: Alignment) -> f32 {
        let available = self.available_width();
        match align {
            Alignment::Center => self.left() + ((available - width) / 2.0).max(0.0),
            Alignment::Right => self.left() + (available - width).max(0.0),
            _ => self.left(),
        }
    }

    fn place_raster(&mut self, data: &[u8], format: &str, x: f32, y: f32, width: f32, height: f32, pixels: Option<(u32, u32)>) {
        let jpeg = matches!(format, "jpg" | "jpeg");
        match (jpeg, pixels.or_else(|| jpeg_dimensions(data).map(|d| (d.0, d.1)))) {
            (true, Some((pw, ph))) => {
                let components = jpeg_dimensions(data).map(|d| d.2).unwrap_or(3);
                let name = self.page.add_image(JpegImage {
                    data: data.to_vec(),
                    pixel_width: pw,
                    pixel_height: ph,
                    components,
                });
                self.page.ops.extend([
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![width.into(), 0.into(), 0.into(), height.into(), x.into(), y.into()],
                    ),
                    Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                    Operation::new("Q", vec![]),
                ]);
            }
            _ => {
                log::debug!("Drawing a frame for a {} image", format);
                self.stroke_rect(x, y, width, height, Color::gray(128), 0.5);
                self.stroke_line((x, y), (x + width, y + height), 0.5, Color::gray(128), None);
                self.stroke_line((x, y + height), (x + width, y), 0.5, Color::gray(128), None);
            }
        }
    }

    fn add_image(&mut self, image: &Image) -> Result<(), EngineError> {
        self.ensure_space(image.height);
        let x = self.block_x(image.width, image.align);
        let y = self.cursor - image.height;
        self.place_raster(
            &image.data,
            &image.format,
            x,
            y,
            image.width,
            image.height,
            Some((image.pixel_width, image.pixel_height)),
        );
        self.cursor = y;
        self.page.has_content = true;
        Ok(())
    }

    fn add_drawable(&mut self, drawable: &Drawable) -> Result<(), EngineError> {
        self.ensure_space(drawable.height);
        let x = self.left();
        let y = self.cursor - drawable.height;
        match &drawable.content {
            DrawableContent::Vector(bytes) => {
                let content = Content::decode(bytes)
                    .map_err(|e| EngineError::Layout(format!("invalid vector content: {}", e)))?;
                self.page.push(Operation::new("q", vec![]));
                self.page.push(Operation::new(
                    "cm",
                    vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
                ));
                self.page.ops.extend(content.operations);
                self.page.push(Operation::new("Q", vec![]));
            }
            DrawableContent::Raster { data, format } => {
                self.place_raster(data, format, x, y, drawable.width, drawable.height, None);
            }
        }
        self.cursor = y;
        self.page.has_content = true;
        Ok(())
    }

    fn add_titled(&mut self, label: &str, title: &Node, fallback: Font) -> Result<(), EngineError> {
        let font = first_font(title).unwrap_or(fallback);
        let mut run = InlineRun::default();
        let style = RunStyle {
            font,
            rise: 0.0,
            background: None,
            link: None,
        };
        if !label.is_empty() {
            self.push_text(&mut run, &format!("{} ", label), style.clone());
        }
        let title_node = match title {
            Node::Paragraph(p) => p.children.iter().collect::<Vec<_>>(),
            other => vec![other],
        };
        for child in title_node {
            if !self.collect_inline(child, None, &mut run) {
                let text = child.text_content();
                self.push_text(&mut run, &text, style.clone());
            }
        }
        let leading = match title {
            Node::Paragraph(p) => p.leading,
            _ => None,
        };
        self.flow_inline(&run, &Flow {
            leading,
            ..Flow::default()
        });
        self.cursor -= font.size * 0.5;
        Ok(())
    }

    fn add_chapter(&mut self, chapter: &Chapter) -> Result<(), EngineError> {
        // Chapters open on a fresh page.
        if self.page.has_content {
            self.break_page();
        }
        let fallback = Font::default().with_size(16.0).with_style(FontStyle::Bold);
        self.add_titled(&format!("{}.", chapter.number), &chapter.title, fallback)?;
        for child in &chapter.children {
            self.add_block(child)?;
        }
        Ok(())
    }

    fn add_section(&mut self, section: &Section) -> Result<(), EngineError> {
        let fallback = Font::default().with_size(12.0).with_style(FontStyle::Bold);
        self.add_titled(&section.label(), &section.title, fallback)?;
        self.inset += section.indent;
        let result = section.children.iter().try_for_each(|c| self.add_block(c));
        self.inset -= section.indent;
        result
    }
}

/// Font of the first text run inside `node`.
fn first_font(node: &Node) -> Option<Font> {
    match node {
        Node::Text(t) | Node::Subscript(t) | Node::Superscript(t) => Some(t.font),
        Node::Paragraph(p) => p.children.iter().find_map(first_font).or(Some(p.font)),
        Node::Phrase(p) => p.children.iter().find_map(first_font).or(Some(p.font)),
        Node::Anchor(a) => first_font(a.content.node()),
        Node::Reference(r) => first_font(&r.target),
        Node::Cell(c) | Node::GridCell(c) => first_font(&c.content),
        _ => None,
    }
}

/// Pixel size and component count from a JPEG's start-of-frame marker.
fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32, u8)> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 9 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some((width, height, data[i + 9]));
        }
        i += 2 + length;
    }
    None
}

impl TextMeasure for LopdfEngine {
    fn text_width(&self, text: &str, font: &Font) -> f32 {
        self.metrics.text_width(text, font)
    }
}

impl DocumentEngine for LopdfEngine {
    fn set_geometry(&mut self, geometry: PageGeometry) {
        if self.state != State::Configuring {
            log::warn!("Page geometry changed after the document was opened; ignoring");
            return;
        }
        self.geometry = geometry;
        self.cursor = geometry.height - geometry.margins.top;
    }

    fn set_info(&mut self, info: DocumentInfo) {
        self.info = info;
    }

    fn set_footer(&mut self, footer: Option<RunningFooter>) {
        self.footer = footer;
    }

    fn add_page_event(&mut self, event: Arc<dyn PageEvent>) {
        self.events.push(event);
    }

    fn open(&mut self) -> Result<(), EngineError> {
        if self.state != State::Configuring {
            return Err(EngineError::State("document was already opened".into()));
        }
        self.state = State::Open;
        self.start_page(1);
        log::debug!(
            "Opened document: {}x{}pt, {} page events",
            self.geometry.width,
            self.geometry.height,
            self.events.len()
        );
        Ok(())
    }

    fn set_header(&mut self, header: Option<String>) {
        self.header = header;
    }

    fn add(&mut self, node: &Node) -> Result<(), EngineError> {
        self.require_open()?;
        self.add_block(node)
    }

    fn new_page(&mut self) -> Result<bool, EngineError> {
        self.require_open()?;
        if !self.page.has_content {
            return Ok(false);
        }
        self.break_page();
        Ok(true)
    }

    fn page_number(&self) -> u32 {
        self.page.number
    }

    fn close(&mut self, out: &mut dyn Write) -> Result<u32, EngineError> {
        self.require_open()?;
        // A trailing empty page is dropped unless it is the only one.
        if self.page.has_content || self.finished.is_empty() {
            self.finish_page();
        }
        self.state = State::Closed;
        let pages = std::mem::take(&mut self.finished);
        let count = pages.len() as u32;
        log::debug!("Writing {} pages", count);
        write_document(
            pages,
            self.geometry.width,
            self.geometry.height,
            &self.info,
            &self.destinations,
            out,
        )?;
        Ok(count)
    }
}

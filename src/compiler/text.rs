use super::Compiler;
use crate::error::CompileError;
use crate::markup::{leaf_text, Element};
use serde_json::{json, Map, Value};
use sheaf_model::{Node, Paragraph, Phrase, TextRun};
use sheaf_style::{Alignment, Font, StyleContext};

/// Sub- and superscripts are drawn at this fraction of the surrounding size.
const SCRIPT_SCALE: f32 = 0.7;

pub(super) fn run(text: String, context: &StyleContext) -> TextRun {
    TextRun {
        text,
        font: Font::from_context(context),
        background: context.color("background"),
    }
}

fn heading_defaults() -> Map<String, Value> {
    match json!({"size": 18, "style": "bold"}) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl Compiler<'_> {
    /// Concatenated leaf text of an element; chunks and scripts only hold text.
    pub(super) fn leaf_children(&self, element: &Element<'_>) -> Result<String, CompileError> {
        element.children.iter().try_fold(String::new(), |mut text, child| {
            let leaf = leaf_text(child)
                .ok_or_else(|| CompileError::invalid_node("only text is allowed here", element.raw))?;
            text.push_str(&leaf);
            Ok(text)
        })
    }

    pub(super) fn chunk(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let text = self.leaf_children(element)?;
        if context.flag("super") {
            return self.script_run(text, context, true);
        }
        if context.flag("sub") {
            return self.script_run(text, context, false);
        }
        Ok(Node::Text(run(text, context)))
    }

    pub(super) fn script(
        &self,
        element: &Element<'_>,
        context: &StyleContext,
        superscript: bool,
    ) -> Result<Node, CompileError> {
        let text = self.leaf_children(element)?;
        self.script_run(text, context, superscript)
    }

    fn script_run(&self, text: String, context: &StyleContext, superscript: bool) -> Result<Node, CompileError> {
        let mut run = run(text, context);
        run.font = run.font.with_size(run.font.size * SCRIPT_SCALE);
        Ok(if superscript {
            Node::Superscript(run)
        } else {
            Node::Subscript(run)
        })
    }

    pub(super) fn phrase(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let children = self.compile_children(element.children, &context.without(&["align"]))?;
        Ok(Node::Phrase(Phrase {
            children,
            font: Font::from_context(context),
            leading: context.f32("leading"),
        }))
    }

    pub(super) fn paragraph(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let children = self.compile_children(element.children, &context.without(&["align"]))?;
        Ok(Node::Paragraph(block_paragraph(children, Font::from_context(context), context)))
    }

    /// A paragraph whose font starts at 18pt bold, overridden by a `style` map.
    pub(super) fn heading(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let mut heading_context = context.merge(&heading_defaults());
        if let Some(style) = context.map("style") {
            heading_context = heading_context.merge(style);
        }
        let children = self.compile_children(element.children, &heading_context.without(&["align"]))?;
        let font = Font::from_context(&heading_context);
        Ok(Node::Paragraph(block_paragraph(children, font, context)))
    }
}

fn block_paragraph(children: Vec<Node>, font: Font, context: &StyleContext) -> Paragraph {
    Paragraph {
        children,
        font,
        align: Alignment::parse_or(context.str("align"), Alignment::Left),
        leading: context.f32("leading"),
        indent: context.f32("indent").unwrap_or(0.0),
        first_line_indent: context.f32("first-line-indent").unwrap_or(0.0),
        spacing_before: context.f32("spacing-before").unwrap_or(0.0),
        spacing_after: context.f32("spacing-after").unwrap_or(0.0),
        keep_together: context.flag("keep-together"),
    }
}

//! The tag dispatcher: raw markup plus a style context in, document nodes out.

mod anchor;
mod graphics;
mod image;
mod list;
mod structure;
mod table;
mod text;

pub use graphics::RendererKind;

use crate::cache::ContentCache;
use crate::error::CompileError;
use crate::markup::{leaf_text, Element, Tag};
use serde_json::{Map, Value};
use sheaf_model::{Node, SharedData};
use sheaf_style::{resolve, StyleContext, Stylesheet};
use sheaf_traits::{ElementRenderer, ResourceProvider};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

/// Compiles markup for one build.
///
/// Owns the document's stylesheet and reference table and borrows the
/// build-scoped content cache and resource provider. Chapter and section
/// numbering is tracked here, so a compiler must not be reused across builds.
pub struct Compiler<'a> {
    stylesheet: Stylesheet,
    references: Map<String, Value>,
    cache: &'a ContentCache,
    resources: &'a dyn ResourceProvider,
    renderers: HashMap<RendererKind, Arc<dyn ElementRenderer>>,
    bitmaps: HashMap<String, SharedData>,
    chapters: Cell<u32>,
    /// Chapters and sections enclosing the element being compiled.
    outline: RefCell<Vec<structure::OutlineFrame>>,
    /// Reference ids whose targets are being compiled, outermost first.
    resolving: RefCell<Vec<String>>,
}

impl<'a> Compiler<'a> {
    pub fn new(cache: &'a ContentCache, resources: &'a dyn ResourceProvider) -> Self {
        Self {
            stylesheet: Stylesheet::new(),
            references: Map::new(),
            cache,
            resources,
            renderers: HashMap::new(),
            bitmaps: HashMap::new(),
            chapters: Cell::new(0),
            outline: RefCell::new(Vec::new()),
            resolving: RefCell::new(Vec::new()),
        }
    }

    pub fn with_stylesheet(mut self, stylesheet: Stylesheet) -> Self {
        self.stylesheet = stylesheet;
        self
    }

    pub fn with_references(mut self, references: Map<String, Value>) -> Self {
        self.references = references
            .into_iter()
            .map(|(id, node)| (sheaf_style::strip_keyword(&id).to_string(), node))
            .collect();
        self
    }

    pub fn with_renderers(mut self, renderers: HashMap<RendererKind, Arc<dyn ElementRenderer>>) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn with_bitmaps(mut self, bitmaps: HashMap<String, SharedData>) -> Self {
        self.bitmaps = bitmaps;
        self
    }

    pub fn cache(&self) -> &ContentCache {
        self.cache
    }

    /// Compiles one raw node in `context`.
    pub fn compile(&self, node: &Value, context: &StyleContext) -> Result<Node, CompileError> {
        if let Some(text) = leaf_text(node) {
            return Ok(Node::Text(text::run(text, context)));
        }
        let element = Element::parse(node)?;
        let tag = element.tag()?;
        let resolved = resolve(context, &self.stylesheet, &element.classes, element.attrs);
        log::trace!("Compiling <{}> with {} attributes", element.name, resolved.attrs().len());

        match tag {
            Tag::Chunk => self.chunk(&element, &resolved),
            Tag::Heading => self.heading(&element, &resolved),
            Tag::Paragraph => self.paragraph(&element, &resolved),
            Tag::Phrase => self.phrase(&element, &resolved),
            Tag::Subscript => self.script(&element, &resolved, false),
            Tag::Superscript => self.script(&element, &resolved, true),
            Tag::List => self.list(&element, &resolved),
            Tag::Table => self.table(&element, &resolved),
            Tag::GridTable => self.grid_table(&element, &resolved),
            Tag::Cell => self.cell(&element, &resolved, false).map(Node::Cell),
            Tag::GridCell => self.cell(&element, &resolved, true).map(Node::GridCell),
            Tag::Image => self.image(&element, &resolved),
            Tag::Chart => self.rendered(&element, &resolved, RendererKind::Chart),
            Tag::Svg => self.rendered(&element, &resolved, RendererKind::Svg),
            Tag::Graphics => self.rendered(&element, &resolved, RendererKind::Graphics),
            Tag::Anchor => self.anchor(&element, &resolved),
            Tag::Annotation => self.annotation(&element, &resolved),
            Tag::Chapter => self.chapter(&element, &resolved),
            Tag::Section => self.section(&element, &resolved),
            Tag::Line => Ok(graphics::line(&resolved)),
            Tag::Spacer => Ok(graphics::spacer(&element, &resolved)),
            Tag::Rectangle => Ok(graphics::rectangle(&resolved)),
            Tag::Reference => self.reference(&element, &resolved),
            Tag::PageBreak | Tag::ClearDoublePage => Err(CompileError::invalid_node(
                "page directives are only allowed at the top level",
                node,
            )),
        }
    }

    /// Compiles `children` in order with the context children of `context` inherit.
    fn compile_children(&self, children: &[Value], context: &StyleContext) -> Result<Vec<Node>, CompileError> {
        let inherited = context.inheritable();
        children.iter().map(|child| self.compile(child, &inherited)).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use sheaf_traits::InMemoryResourceProvider;

    pub(crate) fn with_compiler<R>(f: impl FnOnce(&Compiler<'_>) -> R) -> R {
        let cache = ContentCache::new();
        let resources = InMemoryResourceProvider::new();
        let compiler = Compiler::new(&cache, &resources);
        f(&compiler)
    }

    pub(crate) fn compile(node: Value) -> Result<Node, CompileError> {
        with_compiler(|c| c.compile(&node, &StyleContext::new()))
    }

    #[test]
    fn leaves_compile_to_text_runs() {
        let node = compile(json!(42)).unwrap();
        assert_eq!(node.text_content(), "42");
        assert_eq!(node.kind(), "text");
    }

    #[test]
    fn non_markup_values_are_rejected() {
        for bad in [json!(true), json!(null), json!({"a": 1})] {
            assert!(matches!(compile(bad), Err(CompileError::InvalidNode { .. })));
        }
    }

    #[test]
    fn unknown_tags_fail_the_whole_tree() {
        let result = compile(json!(["paragraph", "ok", ["marquee", "no"]]));
        assert!(matches!(result, Err(CompileError::UnknownTag { tag, .. }) if tag == "marquee"));
    }

    #[test]
    fn directives_are_not_nodes() {
        assert!(matches!(
            compile(json!(["paragraph", ["pagebreak"]])),
            Err(CompileError::InvalidNode { .. })
        ));
    }

    #[test]
    fn stylesheet_classes_flow_into_children() {
        let cache = ContentCache::new();
        let resources = InMemoryResourceProvider::new();
        let stylesheet: Stylesheet =
            serde_json::from_value(json!({"big": {"size": 20}, "red": {"color": [255, 0, 0]}})).unwrap();
        let compiler = Compiler::new(&cache, &resources).with_stylesheet(stylesheet);
        let node = compiler
            .compile(&json!(["paragraph.big.red", {"color": [0, 0, 255]}, "x"]), &StyleContext::new())
            .unwrap();
        let Node::Paragraph(p) = node else { panic!("expected a paragraph") };
        let Node::Text(run) = &p.children[0] else { panic!("expected text") };
        assert_eq!(run.font.size, 20.0);
        assert_eq!(run.font.color, sheaf_style::Color::rgb(0, 0, 255));
    }
}

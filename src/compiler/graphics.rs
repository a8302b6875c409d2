use super::Compiler;
use crate::cache::CacheKey;
use crate::error::CompileError;
use crate::markup::Element;
use serde_json::Value;
use sheaf_model::{Line, Node, Rectangle, Spacer};
use sheaf_style::{Color, Font, StyleContext};
use sheaf_traits::RenderError;
use std::sync::Arc;

/// Blank-line height relative to the font size.
const SPACER_LINE_FACTOR: f32 = 1.5;

/// External renderers the compiler delegates drawing elements to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererKind {
    Chart,
    Svg,
    Graphics,
}

impl RendererKind {
    pub fn name(self) -> &'static str {
        match self {
            RendererKind::Chart => "chart",
            RendererKind::Svg => "svg",
            RendererKind::Graphics => "graphics",
        }
    }
}

impl Compiler<'_> {
    /// Hands the element's children to the registered renderer, once per
    /// distinct element and context.
    ///
    /// The renderer reads options from the context, which already carries the
    /// element's own attributes.
    pub(super) fn rendered(
        &self,
        element: &Element<'_>,
        context: &StyleContext,
        kind: RendererKind,
    ) -> Result<Node, CompileError> {
        let key = CacheKey::structural(element.raw, context);
        let compiled = self.cache.get_or_compute(key, || {
            let renderer = self
                .renderers
                .get(&kind)
                .ok_or_else(|| RenderError::Unavailable(kind.name().to_string()))?;
            let spec = Value::Array(element.children.to_vec());
            let drawable = Arc::new(renderer.render(&spec, context)?);
            log::debug!(
                "Rendered {} at {:.1}x{:.1}pt",
                kind.name(),
                drawable.width,
                drawable.height
            );
            Ok::<_, CompileError>(match kind {
                RendererKind::Chart => Node::Chart(drawable),
                RendererKind::Svg | RendererKind::Graphics => Node::VectorGraphic(drawable),
            })
        })?;
        Ok((*compiled).clone())
    }
}

pub(super) fn line(context: &StyleContext) -> Node {
    Node::Line(Line {
        dotted: context.flag("dotted"),
        gap: context.f32("gap").unwrap_or(2.0),
        line_width: context.f32("line-width").unwrap_or(1.0),
        color: context.color("color").unwrap_or(Color::BLACK),
    })
}

/// `[spacer n]` reserves `n` blank lines, one by default.
pub(super) fn spacer(element: &Element<'_>, context: &StyleContext) -> Node {
    let lines = element
        .children
        .first()
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .unwrap_or(1);
    let leading = context
        .f32("leading")
        .unwrap_or_else(|| Font::from_context(context).size * SPACER_LINE_FACTOR);
    Node::Spacer(Spacer { lines, leading })
}

pub(super) fn rectangle(context: &StyleContext) -> Node {
    Node::Rectangle(Rectangle {
        width: context.f32("width").unwrap_or(0.0),
        height: context.f32("height").unwrap_or(0.0),
        color: context.color("background").or_else(|| context.color("color")),
        border: context.color("border-color").unwrap_or(Color::BLACK),
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::compile;
    use super::*;
    use crate::cache::ContentCache;
    use serde_json::json;
    use sheaf_model::{Drawable, DrawableContent};
    use sheaf_traits::{ElementRenderer, InMemoryResourceProvider};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_chart(calls: Arc<AtomicUsize>) -> Arc<dyn ElementRenderer> {
        Arc::new(move |spec: &Value, context: &StyleContext| -> Result<Drawable, RenderError> {
            calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(spec, &json!([["a", 1], ["b", 2]]));
            Ok(Drawable {
                width: context.f32("width").unwrap_or(100.0),
                height: 50.0,
                content: DrawableContent::Vector(b"0 0 m 10 10 l S".to_vec()),
            })
        })
    }

    #[test]
    fn charts_render_once_per_distinct_element() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ContentCache::new();
        let resources = InMemoryResourceProvider::new();
        let mut renderers = HashMap::new();
        renderers.insert(RendererKind::Chart, counting_chart(calls.clone()));
        let compiler = Compiler::new(&cache, &resources).with_renderers(renderers);

        let node = json!(["chart", {"type": "bar", "width": 120}, ["a", 1], ["b", 2]]);
        let Node::Chart(first) = compiler.compile(&node, &StyleContext::new()).unwrap() else { panic!() };
        let Node::Chart(second) = compiler.compile(&node, &StyleContext::new()).unwrap() else { panic!() };
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.width, 120.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A different context is a different cache entry.
        compiler.compile(&node, &StyleContext::new().with("size", 8)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_renderers_fail() {
        assert!(matches!(
            compile(json!(["svg", "<svg/>"])),
            Err(CompileError::Render(RenderError::Unavailable(kind))) if kind == "svg"
        ));
    }

    #[test]
    fn drawing_primitives_read_their_attributes() {
        let line = compile(json!(["line", {"dotted": true, "gap": 4, "line-width": 2}])).unwrap();
        assert!(matches!(line, Node::Line(l) if l.dotted && l.gap == 4.0 && l.line_width == 2.0));

        let spacer = compile(json!(["spacer", 3])).unwrap();
        assert!(matches!(spacer, Node::Spacer(s) if s.lines == 3 && s.leading == 15.0));
        let spacer = compile(json!(["spacer"])).unwrap();
        assert!(matches!(spacer, Node::Spacer(s) if s.lines == 1));

        let rect = compile(json!(["rectangle", {"width": 40, "height": 10, "background": [9, 9, 9]}])).unwrap();
        assert!(matches!(rect, Node::Rectangle(r) if r.width == 40.0 && r.color == Some(Color::gray(9))));
    }
}

use super::Compiler;
use crate::error::CompileError;
use crate::markup::Element;
use sheaf_model::{Anchor, AnchorContent, Node, Phrase};
use sheaf_style::{Font, StyleContext};

impl Compiler<'_> {
    fn anchor_body(&self, element: &Element<'_>, context: &StyleContext) -> Result<Box<Node>, CompileError> {
        let mut children = self.compile_children(element.children, context)?;
        let body = if children.len() == 1 {
            children.remove(0)
        } else {
            Node::Phrase(Phrase {
                children,
                font: Font::from_context(context),
                leading: None,
            })
        };
        Ok(Box::new(body))
    }

    /// Which of `style` (a font map) and `leading` are given picks one of four shapes.
    pub(super) fn anchor(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let style = context.map("style");
        let leading = context.f32("leading");
        let content = match (style, leading) {
            (Some(style), Some(leading)) => {
                let styled = context.merge(style);
                AnchorContent::LeadingAndFont {
                    leading,
                    font: Font::from_context(&styled),
                    text: self.anchor_body(element, &styled)?,
                }
            }
            (None, Some(leading)) => AnchorContent::Leading {
                leading,
                content: self.anchor_body(element, context)?,
            },
            (Some(style), None) => {
                let styled = context.merge(style);
                AnchorContent::Font {
                    font: Font::from_context(&styled),
                    text: self.anchor_body(element, &styled)?,
                }
            }
            (None, None) => AnchorContent::Plain(self.anchor_body(element, context)?),
        };
        Ok(Node::Anchor(Anchor {
            id: context.str("id").map(str::to_string),
            target: context
                .get("target")
                .and_then(|t| t.as_str())
                .map(str::to_string),
            content,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::compile;
    use super::*;
    use serde_json::json;
    use sheaf_style::FontStyle;

    fn anchor(node: serde_json::Value) -> Anchor {
        match compile(node).unwrap() {
            Node::Anchor(a) => a,
            other => panic!("expected an anchor, got {}", other.kind()),
        }
    }

    #[test]
    fn four_way_content_selection() {
        let a = anchor(json!(["anchor", {"style": {"style": "bold"}, "leading": 12}, "x"]));
        assert!(matches!(a.content, AnchorContent::LeadingAndFont { leading, font, .. }
            if leading == 12.0 && font.style == FontStyle::Bold));

        let a = anchor(json!(["anchor", {"leading": 9}, "x"]));
        assert!(matches!(a.content, AnchorContent::Leading { leading, .. } if leading == 9.0));

        let a = anchor(json!(["anchor", {"style": {"size": 14}}, "x"]));
        assert!(matches!(a.content, AnchorContent::Font { font, .. } if font.size == 14.0));

        let a = anchor(json!(["anchor", "x"]));
        assert!(matches!(a.content, AnchorContent::Plain(_)));
        assert_eq!(a.content.node().text_content(), "x");
    }

    #[test]
    fn styled_text_carries_the_anchor_font() {
        let a = anchor(json!(["anchor", {"style": {"style": "underline", "color": [0, 0, 200]}}, "link"]));
        let Node::Text(run) = a.content.node() else { panic!("expected text") };
        assert_eq!(run.font.style, FontStyle::Underline);
        assert_eq!(run.font.color, sheaf_style::Color::rgb(0, 0, 200));
    }

    #[test]
    fn id_and_target_are_kept() {
        let a = anchor(json!(["anchor", {"id": "intro", "target": "https://example.com"}, "go"]));
        assert_eq!(a.id.as_deref(), Some("intro"));
        assert_eq!(a.target.as_deref(), Some("https://example.com"));

        let a = anchor(json!(["anchor", {"target": "#intro"}, "back", " up"]));
        assert_eq!(a.target.as_deref(), Some("#intro"));
        assert!(matches!(a.content.node(), Node::Phrase(p) if p.children.len() == 2));
    }
}

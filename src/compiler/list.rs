use super::Compiler;
use crate::error::CompileError;
use crate::markup::{leaf_text, Element};
use sheaf_model::{List, ListItem, ListKind, Node, Phrase};
use sheaf_style::{Font, StyleContext};

/// ZapfDingbats glyph used when `dingbats` is simply `true` (a check mark).
const DEFAULT_DINGBAT: u8 = 108;

/// First glyph of each circled-digit series, selected by `type`.
const DINGBAT_NUMBER_SERIES: [u8; 4] = [172, 182, 192, 202];

/// The first flag present wins, in this order.
fn list_kind(context: &StyleContext) -> ListKind {
    if context.flag("roman") {
        return ListKind::Roman;
    }
    if context.flag("greek") {
        return ListKind::Greek;
    }
    if context.flag("dingbats") {
        let glyph = context
            .u32("dingbats")
            .and_then(|n| u8::try_from(n).ok())
            .unwrap_or(DEFAULT_DINGBAT);
        return ListKind::Dingbat { glyph };
    }
    if context.flag("dingbat-number") {
        let series = context.u32("type").unwrap_or(0) as usize;
        let first = DINGBAT_NUMBER_SERIES
            .get(series)
            .copied()
            .unwrap_or_else(|| {
                log::warn!("Unknown dingbat number type {}, using the first series", series);
                DINGBAT_NUMBER_SERIES[0]
            });
        return ListKind::DingbatNumber { first };
    }
    if context.flag("lettered") {
        return ListKind::Lettered;
    }
    if context.flag("numbered") {
        return ListKind::Numbered;
    }
    ListKind::Bulleted {
        symbol: context.str("symbol").unwrap_or("-").to_string(),
    }
}

impl Compiler<'_> {
    pub(super) fn list(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let font = Font::from_context(context);
        let inherited = context.inheritable();
        let items = element
            .children
            .iter()
            .map(|child| match leaf_text(child) {
                Some(text) => Ok(ListItem::Chunk(Node::Text(super::text::run(text, &inherited)))),
                None => match self.compile(child, &inherited)? {
                    phrase @ Node::Phrase(_) => Ok(ListItem::Phrase(phrase)),
                    other => Ok(ListItem::Phrase(Node::Phrase(Phrase {
                        children: vec![other],
                        font,
                        leading: None,
                    }))),
                },
            })
            .collect::<Result<Vec<_>, CompileError>>()?;

        Ok(Node::List(List {
            kind: list_kind(context),
            lowercase: context.flag("lowercase"),
            indent: context.f32("indent").unwrap_or(0.0),
            font,
            items,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::compile;
    use super::*;
    use serde_json::json;

    fn kind_of(attrs: serde_json::Value) -> ListKind {
        match compile(json!(["list", attrs, "x"])).unwrap() {
            Node::List(list) => list.kind,
            other => panic!("expected a list, got {}", other.kind()),
        }
    }

    #[test]
    fn numbered_list_wraps_text_items_in_order() {
        let Node::List(list) = compile(json!(["list", {"numbered": true}, "a", "b"])).unwrap() else {
            panic!("expected a list")
        };
        assert_eq!(list.kind, ListKind::Numbered);
        assert_eq!(list.items.len(), 2);
        let texts: Vec<_> = list
            .items
            .iter()
            .map(|item| match item {
                ListItem::Chunk(Node::Text(run)) => run.text.clone(),
                other => panic!("unexpected item {:?}", other),
            })
            .collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn first_matching_flag_wins() {
        assert_eq!(kind_of(json!({"numbered": true, "roman": true, "greek": true})), ListKind::Roman);
        assert_eq!(kind_of(json!({"greek": true, "dingbats": true})), ListKind::Greek);
        assert_eq!(
            kind_of(json!({"dingbats": 110, "dingbat-number": true})),
            ListKind::Dingbat { glyph: 110 }
        );
        assert_eq!(kind_of(json!({"dingbats": true})), ListKind::Dingbat { glyph: 108 });
        assert_eq!(
            kind_of(json!({"dingbat-number": true, "type": 2, "lettered": true})),
            ListKind::DingbatNumber { first: 192 }
        );
        assert_eq!(kind_of(json!({"lettered": true, "numbered": true})), ListKind::Lettered);
        assert_eq!(kind_of(json!({"symbol": "*"})), ListKind::Bulleted { symbol: "*".into() });
        assert_eq!(kind_of(json!({})), ListKind::Bulleted { symbol: "-".into() });
    }

    #[test]
    fn markup_items_become_phrases() {
        let Node::List(list) = compile(json!(["list", ["chunk", "a"], ["phrase", "b"]])).unwrap() else {
            panic!("expected a list")
        };
        assert!(matches!(&list.items[0], ListItem::Phrase(Node::Phrase(p)) if p.children.len() == 1));
        assert!(matches!(&list.items[1], ListItem::Phrase(Node::Phrase(p)) if p.children.len() == 1));
    }

    #[test]
    fn numbering_flags_do_not_leak_into_nested_lists() {
        let Node::List(outer) = compile(json!(["list", {"roman": true}, ["list", "x"]])).unwrap() else {
            panic!("expected a list")
        };
        let ListItem::Phrase(Node::Phrase(p)) = &outer.items[0] else { panic!("expected a phrase item") };
        assert!(matches!(&p.children[0], Node::List(inner) if inner.kind == ListKind::Bulleted { symbol: "-".into() }));
    }
}

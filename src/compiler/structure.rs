use super::Compiler;
use crate::cache::CacheKey;
use crate::error::CompileError;
use crate::markup::Element;
use sheaf_model::{Annotation, Chapter, Node, Reference, Section};
use sheaf_style::{strip_keyword, StyleContext};

/// A numbered chapter or section whose children are being compiled.
#[derive(Debug, Clone, Default)]
pub(super) struct OutlineFrame {
    number: Vec<u32>,
    sections: u32,
}

impl Compiler<'_> {
    /// Splits `[title, child*]` and compiles both parts.
    fn titled(&self, element: &Element<'_>, context: &StyleContext) -> Result<(Box<Node>, Vec<Node>), CompileError> {
        let (title, rest) = element
            .children
            .split_first()
            .ok_or_else(|| CompileError::invalid_node(format!("{} needs a title", element.name), element.raw))?;
        let title = self.compile(title, &context.inheritable())?;
        let children = self.compile_children(rest, context)?;
        Ok((Box::new(title), children))
    }

    /// Compiles children with `number` pushed onto the outline.
    fn within_outline(
        &self,
        number: Vec<u32>,
        element: &Element<'_>,
        context: &StyleContext,
    ) -> Result<(Box<Node>, Vec<Node>), CompileError> {
        self.outline.borrow_mut().push(OutlineFrame { number, sections: 0 });
        let result = self.titled(element, context);
        self.outline.borrow_mut().pop();
        result
    }

    pub(super) fn chapter(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let number = self.chapters.get() + 1;
        self.chapters.set(number);
        let (title, children) = self.within_outline(vec![number], element, context)?;
        Ok(Node::Chapter(Chapter {
            number,
            title,
            children,
        }))
    }

    /// Numbered inside a chapter or section, unnumbered on its own.
    pub(super) fn section(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let number = {
            let mut outline = self.outline.borrow_mut();
            match outline.last_mut() {
                Some(parent) => {
                    parent.sections += 1;
                    let mut number = parent.number.clone();
                    number.push(parent.sections);
                    number
                }
                None => Vec::new(),
            }
        };
        let (title, children) = if number.is_empty() {
            self.titled(element, context)?
        } else {
            self.within_outline(number.clone(), element, context)?
        };
        Ok(Node::Section(Section {
            number,
            title,
            indent: context.f32("indent").unwrap_or(0.0),
            children,
        }))
    }

    pub(super) fn annotation(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        Ok(Node::Annotation(Annotation {
            title: context.str("title").unwrap_or_default().to_string(),
            text: self.leaf_children(element)?,
        }))
    }

    /// Resolves `[reference "id"]` against the cache, then the reference table.
    pub(super) fn reference(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let id = element
            .text_child()
            .or_else(|| context.str("id"))
            .map(strip_keyword)
            .ok_or_else(|| CompileError::invalid_node("reference needs an id", element.raw))?;
        let target = self.cache.get_or_compute(CacheKey::reference(id), || {
            let raw = self
                .references
                .get(id)
                .ok_or_else(|| CompileError::UnresolvedReference { id: id.to_string() })?;
            log::debug!("Compiling reference '{}'", id);
            self.resolving_reference(id, || self.compile(raw, &context.inheritable()))
        })?;
        Ok(Node::Reference(Reference {
            id: id.to_string(),
            target,
        }))
    }

    /// Runs `compile` with `id` marked as in progress; re-entering it is a cycle.
    fn resolving_reference<T>(
        &self,
        id: &str,
        compile: impl FnOnce() -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        {
            let mut resolving = self.resolving.borrow_mut();
            if resolving.iter().any(|open| open == id) {
                let chain = resolving
                    .iter()
                    .skip_while(|open| *open != id)
                    .map(String::as_str)
                    .chain(std::iter::once(id))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(CompileError::ReferenceCycle { id: id.to_string(), chain });
            }
            resolving.push(id.to_string());
        }
        let result = compile();
        self.resolving.borrow_mut().pop();
        result
    }
}

//! Sources of top-level items for the assembler.
//!
//! - `VecItemSource`: a materialized document body
//! - `IteratorItemSource`: any iterator of pre-parsed items
//! - `ReaderItemSource`: JSON forms read one at a time from a stream

use crate::error::PipelineError;
use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer, Value};
use std::io::Read;

/// Pulls top-level items one at a time. `Ok(None)` ends the document.
pub trait ItemSource {
    fn next_item(&mut self) -> Result<Option<Value>, PipelineError>;

    /// Number of remaining items, when known.
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// Wraps any iterator of items.
pub struct IteratorItemSource<I>
where
    I: Iterator<Item = Value>,
{
    inner: I,
}

impl<I> IteratorItemSource<I>
where
    I: Iterator<Item = Value>,
{
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I> ItemSource for IteratorItemSource<I>
where
    I: Iterator<Item = Value>,
{
    fn next_item(&mut self) -> Result<Option<Value>, PipelineError> {
        Ok(self.inner.next())
    }

    fn size_hint(&self) -> Option<usize> {
        match self.inner.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(lower),
            _ => None,
        }
    }
}

/// Items held in memory, handed out in order.
pub struct VecItemSource {
    items: std::vec::IntoIter<Value>,
}

impl VecItemSource {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl ItemSource for VecItemSource {
    fn next_item(&mut self) -> Result<Option<Value>, PipelineError> {
        Ok(self.items.next())
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Reads whitespace-separated JSON forms from a stream, blocking until each
/// form is complete.
pub struct ReaderItemSource<R: Read> {
    forms: StreamDeserializer<'static, IoRead<R>, Value>,
}

impl<R: Read> ReaderItemSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            forms: Deserializer::from_reader(reader).into_iter::<Value>(),
        }
    }
}

impl<R: Read> ItemSource for ReaderItemSource<R> {
    fn next_item(&mut self) -> Result<Option<Value>, PipelineError> {
        self.forms.next().transpose().map_err(PipelineError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drain(source: &mut dyn ItemSource) -> Vec<Value> {
        let mut items = Vec::new();
        while let Some(item) = source.next_item().unwrap() {
            items.push(item);
        }
        items
    }

    #[test]
    fn reader_yields_forms_in_order() {
        let input = r#"{"title": "t"} ["paragraph", "a"] "b"
            ["table", ["1"]]"#;
        let mut source = ReaderItemSource::new(input.as_bytes());
        let items = drain(&mut source);
        assert_eq!(
            items,
            vec![json!({"title": "t"}), json!(["paragraph", "a"]), json!("b"), json!(["table", ["1"]])]
        );
    }

    #[test]
    fn reader_reports_malformed_input() {
        let mut source = ReaderItemSource::new(r#"["paragraph", "a"] ["oops""#.as_bytes());
        assert!(source.next_item().unwrap().is_some());
        assert!(matches!(source.next_item(), Err(PipelineError::Json(_))));
    }

    #[test]
    fn vec_and_iterator_sources_know_their_size() {
        let mut vec_source = VecItemSource::new(vec![json!("a"), json!("b")]);
        assert_eq!(vec_source.size_hint(), Some(2));
        assert_eq!(drain(&mut vec_source).len(), 2);
        assert_eq!(vec_source.size_hint(), Some(0));

        let mut iter_source = IteratorItemSource::new((0..3).map(|i| json!(i)));
        assert_eq!(iter_source.size_hint(), Some(3));
        assert_eq!(drain(&mut iter_source), vec![json!(0), json!(1), json!(2)]);

        let filtered = IteratorItemSource::new((0..3).map(|i| json!(i)).filter(|_| true));
        assert_eq!(filtered.size_hint(), None);
    }
}

//! The document engine: the collaborator that lays compiled nodes out on
//! pages and encodes the final document bytes.

use crate::page::PageEvent;
use sheaf_model::Node;
use sheaf_style::{Alignment, Font, PageGeometry};
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine used out of order: {0}")]
    State(String),

    #[error("Layout failed: {0}")]
    Layout(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Measures rendered text; used to position footer text.
pub trait TextMeasure {
    /// Advance width of `text` in points when drawn with `font`.
    fn text_width(&self, text: &str, font: &Font) -> f32;
}

/// Document information dictionary entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    /// An extra custom `(name, value)` entry.
    pub custom: Option<(String, String)>,
}

/// Footer the engine draws itself while writing pages, used when the total
/// page count is not needed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningFooter {
    pub text: String,
    pub align: Alignment,
    pub page_numbers: bool,
    pub start_page: u32,
    pub font: Font,
}

/// An engine receives its configuration first, then `open`, then content,
/// then `close`. Calling a setter after `open` is an error or a no-op at the
/// engine's discretion, but never silently reorders output.
pub trait DocumentEngine: TextMeasure {
    fn set_geometry(&mut self, geometry: PageGeometry);

    fn set_info(&mut self, info: DocumentInfo);

    fn set_footer(&mut self, footer: Option<RunningFooter>);

    /// Registers an event run as each page is finished. Events run in
    /// registration order.
    fn add_page_event(&mut self, event: Arc<dyn PageEvent>);

    fn open(&mut self) -> Result<(), EngineError>;

    /// Running header text drawn on every page started after this call.
    fn set_header(&mut self, header: Option<String>);

    fn add(&mut self, node: &Node) -> Result<(), EngineError>;

    /// Starts a new page. Returns `false` when the current page is still
    /// empty, in which case nothing happens.
    fn new_page(&mut self) -> Result<bool, EngineError>;

    /// 1-based number of the page currently receiving content.
    fn page_number(&self) -> u32;

    /// Finishes the document and writes it to `out`. Returns the number of
    /// pages written.
    fn close(&mut self, out: &mut dyn Write) -> Result<u32, EngineError>;
}

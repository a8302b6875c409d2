#![allow(dead_code)]

use lopdf::Document as LopdfDocument;
use serde_json::Value;
use sheaf::pipeline::{Assembler, BuildSummary, Destination};
use sheaf::PipelineError;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Wrapper around a generated PDF with helper methods
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub doc: LopdfDocument,
    pub summary: BuildSummary,
}

impl GeneratedPdf {
    pub fn from_bytes(bytes: Vec<u8>, summary: BuildSummary) -> Result<Self, Box<dyn std::error::Error>> {
        let doc = LopdfDocument::load_mem(&bytes)?;
        Ok(Self { bytes, doc, summary })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Raw content stream of a 1-based page, or an empty string.
    pub fn page_content(&self, number: u32) -> String {
        self.doc
            .get_pages()
            .get(&number)
            .and_then(|id| self.doc.get_page_content(*id).ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }

    /// Whether `text` is drawn as one literal string on the page.
    pub fn page_shows(&self, number: u32, text: &str) -> bool {
        self.page_content(number).contains(&format!("({})", text))
    }

    pub fn shows(&self, text: &str) -> bool {
        (1..=self.page_count() as u32).any(|n| self.page_shows(n, text))
    }

    /// Value of a string entry in the document information dictionary.
    pub fn info(&self, key: &str) -> Option<String> {
        let id = self.doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
        let dict = self.doc.get_object(id).ok()?.as_dict().ok()?;
        let value = dict.get(key.as_bytes()).ok()?.as_str().ok()?;
        Some(String::from_utf8_lossy(value).into_owned())
    }
}

/// Builds `document` with `assembler` into memory.
pub fn generate_with(assembler: &Assembler, document: &Value) -> Result<GeneratedPdf, Box<dyn std::error::Error>> {
    init_logging();
    let mut bytes = Vec::new();
    let summary = assembler.build(document, Destination::writer(&mut bytes))?;
    GeneratedPdf::from_bytes(bytes, summary)
}

pub fn generate(document: &Value) -> Result<GeneratedPdf, Box<dyn std::error::Error>> {
    generate_with(&Assembler::new(), document)
}

/// Builds `document` and returns only the error.
pub fn build_error(document: &Value) -> PipelineError {
    init_logging();
    let mut bytes = Vec::new();
    match Assembler::new().build(document, Destination::writer(&mut bytes)) {
        Ok(summary) => panic!("expected the build to fail, it produced {} pages", summary.pages),
        Err(e) => e,
    }
}

/// Assert the number of pages in a PDF
#[macro_export]
macro_rules! assert_pdf_page_count {
    ($pdf:expr, $count:expr) => {
        assert_eq!(
            $pdf.page_count(),
            $count,
            "Expected {} pages, got {}",
            $count,
            $pdf.page_count()
        );
    };
}

/// Assert that a page draws a literal text string
#[macro_export]
macro_rules! assert_page_shows {
    ($pdf:expr, $page:expr, $text:expr) => {
        assert!(
            $pdf.page_shows($page, $text),
            "Page {} should show '{}', content was:\n{}",
            $page,
            $text,
            $pdf.page_content($page)
        );
    };
}

//! Second pass of a buffered build: reopen the rendered document, and stamp
//! every page once the page total is known.

use super::config::FooterLayout;
use crate::error::PipelineError;
use lopdf::Document;
use sheaf_pdf_composer::{stamp_pages, Overlay, PageBox};
use sheaf_style::Alignment;
use sheaf_traits::{PageEvent, PageInfo, TextMeasure};
use std::io::Write;
use std::sync::Arc;

/// Distance of the footer from the page's bottom edge and side edges.
pub const FOOTER_MARGIN: f32 = 20.0;

/// Left edge of footer text `width` points wide.
pub fn footer_x(align: Alignment, page_width: f32, width: f32) -> f32 {
    match align {
        Alignment::Right => page_width - FOOTER_MARGIN - width,
        Alignment::Center => (page_width - width) / 2.0,
        Alignment::Left | Alignment::Justified => FOOTER_MARGIN,
    }
}

pub(crate) struct Stamper<'a> {
    pub footer: Option<&'a FooterLayout>,
    pub stamps: &'a [Arc<dyn PageEvent>],
    pub measure: &'a dyn TextMeasure,
}

impl Stamper<'_> {
    fn stamp_page(&self, page: &PageBox, overlay: &mut Overlay) {
        if let Some(footer) = self.footer.filter(|f| f.applies_to(page.number)) {
            let text = footer.label(page.number, Some(page.total));
            let width = self.measure.text_width(&text, &footer.font);
            overlay.text(
                &text,
                footer.font.postscript_name(),
                footer.font.size,
                footer_x(footer.align, page.width, width),
                FOOTER_MARGIN,
                footer.font.color.to_unit(),
            );
        }
        let info = PageInfo {
            number: page.number,
            total: Some(page.total),
            width: page.width,
            height: page.height,
        };
        for stamp in self.stamps {
            stamp.on_page(&info, overlay);
        }
    }

    /// Stamps `buffer` and writes the result to `out`. Returns the page total.
    pub fn finish(&self, buffer: &[u8], out: &mut dyn Write) -> Result<u32, PipelineError> {
        let mut doc = Document::load_mem(buffer)?;
        let total = doc.get_pages().len() as u32;
        log::info!("Stamping {} pages", total);
        stamp_pages(&mut doc, |page, overlay| self.stamp_page(page, overlay))?;
        let mut out = out;
        doc.save_to(&mut out)?;
        Ok(total)
    }
}

//! PDF composition utilities for stamping content onto finished documents.
//!
//! This crate provides low-level PDF manipulation using lopdf:
//! - Appending overlay content streams to existing pages
//! - Building overlays (text, lines, rectangles) with standard fonts
//! - Walking every page of a document with its final page count known

mod error;
mod overlay;

pub use error::ComposerError;
pub use overlay::{encode_latin1, font_resource_name, Overlay, Rgb};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// US Letter, used when a page carries no readable `/MediaBox`.
const FALLBACK_MEDIA_BOX: (f32, f32) = (612.0, 792.0);

/// Position and size of a page being stamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// 1-based page number.
    pub number: u32,
    pub total: u32,
    pub width: f32,
    pub height: f32,
}

/// Adds a new content stream to an existing page, overlaying it on top.
///
/// This is useful for footers, page numbers, or watermarks. It wraps the
/// existing page content and the new content in a new array of content streams.
pub fn overlay_content(
    doc: &mut Document,
    page_id: ObjectId,
    content_stream: Vec<u8>,
) -> Result<(), ComposerError> {
    let stream = Stream::new(dictionary! {}, content_stream);
    let new_content_id = doc.add_object(Object::Stream(stream));

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;

    match page_dict.get_mut(b"Contents") {
        Ok(contents_obj) => {
            let mut contents = match contents_obj.as_array() {
                Ok(arr) => arr.clone(),
                // A single stream reference.
                Err(_) => vec![contents_obj.clone()],
            };
            // Later streams draw on top.
            contents.push(Object::Reference(new_content_id));
            page_dict.set("Contents", Object::Array(contents));
        }
        Err(_) => {
            // A page without content gets the overlay as its only stream.
            page_dict.set("Contents", Object::Reference(new_content_id));
        }
    }

    Ok(())
}

/// Visits every page in order and stamps whatever `stamp` draws onto it.
///
/// The callback receives the page's number, the document's total page count
/// and the page size. Pages whose overlay stays empty are left untouched.
/// Fonts used by an overlay are added to the page's font resources as
/// standard Type1 fonts with WinAnsi encoding.
pub fn stamp_pages<F>(doc: &mut Document, mut stamp: F) -> Result<(), ComposerError>
where
    F: FnMut(&PageBox, &mut Overlay),
{
    let pages = doc.get_pages();
    let total = pages.len() as u32;
    let mut font_ids: HashMap<String, ObjectId> = HashMap::new();

    for (number, page_id) in pages {
        let (width, height) = media_box(doc, page_id);
        let page = PageBox {
            number,
            total,
            width,
            height,
        };
        let mut overlay = Overlay::new();
        stamp(&page, &mut overlay);
        if overlay.is_empty() {
            continue;
        }

        let mut registrations = Vec::new();
        for base_font in overlay.fonts() {
            let id = *font_ids.entry(base_font.to_string()).or_insert_with(|| {
                doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
                    "Encoding" => "WinAnsiEncoding",
                })
            });
            registrations.push((font_resource_name(base_font), id));
        }
        let fonts = font_dict_mut(doc, page_id)?;
        for (name, id) in registrations {
            fonts.set(name, Object::Reference(id));
        }

        overlay_content(doc, page_id, overlay.encode()?)?;
        log::debug!("Stamped page {}/{}", number, total);
    }
    Ok(())
}

/// Page width and height from `/MediaBox`, looking one level up the page
/// tree when the page inherits it.
fn media_box(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let read = |dict: &Dictionary| -> Option<(f32, f32)> {
        let values = dict.get(b"MediaBox").ok()?.as_array().ok()?;
        let nums: Vec<f32> = values.iter().filter_map(|v| v.as_float().ok()).collect();
        match nums.as_slice() {
            [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => None,
        }
    };
    let Ok(page) = doc.get_dictionary(page_id) else {
        return FALLBACK_MEDIA_BOX;
    };
    read(page)
        .or_else(|| {
            let parent = page.get(b"Parent").ok()?.as_reference().ok()?;
            read(doc.get_dictionary(parent).ok()?)
        })
        .unwrap_or(FALLBACK_MEDIA_BOX)
}

/// The `/Font` dictionary of a page's resources, created when missing.
/// Resources and font maps may be inline or indirect.
fn font_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, ComposerError> {
    let resources_id = match doc.get_dictionary(page_id)?.get(b"Resources") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    let font_id = {
        let resources = match resources_id {
            Some(id) => Some(doc.get_dictionary(id)?),
            None => doc
                .get_dictionary(page_id)?
                .get(b"Resources")
                .ok()
                .and_then(|r| r.as_dict().ok()),
        };
        match resources.map(|r| r.get(b"Font")) {
            Some(Ok(Object::Reference(id))) => Some(*id),
            _ => None,
        }
    };
    if let Some(id) = font_id {
        return Ok(doc.get_object_mut(id)?.as_dict_mut()?);
    }

    let resources = match resources_id {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if !page.has(b"Resources") {
                page.set("Resources", Dictionary::new());
            }
            page.get_mut(b"Resources")?.as_dict_mut()?
        }
    };
    if !resources.has(b"Font") {
        resources.set("Font", Dictionary::new());
    }
    Ok(resources.get_mut(b"Font")?.as_dict_mut()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, StringFormat};

    /// Creates a simple dummy PDF document with a specified number of pages.
    /// Each page has a unique text content "Page X".
    fn create_dummy_pdf(num_pages: u32, text_prefix: &str) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut page_ids = vec![];
        for i in 1..=num_pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![100.into(), 700.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            format!("{} {}", text_prefix, i).into_bytes(),
                            StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            page_ids.push(page_id.into());
        }

        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => num_pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, pages_dict.into());

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        doc
    }

    #[test]
    fn test_overlay_content() {
        let mut doc = create_dummy_pdf(1, "Original Content");
        let page_id = doc.get_pages().get(&1).cloned().unwrap();

        let mut overlay = Overlay::new();
        overlay.text("Overlay Content", "Helvetica", 12.0, 100.0, 100.0, [0.0; 3]);
        overlay_content(&mut doc, page_id, overlay.encode().unwrap()).unwrap();

        let page_dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let contents_array = page_dict.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(contents_array.len(), 2);

        let full_content = doc.get_page_content(page_id).unwrap();
        let content_str = String::from_utf8_lossy(&full_content);
        assert!(content_str.contains("Original Content"));
        assert!(content_str.contains("Overlay Content"));
    }

    #[test]
    fn test_stamp_pages_sees_total_and_inherited_media_box() {
        let mut doc = create_dummy_pdf(3, "Body");
        let mut seen = Vec::new();
        stamp_pages(&mut doc, |page, overlay| {
            seen.push((page.number, page.total, page.width, page.height));
            if page.number > 1 {
                let text = format!("{} of {}", page.number, page.total);
                overlay.text(&text, "Courier", 9.0, 20.0, 20.0, [0.0; 3]);
            }
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![(1, 3, 612.0, 792.0), (2, 3, 612.0, 792.0), (3, 3, 612.0, 792.0)]
        );

        let pages = doc.get_pages();
        let first = String::from_utf8_lossy(&doc.get_page_content(pages[&1]).unwrap()).into_owned();
        let second = String::from_utf8_lossy(&doc.get_page_content(pages[&2]).unwrap()).into_owned();
        assert!(!first.contains("of 3"));
        assert!(second.contains("(2 of 3) Tj"));

        // The shared resource dictionary gained the stamp font next to F1.
        let page = doc.get_dictionary(pages[&2]).unwrap();
        let resources_id = page.get(b"Resources").unwrap().as_reference().unwrap();
        let fonts = doc
            .get_dictionary(resources_id)
            .unwrap()
            .get(b"Font")
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"FCourier"));
    }

    #[test]
    fn test_stamped_document_survives_save_and_reload() {
        let mut doc = create_dummy_pdf(2, "Body");
        stamp_pages(&mut doc, |page, overlay| {
            overlay.text(&page.number.to_string(), "Helvetica", 10.0, 10.0, 10.0, [0.0; 3]);
        })
        .unwrap();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        let reloaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }
}

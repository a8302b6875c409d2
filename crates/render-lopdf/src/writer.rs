//! Page buffers and the final assembly of a lopdf `Document`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use sheaf_pdf_composer::{encode_latin1, font_resource_name};
use sheaf_traits::{DocumentInfo, EngineError};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;

/// A link hotspot in PDF user space.
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub rect: [f32; 4],
    /// External URI, or `#name` of a named destination.
    pub target: String,
}

/// A sticky-note annotation.
#[derive(Debug, Clone)]
pub(crate) struct Note {
    pub x: f32,
    pub y: f32,
    pub title: String,
    pub text: String,
}

/// A JPEG drawn through an image XObject.
#[derive(Debug, Clone)]
pub(crate) struct JpegImage {
    pub data: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub components: u8,
}

/// Everything drawn on one page, waiting for the document to be written.
#[derive(Debug, Default)]
pub(crate) struct PageCanvas {
    pub number: u32,
    pub ops: Vec<Operation>,
    pub fonts: BTreeSet<String>,
    pub links: Vec<Link>,
    pub notes: Vec<Note>,
    pub images: Vec<JpegImage>,
    /// Set once body content lands on the page; headers don't count.
    pub has_content: bool,
}

impl PageCanvas {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    /// Resource name of the next image drawn on this page.
    pub fn add_image(&mut self, image: JpegImage) -> String {
        self.images.push(image);
        format!("Im{}", self.images.len())
    }
}

/// A named destination: page index and the y coordinate to scroll to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NamedDestination {
    pub page_index: usize,
    pub x: f32,
    pub y: f32,
}

fn text_string(value: &str) -> Object {
    Object::String(encode_latin1(value), StringFormat::Literal)
}

fn encode_err(err: impl std::fmt::Display) -> EngineError {
    EngineError::Encode(err.to_string())
}

/// Writes the finished pages as a complete PDF.
pub(crate) fn write_document(
    pages: Vec<PageCanvas>,
    width: f32,
    height: f32,
    info: &DocumentInfo,
    destinations: &HashMap<String, NamedDestination>,
    mut out: &mut dyn Write,
) -> Result<(), EngineError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    // One font object per base font, shared by every page.
    let base_fonts: BTreeSet<&String> = pages.iter().flat_map(|p| p.fonts.iter()).collect();
    let mut font_dict = Dictionary::new();
    for base_font in base_fonts {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
            "Encoding" => "WinAnsiEncoding",
        });
        font_dict.set(font_resource_name(base_font), Object::Reference(font_id));
    }
    let fonts_id = doc.add_object(font_dict);

    let page_ids: Vec<ObjectId> = pages.iter().map(|_| doc.new_object_id()).collect();

    for (index, page) in pages.into_iter().enumerate() {
        let page_id = page_ids[index];
        let bytes = Content {
            operations: page.ops,
        }
        .encode()
        .map_err(encode_err)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));

        let mut resources = dictionary! { "Font" => fonts_id };
        if !page.images.is_empty() {
            let mut xobjects = Dictionary::new();
            for (i, image) in page.images.into_iter().enumerate() {
                let color_space = match image.components {
                    1 => "DeviceGray",
                    4 => "DeviceCMYK",
                    _ => "DeviceRGB",
                };
                let stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => image.pixel_width as i64,
                        "Height" => image.pixel_height as i64,
                        "ColorSpace" => color_space,
                        "BitsPerComponent" => 8,
                        "Filter" => "DCTDecode",
                    },
                    image.data,
                );
                let image_id = doc.add_object(stream);
                xobjects.set(format!("Im{}", i + 1), Object::Reference(image_id));
            }
            resources.set("XObject", xobjects);
        }

        let mut annots = Vec::new();
        for link in &page.links {
            let rect: Vec<Object> = link.rect.iter().map(|v| (*v).into()).collect();
            let mut annot = dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => rect,
                "Border" => vec![0.into(), 0.into(), 0.into()],
            };
            if let Some(name) = link.target.strip_prefix('#') {
                match destinations.get(name) {
                    Some(dest) => annot.set(
                        "Dest",
                        vec![
                            Object::Reference(page_ids[dest.page_index]),
                            "XYZ".into(),
                            dest.x.into(),
                            dest.y.into(),
                            Object::Null,
                        ],
                    ),
                    None => {
                        log::warn!("Link target '#{}' has no matching anchor id", name);
                        continue;
                    }
                }
            } else {
                annot.set(
                    "A",
                    dictionary! { "S" => "URI", "URI" => text_string(&link.target) },
                );
            }
            annots.push(Object::Reference(doc.add_object(annot)));
        }
        for note in &page.notes {
            let annot = dictionary! {
                "Type" => "Annot",
                "Subtype" => "Text",
                "Rect" => vec![note.x.into(), (note.y - 20.0).into(), (note.x + 20.0).into(), note.y.into()],
                "T" => text_string(&note.title),
                "Contents" => text_string(&note.text),
            };
            annots.push(Object::Reference(doc.add_object(annot)));
        }

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.0.into(), 0.0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => resources,
        };
        if !annots.is_empty() {
            page_dict.set("Annots", Object::Array(annots));
        }
        doc.objects.insert(page_id, Object::Dictionary(page_dict));
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info_dict = dictionary! { "Producer" => text_string("sheaf") };
    let entries = [
        ("Title", &info.title),
        ("Subject", &info.subject),
        ("Author", &info.author),
        ("Creator", &info.creator),
    ];
    for (key, value) in entries {
        if let Some(value) = value {
            info_dict.set(key, text_string(value));
        }
    }
    if let Some((name, value)) = &info.custom {
        info_dict.set(name.as_bytes().to_vec(), text_string(value));
    }
    let info_id = doc.add_object(info_dict);
    doc.trailer.set("Info", info_id);

    doc.save_to(&mut out).map_err(encode_err)?;
    Ok(())
}

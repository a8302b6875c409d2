use crate::ComposerError;
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use std::collections::BTreeSet;

/// An RGB color with components in `0.0..=1.0`.
pub type Rgb = [f32; 3];

/// Resource name a standard font is registered under on stamped pages.
pub fn font_resource_name(base_font: &str) -> String {
    format!("F{}", base_font.replace('-', ""))
}

/// Encodes text for a WinAnsi-encoded standard font. Characters outside
/// Latin-1 become `?`.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// A batch of drawing operations for one page, in PDF user space (origin
/// at the bottom-left corner, units in points).
///
/// Fonts are referenced by their standard Type1 base name and registered on
/// the page when the overlay is applied.
#[derive(Debug, Default, Clone)]
pub struct Overlay {
    operations: Vec<Operation>,
    fonts: BTreeSet<String>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Draws `text` with its baseline starting at `(x, y)`.
    pub fn text(&mut self, text: &str, base_font: &str, size: f32, x: f32, y: f32, color: Rgb) {
        self.fonts.insert(base_font.to_string());
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_resource_name(base_font).into_bytes()), size.into()],
            ),
            Operation::new("rg", color.iter().map(|c| (*c).into()).collect()),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_latin1(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Strokes a straight line. `dash` is an optional `(on, off)` pattern.
    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb, dash: Option<(f32, f32)>) {
        self.operations.push(Operation::new("q", vec![]));
        self.operations.push(Operation::new("w", vec![width.into()]));
        self.operations
            .push(Operation::new("RG", color.iter().map(|c| (*c).into()).collect()));
        if let Some((on, off)) = dash {
            self.operations.push(Operation::new(
                "d",
                vec![Object::Array(vec![on.into(), off.into()]), 0.into()],
            ));
        }
        self.operations.extend([
            Operation::new("m", vec![from.0.into(), from.1.into()]),
            Operation::new("l", vec![to.0.into(), to.1.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Draws a rectangle with its lower-left corner at `(x, y)`.
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Option<Rgb>, stroke: Option<Rgb>) {
        if fill.is_none() && stroke.is_none() {
            return;
        }
        self.operations.push(Operation::new("q", vec![]));
        if let Some(fill) = fill {
            self.operations
                .push(Operation::new("rg", fill.iter().map(|c| (*c).into()).collect()));
        }
        if let Some(stroke) = stroke {
            self.operations
                .push(Operation::new("RG", stroke.iter().map(|c| (*c).into()).collect()));
        }
        self.operations.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        ));
        let paint = match (fill.is_some(), stroke.is_some()) {
            (true, true) => "B",
            (true, false) => "f",
            _ => "S",
        };
        self.operations.push(Operation::new(paint, vec![]));
        self.operations.push(Operation::new("Q", vec![]));
    }

    /// Base names of every font the overlay draws with.
    pub fn fonts(&self) -> impl Iterator<Item = &str> {
        self.fonts.iter().map(String::as_str)
    }

    pub fn into_parts(self) -> (Vec<Operation>, BTreeSet<String>) {
        (self.operations, self.fonts)
    }

    /// Encodes the overlay as a self-contained content stream (wrapped in `q`/`Q`).
    pub fn encode(&self) -> Result<Vec<u8>, ComposerError> {
        let mut operations = Vec::with_capacity(self.operations.len() + 2);
        operations.push(Operation::new("q", vec![]));
        operations.extend(self.operations.iter().cloned());
        operations.push(Operation::new("Q", vec![]));
        Ok(Content { operations }.encode()?)
    }
}

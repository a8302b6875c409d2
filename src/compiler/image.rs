use super::Compiler;
use crate::cache::CacheKey;
use crate::error::CompileError;
use crate::markup::Element;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use sheaf_model::{Image, ImageOrigin, Node, SharedData};
use sheaf_style::{Alignment, StyleContext};
use sheaf_traits::ResourceError;
use std::io::Cursor;
use std::sync::Arc;

/// Width and height the page leaves for content, when the context knows them.
fn content_area(context: &StyleContext) -> Option<(f32, f32)> {
    let width = context.f32("page-width")?;
    let height = context.f32("page-height")?;
    let left = context.f32("left-margin")?;
    let right = context.f32("right-margin")?;
    let top = context.f32("top-margin")?;
    let bottom = context.f32("bottom-margin")?;
    Some((width - left - right, height - top - bottom))
}

/// Final drawn size: fit the content area, then apply the explicit overrides.
fn drawn_size(pixel_width: u32, pixel_height: u32, context: &StyleContext) -> (f32, f32) {
    let (mut width, mut height) = (pixel_width as f32, pixel_height as f32);

    if let Some((available_width, available_height)) = content_area(context) {
        if available_width > 0.0
            && available_height > 0.0
            && (width > available_width || height > available_height)
        {
            // The axis that overflows by the larger proportion bounds the scale.
            let scale = if width / available_width > height / available_height {
                available_width / width
            } else {
                available_height / height
            };
            width *= scale;
            height *= scale;
        }
    }

    if let Some(percent) = context.f32("scale") {
        width *= percent / 100.0;
        height *= percent / 100.0;
    }
    if let Some(x) = context.f32("xscale") {
        width *= x;
    }
    if let Some(y) = context.f32("yscale") {
        height *= y;
    }

    match (context.f32("width"), context.f32("height")) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) if width > 0.0 => (w, w * height / width),
        (None, Some(h)) if height > 0.0 => (h * width / height, h),
        _ => (width, height),
    }
}

fn format_of(data: &[u8]) -> Result<String, CompileError> {
    let format = image::guess_format(data)?;
    Ok(format
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("bin")
        .to_string())
}

fn pixel_dimensions(data: &[u8]) -> Result<(u32, u32), CompileError> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| CompileError::ImageData(e.to_string()))?;
    Ok(reader.into_dimensions()?)
}

impl Compiler<'_> {
    /// Picks the first source representation the element carries.
    fn image_source(&self, element: &Element<'_>, context: &StyleContext) -> Result<(SharedData, ImageOrigin), CompileError> {
        if let Some(handle) = context.str("handle") {
            let data = self.bitmaps.get(handle).cloned().ok_or_else(|| {
                CompileError::Resource(ResourceError::NotFound(format!("bitmap handle '{}'", handle)))
            })?;
            return Ok((data, ImageOrigin::Handle(handle.to_string())));
        }
        match element.children.first() {
            Some(Value::String(payload)) if context.flag("base64") => {
                let bytes = BASE64.decode(payload.trim())?;
                Ok((Arc::new(bytes), ImageOrigin::Base64))
            }
            Some(Value::Array(bytes)) if !bytes.is_empty() => {
                let bytes = bytes
                    .iter()
                    .map(|b| b.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .ok_or_else(|| CompileError::UnsupportedImageSource(element.raw.to_string()))?;
                Ok((Arc::new(bytes), ImageOrigin::Bytes))
            }
            Some(Value::String(path)) => {
                let data = self.resources.load(path)?;
                Ok((data, ImageOrigin::Path(path.clone())))
            }
            _ => Err(CompileError::UnsupportedImageSource(element.raw.to_string())),
        }
    }

    pub(super) fn image(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let key = CacheKey::structural(element.raw, context);
        let compiled = self.cache.get_or_compute(key, || {
            let (data, origin) = self.image_source(element, context)?;
            let format = format_of(&data)?;
            let (pixel_width, pixel_height) = pixel_dimensions(&data)?;
            let (width, height) = drawn_size(pixel_width, pixel_height, context);
            log::debug!(
                "Loaded {} image {}x{}px from {:?}, drawn at {:.1}x{:.1}pt",
                format,
                pixel_width,
                pixel_height,
                origin,
                width,
                height
            );
            Ok::<_, CompileError>(Node::Image(Arc::new(Image {
                data,
                format,
                pixel_width,
                pixel_height,
                width,
                height,
                align: Alignment::parse_or(context.str("align"), Alignment::Left),
                origin,
            })))
        })?;
        Ok((*compiled).clone())
    }
}

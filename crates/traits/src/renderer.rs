//! External element renderers for charts, SVG and embedded graphics.

use serde_json::Value;
use sheaf_model::Drawable;
use sheaf_style::StyleContext;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No renderer registered for '{0}'")]
    Unavailable(String),

    #[error("Invalid {kind} description: {message}")]
    InvalidSpec { kind: String, message: String },

    #[error("Rendering failed: {0}")]
    Failed(String),
}

/// Turns an element description into something the engine can draw.
///
/// `spec` is the array of the element's children; its attributes arrive
/// merged into `context`, the resolved style context at that node.
pub trait ElementRenderer {
    fn render(&self, spec: &Value, context: &StyleContext) -> Result<Drawable, RenderError>;
}

impl<F> ElementRenderer for F
where
    F: Fn(&Value, &StyleContext) -> Result<Drawable, RenderError>,
{
    fn render(&self, spec: &Value, context: &StyleContext) -> Result<Drawable, RenderError> {
        self(spec, context)
    }
}

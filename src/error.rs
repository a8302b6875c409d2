// src/error.rs
use sheaf_pdf_composer::ComposerError;
use sheaf_traits::{EngineError, RenderError, ResourceError};
use thiserror::Error;

/// Errors raised while compiling markup into document nodes.
///
/// Every variant aborts the build; the compiler never substitutes defaults
/// for malformed input.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Unknown tag '{tag}' in node {node}")]
    UnknownTag { tag: String, node: String },

    #[error("Table has no rows")]
    EmptyTable,

    #[error("Grid table has {expected} columns but {actual} widths were given")]
    ColumnWidthMismatch { expected: usize, actual: usize },

    #[error("Unsupported image source in node {0}")]
    UnsupportedImageSource(String),

    #[error("Unresolved reference '{id}'")]
    UnresolvedReference { id: String },

    #[error("Reference '{id}' refers back to itself through {chain}")]
    ReferenceCycle { id: String, chain: String },

    #[error("Invalid node ({reason}): {node}")]
    InvalidNode { reason: String, node: String },

    #[error("Invalid value for '{attribute}' on '{tag}': {reason}")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        reason: String,
    },

    #[error("Image data could not be read: {0}")]
    ImageData(String),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Renderer failed: {0}")]
    Render(#[from] RenderError),
}

impl CompileError {
    pub(crate) fn invalid_node(reason: impl Into<String>, node: &serde_json::Value) -> Self {
        CompileError::InvalidNode {
            reason: reason.into(),
            node: node.to_string(),
        }
    }
}

impl From<base64::DecodeError> for CompileError {
    fn from(e: base64::DecodeError) -> Self {
        CompileError::ImageData(format!("invalid base64 payload: {}", e))
    }
}

impl From<image::ImageError> for CompileError {
    fn from(e: image::ImageError) -> Self {
        CompileError::ImageData(e.to_string())
    }
}

/// A comprehensive error type for the entire document build.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("Document engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Page stamping failed: {0}")]
    Composer(#[from] ComposerError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

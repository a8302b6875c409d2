//! sheaf compiles a JSON markup tree (strings, numbers and
//! `[tag, {attrs}?, child*]` arrays) into PDF documents.
//!
//! The [`compiler`] turns raw markup into `sheaf_model::Node` trees under a
//! cascading style context; the [`pipeline`] drives a `DocumentEngine` with
//! those trees and, when the page total is needed, stamps footers in a second
//! pass.

pub mod cache;
pub mod compiler;
pub mod error;
pub mod fonts;
pub mod markup;
pub mod pipeline;
pub mod resource;

pub use cache::{CacheKey, CacheStats, ContentCache};
pub use compiler::{Compiler, RendererKind};
pub use error::{CompileError, PipelineError};
pub use pipeline::{Assembler, BuildSummary, Destination, DocumentConfig, OutputStrategy};
pub use resource::FilesystemResourceProvider;

pub use sheaf_model as model;
pub use sheaf_style as style;
pub use sheaf_traits as traits;

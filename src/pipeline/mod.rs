//! Document assembly.
//!
//! - [`Assembler`]: sets up the engine from document metadata and feeds it
//!   compiled top-level items
//! - [`DocumentConfig`]: the metadata map, with every default filled in
//! - [`OutputStrategy`]: direct writing, or buffering followed by page stamping
//! - [`ItemSource`]: materialized, iterator and streaming item sources
//!
//! # Example
//!
//! ```no_run
//! use sheaf::pipeline::{Assembler, Destination};
//! use serde_json::json;
//!
//! let document = json!([
//!     {"title": "Report", "pages": true, "footer": "Page"},
//!     ["heading", "Summary"],
//!     "Quarterly figures follow."
//! ]);
//! Assembler::new().build(&document, Destination::path("report.pdf"))?;
//! # Ok::<(), sheaf::PipelineError>(())
//! ```

mod assembler;
pub mod config;
mod destination;
pub mod source;
mod two_pass;

pub use assembler::{Assembler, BuildSummary, EngineFactory};
pub use config::{DocumentConfig, FooterLayout, FooterSetting, FooterSpec, OutputStrategy};
pub use destination::Destination;
pub use source::{ItemSource, IteratorItemSource, ReaderItemSource, VecItemSource};
pub use two_pass::{footer_x, FOOTER_MARGIN};

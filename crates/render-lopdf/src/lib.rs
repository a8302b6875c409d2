//! PDF document engine using lopdf.
//!
//! [`LopdfEngine`] implements the `DocumentEngine` seam with a simple flow
//! layout over the standard Type1 fonts, so documents can be produced without
//! any font files or external typesetter.

mod engine;
mod metrics;
mod writer;

pub use engine::LopdfEngine;
pub use metrics::StandardFontMetrics;

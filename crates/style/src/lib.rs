//! Style primitives for sheaf markup: colors, fonts, page geometry, the
//! immutable [`StyleContext`] and the class cascade.

pub mod color;
pub mod context;
pub mod dimension;
pub mod font;
pub mod stylesheet;
pub mod text;

pub use color::Color;
pub use context::{hash_value, strip_keyword, value_as_f32, StyleContext, LOCAL_ATTRIBUTES};
pub use dimension::{Margins, Orientation, PageGeometry, PageSize};
pub use font::{Font, FontFamily, FontStyle};
pub use stylesheet::{resolve, Stylesheet};
pub use text::{Alignment, VerticalAlignment};

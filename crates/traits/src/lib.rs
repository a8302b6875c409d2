pub mod engine;
pub mod page;
pub mod renderer;
pub mod resource;

pub use engine::{DocumentEngine, DocumentInfo, EngineError, RunningFooter, TextMeasure};
pub use page::{PageEvent, PageInfo};
pub use renderer::{ElementRenderer, RenderError};
pub use resource::{InMemoryResourceProvider, ResourceError, ResourceProvider, SharedResourceData};
pub use sheaf_pdf_composer::Overlay;

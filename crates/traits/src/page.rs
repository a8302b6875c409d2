use sheaf_pdf_composer::Overlay;
use std::fmt::Debug;

/// The page a [`PageEvent`] is drawing on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    pub number: u32,
    /// Known only when the event runs during the stamping pass.
    pub total: Option<u32>,
    pub width: f32,
    pub height: f32,
}

/// A low-level hook that draws directly onto a page.
///
/// Engines run registered events as each page is finished (`total` is
/// `None`); the stamping pass runs its hooks once the whole document exists.
pub trait PageEvent: Debug {
    fn on_page(&self, page: &PageInfo, overlay: &mut Overlay);
}

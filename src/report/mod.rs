pub mod money;
pub mod pdf;
pub mod render;

pub use render::{DocumentInfo, PDF_CONTENT_TYPE, RenderedDocument, render_quote};

use std::sync::Arc;

use crate::error::EngineResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl RgbaFrame {
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels_to_vec(&self) -> Vec<u8> {
        self.pixels.as_ref().to_vec()
    }
}

/// One positioned run of text as emitted by text extraction. The origin is
/// in the page's native bottom-left coordinate space; callers flip to
/// top-left screen space with the page's pixel height.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
    pub font_name: String,
    pub is_line_end: bool,
}

/// Decoding capability: turns a raw byte buffer into a decoded document.
pub trait RasterBackend: Send + Sync {
    fn decode(&self, bytes: Arc<Vec<u8>>) -> EngineResult<Box<dyn DecodedDocument>>;
}

/// One decoded document. Page numbers are 1-based across the crate.
pub trait DecodedDocument: Send {
    fn page_count(&self) -> u32;
    fn render_page(&self, page_number: u32, scale: f32) -> EngineResult<RgbaFrame>;
    fn extract_text(&self, page_number: u32) -> EngineResult<Vec<TextFragment>>;
}

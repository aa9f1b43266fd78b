use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{EngineError, EngineResult};

use super::traits::{DecodedDocument, RasterBackend, RgbaFrame, TextFragment};

/// One scripted page served by the fixture backend.
#[derive(Debug, Clone)]
pub struct FixturePage {
    pub width: u32,
    pub height: u32,
    pub fragments: Vec<TextFragment>,
}

impl FixturePage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fragments: Vec::new(),
        }
    }

    pub fn with_fragments(mut self, fragments: Vec<TextFragment>) -> Self {
        self.fragments = fragments;
        self
    }
}

/// Deterministic rasterization capability for tests: every decoded document
/// serves the same scripted pages, render failures can be injected per page,
/// and every capability invocation is counted.
#[derive(Clone)]
pub struct FixtureBackend {
    shared: Arc<FixtureShared>,
}

struct FixtureShared {
    pages: Vec<FixturePage>,
    render_failures: Mutex<HashMap<u32, u32>>,
    decode_calls: AtomicU64,
    render_calls: AtomicU64,
    extract_calls: AtomicU64,
}

impl FixtureBackend {
    pub fn new(pages: Vec<FixturePage>) -> Self {
        Self {
            shared: Arc::new(FixtureShared {
                pages,
                render_failures: Mutex::new(HashMap::new()),
                decode_calls: AtomicU64::new(0),
                render_calls: AtomicU64::new(0),
                extract_calls: AtomicU64::new(0),
            }),
        }
    }

    /// Makes the next `times` renders of `page_number` fail.
    pub fn fail_renders(&self, page_number: u32, times: u32) {
        self.shared
            .render_failures
            .lock()
            .insert(page_number, times);
    }

    pub fn decode_calls(&self) -> u64 {
        self.shared.decode_calls.load(Ordering::SeqCst)
    }

    pub fn render_calls(&self) -> u64 {
        self.shared.render_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> u64 {
        self.shared.extract_calls.load(Ordering::SeqCst)
    }
}

impl RasterBackend for FixtureBackend {
    fn decode(&self, bytes: Arc<Vec<u8>>) -> EngineResult<Box<dyn DecodedDocument>> {
        self.shared.decode_calls.fetch_add(1, Ordering::SeqCst);
        if bytes.is_empty() {
            return Err(EngineError::decode("document buffer is empty"));
        }

        Ok(Box::new(FixtureDocument {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FixtureDocument {
    shared: Arc<FixtureShared>,
}

impl FixtureDocument {
    fn page(&self, page_number: u32) -> EngineResult<&FixturePage> {
        if page_number == 0 {
            return Err(EngineError::invalid_argument("page numbers start at 1"));
        }
        self.shared
            .pages
            .get(page_number as usize - 1)
            .ok_or(EngineError::invalid_argument("page number is out of range"))
    }
}

impl DecodedDocument for FixtureDocument {
    fn page_count(&self) -> u32 {
        self.shared.pages.len() as u32
    }

    fn render_page(&self, page_number: u32, scale: f32) -> EngineResult<RgbaFrame> {
        self.shared.render_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(remaining) = self.shared.render_failures.lock().get_mut(&page_number)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(EngineError::render_message(
                page_number,
                "scripted render failure",
            ));
        }

        let page = self.page(page_number)?;
        let width = ((page.width as f32 * scale).round() as u32).max(1);
        let height = ((page.height as f32 * scale).round() as u32).max(1);
        // Fill derived from the page number so distinct pages are
        // distinguishable byte-for-byte.
        let pixels = vec![page_number as u8; width as usize * height as usize * 4];

        Ok(RgbaFrame {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    fn extract_text(&self, page_number: u32) -> EngineResult<Vec<TextFragment>> {
        self.shared.extract_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.page(page_number)?.fragments.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::backend::{RasterBackend, TextFragment};
    use crate::error::EngineError;

    use super::{FixtureBackend, FixturePage};

    fn fragment(text: &str) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            origin_x: 10.0,
            origin_y: 700.0,
            width: 50.0,
            height: 12.0,
            font_name: "Fixture".to_string(),
            is_line_end: false,
        }
    }

    #[test]
    fn decode_rejects_empty_bytes_and_counts_calls() {
        let backend = FixtureBackend::new(vec![FixturePage::new(100, 200)]);
        let result = backend.decode(Arc::new(Vec::new()));
        assert!(matches!(result, Err(EngineError::Decode(_))));
        assert_eq!(backend.decode_calls(), 1);
    }

    #[test]
    fn render_scales_page_dimensions_and_counts_calls() {
        let backend = FixtureBackend::new(vec![FixturePage::new(100, 200)]);
        let doc = backend
            .decode(Arc::new(vec![1]))
            .expect("fixture should decode");

        let frame = doc.render_page(1, 2.0).expect("render should succeed");
        assert_eq!(frame.width, 200);
        assert_eq!(frame.height, 400);
        assert_eq!(frame.pixels.len(), 200 * 400 * 4);
        assert_eq!(backend.render_calls(), 1);
    }

    #[test]
    fn scripted_failures_are_consumed_in_order() {
        let backend = FixtureBackend::new(vec![FixturePage::new(10, 10)]);
        backend.fail_renders(1, 1);
        let doc = backend
            .decode(Arc::new(vec![1]))
            .expect("fixture should decode");

        assert!(matches!(
            doc.render_page(1, 1.0),
            Err(EngineError::Render { page: 1, .. })
        ));
        assert!(doc.render_page(1, 1.0).is_ok());
        assert_eq!(backend.render_calls(), 2);
    }

    #[test]
    fn extract_returns_scripted_fragments() {
        let page = FixturePage::new(10, 10).with_fragments(vec![fragment("hello")]);
        let backend = FixtureBackend::new(vec![page]);
        let doc = backend
            .decode(Arc::new(vec![1]))
            .expect("fixture should decode");

        let fragments = doc.extract_text(1).expect("extract should succeed");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "hello");
        assert_eq!(backend.extract_calls(), 1);
    }
}

use std::sync::Arc;

use hayro::hayro_interpret::font::Glyph;
use hayro::hayro_interpret::util::{PageExt, RectExt};
use hayro::hayro_interpret::{
    BlendMode, ClipPath, Context, Device, GlyphDrawMode, Image, InterpreterSettings, Paint,
    PathDrawMode, SoftMask, interpret_page,
};
use hayro::hayro_syntax::Pdf;
use hayro::hayro_syntax::page::Page;
use hayro::vello_cpu::color::palette::css::WHITE;
use hayro::{RenderSettings, render};
use kurbo::{Affine, BezPath, Point};

use crate::error::{EngineError, EngineResult};

use super::traits::{DecodedDocument, RasterBackend, RgbaFrame, TextFragment};

/// Production rasterization capability backed by the hayro PDF interpreter.
#[derive(Debug, Default)]
pub struct HayroBackend;

impl RasterBackend for HayroBackend {
    fn decode(&self, bytes: Arc<Vec<u8>>) -> EngineResult<Box<dyn DecodedDocument>> {
        if bytes.is_empty() {
            return Err(EngineError::decode("document buffer is empty"));
        }
        if !bytes.as_slice().starts_with(b"%PDF-") {
            return Err(EngineError::decode("input is not a valid PDF header"));
        }

        let pdf = Pdf::new(bytes)
            .map_err(|_| EngineError::decode("failed to parse PDF with hayro"))?;
        Ok(Box::new(HayroDocument { pdf }))
    }
}

pub struct HayroDocument {
    pdf: Pdf,
}

impl HayroDocument {
    fn page(&self, page_number: u32) -> EngineResult<&Page<'_>> {
        if page_number == 0 {
            return Err(EngineError::invalid_argument("page numbers start at 1"));
        }
        self.pdf
            .pages()
            .get(page_number as usize - 1)
            .ok_or(EngineError::invalid_argument("page number is out of range"))
    }
}

impl DecodedDocument for HayroDocument {
    fn page_count(&self) -> u32 {
        self.pdf.pages().len() as u32
    }

    fn render_page(&self, page_number: u32, scale: f32) -> EngineResult<RgbaFrame> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(EngineError::invalid_argument(
                "scale must be a positive finite value",
            ));
        }
        let page = self.page(page_number)?;

        let render_settings = RenderSettings {
            x_scale: scale,
            y_scale: scale,
            bg_color: WHITE,
            ..Default::default()
        };
        let interpreter_settings = InterpreterSettings::default();
        let pixmap = render(page, &interpreter_settings, &render_settings);

        Ok(RgbaFrame {
            width: pixmap.width() as u32,
            height: pixmap.height() as u32,
            pixels: pixmap.data_as_u8_slice().to_vec().into(),
        })
    }

    fn extract_text(&self, page_number: u32) -> EngineResult<Vec<TextFragment>> {
        let page = self.page(page_number)?;
        let (_, page_height) = page.render_dimensions();

        let mut context = Context::new(
            page.initial_transform(true),
            page.intersected_crop_box().to_kurbo(),
            page.xref(),
            InterpreterSettings::default(),
        );
        let mut device = FragmentDevice::new(page_height as f64);
        interpret_page(page, &mut context, &mut device);
        Ok(device.finish())
    }
}

const LINE_BREAK_THRESHOLD: f64 = 6.0;

/// Interpreter device that groups glyphs into positioned runs. Device
/// coordinates are top-left; emitted fragments are flipped to the crate's
/// bottom-left convention using the page height.
struct FragmentDevice {
    page_height: f64,
    fragments: Vec<TextFragment>,
    current: Option<RunBuilder>,
    last_glyph: Option<(char, i32, i32)>,
}

struct RunBuilder {
    text: String,
    start: Point,
    last: Point,
    size: f64,
}

impl FragmentDevice {
    fn new(page_height: f64) -> Self {
        Self {
            page_height,
            fragments: Vec::new(),
            current: None,
            last_glyph: None,
        }
    }

    fn finish(mut self) -> Vec<TextFragment> {
        self.flush(true);
        self.fragments
    }

    fn flush(&mut self, line_end: bool) {
        let Some(run) = self.current.take() else {
            return;
        };
        if run.text.trim().is_empty() {
            return;
        }

        // The last glyph's advance is not reported; approximate it from the
        // font size so the run width covers the final glyph.
        let width = (run.last.x - run.start.x) + run.size * 0.6;
        self.fragments.push(TextFragment {
            text: run.text,
            origin_x: run.start.x as f32,
            origin_y: (self.page_height - run.start.y) as f32,
            width: width as f32,
            height: run.size as f32,
            // hayro glyphs do not carry a font name
            font_name: String::new(),
            is_line_end: line_end,
        });
    }

    fn push_char(&mut self, ch: char, position: Point, size: f64) {
        let run_break = self.current.as_ref().and_then(|run| {
            if (position.y - run.last.y).abs() > LINE_BREAK_THRESHOLD {
                Some(true)
            } else if position.x - run.last.x > run.size * 3.0 {
                // Large horizontal jump inside one line: separate column or
                // tabulated run.
                Some(false)
            } else {
                None
            }
        });
        if let Some(line_end) = run_break {
            self.flush(line_end);
        }

        if ch.is_whitespace() {
            if let Some(run) = &mut self.current {
                if !run.text.ends_with(' ') {
                    run.text.push(' ');
                }
                run.last = position;
            }
            return;
        }

        match &mut self.current {
            Some(run) => {
                if position.x - run.last.x > run.size * 0.3 && !run.text.ends_with(' ') {
                    run.text.push(' ');
                }
                run.text.push(ch);
                run.last = position;
                run.size = run.size.max(size);
            }
            None => {
                self.current = Some(RunBuilder {
                    text: ch.to_string(),
                    start: position,
                    last: position,
                    size,
                });
            }
        }
    }

    fn is_duplicate_glyph(&self, ch: char, x: f64, y: f64) -> bool {
        self.last_glyph == Some((ch, quantize_coord(x), quantize_coord(y)))
    }

    fn set_last_glyph(&mut self, ch: char, x: f64, y: f64) {
        self.last_glyph = Some((ch, quantize_coord(x), quantize_coord(y)));
    }
}

impl<'a> Device<'a> for FragmentDevice {
    fn set_soft_mask(&mut self, _mask: Option<SoftMask<'a>>) {}

    fn set_blend_mode(&mut self, _blend_mode: BlendMode) {}

    fn draw_path(
        &mut self,
        _path: &BezPath,
        _transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &PathDrawMode,
    ) {
    }

    fn push_clip_path(&mut self, _clip_path: &ClipPath) {}

    fn push_transparency_group(
        &mut self,
        _opacity: f32,
        _mask: Option<SoftMask<'a>>,
        _blend_mode: BlendMode,
    ) {
    }

    fn draw_glyph(
        &mut self,
        glyph: &Glyph<'a>,
        transform: Affine,
        glyph_transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &GlyphDrawMode,
    ) {
        let Some(ch) = glyph.as_unicode() else {
            return;
        };

        let combined = transform * glyph_transform;
        let position = combined * Point::ORIGIN;
        if self.is_duplicate_glyph(ch, position.x, position.y) {
            return;
        }

        let coeffs = combined.as_coeffs();
        let size = coeffs[3].abs().max(1.0);

        self.set_last_glyph(ch, position.x, position.y);
        self.push_char(ch, position, size);
    }

    fn draw_image(&mut self, _image: Image<'a, '_>, _transform: Affine) {}

    fn pop_clip_path(&mut self) {}

    fn pop_transparency_group(&mut self) {}
}

fn quantize_coord(value: f64) -> i32 {
    (value * 100.0).round() as i32
}

//! Text layer for selection
//!
//! Turns the text runs a page exposes (natively or through OCR) into the
//! per-character hit-test units the selection geometry works on.

use crate::config::EngineConfig;
use crate::error::AnnotatorResult;
use crate::geometry::{HitUnit, ScreenRect};
use doc_model::Rect;

/// A run of text with its bounding box in document space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub rect: Rect,
}

impl TextRun {
    pub fn new(text: impl Into<String>, rect: Rect) -> Self {
        Self { text: text.into(), rect }
    }
}

/// Raster of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA rows
    pub data: Vec<u8>,
}

/// Supplies the native text runs of a page, in reading order.
pub trait TextRunSource {
    fn extract_text_runs(&self, page_index: u32) -> AnnotatorResult<Vec<TextRun>>;
}

/// Rasterizes a page at a linear scale.
pub trait PageRenderer {
    fn render(&self, page_index: u32, scale: f64) -> AnnotatorResult<PixelBuffer>;
}

/// Recognizes text on a page image.
///
/// Runs are returned in image pixel coordinates.
pub trait OcrEngine {
    fn recognize(&self, image: &PixelBuffer) -> AnnotatorResult<Vec<TextRun>>;
}

/// Renderer and OCR engine used for pages without native text.
pub struct OcrFallback<'a> {
    pub renderer: &'a dyn PageRenderer,
    pub engine: &'a dyn OcrEngine,
    pub scale: f64,
}

impl<'a> OcrFallback<'a> {
    /// Fallback rendering at the configured OCR scale.
    pub fn new(
        renderer: &'a dyn PageRenderer,
        engine: &'a dyn OcrEngine,
        config: &EngineConfig,
    ) -> Self {
        Self { renderer, engine, scale: config.ocr_scale }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOrigin {
    Native,
    Ocr,
}

/// Text runs of one page together with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTextLayer {
    pub page_index: u32,
    pub runs: Vec<TextRun>,
    pub origin: TextOrigin,
}

impl PageTextLayer {
    pub fn from_runs(page_index: u32, runs: Vec<TextRun>) -> Self {
        Self { page_index, runs, origin: TextOrigin::Native }
    }

    /// Build the layer for a page, going through OCR only when the page has
    /// no native text and a fallback is available.
    pub fn build(
        page_index: u32,
        source: &dyn TextRunSource,
        ocr: Option<&OcrFallback<'_>>,
    ) -> AnnotatorResult<Self> {
        let runs = source.extract_text_runs(page_index)?;
        if !runs.iter().all(|run| run.text.is_empty()) {
            return Ok(Self::from_runs(page_index, runs));
        }

        let Some(fallback) = ocr else {
            return Ok(Self::from_runs(page_index, runs));
        };

        log::debug!(
            "page {} has no native text, running OCR at scale {}",
            page_index,
            fallback.scale
        );
        let image = fallback.renderer.render(page_index, fallback.scale)?;
        let inverse = 1.0 / fallback.scale;
        let runs = fallback
            .engine
            .recognize(&image)?
            .into_iter()
            .map(|run| TextRun { rect: run.rect.scaled(inverse), text: run.text })
            .collect();

        Ok(Self { page_index, runs, origin: TextOrigin::Ocr })
    }

    /// Concatenated text, one char per hit unit.
    pub fn text(&self) -> String {
        self.runs.iter().flat_map(|run| run.text.chars()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|run| run.text.is_empty())
    }

    /// Hit units for this page at the given zoom factor.
    pub fn units(&self, zoom: f64) -> Vec<HitUnit> {
        hit_units(&self.runs, zoom)
    }
}

/// Split runs into per-character hit units on screen.
///
/// Each run is scaled by `zoom` (origin clamped to non-negative, size to at
/// least one pixel) and its width is shared evenly between its characters.
pub fn hit_units(runs: &[TextRun], zoom: f64) -> Vec<HitUnit> {
    let mut units = Vec::new();

    for run in runs {
        let count = run.text.chars().count();
        if count == 0 {
            continue;
        }

        let x = (run.rect.x0 * zoom).max(0.0);
        let y = (run.rect.y0 * zoom).max(0.0);
        let width = (run.rect.width() * zoom).max(1.0);
        let height = (run.rect.height() * zoom).max(1.0);
        let char_width = width / count as f64;

        units.extend(run.text.chars().enumerate().map(|(i, c)| {
            HitUnit::new(c, ScreenRect::new(x + i as f64 * char_width, y, char_width, height))
        }));
    }

    units
}

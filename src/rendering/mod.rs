//! Single-image rendering of an answer.
//!
//! Prose lines and rasterized formulas are stacked vertically on a
//! fixed-width white canvas whose height is computed before drawing.

pub mod font;
pub mod layout;
pub mod paint;
pub mod raster;

use crate::config::ImageLayout;
use crate::extract::extract;
use crate::rasterize::Rasterizer;
use font::Fonts;
use image::RgbImage;
use log::debug;

/// An encoded PNG with its pixel dimensions.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

/// Extract, rasterize and paint `text` onto a single canvas.
pub fn render_answer(
    text: &str,
    rasterizer: &Rasterizer,
    fonts: &Fonts,
    metrics: &ImageLayout,
    dpi: u32,
) -> RgbImage {
    let spans = extract(text);
    let formulas = rasterizer.rasterize_spans(spans, dpi);
    let items = layout::build_items(text, formulas);
    let canvas = paint::paint(&items, fonts, metrics);
    debug!(
        "painted {} layout items onto {}x{} canvas",
        items.len(),
        canvas.width(),
        canvas.height()
    );
    canvas
}

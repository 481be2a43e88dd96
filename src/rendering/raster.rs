/// PNG encoding and the single-formula preview canvas

use crate::rasterize::paste_with_background;
use crate::rendering::paint::BACKGROUND;
use crate::rendering::Screenshot;
use crate::Result;
use image::{ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Fixed preview canvas size.
pub const PREVIEW_WIDTH: u32 = 800;
pub const PREVIEW_HEIGHT: u32 = 200;

pub fn encode_png(canvas: &RgbImage) -> Result<Screenshot> {
    let mut out = Cursor::new(Vec::new());
    canvas.write_to(&mut out, ImageFormat::Png)?;
    Ok(Screenshot {
        width: canvas.width(),
        height: canvas.height(),
        png_data: out.into_inner(),
    })
}

pub fn write_png(canvas: &RgbImage, path: &Path) -> Result<()> {
    canvas.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Center `formula` on a white preview canvas. Oversized formulas stay
/// centred and are cropped on every side.
pub fn preview_canvas(formula: &RgbaImage) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(PREVIEW_WIDTH, PREVIEW_HEIGHT, BACKGROUND);
    let x = (PREVIEW_WIDTH as i64 - formula.width() as i64).div_euclid(2);
    let y = (PREVIEW_HEIGHT as i64 - formula.height() as i64).div_euclid(2);
    paste_with_background(&mut canvas, formula, x, y, BACKGROUND);
    canvas
}

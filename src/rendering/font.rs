//! Text faces for the raster path.
//!
//! TrueType faces from the assets directory are rasterized with `ab_glyph`.
//! When none can be loaded, the built-in `embedded-graphics` mono font is
//! used instead so rendering never fails for lack of a font file.

use crate::rendering::layout::Emphasis;
use crate::{Error, Result};
use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use embedded_graphics::mono_font::{iso_8859_1::FONT_10X20, MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use image::{Rgb, RgbImage};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Regular/bold file pairs tried in order.
pub(crate) const FACE_CANDIDATES: &[(&str, &str)] = &[
    ("arial.ttf", "arialbd.ttf"),
    ("DejaVuSans.ttf", "DejaVuSans-Bold.ttf"),
];

/// First candidate pair whose regular and bold files both exist.
pub(crate) fn locate_face_pair(assets_dir: &Path) -> Option<(PathBuf, PathBuf)> {
    FACE_CANDIDATES.iter().find_map(|(regular, bold)| {
        let regular = assets_dir.join(regular);
        let bold = assets_dir.join(bold);
        (regular.is_file() && bold.is_file()).then_some((regular, bold))
    })
}

/// A face at a fixed pixel size.
pub enum Face {
    Outline { font: FontVec, scale: PxScale },
    /// The built-in 10x20 Latin-1 bitmap font
    Builtin,
}

fn builtin_font() -> &'static MonoFont<'static> {
    &FONT_10X20
}

impl Face {
    pub fn from_file(path: &Path, size: f32) -> Result<Self> {
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data)
            .map_err(|e| Error::FontError(format!("{}: {}", path.display(), e)))?;
        Ok(Face::Outline {
            font,
            scale: PxScale::from(size),
        })
    }

    pub fn builtin() -> Self {
        Face::Builtin
    }

    /// Advance width of `text` in pixels.
    pub fn text_width(&self, text: &str) -> u32 {
        match self {
            Face::Outline { font, scale } => {
                let scaled = font.as_scaled(*scale);
                let mut width = 0.0f32;
                let mut prev: Option<GlyphId> = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = prev {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    prev = Some(id);
                }
                width.max(0.0).ceil() as u32
            }
            Face::Builtin => {
                let mono = builtin_font();
                let advance = mono.character_size.width + mono.character_spacing;
                text.chars().count() as u32 * advance
            }
        }
    }

    /// Draw `text` with its top edge at `y`. Pixels outside the canvas are
    /// clipped.
    pub fn draw(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        match self {
            Face::Outline { font, scale } => {
                let scaled = font.as_scaled(*scale);
                let baseline = y as f32 + scaled.ascent();
                let mut caret = x as f32;
                let mut prev: Option<GlyphId> = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = prev {
                        caret += scaled.kern(prev, id);
                    }
                    let glyph = id.with_scale_and_position(*scale, point(caret, baseline));
                    caret += scaled.h_advance(id);
                    prev = Some(id);

                    let Some(outlined) = font.outline_glyph(glyph) else {
                        continue;
                    };
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        let px = bounds.min.x as i32 + gx as i32;
                        let py = bounds.min.y as i32 + gy as i32;
                        blend_pixel(canvas, px, py, color, coverage);
                    });
                }
            }
            Face::Builtin => {
                let style = MonoTextStyle::new(builtin_font(), Rgb888::new(color[0], color[1], color[2]));
                let mut target = CanvasTarget { image: canvas };
                let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
                    .draw(&mut target);
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Face::Builtin)
    }
}

fn blend_pixel(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    let px = canvas.get_pixel_mut(x as u32, y as u32);
    for (dst, src) in px.0.iter_mut().zip(color.0) {
        let mixed = src as f32 * coverage + *dst as f32 * (1.0 - coverage);
        *dst = mixed.round() as u8;
    }
}

/// `DrawTarget` over an `RgbImage`, for the built-in mono font.
struct CanvasTarget<'a> {
    image: &'a mut RgbImage,
}

impl OriginDimensions for CanvasTarget<'_> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for CanvasTarget<'_> {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.image.dimensions();
        for Pixel(coord, color) in pixels {
            if coord.x < 0 || coord.y < 0 {
                continue;
            }
            let (x, y) = (coord.x as u32, coord.y as u32);
            if x < width && y < height {
                self.image.put_pixel(x, y, Rgb([color.r(), color.g(), color.b()]));
            }
        }
        Ok(())
    }
}

/// Regular and bold faces for the image layout.
pub struct Fonts {
    pub regular: Face,
    pub bold: Face,
}

impl Fonts {
    /// Load the first available TrueType pair from `assets_dir`, falling back
    /// to the built-in face for both roles.
    pub fn load(assets_dir: &Path, size: f32, bold_size: f32) -> Self {
        let Some((regular, bold)) = locate_face_pair(assets_dir) else {
            warn!(
                "No TrueType fonts in {}, using built-in face",
                assets_dir.display()
            );
            return Self::builtin();
        };

        match (Face::from_file(&regular, size), Face::from_file(&bold, bold_size)) {
            (Ok(regular_face), Ok(bold_face)) => {
                debug!("image fonts: {} / {}", regular.display(), bold.display());
                Self {
                    regular: regular_face,
                    bold: bold_face,
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to load fonts, using built-in face: {}", e);
                Self::builtin()
            }
        }
    }

    pub fn builtin() -> Self {
        Self {
            regular: Face::builtin(),
            bold: Face::builtin(),
        }
    }

    pub fn face(&self, emphasis: Emphasis) -> &Face {
        match emphasis {
            Emphasis::Normal => &self.regular,
            Emphasis::Bold => &self.bold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    #[test]
    fn builtin_width_is_monospaced() {
        let face = Face::builtin();
        assert_eq!(face.text_width(""), 0);
        assert_eq!(face.text_width("abcd"), 2 * face.text_width("ab"));
        assert!(face.is_builtin());
    }

    #[test]
    fn builtin_draw_marks_pixels() {
        let mut canvas = RgbImage::from_pixel(60, 30, WHITE);
        Face::builtin().draw(&mut canvas, 2, 2, "Hi", BLACK);
        assert!(canvas.pixels().any(|p| *p == BLACK));
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let mut canvas = RgbImage::from_pixel(10, 10, WHITE);
        Face::builtin().draw(&mut canvas, -50, -50, "clipped", BLACK);
        Face::builtin().draw(&mut canvas, 500, 500, "clipped", BLACK);
        assert!(canvas.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn missing_assets_fall_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let fonts = Fonts::load(dir.path(), 20.0, 22.0);
        assert!(fonts.regular.is_builtin());
        assert!(fonts.face(Emphasis::Bold).is_builtin());
    }

    #[test]
    fn unreadable_font_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("arial.ttf"), b"not a font").unwrap();
        std::fs::write(dir.path().join("arialbd.ttf"), b"not a font").unwrap();
        let fonts = Fonts::load(dir.path(), 20.0, 22.0);
        assert!(fonts.regular.is_builtin());
    }
}

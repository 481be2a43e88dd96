//! Paint commands and the canvas painter.

use crate::config::ImageLayout;
use crate::rasterize::paste_with_background;
use crate::rendering::font::{Face, Fonts};
use crate::rendering::layout::{self, LayoutItem};
use image::{Rgb, RgbImage, RgbaImage};

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// One placement produced by the layout walk.
pub enum PaintCommand<'a> {
    Text {
        x: i32,
        y: i32,
        text: String,
        face: &'a Face,
    },
    Formula {
        x: i64,
        y: i64,
        bitmap: &'a RgbaImage,
    },
}

impl std::fmt::Debug for PaintCommand<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaintCommand::Text { x, y, text, .. } => f
                .debug_struct("Text")
                .field("x", x)
                .field("y", y)
                .field("text", text)
                .finish(),
            PaintCommand::Formula { x, y, bitmap } => f
                .debug_struct("Formula")
                .field("x", x)
                .field("y", y)
                .field("size", &bitmap.dimensions())
                .finish(),
        }
    }
}

/// Two-pass render: measure the height, allocate a white canvas, then replay
/// the same layout walk while drawing.
pub fn paint(items: &[LayoutItem], fonts: &Fonts, metrics: &ImageLayout) -> RgbImage {
    let height = layout::measure_height(items, fonts, metrics);
    let mut canvas = RgbImage::from_pixel(metrics.width, height, BACKGROUND);

    layout::walk(items, fonts, metrics, |cmd| match cmd {
        PaintCommand::Text { x, y, text, face } => face.draw(&mut canvas, x, y, &text, INK),
        PaintCommand::Formula { x, y, bitmap } => {
            paste_with_background(&mut canvas, bitmap, x, y, BACKGROUND)
        }
    });
    canvas
}

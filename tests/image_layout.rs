//! Two-pass image layout through the public renderer.

use image::{DynamicImage, ImageFormat, Rgb, Rgba, RgbaImage};
use mathshot::{Error, Renderer, RendererConfig, Result};
use std::io::Cursor;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

fn encoded(bitmap: RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(bitmap)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Red opaque boxes whose height is the payload length times ten.
fn boxes(latex: &str, _dpi: u32) -> Result<Vec<u8>> {
    if latex.contains("fail") {
        return Err(Error::NetworkError("refused".into()));
    }
    let height = latex.len() as u32 * 10;
    Ok(encoded(RgbaImage::from_pixel(100, height, Rgba([255, 0, 0, 255]))))
}

fn renderer() -> Renderer {
    let config = RendererConfig {
        assets_dir: "/nonexistent-mathshot-assets".into(),
        ..RendererConfig::default()
    };
    Renderer::with_source(config, Box::new(boxes)).unwrap()
}

#[test]
fn short_answer_uses_minimum_height() {
    let canvas = renderer().render_image("one line", 1200).unwrap();
    assert_eq!(canvas.dimensions(), (1200, 400));
    assert!(canvas.pixels().any(|p| *p != WHITE));
}

#[test]
fn tall_content_extends_the_canvas() {
    let text = "intro\n$$abcdefghijklmnopqrstuvwxyzabcdef$$\noutro";
    let canvas = renderer().render_image(text, 1200).unwrap();
    // 40 + 35 + (320 + 20) + 35 + 40
    assert_eq!(canvas.height(), 490);
}

#[test]
fn formula_is_centred_horizontally() {
    let canvas = renderer().render_image("$$abcdefghij$$", 1200).unwrap();
    let red: Vec<(u32, u32)> = canvas
        .enumerate_pixels()
        .filter(|(_, _, p)| **p == Rgb([255, 0, 0]))
        .map(|(x, y, _)| (x, y))
        .collect();
    assert_eq!(red.len(), 100 * 100);
    let min_x = red.iter().map(|(x, _)| *x).min().unwrap();
    let min_y = red.iter().map(|(_, y)| *y).min().unwrap();
    assert_eq!(min_x, 550);
    assert_eq!(min_y, 40);
}

#[test]
fn failed_formula_leaves_prose_intact() {
    let renderer = renderer();
    let with_failure = renderer
        .render_image("before\n$$fail$$\nafter", 1200)
        .unwrap();
    let without = renderer.render_image("before\nafter", 1200).unwrap();
    assert_eq!(with_failure, without);
}

#[test]
fn inline_formula_splits_its_line() {
    let renderer = renderer();
    let canvas = renderer.render_image("left $ab$ right", 1200).unwrap();
    // "left", the 20px formula, then "right"
    assert_eq!(canvas.height(), 400);
    assert!(canvas.pixels().any(|p| *p == Rgb([255, 0, 0])));
}

#[test]
fn png_encoding_reports_dimensions() {
    let shot = renderer().render_png("$$abc$$").unwrap();
    assert_eq!((shot.width, shot.height), (1200, 400));
    assert!(shot.png_data.starts_with(&[0x89, b'P', b'N', b'G']));
    let decoded = image::load_from_memory(&shot.png_data).unwrap();
    assert_eq!(decoded.width(), 1200);
}

#[test]
fn image_file_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("answer.png");
    assert!(renderer().render_image_file("**Answer:** $x$", &path));
    assert_eq!(image::open(&path).unwrap().height(), 400);
}

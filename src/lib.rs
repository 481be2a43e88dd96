//! mathshot
//!
//! Formula-aware rendering of mixed prose and LaTeX answers into three
//! delivery formats:
//!
//! - **Plain text**: math degraded to Unicode approximations and split into
//!   bounded-length messages
//! - **Image**: one PNG with prose lines and rasterized formulas stacked on a
//!   fixed-width canvas
//! - **Document**: a paginated A4 PDF with formulas embedded as images
//!
//! Formulas are rasterized by an external service reached through the
//! [`FormulaSource`] trait (CodeCogs by default, feature `codecogs`). A failed
//! formula never fails the render: it is logged and left out.
//!
//! # Example
//!
//! ```no_run
//! use mathshot::{Renderer, RendererConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let renderer = Renderer::new(RendererConfig::default())?;
//! let answer = "**Answer:** the root is $x = \\frac{1}{2}$.";
//!
//! for chunk in renderer.render_text(answer) {
//!     println!("{}", chunk);
//! }
//! assert!(renderer.render_image_file(answer, "answer.png".as_ref()));
//! assert!(renderer.render_document(answer, "answer.pdf".as_ref()));
//! # Ok(())
//! # }
//! ```

use log::{debug, error};
use std::path::Path;

pub mod config;
pub mod degrade;
pub mod document;
pub mod error;
pub mod extract;
pub mod rasterize;
pub mod rendering;
pub mod split;
pub mod tempfiles;

pub use config::{DocumentLayout, ImageLayout, RendererConfig};
pub use degrade::{degrade, format_plain};
pub use error::{Error, Result};
pub use extract::{extract, Delimiter, DisplayMode, Span};
#[cfg(feature = "codecogs")]
pub use rasterize::CodecogsClient;
pub use rasterize::{FormulaSource, RasterizedFormula, Rasterizer};
pub use rendering::Screenshot;
pub use split::split;

use document::fonts::DocumentFonts;
use rendering::font::Fonts;
use rendering::raster;

/// Composition root: configuration, the formula source and loaded fonts.
///
/// Holds no per-request state, so one renderer can serve many requests and
/// be shared across threads by reference.
pub struct Renderer {
    config: RendererConfig,
    rasterizer: Rasterizer,
    fonts: Fonts,
    document_fonts: DocumentFonts,
}

impl Renderer {
    /// Build a renderer backed by the CodeCogs HTTP client.
    #[cfg(feature = "codecogs")]
    pub fn new(config: RendererConfig) -> Result<Self> {
        let client = CodecogsClient::new(&config)?;
        Self::with_source(config, Box::new(client))
    }

    /// Build a renderer around any formula source.
    pub fn with_source(config: RendererConfig, source: Box<dyn FormulaSource>) -> Result<Self> {
        config.validate()?;
        let fonts = Fonts::load(
            &config.assets_dir,
            config.image.font_size,
            config.image.bold_font_size,
        );
        let document_fonts = DocumentFonts::load(&config.assets_dir);
        Ok(Self {
            config,
            rasterizer: Rasterizer::new(source),
            fonts,
            document_fonts,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    /// Plain-text delivery: degraded, formatted and split into messages.
    pub fn render_text(&self, text: &str) -> Vec<String> {
        split(&format_plain(text), self.config.max_message_length)
    }

    /// Render `text` onto a single canvas `width` pixels wide.
    pub fn render_image(&self, text: &str, width: u32) -> Result<image::RgbImage> {
        let metrics = ImageLayout {
            width,
            ..self.config.image
        };
        if metrics.width <= metrics.padding * 2 {
            return Err(Error::ConfigError(format!(
                "image width {} leaves no room inside {}px padding",
                width, metrics.padding
            )));
        }
        let start = std::time::Instant::now();
        let canvas = rendering::render_answer(
            text,
            &self.rasterizer,
            &self.fonts,
            &metrics,
            self.config.inline_dpi,
        );
        debug!("image rendered in {:?}", start.elapsed());
        Ok(canvas)
    }

    /// Render at the configured width and encode as PNG.
    pub fn render_png(&self, text: &str) -> Result<Screenshot> {
        let canvas = self.render_image(text, self.config.image.width)?;
        raster::encode_png(&canvas)
    }

    /// Render and write a PNG to `path`. Failures are logged.
    pub fn render_image_file(&self, text: &str, path: &Path) -> bool {
        let result = self
            .render_image(text, self.config.image.width)
            .and_then(|canvas| raster::write_png(&canvas, path));
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Image render to {} failed: {}", path.display(), e);
                false
            }
        }
    }

    /// Render a paginated PDF to `path`. Failures are logged.
    pub fn render_document(&self, text: &str, path: &Path) -> bool {
        let start = std::time::Instant::now();
        match document::render_document(
            text,
            path,
            &self.rasterizer,
            &self.document_fonts,
            &self.config,
        ) {
            Ok(()) => {
                debug!("document rendered in {:?}", start.elapsed());
                true
            }
            Err(e) => {
                error!("Document render to {} failed: {}", path.display(), e);
                false
            }
        }
    }

    /// Render one formula at preview DPI, centred on an 800x200 canvas.
    pub fn render_preview(&self, latex: &str, path: &Path) -> bool {
        let Some(formula) = self.rasterizer.rasterize(latex, self.config.preview_dpi) else {
            error!("Preview of `{}` failed: formula unavailable", latex.trim());
            return false;
        };
        let canvas = raster::preview_canvas(&rasterize::to_rgba(formula));
        match raster::write_png(&canvas, path) {
            Ok(()) => true,
            Err(e) => {
                error!("Preview write to {} failed: {}", path.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn renderer_with(source: impl FormulaSource + 'static) -> Renderer {
        let config = RendererConfig {
            assets_dir: "/nonexistent-mathshot-assets".into(),
            ..RendererConfig::default()
        };
        Renderer::with_source(config, Box::new(source)).unwrap()
    }

    fn offline() -> Renderer {
        renderer_with(|_: &str, _: u32| -> Result<Vec<u8>> {
            Err(Error::NetworkError("offline".into()))
        })
    }

    #[test]
    fn renderer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Renderer>();
    }

    #[test]
    fn text_path_degrades_and_splits() {
        let chunks = offline().render_text("$x^2$ and $y_1$\n\n\n\nnext");
        assert_eq!(chunks, vec!["x² and y₁\n\nnext"]);
    }

    #[test]
    fn unreachable_service_keeps_text_and_drops_formula() {
        let renderer = offline();
        let with_formula = renderer.render_image("Result:\n$$x$$\nDone", 1200).unwrap();
        let text_only = renderer.render_image("Result:\nDone", 1200).unwrap();
        assert_eq!(with_formula.dimensions(), text_only.dimensions());
        assert_eq!(with_formula, text_only);
    }

    #[test]
    fn formula_height_grows_the_canvas() {
        let renderer = renderer_with(|_: &str, _: u32| -> Result<Vec<u8>> { Ok(png(200, 500)) });
        let canvas = renderer.render_image("a\n$$x$$\nb", 1200).unwrap();
        // padding + line + formula + gap + line + padding
        assert_eq!(canvas.height(), 40 + 35 + 500 + 20 + 35 + 40);
    }

    #[test]
    fn inline_dpi_is_used_for_images() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in = Arc::clone(&seen);
        let renderer = renderer_with(move |_: &str, dpi: u32| -> Result<Vec<u8>> {
            seen_in.store(dpi as usize, Ordering::SeqCst);
            Ok(png(10, 10))
        });
        renderer.render_image("$a$", 1200).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn invalid_config_is_rejected_for_any_source() {
        let config = RendererConfig {
            inline_dpi: 0,
            ..RendererConfig::default()
        };
        let source = |_: &str, _: u32| -> Result<Vec<u8>> { Ok(png(1, 1)) };
        assert!(matches!(
            Renderer::with_source(config, Box::new(source)),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn rasterizer_is_shared_with_callers() {
        let renderer = renderer_with(|_: &str, _: u32| -> Result<Vec<u8>> { Ok(png(7, 3)) });
        let formula = renderer.rasterizer().rasterize("x", renderer.config().preview_dpi);
        assert_eq!(formula.map(|f| (f.width(), f.height())), Some((7, 3)));
    }

    #[test]
    fn narrow_width_is_rejected() {
        assert!(matches!(offline().render_image("x", 80), Err(Error::ConfigError(_))));
    }

    #[test]
    fn preview_fails_without_formula() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.png");
        assert!(!offline().render_preview("x^2", &path));
        assert!(!path.exists());
    }

    #[test]
    fn preview_writes_fixed_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.png");
        let renderer = renderer_with(|_: &str, dpi: u32| -> Result<Vec<u8>> {
            assert_eq!(dpi, 300);
            Ok(png(40, 20))
        });
        assert!(renderer.render_preview("x^2", &path));
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (800, 200));
    }

    #[test]
    fn document_without_service_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        assert!(offline().render_document("Text with $x$ formula", &path));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn document_to_missing_directory_fails() {
        let path = Path::new("/nonexistent-mathshot-dir/out.pdf");
        assert!(!offline().render_document("text", path));
    }
}

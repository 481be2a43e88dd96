//! Formula rasterization adapter.
//!
//! The external formula service is reached through the [`FormulaSource`]
//! trait. [`CodecogsClient`] is the blocking HTTP implementation; tests and
//! embedders can pass any closure instead. [`Rasterizer`] turns a source into
//! the total `latex -> Option<bitmap>` function the layout engines rely on:
//! every failure is logged and becomes `None`.
//!
//! Bitmaps are normalized to RGBA ([`to_rgba`]) before compositing, and
//! [`paste_with_background`] flattens transparent formulas onto an opaque
//! background colour before pasting them onto a canvas.

use crate::extract::Span;
use crate::{Error, Result};
use image::{imageops, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use log::{debug, warn};

/// Source of raw formula images, usually a remote rendering service.
pub trait FormulaSource: Send + Sync {
    /// Fetch the encoded image (PNG, GIF, ...) for `latex` rendered at `dpi`.
    fn fetch(&self, latex: &str, dpi: u32) -> Result<Vec<u8>>;
}

impl<F> FormulaSource for F
where
    F: Fn(&str, u32) -> Result<Vec<u8>> + Send + Sync,
{
    fn fetch(&self, latex: &str, dpi: u32) -> Result<Vec<u8>> {
        self(latex, dpi)
    }
}

/// Blocking client for CodeCogs-compatible services
/// (`GET {endpoint}?\dpi{N}<url-encoded latex>`).
#[cfg(feature = "codecogs")]
pub struct CodecogsClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    timeout_ms: u64,
}

#[cfg(feature = "codecogs")]
impl CodecogsClient {
    /// Build the client once; it is reused for every formula.
    pub fn new(config: &crate::RendererConfig) -> Result<Self> {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::ConfigError(format!("invalid header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::ConfigError(format!("invalid value for header '{}': {}", name, e))
            })?;
            headers.insert(name, value);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| {
                Error::InitializationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.formula_endpoint.trim_end_matches('?').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn request_url(&self, latex: &str, dpi: u32) -> String {
        format!(
            "{}?\\dpi{{{}}}{}",
            self.endpoint,
            dpi,
            urlencoding::encode(latex)
        )
    }
}

#[cfg(feature = "codecogs")]
impl FormulaSource for CodecogsClient {
    fn fetch(&self, latex: &str, dpi: u32) -> Result<Vec<u8>> {
        let res = self
            .client
            .get(self.request_url(latex, dpi))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.timeout_ms)
                } else {
                    Error::NetworkError(format!("HTTP GET failed: {}", e))
                }
            })?;

        let status = res.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::ServiceStatus {
                status: status.as_u16(),
                latex: latex.to_string(),
            });
        }

        let body = res.bytes()?;
        Ok(body.to_vec())
    }
}

/// A span paired with its rasterized bitmap, or `None` when rendering failed.
#[derive(Debug, Clone)]
pub struct RasterizedFormula {
    pub span: Span,
    pub bitmap: Option<RgbaImage>,
}

impl RasterizedFormula {
    pub fn is_rendered(&self) -> bool {
        self.bitmap.is_some()
    }
}

/// Total wrapper around a [`FormulaSource`].
pub struct Rasterizer {
    source: Box<dyn FormulaSource>,
}

impl Rasterizer {
    pub fn new(source: Box<dyn FormulaSource>) -> Self {
        Self { source }
    }

    /// Render `latex` at `dpi`. Any failure is logged and yields `None`.
    pub fn rasterize(&self, latex: &str, dpi: u32) -> Option<DynamicImage> {
        let payload = prepare_payload(latex);
        if payload.is_empty() {
            debug!("skipping empty formula");
            return None;
        }

        let bytes = match self.source.fetch(&payload, dpi) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Formula unavailable ({}): {}", payload, e);
                return None;
            }
        };

        match image::load_from_memory(&bytes) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("Formula image undecodable ({}): {}", payload, e);
                None
            }
        }
    }

    /// Rasterize every span in order, normalizing successes to RGBA.
    pub fn rasterize_spans(&self, spans: Vec<Span>, dpi: u32) -> Vec<RasterizedFormula> {
        let formulas: Vec<RasterizedFormula> = spans
            .into_iter()
            .map(|span| {
                let bitmap = self.rasterize(&span.payload, dpi).map(to_rgba);
                RasterizedFormula { span, bitmap }
            })
            .collect();
        debug!(
            "rasterized {}/{} formulas at {} dpi",
            formulas.iter().filter(|f| f.is_rendered()).count(),
            formulas.len(),
            dpi
        );
        formulas
    }
}

/// Payload as sent to the service: stray `$` removed, fractions forced into
/// display style so they are not rendered at script size.
pub fn prepare_payload(latex: &str) -> String {
    let clean = latex.trim().trim_matches('$').trim();
    if clean.contains(r"\frac") && !clean.contains(r"\displaystyle") {
        format!(r"\displaystyle {}", clean)
    } else {
        clean.to_string()
    }
}

/// Normalize any bitmap to 8-bit RGBA. RGBA8 input is returned untouched.
pub fn to_rgba(image: DynamicImage) -> RgbaImage {
    match image {
        DynamicImage::ImageRgba8(rgba) => rgba,
        other => other.into_rgba8(),
    }
}

/// Alpha-composite `formula` over an opaque `background` layer and drop alpha.
pub fn flatten(formula: &RgbaImage, background: Rgb<u8>) -> Result<RgbImage> {
    let (width, height) = formula.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::RenderError("formula bitmap is empty".into()));
    }

    let [r, g, b] = background.0;
    let mut layer = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
    imageops::overlay(&mut layer, formula, 0, 0);
    Ok(DynamicImage::ImageRgba8(layer).to_rgb8())
}

/// Paste `formula` onto `canvas` at (`x`, `y`), clipped to the canvas.
///
/// Falls back to a direct paste that ignores transparency if flattening
/// fails, so one bad bitmap never aborts the render.
pub fn paste_with_background(
    canvas: &mut RgbImage,
    formula: &RgbaImage,
    x: i64,
    y: i64,
    background: Rgb<u8>,
) {
    match flatten(formula, background) {
        Ok(layer) => imageops::replace(canvas, &layer, x, y),
        Err(e) => {
            warn!("Alpha-aware formula paste failed, pasting directly: {}", e);
            let direct = DynamicImage::ImageRgba8(formula.clone()).to_rgb8();
            imageops::replace(canvas, &direct, x, y);
        }
    }
}

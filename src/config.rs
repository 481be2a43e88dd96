//! Renderer configuration.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration for the renderer
///
/// Defaults mirror the production bot: CodeCogs as the formula service, a
/// 10 second request timeout, 200 DPI for embedded formulas and 300 DPI for
/// standalone previews.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
///
/// # Examples
///
/// ```
/// let cfg = mathshot::RendererConfig::default();
/// assert_eq!(cfg.image.width, 1200);
/// assert!(cfg.inline_dpi < cfg.preview_dpi);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Base URL of the formula rasterization service
    pub formula_endpoint: String,
    /// Timeout for a single formula request in milliseconds
    pub timeout_ms: u64,
    /// User agent string to send with requests
    pub user_agent: String,
    /// Extra HTTP headers sent with every formula request
    pub headers: HashMap<String, String>,
    /// DPI for formulas embedded in images and documents
    pub inline_dpi: u32,
    /// DPI for single-formula previews
    pub preview_dpi: u32,
    /// Directory searched for TrueType font files
    pub assets_dir: PathBuf,
    /// Raster canvas metrics
    pub image: ImageLayout,
    /// Paginated document settings
    pub document: DocumentLayout,
    /// Maximum characters per plain-text message
    pub max_message_length: usize,
    /// Attempts made to delete a temporary file before giving up
    pub cleanup_retries: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            formula_endpoint: "https://latex.codecogs.com/png.latex".to_string(),
            timeout_ms: 10_000,
            user_agent: concat!("mathshot/", env!("CARGO_PKG_VERSION")).to_string(),
            headers: HashMap::new(),
            inline_dpi: 200,
            preview_dpi: 300,
            assets_dir: PathBuf::from("assets"),
            image: ImageLayout::default(),
            document: DocumentLayout::default(),
            max_message_length: 4000,
            cleanup_retries: 3,
        }
    }
}

impl RendererConfig {
    /// Load a (possibly partial) configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: RendererConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `MATHSHOT_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(endpoint) = std::env::var("MATHSHOT_FORMULA_ENDPOINT") {
            self.formula_endpoint = endpoint;
        }
        if let Ok(raw) = std::env::var("MATHSHOT_TIMEOUT_MS") {
            self.timeout_ms = raw.trim().parse().map_err(|_| {
                Error::ConfigError(format!("MATHSHOT_TIMEOUT_MS must be a number, got '{}'", raw))
            })?;
        }
        if let Ok(dir) = std::env::var("MATHSHOT_ASSETS_DIR") {
            self.assets_dir = PathBuf::from(dir);
        }
        self.validate()
    }

    /// Reject values that would make layout degenerate.
    pub fn validate(&self) -> Result<()> {
        if self.formula_endpoint.trim().is_empty() {
            return Err(Error::ConfigError("formula_endpoint is empty".into()));
        }
        if self.inline_dpi == 0 || self.preview_dpi == 0 {
            return Err(Error::ConfigError("DPI values must be positive".into()));
        }
        if self.max_message_length == 0 {
            return Err(Error::ConfigError("max_message_length must be positive".into()));
        }
        if self.image.width <= self.image.padding * 2 {
            return Err(Error::ConfigError(format!(
                "image width {} leaves no room inside {}px padding",
                self.image.width, self.image.padding
            )));
        }
        if self.image.line_height == 0 || self.image.font_size <= 0.0 {
            return Err(Error::ConfigError("image text metrics must be positive".into()));
        }
        Ok(())
    }
}

/// Raster canvas metrics, in pixels
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ImageLayout {
    pub width: u32,
    pub padding: u32,
    pub line_height: u32,
    pub font_size: f32,
    pub bold_font_size: f32,
    /// Vertical space after each formula
    pub formula_gap: u32,
    pub min_height: u32,
}

impl Default for ImageLayout {
    fn default() -> Self {
        Self {
            width: 1200,
            padding: 40,
            line_height: 35,
            font_size: 20.0,
            bold_font_size: 22.0,
            formula_gap: 20,
            min_height: 400,
        }
    }
}

/// Paginated document settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentLayout {
    /// Heading printed at the top of the first page
    pub title: Option<String>,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self {
            title: Some("Solutions".to_string()),
        }
    }
}

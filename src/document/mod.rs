//! Paginated PDF rendering of an answer.
//!
//! Prose gaps are degraded to Unicode and flowed as paragraphs; each formula
//! that rasterized is embedded as an image block. Formula bitmaps travel
//! through uniquely named temporary PNG files which are removed once the
//! document is written, whether or not writing succeeded.

pub mod compose;
pub mod fonts;
pub mod pdf;

use crate::config::RendererConfig;
use crate::degrade::degrade;
use crate::extract::{extract, gaps};
use crate::rasterize::{RasterizedFormula, Rasterizer};
use crate::tempfiles::TempRaster;
use crate::Result;
use compose::{DocTemplate, Flowable, ImageBlock, PageGeometry, Paragraph, ParagraphStyle, CM};
use fonts::DocumentFonts;
use log::{debug, warn};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Points per formula pixel.
const PX_TO_PT: f32 = 0.75;
/// Upper bound on formula width.
const MAX_FORMULA_WIDTH: f32 = 16.0 * CM;

/// Story under construction plus the temp files it references.
pub struct Story {
    pub flowables: Vec<Flowable>,
    rasters: Vec<TempRaster>,
}

impl Story {
    pub fn rasters(&self) -> &[TempRaster] {
        &self.rasters
    }
}

/// Build the flowable story for `text` from already rasterized formulas.
pub fn build_story(
    text: &str,
    formulas: Vec<RasterizedFormula>,
    title: Option<&str>,
    frame_width: f32,
    cleanup_retries: u32,
) -> Story {
    let mut story = Story {
        flowables: Vec::new(),
        rasters: Vec::new(),
    };

    if let Some(title) = title {
        let markup = format!("<b>{}</b>", escape(title));
        story
            .flowables
            .push(Flowable::Paragraph(Paragraph::from_markup(&markup, ParagraphStyle::HEADING)));
        story.flowables.push(Flowable::Spacer(0.5 * CM));
    }

    let mut pieces = gaps(text, formulas.iter().map(|f| &f.span)).into_iter();
    for formula in formulas {
        if let Some(gap) = pieces.next() {
            push_paragraphs(&mut story.flowables, gap);
        }
        let Some(bitmap) = formula.bitmap else {
            continue;
        };
        let raster = match TempRaster::create(&bitmap, cleanup_retries) {
            Ok(raster) => raster,
            Err(e) => {
                warn!("Skipping formula '{}': temp file failed: {}", formula.span.payload, e);
                continue;
            }
        };

        let mut width = bitmap.width() as f32 * PX_TO_PT;
        let mut height = bitmap.height() as f32 * PX_TO_PT;
        let max_width = MAX_FORMULA_WIDTH.min(frame_width);
        if width > max_width {
            height *= max_width / width;
            width = max_width;
        }
        story.flowables.push(Flowable::Image(ImageBlock {
            path: raster.path().to_path_buf(),
            width,
            height,
        }));
        story.flowables.push(Flowable::Spacer(0.3 * CM));
        story.rasters.push(raster);
    }
    for tail in pieces {
        push_paragraphs(&mut story.flowables, tail);
    }
    story
}

fn push_paragraphs(flowables: &mut Vec<Flowable>, gap: &str) {
    if gap.trim().is_empty() {
        return;
    }
    let escaped = escape(&degrade(gap));
    for para in escaped.split("\n\n") {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        let markup = bold_markup().replace_all(&para.replace('\n', "<br/>"), "<b>$1</b>").into_owned();
        flowables.push(Flowable::Paragraph(Paragraph::from_markup(&markup, ParagraphStyle::BODY)));
    }
}

fn bold_markup() -> &'static Regex {
    static BOLD: OnceLock<Regex> = OnceLock::new();
    BOLD.get_or_init(|| crate::extract::compile(r"\*\*(.*?)\*\*"))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render `text` as a PDF at `output`.
///
/// Temporary formula files are dropped (and deleted) before this returns on
/// every path.
pub fn render_document(
    text: &str,
    output: &Path,
    rasterizer: &Rasterizer,
    fonts: &DocumentFonts,
    config: &RendererConfig,
) -> Result<()> {
    let geometry = PageGeometry::a4();
    let formulas = rasterizer.rasterize_spans(extract(text), config.inline_dpi);
    let story = build_story(
        text,
        formulas,
        config.document.title.as_deref(),
        geometry.frame_width(),
        config.cleanup_retries,
    );

    let pages = DocTemplate::new(geometry).build(&story.flowables, fonts);
    let bytes = pdf::write(&pages, fonts, &geometry)?;
    std::fs::write(output, bytes)?;
    debug!(
        "wrote {} ({} pages, {} formulas)",
        output.display(),
        pages.len(),
        story.rasters().len()
    );
    Ok(())
}

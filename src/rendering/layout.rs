//! Vertical layout for the single-image renderer.
//!
//! The answer is flattened into a list of [`LayoutItem`]s (prose lines and
//! formula bitmaps). [`walk`] is the one layout routine: it wraps lines,
//! positions formulas and reports every placement to a visitor. Measuring
//! and painting both run it, so the canvas height always agrees with what is
//! drawn.

use crate::config::ImageLayout;
use crate::extract::gaps;
use crate::rasterize::RasterizedFormula;
use crate::rendering::font::{Face, Fonts};
use crate::rendering::paint::PaintCommand;
use image::RgbaImage;

/// Text weight of a prose line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Normal,
    Bold,
}

#[derive(Debug, Clone)]
pub enum LayoutItem {
    Text { line: String, emphasis: Emphasis },
    Formula(RgbaImage),
}

/// Lines starting with `**` or `#` are emphasized and lose their surrounding
/// markup characters.
pub fn classify_line(line: &str) -> (Emphasis, String) {
    if line.starts_with("**") || line.starts_with('#') {
        let cleaned = line.trim_matches(|c| c == '*' || c == '#').trim();
        (Emphasis::Bold, cleaned.to_string())
    } else {
        (Emphasis::Normal, line.to_string())
    }
}

/// Interleave prose lines with the formulas that rendered.
///
/// Blank and whitespace-only lines are skipped; formulas whose bitmap is
/// absent are omitted.
pub fn build_items(text: &str, formulas: Vec<RasterizedFormula>) -> Vec<LayoutItem> {
    let mut items = Vec::new();
    let mut pieces = gaps(text, formulas.iter().map(|f| &f.span)).into_iter();

    for formula in formulas {
        if let Some(gap) = pieces.next() {
            push_lines(&mut items, gap);
        }
        if let Some(bitmap) = formula.bitmap {
            items.push(LayoutItem::Formula(bitmap));
        }
    }
    for tail in pieces {
        push_lines(&mut items, tail);
    }
    items
}

fn push_lines(items: &mut Vec<LayoutItem>, gap: &str) {
    for raw in gap.split('\n') {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (emphasis, line) = classify_line(line);
        if line.is_empty() {
            continue;
        }
        items.push(LayoutItem::Text { line, emphasis });
    }
}

/// Greedy word wrap against a pixel budget.
///
/// A single word wider than `max_width` is emitted on its own line. Never
/// yields empty lines.
pub fn wrap_line(face: &Face, text: &str, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if cur.is_empty() {
            cur.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", cur, word);
        if face.text_width(&candidate) <= max_width {
            cur = candidate;
        } else {
            lines.push(std::mem::replace(&mut cur, word.to_string()));
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

/// Run the layout, reporting each placement to `visit`.
///
/// Returns the y coordinate just below the last placed item (the top padding
/// included, bottom padding excluded).
pub fn walk<'a, F>(items: &'a [LayoutItem], fonts: &'a Fonts, metrics: &ImageLayout, mut visit: F) -> u32
where
    F: FnMut(PaintCommand<'a>),
{
    let max_width = metrics.width.saturating_sub(metrics.padding * 2);
    let mut y = metrics.padding;

    for item in items {
        match item {
            LayoutItem::Text { line, emphasis } => {
                let face = fonts.face(*emphasis);
                for wrapped in wrap_line(face, line, max_width) {
                    visit(PaintCommand::Text {
                        x: metrics.padding as i32,
                        y: y as i32,
                        text: wrapped,
                        face,
                    });
                    y += metrics.line_height;
                }
            }
            LayoutItem::Formula(bitmap) => {
                // wider than the canvas: centred anyway, both sides clipped
                let x = (metrics.width as i64 - bitmap.width() as i64).div_euclid(2);
                visit(PaintCommand::Formula {
                    x,
                    y: y as i64,
                    bitmap,
                });
                y += bitmap.height() + metrics.formula_gap;
            }
        }
    }
    y
}

/// Canvas height for `items`: content plus bottom padding, at least
/// `min_height`.
pub fn measure_height(items: &[LayoutItem], fonts: &Fonts, metrics: &ImageLayout) -> u32 {
    let bottom = walk(items, fonts, metrics, |_| {});
    (bottom + metrics.padding).max(metrics.min_height)
}

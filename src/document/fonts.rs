//! Fonts for PDF output.
//!
//! TrueType faces found in the assets directory are embedded whole and
//! addressed by glyph id (Type0, Identity-H). Without them the standard
//! Helvetica pair is used with WinAnsi encoding, which needs no embedding but
//! only covers Latin-1 plus a few typographic characters.

use crate::document::compose::TextMeasure;
use crate::rendering::font::locate_face_pair;
use crate::{Error, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::Path;

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for WinAnsi codes outside the ASCII table.
const DEFAULT_WIDTH: u16 = 556;

/// cp1252 code points 0x80..=0x9F that differ from Latin-1.
#[rustfmt::skip]
const WIN_ANSI_EXTRAS: &[(char, u8)] = &[
    ('€', 0x80), ('‚', 0x82), ('ƒ', 0x83), ('„', 0x84), ('…', 0x85), ('†', 0x86), ('‡', 0x87),
    ('ˆ', 0x88), ('‰', 0x89), ('Š', 0x8A), ('‹', 0x8B), ('Œ', 0x8C), ('Ž', 0x8E), ('‘', 0x91),
    ('’', 0x92), ('“', 0x93), ('”', 0x94), ('•', 0x95), ('–', 0x96), ('—', 0x97), ('˜', 0x98),
    ('™', 0x99), ('š', 0x9A), ('›', 0x9B), ('œ', 0x9C), ('ž', 0x9E), ('Ÿ', 0x9F),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFace {
    Helvetica,
    HelveticaBold,
}

impl StandardFace {
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFace::Helvetica => "Helvetica",
            StandardFace::HelveticaBold => "Helvetica-Bold",
        }
    }

    fn code_width(self, code: u8) -> u16 {
        let table = match self {
            StandardFace::Helvetica => &HELVETICA_WIDTHS,
            StandardFace::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        match code {
            0x20..=0x7E => table[(code - 0x20) as usize],
            _ => DEFAULT_WIDTH,
        }
    }
}

/// Map a char to its WinAnsi code; unencodable chars become `?`.
pub fn win_ansi(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        _ => WIN_ANSI_EXTRAS
            .iter()
            .find(|(from, _)| *from == c)
            .map(|(_, code)| *code)
            .unwrap_or(b'?'),
    }
}

/// A TrueType face prepared for embedding.
#[derive(Debug, Clone)]
pub struct EmbeddedFace {
    pub base_font: String,
    pub data: Vec<u8>,
    pub units_per_em: u16,
    pub ascent: i16,
    pub descent: i16,
    pub cap_height: i16,
    pub bbox: [i16; 4],
    cmap: HashMap<char, u16>,
    advances: Vec<u16>,
}

impl EmbeddedFace {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Embedded");
        Self::parse(stem, data)
    }

    pub fn parse(name: &str, data: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| Error::FontError(format!("{}: {}", name, e)))?;

        let mut cmap = HashMap::new();
        if let Some(table) = face.tables().cmap {
            for subtable in table.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    let Some(c) = char::from_u32(cp) else {
                        return;
                    };
                    if let Some(gid) = subtable.glyph_index(cp) {
                        cmap.entry(c).or_insert(gid.0);
                    }
                });
            }
        }
        if cmap.is_empty() {
            return Err(Error::FontError(format!("{}: no Unicode cmap", name)));
        }

        let advances = (0..face.number_of_glyphs())
            .map(|g| face.glyph_hor_advance(ttf_parser::GlyphId(g)).unwrap_or(0))
            .collect();
        let bbox = face.global_bounding_box();
        let units_per_em = face.units_per_em();

        let base_font: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

        Ok(Self {
            base_font: if base_font.is_empty() { "Embedded".into() } else { base_font },
            units_per_em,
            ascent: face.ascender(),
            descent: face.descender(),
            cap_height: face.capital_height().unwrap_or_else(|| face.ascender()),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            cmap,
            advances,
            data,
        })
    }

    /// Glyph id for `c`, 0 (.notdef) when unmapped.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.cmap.get(&c).copied().unwrap_or(0)
    }

    /// Advance of `gid` in 1/1000 em.
    pub fn glyph_width(&self, gid: u16) -> f32 {
        let advance = self.advances.get(gid as usize).copied().unwrap_or(0);
        self.to_pdf_units(advance as f32)
    }

    pub fn to_pdf_units(&self, value: f32) -> f32 {
        value * 1000.0 / self.units_per_em.max(1) as f32
    }
}

pub enum PdfFace {
    Standard(StandardFace),
    Embedded(EmbeddedFace),
}

impl PdfFace {
    /// Width of `text` in points at `size`.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        let units: f32 = match self {
            PdfFace::Standard(face) => text
                .chars()
                .map(|c| face.code_width(win_ansi(c)) as f32)
                .sum(),
            PdfFace::Embedded(face) => text
                .chars()
                .map(|c| face.glyph_width(face.glyph_id(c)))
                .sum(),
        };
        units * size / 1000.0
    }

    /// Bytes for a PDF string operand in this face's encoding.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            PdfFace::Standard(_) => text.chars().map(win_ansi).collect(),
            PdfFace::Embedded(face) => text
                .chars()
                .flat_map(|c| face.glyph_id(c).to_be_bytes())
                .collect(),
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, PdfFace::Embedded(_))
    }
}

/// Regular and bold faces for a document.
pub struct DocumentFonts {
    pub regular: PdfFace,
    pub bold: PdfFace,
}

impl DocumentFonts {
    /// Embed the first TrueType pair found in `assets_dir`, else fall back to
    /// Helvetica.
    pub fn load(assets_dir: &Path) -> Self {
        let Some((regular, bold)) = locate_face_pair(assets_dir) else {
            warn!("No TrueType fonts for PDF in {}, using Helvetica", assets_dir.display());
            return Self::standard();
        };

        match (EmbeddedFace::from_file(&regular), EmbeddedFace::from_file(&bold)) {
            (Ok(regular_face), Ok(bold_face)) => {
                debug!("pdf fonts: {} / {}", regular.display(), bold.display());
                Self {
                    regular: PdfFace::Embedded(regular_face),
                    bold: PdfFace::Embedded(bold_face),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to load PDF fonts, using Helvetica: {}", e);
                Self::standard()
            }
        }
    }

    pub fn standard() -> Self {
        Self {
            regular: PdfFace::Standard(StandardFace::Helvetica),
            bold: PdfFace::Standard(StandardFace::HelveticaBold),
        }
    }

    pub fn face(&self, bold: bool) -> &PdfFace {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }
}

impl TextMeasure for DocumentFonts {
    fn width(&self, text: &str, bold: bool, size: f32) -> f32 {
        self.face(bold).measure(text, size)
    }
}

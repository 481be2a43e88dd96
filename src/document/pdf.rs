//! PDF serialization of composed pages.

use crate::document::compose::{Page, PageGeometry, Placed};
use crate::document::fonts::{DocumentFonts, EmbeddedFace, PdfFace};
use crate::{Error, Result};
use image::RgbaImage;
use log::debug;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo};
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

const REGULAR: &[u8] = b"F1";
const BOLD: &[u8] = b"F2";

/// Serialize `pages` into a complete PDF file.
///
/// Images are read back from the files named by [`Placed::Image`], so those
/// files must exist until this returns.
pub fn write(pages: &[Page], fonts: &DocumentFonts, geometry: &PageGeometry) -> Result<Vec<u8>> {
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    let regular_id = alloc();
    let bold_id = alloc();
    let mut used = GlyphUsage::default();
    collect_glyphs(pages, fonts, &mut used);
    write_font(&mut pdf, &mut alloc, regular_id, &fonts.regular, &used.regular);
    write_font(&mut pdf, &mut alloc, bold_id, &fonts.bold, &used.bold);

    // one XObject per distinct image file, named Im1, Im2, ...
    let mut image_xobjects: Vec<(String, Ref)> = Vec::new();
    let mut image_names: HashMap<PathBuf, String> = HashMap::new();
    for page in pages {
        for item in &page.items {
            let Placed::Image { path, .. } = item else {
                continue;
            };
            if image_names.contains_key(path) {
                continue;
            }
            let xobj_ref = embed_image(&mut pdf, &mut alloc, path)?;
            let name = format!("Im{}", image_xobjects.len() + 1);
            image_xobjects.push((name.clone(), xobj_ref));
            image_names.insert(path.clone(), name);
        }
    }

    let page_ids: Vec<Ref> = pages.iter().map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = pages.iter().map(|_| alloc()).collect();

    for (page, content_id) in pages.iter().zip(&content_ids) {
        let raw = page_content(page, fonts, &image_names).finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(*content_id, &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    for (page_id, content_id) in page_ids.iter().zip(&content_ids) {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height))
            .parent(pages_id)
            .contents(*content_id);
        let mut resources = page.resources();
        resources
            .fonts()
            .pair(Name(REGULAR), regular_id)
            .pair(Name(BOLD), bold_id);
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    debug!(
        "pdf: {} pages, {} images, embedded fonts: {}",
        pages.len(),
        image_xobjects.len(),
        fonts.regular.is_embedded()
    );
    Ok(pdf.finish())
}

fn page_content(page: &Page, fonts: &DocumentFonts, images: &HashMap<PathBuf, String>) -> Content {
    let mut content = Content::new();
    for item in &page.items {
        match item {
            Placed::Text { x, y, text, bold, size } => {
                let (name, face) = if *bold { (BOLD, &fonts.bold) } else { (REGULAR, &fonts.regular) };
                let bytes = face.encode(text);
                content
                    .begin_text()
                    .set_font(Name(name), *size)
                    .next_line(*x, *y)
                    .show(Str(&bytes))
                    .end_text();
            }
            Placed::Image { x, y, width, height, path } => {
                let Some(name) = images.get(path) else {
                    continue;
                };
                content
                    .save_state()
                    .transform([*width, 0.0, 0.0, *height, *x, *y])
                    .x_object(Name(name.as_bytes()))
                    .restore_state();
            }
        }
    }
    content
}

/// Glyph id to char, per embedded face, for widths and ToUnicode.
#[derive(Default)]
struct GlyphUsage {
    regular: BTreeMap<u16, char>,
    bold: BTreeMap<u16, char>,
}

fn collect_glyphs(pages: &[Page], fonts: &DocumentFonts, used: &mut GlyphUsage) {
    for item in pages.iter().flat_map(|p| &p.items) {
        let Placed::Text { text, bold, .. } = item else {
            continue;
        };
        let (face, map) = if *bold {
            (&fonts.bold, &mut used.bold)
        } else {
            (&fonts.regular, &mut used.regular)
        };
        if let PdfFace::Embedded(face) = face {
            for c in text.chars() {
                map.entry(face.glyph_id(c)).or_insert(c);
            }
        }
    }
}

fn write_font(
    pdf: &mut Pdf,
    alloc: &mut dyn FnMut() -> Ref,
    font_id: Ref,
    face: &PdfFace,
    glyphs: &BTreeMap<u16, char>,
) {
    match face {
        PdfFace::Standard(standard) => {
            pdf.type1_font(font_id)
                .base_font(Name(standard.base_font().as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }
        PdfFace::Embedded(embedded) => write_type0(pdf, alloc, font_id, embedded, glyphs),
    }
}

fn write_type0(
    pdf: &mut Pdf,
    alloc: &mut dyn FnMut() -> Ref,
    font_id: Ref,
    face: &EmbeddedFace,
    glyphs: &BTreeMap<u16, char>,
) {
    let cid_id = alloc();
    let descriptor_id = alloc();
    let file_id = alloc();
    let to_unicode_id = alloc();
    let base_font = Name(face.base_font.as_bytes());

    pdf.type0_font(font_id)
        .base_font(base_font)
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_id)
        .to_unicode(to_unicode_id);

    {
        let mut cid = pdf.cid_font(cid_id);
        cid.subtype(CidFontType::Type2)
            .base_font(base_font)
            .system_info(SystemInfo {
                registry: Str(b"Adobe"),
                ordering: Str(b"Identity"),
                supplement: 0,
            })
            .font_descriptor(descriptor_id)
            .default_width(face.glyph_width(0))
            .cid_to_gid_map_predefined(Name(b"Identity"));
        let mut widths = cid.widths();
        for gid in glyphs.keys() {
            widths.consecutive(*gid, [face.glyph_width(*gid)]);
        }
    }

    let units = |v: i16| face.to_pdf_units(v as f32);
    pdf.font_descriptor(descriptor_id)
        .name(base_font)
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(
            units(face.bbox[0]),
            units(face.bbox[1]),
            units(face.bbox[2]),
            units(face.bbox[3]),
        ))
        .italic_angle(0.0)
        .ascent(units(face.ascent))
        .descent(units(face.descent))
        .cap_height(units(face.cap_height))
        .stem_v(80.0)
        .font_file2(file_id);

    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&face.data, 6);
    pdf.stream(file_id, &compressed)
        .filter(Filter::FlateDecode)
        .pair(Name(b"Length1"), face.data.len() as i32);

    let cmap = to_unicode_cmap(glyphs);
    pdf.stream(to_unicode_id, cmap.as_bytes());
}

/// Minimal ToUnicode CMap mapping 2-byte glyph ids back to text.
fn to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let mut out = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    let entries: Vec<(&u16, &char)> = glyphs.iter().collect();
    // at most 100 entries per bfchar block
    for chunk in entries.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, c) in chunk {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            out.push_str(&format!("<{:04X}> <{}>\n", gid, hex));
        }
        out.push_str("endbfchar\n");
    }
    out.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    out
}

/// Embed the PNG at `path` as a Flate-compressed RGB image, with an SMask
/// when any pixel is not fully opaque.
fn embed_image(pdf: &mut Pdf, alloc: &mut dyn FnMut() -> Ref, path: &Path) -> Result<Ref> {
    let rgba: RgbaImage = image::open(path)
        .map_err(|e| Error::DocumentError(format!("{}: {}", path.display(), e)))?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

    let rgb_data: Vec<u8> = rgba.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();
    let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

    let smask_ref = if has_alpha {
        let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
        let mask_ref = alloc();
        let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(w as i32);
        mask.height(h as i32);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        Some(mask_ref)
    } else {
        None
    };

    let xobj_ref = alloc();
    let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
    xobj.filter(Filter::FlateDecode);
    xobj.width(w as i32);
    xobj.height(h as i32);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);
    if let Some(mask_ref) = smask_ref {
        xobj.s_mask(mask_ref);
    }
    Ok(xobj_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::compose::{DocTemplate, Flowable, Paragraph, ParagraphStyle};
    use image::Rgba;

    fn render(story: &[Flowable]) -> Vec<u8> {
        let fonts = DocumentFonts::standard();
        let geometry = PageGeometry::a4();
        let pages = DocTemplate::new(geometry).build(story, &fonts);
        write(&pages, &fonts, &geometry).unwrap()
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn empty_document_is_a_valid_single_page() {
        let bytes = render(&[]);
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.ends_with(b"%%EOF") || bytes.ends_with(b"%%EOF\n"));
        assert!(count(&bytes, b"/Helvetica") >= 1);
        assert_eq!(count(&bytes, b"/Count 1"), 1);
    }

    #[test]
    fn standard_fonts_are_declared() {
        let story = vec![Flowable::Paragraph(Paragraph::from_markup(
            "plain <b>bold</b>",
            ParagraphStyle::BODY,
        ))];
        let bytes = render(&story);
        assert_eq!(count(&bytes, b"/BaseFont /Helvetica-Bold"), 1);
        assert_eq!(count(&bytes, b"/WinAnsiEncoding"), 2);
    }

    #[test]
    fn transparent_image_gets_a_soft_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.png");
        let mut img = RgbaImage::from_pixel(8, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.save(&path).unwrap();

        let story = vec![Flowable::Image(crate::document::compose::ImageBlock {
            path: path.clone(),
            width: 6.0,
            height: 3.0,
        })];
        let bytes = render(&story);
        assert_eq!(count(&bytes, b"/Subtype /Image"), 2);
        assert_eq!(count(&bytes, b"/SMask"), 1);
        assert_eq!(count(&bytes, b"/Im1"), 1);
    }

    #[test]
    fn missing_image_file_is_an_error() {
        let fonts = DocumentFonts::standard();
        let geometry = PageGeometry::a4();
        let story = vec![Flowable::Image(crate::document::compose::ImageBlock {
            path: PathBuf::from("/nonexistent/formula.png"),
            width: 10.0,
            height: 10.0,
        })];
        let pages = DocTemplate::new(geometry).build(&story, &fonts);
        assert!(matches!(write(&pages, &fonts, &geometry), Err(Error::DocumentError(_))));
    }

    #[test]
    fn cmap_maps_glyphs_to_utf16() {
        let mut glyphs = BTreeMap::new();
        glyphs.insert(3u16, 'A');
        glyphs.insert(900u16, '∑');
        let cmap = to_unicode_cmap(&glyphs);
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0003> <0041>"));
        assert!(cmap.contains("<0384> <2211>"));
    }
}

//! Flowable composition onto fixed-size pages.
//!
//! A story is a sequence of [`Flowable`]s. [`DocTemplate::build`] lays them
//! top to bottom into the page frame with a falling y cursor, breaking pages
//! as needed, and returns positioned [`Placed`] items in PDF user space
//! (points, origin bottom-left).

use std::path::PathBuf;

/// Points per centimetre.
pub const CM: f32 = 72.0 / 2.54;

/// Width of `text` in points for the given weight and size.
pub trait TextMeasure {
    fn width(&self, text: &str, bold: bool, size: f32) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphStyle {
    pub font_size: f32,
    pub leading: f32,
    pub space_after: f32,
    pub bold: bool,
}

impl ParagraphStyle {
    pub const HEADING: Self = Self {
        font_size: 14.0,
        leading: 18.0,
        space_after: 12.0,
        bold: true,
    };

    pub const BODY: Self = Self {
        font_size: 11.0,
        leading: 16.0,
        space_after: 10.0,
        bold: false,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Run { text: String, bold: bool },
    Break,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub inlines: Vec<Inline>,
    pub style: ParagraphStyle,
}

impl Paragraph {
    /// Parse the small markup dialect used for answers: `<b>`, `</b>`,
    /// `<br/>` and the `&amp;`, `&lt;`, `&gt;` entities. Any other `<` is
    /// kept as text.
    pub fn from_markup(markup: &str, style: ParagraphStyle) -> Self {
        let mut inlines = Vec::new();
        let mut bold = style.bold;
        let mut buf = String::new();
        let mut rest = markup;

        while let Some(pos) = rest.find('<') {
            buf.push_str(&rest[..pos]);
            rest = &rest[pos..];
            let (next_bold, tag_len) = if rest.starts_with("<b>") {
                (true, 3)
            } else if rest.starts_with("</b>") {
                (style.bold, 4)
            } else if rest.starts_with("<br/>") {
                (bold, 5)
            } else {
                buf.push('<');
                rest = &rest[1..];
                continue;
            };
            if !buf.is_empty() {
                inlines.push(Inline::Run { text: unescape(&buf), bold });
                buf.clear();
            }
            if tag_len == 5 {
                inlines.push(Inline::Break);
            }
            bold = next_bold;
            rest = &rest[tag_len..];
        }
        buf.push_str(rest);
        if !buf.is_empty() {
            inlines.push(Inline::Run { text: unescape(&buf), bold });
        }
        Self { inlines, style }
    }

    /// Break into lines no wider than `max_width`. Runs join without a space
    /// unless whitespace separates them in the source.
    pub fn wrap(&self, measure: &dyn TextMeasure, max_width: f32) -> Vec<Line> {
        let size = self.style.font_size;
        let mut lines = Vec::new();
        let mut line = Line::default();
        let mut spaced = false;

        for inline in &self.inlines {
            let (text, bold) = match inline {
                Inline::Run { text, bold } => (text, *bold),
                Inline::Break => {
                    lines.push(std::mem::take(&mut line));
                    spaced = false;
                    continue;
                }
            };
            for (i, word) in text.split(char::is_whitespace).enumerate() {
                spaced |= i > 0;
                if word.is_empty() {
                    continue;
                }
                let word_w = measure.width(word, bold, size);
                let space_w = if spaced && !line.fragments.is_empty() {
                    measure.width(" ", bold, size)
                } else {
                    0.0
                };
                if !line.fragments.is_empty() && line.width + space_w + word_w > max_width {
                    lines.push(std::mem::take(&mut line));
                    line.push(word, bold, 0.0, word_w);
                } else {
                    line.push(word, bold, space_w, word_w);
                }
                spaced = false;
            }
        }
        if !line.fragments.is_empty() || lines.is_empty() {
            lines.push(line);
        }
        lines
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// A same-weight stretch of text within a line, offset from the line start.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub bold: bool,
    pub x: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    pub width: f32,
}

impl Line {
    fn push(&mut self, word: &str, bold: bool, space_w: f32, word_w: f32) {
        let space = if space_w > 0.0 { " " } else { "" };
        match self.fragments.last_mut() {
            Some(last) if last.bold == bold => {
                last.text.push_str(space);
                last.text.push_str(word);
            }
            // a new fragment carries its separating space
            _ => self.fragments.push(Fragment {
                text: format!("{}{}", space, word),
                bold,
                x: self.width,
            }),
        }
        self.width += space_w + word_w;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub path: PathBuf,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Flowable {
    Paragraph(Paragraph),
    Image(ImageBlock),
    Spacer(f32),
}

/// Positioned content. Text `y` is the baseline; image `y` is the bottom edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Placed {
    Text {
        x: f32,
        y: f32,
        text: String,
        bold: bool,
        size: f32,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Placed>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    /// A4 portrait with 2 cm margins on every side.
    pub fn a4() -> Self {
        Self {
            width: 21.0 * CM,
            height: 29.7 * CM,
            margin: 2.0 * CM,
        }
    }

    pub fn frame_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn frame_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

pub struct DocTemplate {
    pub geometry: PageGeometry,
}

impl DocTemplate {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }

    /// Lay `story` onto pages. Always yields at least one page.
    pub fn build(&self, story: &[Flowable], measure: &dyn TextMeasure) -> Vec<Page> {
        let geo = self.geometry;
        let top = geo.height - geo.margin;
        let mut pages = Vec::new();
        let mut page = Page::default();
        let mut cursor_y = top;

        // true when `height` more points stay inside the bottom margin
        let fits = |cursor_y: f32, height: f32| cursor_y - height >= geo.margin - 0.01;

        for flowable in story {
            match flowable {
                Flowable::Spacer(height) => {
                    if cursor_y >= top {
                        continue;
                    }
                    if fits(cursor_y, *height) {
                        cursor_y -= height;
                    } else {
                        pages.push(std::mem::take(&mut page));
                        cursor_y = top;
                    }
                }
                Flowable::Paragraph(paragraph) => {
                    let style = paragraph.style;
                    let leading = style.leading.max(style.font_size);
                    for line in paragraph.wrap(measure, geo.frame_width()) {
                        if !fits(cursor_y, leading) && cursor_y < top {
                            pages.push(std::mem::take(&mut page));
                            cursor_y = top;
                        }
                        let baseline = cursor_y - style.font_size;
                        page.items.extend(line.fragments.into_iter().map(|f| Placed::Text {
                            x: geo.margin + f.x,
                            y: baseline,
                            text: f.text,
                            bold: f.bold,
                            size: style.font_size,
                        }));
                        cursor_y -= leading;
                    }
                    cursor_y -= style.space_after;
                }
                Flowable::Image(image) => {
                    let (mut width, mut height) = (image.width, image.height);
                    if width > geo.frame_width() {
                        height *= geo.frame_width() / width;
                        width = geo.frame_width();
                    }
                    if height > geo.frame_height() {
                        width *= geo.frame_height() / height;
                        height = geo.frame_height();
                    }
                    if !fits(cursor_y, height) && cursor_y < top {
                        pages.push(std::mem::take(&mut page));
                        cursor_y = top;
                    }
                    cursor_y -= height;
                    page.items.push(Placed::Image {
                        x: geo.margin + (geo.frame_width() - width) / 2.0,
                        y: cursor_y,
                        width,
                        height,
                        path: image.path.clone(),
                    });
                }
            }
        }
        if !page.items.is_empty() || pages.is_empty() {
            pages.push(page);
        }
        pages
    }
}

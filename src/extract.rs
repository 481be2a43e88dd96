//! LaTeX span extraction.
//!
//! Scans free text for the four delimiter conventions used in model answers
//! and returns an ordered, non-overlapping list of [`Span`]s:
//!
//! - display: `\[ ... \]` and `$$ ... $$`
//! - inline: `\( ... \)` and `$ ... $` (no embedded `$`)
//!
//! LaTeX payloads are treated as opaque strings. Unterminated delimiters never
//! match, so malformed math simply stays in the surrounding prose.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Rendering convention of a math span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Block-level math on its own line
    Display,
    /// Run-in math inside a sentence
    Inline,
}

/// Delimiter convention that produced a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// `\[ ... \]`
    Bracket,
    /// `$$ ... $$`
    DoubleDollar,
    /// `\( ... \)`
    Paren,
    /// `$ ... $`
    Dollar,
}

impl Delimiter {
    /// Scan order. Ties on start offset keep this order, display first.
    pub const PRIORITY: [Delimiter; 4] = [
        Delimiter::Bracket,
        Delimiter::DoubleDollar,
        Delimiter::Paren,
        Delimiter::Dollar,
    ];

    pub fn mode(self) -> DisplayMode {
        match self {
            Delimiter::Bracket | Delimiter::DoubleDollar => DisplayMode::Display,
            Delimiter::Paren | Delimiter::Dollar => DisplayMode::Inline,
        }
    }

    /// Pattern whose first capture group is the payload.
    pub(crate) fn regex(self) -> &'static Regex {
        static BRACKET: OnceLock<Regex> = OnceLock::new();
        static DOUBLE_DOLLAR: OnceLock<Regex> = OnceLock::new();
        static PAREN: OnceLock<Regex> = OnceLock::new();
        static DOLLAR: OnceLock<Regex> = OnceLock::new();

        match self {
            Delimiter::Bracket => BRACKET.get_or_init(|| compile(r"(?s)\\\[(.*?)\\\]")),
            Delimiter::DoubleDollar => DOUBLE_DOLLAR.get_or_init(|| compile(r"(?s)\$\$(.*?)\$\$")),
            Delimiter::Paren => PAREN.get_or_init(|| compile(r"(?s)\\\((.*?)\\\)")),
            Delimiter::Dollar => DOLLAR.get_or_init(|| compile(r"\$([^$]+)\$")),
        }
    }
}

pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}

/// A located, classified region of math in the input text.
///
/// `start` and `end` are byte offsets into the original string (`end`
/// exclusive), so `&text[span.start..span.end] == span.source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Raw LaTeX between the delimiters, trimmed, line breaks collapsed
    pub payload: String,
    pub mode: DisplayMode,
    pub delimiter: Delimiter,
    pub start: usize,
    pub end: usize,
    /// Full matched substring including delimiters
    pub source: String,
}

impl Span {
    pub fn is_display(&self) -> bool {
        self.mode == DisplayMode::Display
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Extract all math spans from `text`, sorted and non-overlapping.
pub fn extract(text: &str) -> Vec<Span> {
    let mut candidates = Vec::new();
    for delimiter in Delimiter::PRIORITY {
        for caps in delimiter.regex().captures_iter(text) {
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            candidates.push(Span {
                payload: clean_payload(body.as_str()),
                mode: delimiter.mode(),
                delimiter,
                start: whole.start(),
                end: whole.end(),
                source: whole.as_str().to_string(),
            });
        }
    }

    // Stable sort keeps priority order for equal starts.
    candidates.sort_by_key(|span| span.start);
    resolve_overlaps(candidates)
}

/// Greedy left-to-right sweep over start-sorted candidates.
///
/// A span is kept only if it starts at or after the end of the last kept
/// span. Overlapping later spans are dropped without error.
pub fn resolve_overlaps(sorted: Vec<Span>) -> Vec<Span> {
    // Offsets are unsigned, so 0 already sits before every possible start.
    let mut last_end = 0usize;
    let mut accepted = Vec::with_capacity(sorted.len());
    for span in sorted {
        if span.start >= last_end {
            last_end = span.end;
            accepted.push(span);
        }
    }
    accepted
}

/// Split `text` into the prose gaps around `spans`.
///
/// Returns `spans.len() + 1` slices: the gap before each span, then the tail
/// after the last one. Spans must be sorted and non-overlapping.
pub fn gaps<'t, 's, I>(text: &'t str, spans: I) -> Vec<&'t str>
where
    I: IntoIterator<Item = &'s Span>,
{
    let mut out = Vec::new();
    let mut cursor = 0usize;
    for span in spans {
        let start = span.start.clamp(cursor, text.len());
        out.push(&text[cursor..start]);
        cursor = span.end.clamp(start, text.len());
    }
    out.push(&text[cursor..]);
    out
}

fn clean_payload(raw: &str) -> String {
    static LINE_BREAK: OnceLock<Regex> = OnceLock::new();
    let line_break = LINE_BREAK.get_or_init(|| compile(r"\s*\n\s*"));
    line_break.replace_all(raw.trim(), " ").into_owned()
}

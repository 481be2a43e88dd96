//! Bounded-length message splitting for the plain-text path.
//!
//! Greedy packing of paragraphs, then sentences, then words. Lengths are
//! counted in `char`s because chat transports limit characters, not bytes.

use crate::extract::compile;
use regex::Regex;
use std::sync::OnceLock;

/// Split `text` into chunks of at most `max_len` characters.
///
/// Text that already fits is returned unchanged as a single chunk.
pub fn split(text: &str, max_len: usize) -> Vec<String> {
    if char_len(text) <= max_len {
        return vec![text.to_string()];
    }

    let max_len = max_len.max(1);
    let mut packer = Packer::new(max_len);
    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if char_len(paragraph) <= max_len {
            packer.push(paragraph, "\n\n");
            continue;
        }
        // only the first unit of a paragraph carries the paragraph break
        let mut sep = "\n\n";
        for sentence in sentences(paragraph) {
            if char_len(sentence) <= max_len {
                packer.push(sentence, sep);
                sep = " ";
            } else {
                for piece in hard_wrap(sentence, max_len) {
                    packer.push(&piece, sep);
                    sep = " ";
                }
            }
        }
    }
    packer.finish()
}

struct Packer {
    max_len: usize,
    parts: Vec<String>,
    current: String,
    current_len: usize,
}

impl Packer {
    fn new(max_len: usize) -> Self {
        Self {
            max_len,
            parts: Vec::new(),
            current: String::new(),
            current_len: 0,
        }
    }

    /// Append `unit` joined by `sep`, flushing first if it would overflow.
    fn push(&mut self, unit: &str, sep: &str) {
        let unit_len = char_len(unit);
        if self.current.is_empty() {
            self.current.push_str(unit);
            self.current_len = unit_len;
            return;
        }
        let sep_len = char_len(sep);
        if self.current_len + sep_len + unit_len <= self.max_len {
            self.current.push_str(sep);
            self.current.push_str(unit);
            self.current_len += sep_len + unit_len;
        } else {
            self.flush();
            self.current.push_str(unit);
            self.current_len = unit_len;
        }
    }

    fn flush(&mut self) {
        let chunk = std::mem::take(&mut self.current);
        self.current_len = 0;
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.parts
    }
}

/// Sentences end at `.`, `!` or `?` followed by whitespace.
fn sentences(paragraph: &str) -> Vec<&str> {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    let boundary = BOUNDARY.get_or_init(|| compile(r"[.!?]\s+"));

    let mut out = Vec::new();
    let mut start = 0usize;
    for m in boundary.find_iter(paragraph) {
        // terminators are single-byte ASCII
        out.push(&paragraph[start..m.start() + 1]);
        start = m.end();
    }
    if start < paragraph.len() {
        out.push(&paragraph[start..]);
    }
    out
}

/// Pack words into pieces of at most `max_len` chars; overlong words are cut
/// on `char` boundaries.
fn hard_wrap(sentence: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in sentence.split_whitespace() {
        let word_len = char_len(word);
        if word_len > max_len {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            pieces.extend(chars.chunks(max_len).map(|c| c.iter().collect::<String>()));
            continue;
        }
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_len {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            pieces.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

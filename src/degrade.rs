//! LaTeX to Unicode degradation for the plain-text delivery path.
//!
//! The rewrite is a fixed sequence of single-pass substitutions. Nested
//! fractions and nested scripts are only rewritten one level deep.

use crate::extract::{compile, Delimiter};
use regex::{Captures, Regex};
use std::sync::OnceLock;

const SUPERSCRIPTS: &[(char, char)] = &[
    ('0', '⁰'),
    ('1', '¹'),
    ('2', '²'),
    ('3', '³'),
    ('4', '⁴'),
    ('5', '⁵'),
    ('6', '⁶'),
    ('7', '⁷'),
    ('8', '⁸'),
    ('9', '⁹'),
    ('n', 'ⁿ'),
    ('x', 'ˣ'),
    ('m', 'ᵐ'),
    ('k', 'ᵏ'),
    ('+', '⁺'),
    ('-', '⁻'),
    ('i', 'ⁱ'),
];

const SUBSCRIPTS: &[(char, char)] = &[
    ('0', '₀'),
    ('1', '₁'),
    ('2', '₂'),
    ('3', '₃'),
    ('4', '₄'),
    ('5', '₅'),
    ('6', '₆'),
    ('7', '₇'),
    ('8', '₈'),
    ('9', '₉'),
    ('n', 'ₙ'),
    ('m', 'ₘ'),
];

const MACROS: &[(&str, &str)] = &[
    (r"\times", "×"),
    (r"\cdot", "·"),
    (r"\le", "≤"),
    (r"\ge", "≥"),
    (r"\ne", "≠"),
    (r"\approx", "≈"),
    (r"\sum", "Σ"),
    (r"\prod", "Π"),
    (r"\infty", "∞"),
    (r"\Rightarrow", "⇒"),
    (r"\rightarrow", "→"),
    (r"\quad", "  "),
];

struct Rules {
    display_tokens: Regex,
    fraction: Regex,
    sup_bare: Regex,
    sup_braced: Regex,
    sub_bare: Regex,
    sub_braced: Regex,
    blank_lines: Regex,
    rule: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        display_tokens: compile(r"\\\[|\\\]|\$\$"),
        fraction: compile(r"\\frac\{([^}]+)\}\{([^}]+)\}"),
        sup_bare: compile(r"(\w+)\^(\w+)"),
        sup_braced: compile(r"(\w+)\^\{([^}]+)\}"),
        sub_bare: compile(r"(\w+)_(\w+)"),
        sub_braced: compile(r"(\w+)_\{([^}]+)\}"),
        blank_lines: compile(r"\n\n+"),
        rule: compile(r"---+"),
    })
}

/// Convert math notation in `text` into a best-effort Unicode approximation.
///
/// Never fails; characters without a glyph mapping pass through unchanged.
pub fn degrade(text: &str) -> String {
    let rules = rules();

    let text = rules.display_tokens.replace_all(text, "");
    let text = Delimiter::Paren.regex().replace_all(&text, "$1");
    let text = Delimiter::Dollar.regex().replace_all(&text, "$1");

    let text = rules.fraction.replace_all(&text, "(${1})/(${2})");

    let text = rules.sup_bare.replace_all(&text, |c: &Captures| script(c, SUPERSCRIPTS));
    let text = rules.sup_braced.replace_all(&text, |c: &Captures| script(c, SUPERSCRIPTS));
    let text = rules.sub_bare.replace_all(&text, |c: &Captures| script(c, SUBSCRIPTS));
    let text = rules.sub_braced.replace_all(&text, |c: &Captures| script(c, SUBSCRIPTS));

    let mut text = text.into_owned();
    for (latex, glyph) in MACROS {
        if text.contains(latex) {
            text = text.replace(latex, glyph);
        }
    }
    text
}

/// Text as sent on the plain-text path: degraded, blank-line runs collapsed,
/// markdown rules drawn with box characters.
pub fn format_plain(text: &str) -> String {
    let rules = rules();
    let text = degrade(text);
    let text = rules.blank_lines.replace_all(&text, "\n\n");
    let rule_line = "─".repeat(30);
    rules.rule.replace_all(&text, rule_line.as_str()).into_owned()
}

fn script(caps: &Captures, table: &[(char, char)]) -> String {
    let base = &caps[1];
    let mut out = String::with_capacity(base.len() + caps[2].len() * 3);
    out.push_str(base);
    out.extend(caps[2].chars().map(|c| map_char(c, table)));
    out
}

fn map_char(c: char, table: &[(char, char)]) -> char {
    table
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

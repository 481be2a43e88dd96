//! Plain-text delivery: degradation followed by message splitting.

use mathshot::{degrade, format_plain, split};
use proptest::prelude::*;

fn non_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

proptest! {
    #[test]
    fn chunks_respect_the_limit(text in "[a-z .!?\n]{0,400}", max_len in 1usize..60) {
        for chunk in split(&text, max_len) {
            prop_assert!(chunk.chars().count() <= max_len, "{:?} longer than {}", chunk, max_len);
        }
    }

    #[test]
    fn splitting_only_drops_whitespace(text in "[a-zé .!?\n]{0,400}", max_len in 1usize..60) {
        let joined: String = split(&text, max_len).concat();
        prop_assert_eq!(non_whitespace(&joined), non_whitespace(&text));
    }

    #[test]
    fn degrade_never_panics(text in r"[a-z0-9{}^_$\\() \[\]]{0,60}") {
        let _ = degrade(&text);
        let _ = format_plain(&text);
    }
}

#[test]
fn telegram_sized_answer_is_split_into_paragraphs() {
    let paragraph = "The derivative of $x^2$ is $2x$. ".repeat(20);
    let text = format!("{}\n\n{}", paragraph.trim(), paragraph.trim());
    let plain = format_plain(&text);
    assert!(plain.contains("x²"));

    let limit = plain.chars().count() / 2 + 10;
    let chunks = split(&plain, limit);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], chunks[1]);
    assert!(!chunks[0].contains('$'));
}

#[test]
fn formatting_a_worked_solution() {
    let text = "**Step 1**\n\\[\\frac{a}{b} \\times c\\]\n\n\n---\nDone, $a \\le b$.";
    let plain = format_plain(text);
    assert!(plain.contains("(a)/(b) × c"));
    assert!(plain.contains(&"─".repeat(30)));
    assert!(plain.contains("a ≤ b"));
    assert!(!plain.contains("\n\n\n"));
}

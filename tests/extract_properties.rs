//! Property tests for span extraction and the prose gaps around spans.

use mathshot::extract::{extract, gaps};
use mathshot::{Delimiter, DisplayMode};
use proptest::prelude::*;

fn answer_text() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        "[a-zA-Z ,.:]{0,12}",
        Just("$".to_string()),
        Just("$$".to_string()),
        Just("\\[".to_string()),
        Just("\\]".to_string()),
        Just("\\(".to_string()),
        Just("\\)".to_string()),
        Just("\n".to_string()),
        Just("x^2".to_string()),
        Just("é∑".to_string()),
    ];
    prop::collection::vec(piece, 0..24).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn spans_are_sorted_and_disjoint(text in answer_text()) {
        let spans = extract(&text);
        for pair in spans.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn spans_index_the_original_text(text in answer_text()) {
        for span in extract(&text) {
            prop_assert!(!span.is_empty());
            prop_assert_eq!(span.len(), span.source.len());
            prop_assert_eq!(&text[span.start..span.end], span.source.as_str());
            prop_assert_eq!(span.mode, span.delimiter.mode());
        }
    }

    #[test]
    fn gaps_and_sources_rebuild_the_text(text in answer_text()) {
        let spans = extract(&text);
        let pieces = gaps(&text, &spans);
        prop_assert_eq!(pieces.len(), spans.len() + 1);

        let mut rebuilt = String::new();
        for (gap, span) in pieces.iter().zip(&spans) {
            rebuilt.push_str(gap);
            rebuilt.push_str(&span.source);
        }
        rebuilt.push_str(pieces[spans.len()]);
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn text_without_delimiters_has_no_spans(text in "[a-zA-Z0-9 ,.!?\n]{0,80}") {
        prop_assert!(extract(&text).is_empty());
    }
}

#[test]
fn mixed_answer_is_classified() {
    let text = "Given \\(a\\) and $b$:\n$$a + b$$\nso \\[c = 1\\].";
    let spans = extract(text);
    let kinds: Vec<(Delimiter, DisplayMode, &str)> = spans
        .iter()
        .map(|s| (s.delimiter, s.mode, s.payload.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (Delimiter::Paren, DisplayMode::Inline, "a"),
            (Delimiter::Dollar, DisplayMode::Inline, "b"),
            (Delimiter::DoubleDollar, DisplayMode::Display, "a + b"),
            (Delimiter::Bracket, DisplayMode::Display, "c = 1"),
        ]
    );
    assert!(spans[2].is_display() && !spans[1].is_display());
}

#[test]
fn unterminated_math_stays_in_prose() {
    let text = "price is $5 and \\(x";
    assert!(extract(text).is_empty());
    assert_eq!(gaps(text, &extract(text)), vec![text]);
}

//! Locating model-reported corrections in the source text.
//!
//! The model reports the incorrect snippet, not its position. Snippets are
//! placed greedily left to right: each search starts where the previous match
//! ended, so located spans never overlap and come out sorted by start offset.
//! A snippet that is listed out of order, or that appears nowhere after the
//! cursor, is dropped rather than guessed.
//!
//! Models that report char offsets instead go through [`locate_indexed`],
//! which checks each reported span against the buffer under the same rules:
//! in bounds, non-empty, sorted and disjoint.

use smol_str::SmolStr;

use crate::error::LocateError;
use crate::model::ReportedCorrections;
use crate::text::TextBuffer;
use crate::types::{Correction, ErrorKind, IndexedCorrection, RawCorrection, Span};

/// A reported correction that could not be placed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unlocated {
    /// Position of the correction in the model's list.
    pub index: usize,
    pub kind: ErrorKind,
    pub corrected_text: String,
    pub reason: LocateError,
}

/// Result of locating a batch of raw corrections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Located {
    /// Located corrections, ascending by start offset.
    pub corrections: Vec<Correction>,
    /// Corrections that were dropped because they could not be placed.
    pub unlocated: Vec<Unlocated>,
    /// Number of no-op corrections (original equals corrected) that were skipped.
    pub skipped: usize,
}

/// Place each raw correction in `buffer`.
///
/// No-op corrections are skipped without touching the cursor. Unlocatable
/// corrections are reported in [`Located::unlocated`] and also leave the
/// cursor where it was.
pub fn locate<T: TextBuffer>(buffer: &T, raw: &[RawCorrection]) -> Located {
    let mut located = Located::default();
    let mut search_from = 0usize;

    for (index, correction) in raw.iter().enumerate() {
        if correction.original_text == correction.corrected_text {
            tracing::debug!(
                target: "redline::locate",
                text = %correction.original_text,
                "skipping no-op correction"
            );
            located.skipped += 1;
            continue;
        }

        if correction.original_text.is_empty() {
            tracing::warn!(
                target: "redline::locate",
                corrected = %correction.corrected_text,
                "correction has empty original text"
            );
            located.unlocated.push(Unlocated {
                index,
                kind: correction.kind,
                corrected_text: correction.corrected_text.clone(),
                reason: LocateError::EmptyOriginal,
            });
            continue;
        }

        let Some(start) = buffer.find_from(&correction.original_text, search_from) else {
            tracing::warn!(
                target: "redline::locate",
                text = %correction.original_text,
                search_from,
                "could not find correction in text"
            );
            located.unlocated.push(Unlocated {
                index,
                kind: correction.kind,
                corrected_text: correction.corrected_text.clone(),
                reason: LocateError::NotFound(correction.original_text.clone()),
            });
            continue;
        };

        let end = start + correction.original_text.chars().count();
        tracing::debug!(
            target: "redline::locate",
            kind = %correction.kind,
            start,
            end,
            "located correction"
        );

        located.corrections.push(Correction {
            span: Span::new(start, end),
            original_text: SmolStr::new(&correction.original_text),
            corrected_text: SmolStr::new(&correction.corrected_text),
            kind: correction.kind,
            explanation: SmolStr::new(&correction.explanation),
        });
        search_from = end;
    }

    located
}

/// Check each position-reported correction against `buffer`.
///
/// A span must be non-empty, end within the buffer and start at or after the
/// end of the previous placed span. Anything else is reported unlocated and
/// does not move that boundary. A span whose text already equals the
/// correction is skipped.
pub fn locate_indexed<T: TextBuffer>(buffer: &T, reported: &[IndexedCorrection]) -> Located {
    let mut located = Located::default();
    let len = buffer.len_chars();
    let mut placed_to = 0usize;

    for (index, correction) in reported.iter().enumerate() {
        let (start, end) = (correction.start_index, correction.end_index);
        let original = if start >= end {
            Err(LocateError::EmptySpan { start, end })
        } else if end > len {
            Err(LocateError::OutOfBounds { start, end, len })
        } else if start < placed_to {
            Err(LocateError::OutOfOrder { start, end })
        } else {
            buffer
                .slice(start..end)
                .ok_or(LocateError::OutOfBounds { start, end, len })
        };

        let original = match original {
            Ok(original) => original,
            Err(reason) => {
                tracing::warn!(
                    target: "redline::locate",
                    start,
                    end,
                    len,
                    %reason,
                    "rejecting reported span"
                );
                located.unlocated.push(Unlocated {
                    index,
                    kind: correction.kind,
                    corrected_text: correction.correction.clone(),
                    reason,
                });
                continue;
            }
        };

        if original == correction.correction {
            tracing::debug!(
                target: "redline::locate",
                text = %original,
                "skipping no-op correction"
            );
            located.skipped += 1;
            continue;
        }

        tracing::debug!(
            target: "redline::locate",
            kind = %correction.kind,
            start,
            end,
            "accepted reported span"
        );
        located.corrections.push(Correction {
            span: Span::new(start, end),
            original_text: original,
            corrected_text: SmolStr::new(&correction.correction),
            kind: correction.kind,
            explanation: SmolStr::new(&correction.explanation),
        });
        placed_to = end;
    }

    located
}

/// Place corrections in whichever shape the model reported them.
pub fn locate_reported<T: TextBuffer>(buffer: &T, reported: &ReportedCorrections) -> Located {
    match reported {
        ReportedCorrections::Snippets(raw) => locate(buffer, raw),
        ReportedCorrections::Indexed(indexed) => locate_indexed(buffer, indexed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextRope;

    fn raw(original: &str, corrected: &str, kind: ErrorKind) -> RawCorrection {
        RawCorrection {
            original_text: original.to_string(),
            corrected_text: corrected.to_string(),
            kind,
            explanation: format!("{original} -> {corrected}"),
        }
    }

    fn assert_well_formed(buffer: &TextRope, corrections: &[Correction]) {
        for pair in corrections.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start, "spans overlap or unsorted");
        }
        for c in corrections {
            assert!(c.span.start < c.span.end);
            assert_eq!(
                buffer.slice(c.span.to_range()).as_deref(),
                Some(c.original_text.as_str())
            );
        }
    }

    #[test]
    fn test_single_grammar_correction() {
        let buffer = TextRope::from_str("I seen him");
        let located = locate(&buffer, &[raw("seen", "saw", ErrorKind::Grammar)]);

        assert_eq!(located.corrections.len(), 1);
        let c = &located.corrections[0];
        assert_eq!(c.span, Span::new(2, 6));
        assert_eq!(c.corrected_text, "saw");
        assert_eq!(c.kind, ErrorKind::Grammar);
        assert!(located.unlocated.is_empty());
    }

    #[test]
    fn test_two_disjoint_corrections() {
        let buffer = TextRope::from_str("i think he is gud");
        let located = locate(
            &buffer,
            &[
                raw("i", "I", ErrorKind::Capitalization),
                raw("gud", "good", ErrorKind::Spelling),
            ],
        );

        let spans: Vec<_> = located.corrections.iter().map(|c| c.span).collect();
        assert_eq!(spans, vec![Span::new(0, 1), Span::new(14, 17)]);
        assert_well_formed(&buffer, &located.corrections);
    }

    #[test]
    fn test_noop_correction_is_discarded() {
        let buffer = TextRope::from_str("the cat sat");
        let located = locate(&buffer, &[raw("cat", "cat", ErrorKind::Spelling)]);

        assert!(located.corrections.is_empty());
        assert!(located.unlocated.is_empty());
        assert_eq!(located.skipped, 1);
    }

    #[test]
    fn test_unlocatable_does_not_advance_cursor() {
        let buffer = TextRope::from_str("their going to the park");
        let located = locate(
            &buffer,
            &[
                raw("thier", "their", ErrorKind::Spelling),
                raw("their going", "they're going", ErrorKind::Grammar),
            ],
        );

        assert_eq!(located.corrections.len(), 1);
        assert_eq!(located.corrections[0].span, Span::new(0, 11));
        assert_eq!(located.unlocated.len(), 1);
        assert_eq!(located.unlocated[0].index, 0);
        assert_eq!(
            located.unlocated[0].reason,
            LocateError::NotFound("thier".to_string())
        );
    }

    #[test]
    fn test_cursor_prevents_matching_inside_consumed_span() {
        // "an" occurs inside "and" which was already consumed.
        let buffer = TextRope::from_str("and an apple");
        let located = locate(
            &buffer,
            &[
                raw("and", "And", ErrorKind::Capitalization),
                raw("an", "a", ErrorKind::Grammar),
            ],
        );

        let spans: Vec<_> = located.corrections.iter().map(|c| c.span).collect();
        assert_eq!(spans, vec![Span::new(0, 3), Span::new(4, 6)]);
        assert_well_formed(&buffer, &located.corrections);
    }

    #[test]
    fn test_repeated_text_in_order() {
        let buffer = TextRope::from_str("teh cat and teh dog");
        let located = locate(
            &buffer,
            &[
                raw("teh", "the", ErrorKind::Spelling),
                raw("teh", "the", ErrorKind::Spelling),
            ],
        );
        let spans: Vec<_> = located.corrections.iter().map(|c| c.span).collect();
        assert_eq!(spans, vec![Span::new(0, 3), Span::new(12, 15)]);
    }

    #[test]
    fn test_out_of_order_listing_is_dropped() {
        let buffer = TextRope::from_str("one two three");
        let located = locate(
            &buffer,
            &[
                raw("three", "3", ErrorKind::Spelling),
                raw("one", "1", ErrorKind::Spelling),
            ],
        );
        assert_eq!(located.corrections.len(), 1);
        assert_eq!(located.corrections[0].original_text, "three");
        assert_eq!(located.unlocated.len(), 1);
        assert_eq!(
            located.unlocated[0].reason,
            LocateError::NotFound("one".to_string())
        );
        assert_eq!(located.unlocated[0].corrected_text, "1");
    }

    #[test]
    fn test_empty_original_is_unlocated() {
        let buffer = TextRope::from_str("I going home");
        let located = locate(&buffer, &[raw("", "am ", ErrorKind::MissingWords)]);
        assert!(located.corrections.is_empty());
        assert_eq!(located.unlocated[0].reason, LocateError::EmptyOriginal);
    }

    #[test]
    fn test_offsets_are_chars_not_bytes() {
        let buffer = TextRope::from_str("Café is gud");
        let located = locate(&buffer, &[raw("gud", "good", ErrorKind::Spelling)]);
        assert_eq!(located.corrections[0].span, Span::new(8, 11));
        assert_well_formed(&buffer, &located.corrections);
    }

    fn indexed(start: usize, end: usize, correction: &str, kind: ErrorKind) -> IndexedCorrection {
        IndexedCorrection {
            start_index: start,
            end_index: end,
            correction: correction.to_string(),
            kind,
            explanation: String::new(),
        }
    }

    #[test]
    fn test_indexed_span_takes_text_from_buffer() {
        let buffer = TextRope::from_str("I seen him");
        let located = locate_indexed(&buffer, &[indexed(2, 6, "saw", ErrorKind::Grammar)]);

        assert_eq!(located.corrections.len(), 1);
        let c = &located.corrections[0];
        assert_eq!(c.span, Span::new(2, 6));
        assert_eq!(c.original_text, "seen");
        assert_eq!(c.corrected_text, "saw");
        assert!(located.unlocated.is_empty());
    }

    #[test]
    fn test_indexed_spans_are_validated() {
        let buffer = TextRope::from_str("i think he is gud");
        let located = locate_indexed(
            &buffer,
            &[
                indexed(0, 1, "I", ErrorKind::Capitalization),
                indexed(5, 5, "x", ErrorKind::Spelling),
                indexed(9, 7, "x", ErrorKind::Spelling),
                indexed(14, 30, "good", ErrorKind::Spelling),
                indexed(14, 17, "good", ErrorKind::Spelling),
                indexed(11, 13, "was", ErrorKind::Grammar),
                indexed(15, 17, "od", ErrorKind::Spelling),
            ],
        );

        assert_eq!(
            located.corrections.iter().map(|c| c.span).collect::<Vec<_>>(),
            vec![Span::new(0, 1), Span::new(14, 17)]
        );
        assert_well_formed(&buffer, &located.corrections);

        let reasons: Vec<_> = located
            .unlocated
            .iter()
            .map(|u| (u.index, u.reason.clone()))
            .collect();
        assert_eq!(
            reasons,
            vec![
                (1, LocateError::EmptySpan { start: 5, end: 5 }),
                (2, LocateError::EmptySpan { start: 9, end: 7 }),
                (3, LocateError::OutOfBounds { start: 14, end: 30, len: 17 }),
                (5, LocateError::OutOfOrder { start: 11, end: 13 }),
                (6, LocateError::OutOfOrder { start: 15, end: 17 }),
            ]
        );
    }

    #[test]
    fn test_indexed_noop_and_touching_spans() {
        let buffer = TextRope::from_str("ab cd");
        let located = locate_indexed(
            &buffer,
            &[
                indexed(0, 1, "A", ErrorKind::Capitalization),
                indexed(1, 2, "b", ErrorKind::Spelling),
                indexed(1, 2, "B", ErrorKind::Capitalization),
                indexed(3, 5, "CD", ErrorKind::Capitalization),
            ],
        );
        assert_eq!(located.skipped, 1);
        assert_eq!(
            located.corrections.iter().map(|c| c.span).collect::<Vec<_>>(),
            vec![Span::new(0, 1), Span::new(1, 2), Span::new(3, 5)]
        );
    }

    #[test]
    fn test_indexed_offsets_are_chars() {
        let buffer = TextRope::from_str("Café is gud");
        let located = locate_indexed(&buffer, &[indexed(8, 11, "good", ErrorKind::Spelling)]);
        assert_eq!(located.corrections[0].original_text, "gud");
        assert_well_formed(&buffer, &located.corrections);
    }

    #[test]
    fn test_locate_reported_dispatches_on_shape() {
        let buffer = TextRope::from_str("I seen him");
        let snippets =
            ReportedCorrections::Snippets(vec![raw("seen", "saw", ErrorKind::Grammar)]);
        let positions =
            ReportedCorrections::Indexed(vec![indexed(2, 6, "saw", ErrorKind::Grammar)]);

        let a = locate_reported(&buffer, &snippets);
        let b = locate_reported(&buffer, &positions);
        assert_eq!(a.corrections[0].span, b.corrections[0].span);
        assert_eq!(a.corrections[0].original_text, b.corrections[0].original_text);
    }

    #[test]
    fn test_locate_is_idempotent() {
        let buffer = TextRope::from_str("i seen teh dog , it were big");
        let batch = vec![
            raw("i", "I", ErrorKind::Capitalization),
            raw("seen", "saw", ErrorKind::Grammar),
            raw("teh", "the", ErrorKind::Spelling),
            raw(" ,", ",", ErrorKind::Punctuation),
            raw("were", "was", ErrorKind::Grammar),
        ];

        let first = locate(&buffer, &batch);
        let second = locate(&buffer, &batch);
        assert_eq!(first, second);
        assert_eq!(first.corrections.len(), 5);
        assert_well_formed(&buffer, &first.corrections);
    }
}

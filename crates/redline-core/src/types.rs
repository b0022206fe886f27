//! Core proofreading types: error categories, spans, and corrections.
//!
//! These types are host-agnostic and can be used with any text buffer implementation.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Category of a proofreading correction.
///
/// Closed set. Declaration order is the order used for legend labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Spelling,
    Punctuation,
    Capitalization,
    Preposition,
    MissingWords,
    Grammar,
}

impl ErrorKind {
    /// All kinds, in legend order.
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::Spelling,
        ErrorKind::Punctuation,
        ErrorKind::Capitalization,
        ErrorKind::Preposition,
        ErrorKind::MissingWords,
        ErrorKind::Grammar,
    ];

    /// Highlight channel name, identical to the serialized form.
    pub fn channel_name(self) -> &'static str {
        match self {
            ErrorKind::Spelling => "spelling",
            ErrorKind::Punctuation => "punctuation",
            ErrorKind::Capitalization => "capitalization",
            ErrorKind::Preposition => "preposition",
            ErrorKind::MissingWords => "missing-words",
            ErrorKind::Grammar => "grammar",
        }
    }

    /// Human-readable heading shown in the correction popover.
    pub fn heading(self) -> &'static str {
        match self {
            ErrorKind::Spelling => "Spelling",
            ErrorKind::Punctuation => "Punctuation",
            ErrorKind::Capitalization => "Capitalization",
            ErrorKind::Preposition => "Preposition",
            ErrorKind::MissingWords => "Missing words",
            ErrorKind::Grammar => "Grammar",
        }
    }

    /// Position of this kind in [`ErrorKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Parse a channel name back into a kind.
    pub fn from_channel_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.channel_name() == name)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.channel_name())
    }
}

/// Half-open `[start, end)` interval of character offsets (NOT byte offsets!).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if an offset is within the span, counting both endpoints.
    ///
    /// A caret sitting exactly on either boundary still belongs to the span.
    pub fn contains_inclusive(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }

    /// Check whether two spans share at least one character.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Move both ends by `delta`, saturating at 0.
    pub fn shifted(&self, delta: isize) -> Self {
        Self {
            start: apply_delta(self.start, delta),
            end: apply_delta(self.end, delta),
        }
    }

    pub fn to_range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(s: Span) -> Self {
        s.start..s.end
    }
}

/// Apply a signed delta to a usize, saturating at 0 on underflow.
pub fn apply_delta(val: usize, delta: isize) -> usize {
    if delta >= 0 {
        val.saturating_add(delta as usize)
    } else {
        val.saturating_sub(delta.unsigned_abs())
    }
}

/// A correction exactly as the model reported it, before locating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawCorrection {
    /// The incorrect text, as it (supposedly) appears in the source.
    pub original_text: String,
    pub corrected_text: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub explanation: String,
}

/// A correction the model reported by position rather than by snippet.
///
/// Indices are char offsets into the text that was sent, `end_index`
/// exclusive. They are untrusted until checked against the buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IndexedCorrection {
    pub start_index: usize,
    pub end_index: usize,
    /// Replacement for the text at `start_index..end_index`.
    pub correction: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub explanation: String,
}

/// A correction located to a span of the current text buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub span: Span,
    /// Buffer text at `span` when the correction was located.
    pub original_text: SmolStr,
    pub corrected_text: SmolStr,
    pub kind: ErrorKind,
    pub explanation: SmolStr,
}

impl Correction {
    /// Change in buffer length (in chars) if this correction is accepted.
    pub fn length_delta(&self) -> isize {
        self.corrected_text.chars().count() as isize - self.original_text.chars().count() as isize
    }
}

/// Screen rectangle of the caret, used to anchor the correction popover.
#[derive(Clone, Debug, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CaretRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CaretRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Popover anchor: horizontally centred, just below the caret.
    /// Rounded to whole pixels.
    pub fn popover_anchor(&self) -> (f64, f64) {
        (
            (self.left + self.width / 2.0).round(),
            (self.top + self.height).round(),
        )
    }
}

//! Highlight channels, one per error category.
//!
//! Each channel holds three kinds of ranges:
//! - a permanent legend label naming the channel, which survives every clear
//! - dynamic ranges over the editor text, one per live correction
//! - popover heading marks, added when a correction's popover opens
//!
//! Channels are independent. Ranges in different channels may overlap;
//! editor ranges within one channel never do.

use crate::types::{Correction, ErrorKind, Span};

/// Which text a highlight range refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HighlightTarget {
    /// The editable text region.
    Editor,
    /// The legend line naming each category.
    Legend,
    /// The heading inside the correction popover.
    PopoverHeading,
}

/// A range to paint, with the text it applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HighlightRange {
    pub target: HighlightTarget,
    pub span: Span,
}

/// Highlight state for one error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightChannel {
    kind: ErrorKind,
    label: Option<Span>,
    /// Sorted by start, pairwise disjoint.
    ranges: Vec<Span>,
    heading_marks: Vec<Span>,
}

impl HighlightChannel {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            label: None,
            ranges: Vec::new(),
            heading_marks: Vec::new(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.channel_name()
    }

    /// The permanent legend label, if a legend was laid out.
    pub fn label(&self) -> Option<Span> {
        self.label
    }

    /// Dynamic ranges over the editor text.
    pub fn editor_ranges(&self) -> &[Span] {
        &self.ranges
    }

    pub fn heading_marks(&self) -> &[Span] {
        &self.heading_marks
    }

    /// Whether the channel has anything besides its label.
    pub fn has_dynamic_ranges(&self) -> bool {
        !self.ranges.is_empty() || !self.heading_marks.is_empty()
    }

    /// Every range in the channel, label first.
    pub fn ranges(&self) -> Vec<HighlightRange> {
        let label = self.label.map(|span| HighlightRange {
            target: HighlightTarget::Legend,
            span,
        });
        let editor = self.ranges.iter().map(|&span| HighlightRange {
            target: HighlightTarget::Editor,
            span,
        });
        let headings = self.heading_marks.iter().map(|&span| HighlightRange {
            target: HighlightTarget::PopoverHeading,
            span,
        });
        label.into_iter().chain(editor).chain(headings).collect()
    }

    /// Add an editor range. Returns false if it would overlap an existing one.
    fn add(&mut self, span: Span) -> bool {
        let idx = self.ranges.partition_point(|r| r.start < span.start);
        let clashes_prev = idx > 0 && self.ranges[idx - 1].overlaps(&span);
        let clashes_next = self.ranges.get(idx).is_some_and(|r| r.overlaps(&span) || *r == span);
        if clashes_prev || clashes_next {
            return false;
        }
        self.ranges.insert(idx, span);
        true
    }

    /// Remove dynamic ranges, keeping the label.
    fn clear(&mut self) {
        self.ranges.clear();
        self.heading_marks.clear();
    }
}

/// The full set of highlight channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightOverlay {
    channels: [HighlightChannel; 6],
    dirty: [bool; 6],
}

impl Default for HighlightOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightOverlay {
    /// Create channels with no legend labels.
    pub fn new() -> Self {
        Self {
            channels: ErrorKind::ALL.map(HighlightChannel::new),
            dirty: [false; 6],
        }
    }

    /// Create channels with legend labels laid out over `legend`.
    ///
    /// See [`legend_spans`] for how words are assigned to categories.
    pub fn with_legend(legend: &str) -> Self {
        let mut overlay = Self::new();
        for (kind, span) in legend_spans(legend) {
            overlay.set_label(kind, span);
        }
        overlay
    }

    /// Set the permanent label range for a channel.
    pub fn set_label(&mut self, kind: ErrorKind, span: Span) {
        self.channels[kind.index()].label = Some(span);
        self.dirty[kind.index()] = true;
    }

    pub fn channel(&self, kind: ErrorKind) -> &HighlightChannel {
        &self.channels[kind.index()]
    }

    pub fn channels(&self) -> impl Iterator<Item = &HighlightChannel> {
        self.channels.iter()
    }

    /// Add an editor range for each correction to its category's channel.
    ///
    /// Never touches the text or the corrections themselves.
    pub fn render(&mut self, corrections: &[Correction]) {
        for correction in corrections {
            let idx = correction.kind.index();
            if self.channels[idx].add(correction.span) {
                tracing::trace!(
                    target: "redline::overlay",
                    channel = correction.kind.channel_name(),
                    start = correction.span.start,
                    end = correction.span.end,
                    "highlighted"
                );
                self.dirty[idx] = true;
            } else {
                tracing::warn!(
                    target: "redline::overlay",
                    channel = correction.kind.channel_name(),
                    start = correction.span.start,
                    end = correction.span.end,
                    "skipping range overlapping an existing highlight"
                );
            }
        }
    }

    /// Remove every dynamic range from every channel. Legend labels stay.
    pub fn clear_all(&mut self) {
        for (idx, channel) in self.channels.iter_mut().enumerate() {
            if channel.has_dynamic_ranges() {
                channel.clear();
                self.dirty[idx] = true;
            }
        }
    }

    /// Highlight a popover heading of `heading_len` chars in a channel.
    pub fn mark_heading(&mut self, kind: ErrorKind, heading_len: usize) {
        let channel = &mut self.channels[kind.index()];
        let span = Span::new(0, heading_len);
        if !channel.heading_marks.contains(&span) {
            channel.heading_marks.push(span);
            self.dirty[kind.index()] = true;
        }
    }

    /// Number of editor ranges across all channels.
    pub fn editor_range_count(&self) -> usize {
        self.channels.iter().map(|c| c.ranges.len()).sum()
    }

    /// Channels changed since the last call, in legend order.
    pub fn take_dirty(&mut self) -> Vec<ErrorKind> {
        let changed = ErrorKind::ALL
            .into_iter()
            .filter(|k| self.dirty[k.index()])
            .collect();
        self.dirty = [false; 6];
        changed
    }
}

/// Lay out one legend label per category over a space-separated line.
///
/// Leading whitespace is skipped; the remaining text is split on single
/// spaces and the n-th word labels the n-th category. Words beyond the sixth
/// are ignored.
pub fn legend_spans(legend: &str) -> Vec<(ErrorKind, Span)> {
    let trimmed = legend.trim_start();
    let mut offset = legend.chars().count() - trimmed.chars().count();

    trimmed
        .split(' ')
        .zip(ErrorKind::ALL)
        .map(|(word, kind)| {
            let len = word.chars().count();
            let span = Span::new(offset, offset + len);
            offset += len + 1;
            (kind, span)
        })
        .collect()
}

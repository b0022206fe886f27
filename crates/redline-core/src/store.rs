//! The live correction set for one text buffer.

use crate::types::{Correction, Span};

/// Ordered, pairwise-disjoint corrections for the current buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorrectionStore {
    corrections: Vec<Correction>,
}

impl CorrectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-located corrections.
    pub fn from_corrections(corrections: Vec<Correction>) -> Self {
        Self { corrections }
    }

    /// Replace the whole set, discarding the previous one.
    pub fn replace(&mut self, corrections: Vec<Correction>) {
        self.corrections = corrections;
    }

    pub fn clear(&mut self) {
        self.corrections.clear();
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Correction> {
        self.corrections.iter()
    }

    pub fn as_slice(&self) -> &[Correction] {
        &self.corrections
    }

    /// Find the correction under a caret at `offset`.
    ///
    /// Both span ends count, so a caret just before or just after the
    /// highlighted text still selects it. Spans are disjoint, so at most one
    /// can match; if that ever fails to hold, the first match wins.
    pub fn find_at(&self, offset: usize) -> Option<&Correction> {
        self.corrections
            .iter()
            .find(|c| c.span.contains_inclusive(offset))
    }

    /// Compute the correction set that remains after `accepted` is applied.
    ///
    /// - the accepted correction itself is removed;
    /// - corrections ending at or before its start keep their spans;
    /// - corrections starting strictly after its end move by `length_delta`;
    /// - anything else overlaps the edit and is dropped, since its position
    ///   is no longer well defined.
    pub fn reindex_after_accept(
        &self,
        accepted: &Correction,
        length_delta: isize,
    ) -> Vec<Correction> {
        let mut next = Vec::with_capacity(self.corrections.len().saturating_sub(1));

        for correction in &self.corrections {
            if correction.span == accepted.span {
                continue;
            }

            if correction.span.start > accepted.span.end {
                let mut shifted = correction.clone();
                shifted.span = correction.span.shifted(length_delta);
                tracing::trace!(
                    target: "redline::store",
                    text = %correction.original_text,
                    delta = length_delta,
                    "shifted correction"
                );
                next.push(shifted);
            } else if correction.span.end <= accepted.span.start {
                next.push(correction.clone());
            } else {
                tracing::debug!(
                    target: "redline::store",
                    text = %correction.original_text,
                    "dropping correction overlapping accepted edit"
                );
            }
        }

        next
    }

    /// Drop any correction whose span is empty or reaches past `len_chars`.
    ///
    /// Returns the number of corrections removed.
    pub fn retain_within(&mut self, len_chars: usize) -> usize {
        let before = self.corrections.len();
        self.corrections
            .retain(|c| !c.span.is_empty() && c.span.end <= len_chars);
        before - self.corrections.len()
    }

    /// Check the set invariants: sorted, disjoint, non-empty and in bounds.
    pub fn is_consistent(&self, len_chars: usize) -> bool {
        let ordered = self
            .corrections
            .windows(2)
            .all(|pair| pair[0].span.end <= pair[1].span.start);
        ordered
            && self
                .corrections
                .iter()
                .all(|c| c.span.start < c.span.end && c.span.end <= len_chars)
    }

    /// Span of every correction, in order.
    pub fn spans(&self) -> Vec<Span> {
        self.corrections.iter().map(|c| c.span).collect()
    }
}

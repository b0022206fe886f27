//! Reconciliation engine: the proofreading state machine.
//!
//! The engine owns the text buffer, the live correction set and the highlight
//! overlay, and is the only thing that mutates them. Hosts feed it
//! [`EngineEvent`]s (button presses, caret moves, edits, model answers) and
//! apply the [`Effect`]s it returns.
//!
//! ```text
//! Idle -> Proofreading -> ShowingHighlights <-> ShowingPopover
//!   ^                                              |
//!   +---------------- edit / new request ----------+
//! ```
//!
//! Model calls are the only asynchronous step. Every request carries a
//! [`RequestToken`]; an answer is applied only if its token is the latest one
//! issued and the buffer has not changed since.

use smol_str::SmolStr;

use crate::error::ModelError;
use crate::locate::locate_reported;
use crate::model::{LanguageModel, ProofreadResponse, Proofreader};
use crate::overlay::HighlightOverlay;
use crate::store::CorrectionStore;
use crate::text::{TextBuffer, TextRope};
use crate::types::{CaretRect, Correction, ErrorKind, Span};

/// Identifies one proofreading request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestToken {
    /// Monotonic request counter.
    pub id: u64,
    /// Buffer version the request was issued against.
    pub buffer_version: u64,
}

/// Engine state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    /// Waiting for the model to answer `token`.
    Proofreading { token: RequestToken },
    /// Corrections are highlighted, no popover open.
    ShowingHighlights,
    /// The popover for the current correction is open.
    ShowingPopover,
}

/// Input to the engine.
#[derive(Debug)]
pub enum EngineEvent {
    /// The proofread button was pressed.
    SubmitProofread,
    /// The model answered (or failed) a request.
    ProofreadCompleted {
        token: RequestToken,
        result: Result<ProofreadResponse, ModelError>,
    },
    /// The caret moved to `offset` (pointer release or key up).
    CaretMoved {
        offset: usize,
        rect: Option<CaretRect>,
    },
    /// Accept the correction in the open popover.
    Accept,
    /// Close the popover without accepting (Escape).
    Dismiss,
    /// The user edited the text directly.
    BufferEdited { text: String },
}

/// Content of the correction popover.
#[derive(Clone, Debug, PartialEq)]
pub struct Popover {
    pub kind: ErrorKind,
    pub heading: &'static str,
    pub corrected_text: SmolStr,
    pub explanation: SmolStr,
    pub span: Span,
    /// Screen position, when the host reported a caret rectangle.
    pub anchor: Option<(f64, f64)>,
}

impl Popover {
    fn for_correction(correction: &Correction, rect: Option<CaretRect>) -> Self {
        Self {
            kind: correction.kind,
            heading: correction.kind.heading(),
            corrected_text: correction.corrected_text.clone(),
            explanation: correction.explanation.clone(),
            span: correction.span,
            anchor: rect.map(|r| r.popover_anchor()),
        }
    }
}

/// User-facing status messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Nothing to proofread.
    EmptyInput,
    /// The model found nothing, or nothing it reported could be placed.
    NoCorrections { unlocated: usize },
    /// Corrections are highlighted.
    Located { found: usize, unlocated: usize },
    /// The model cannot be used; the feature should appear disabled.
    FeatureUnavailable(String),
    /// One request failed; no corrections are shown.
    ModelFailed(String),
}

/// Output of a transition, for the host to apply.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Send `text` to the model and report back with `token`.
    RequestProofread { token: RequestToken, text: String },
    /// The whole buffer now reads `text`.
    TextReplaced { text: String },
    /// These channels changed; re-read them from the overlay.
    HighlightsChanged(Vec<ErrorKind>),
    ShowPopover(Popover),
    HidePopover,
    Notify(Notice),
}

/// Owns the (buffer, corrections, highlights) triple and drives it through
/// proofreading requests and acceptances.
#[derive(Debug)]
pub struct ProofreadEngine<T = TextRope> {
    buffer: T,
    version: u64,
    store: CorrectionStore,
    overlay: HighlightOverlay,
    state: EngineState,
    current: Option<Correction>,
    /// The model's own rewrite of the text the live corrections came from.
    corrected_input: Option<String>,
    next_request: u64,
    pending: Option<RequestToken>,
}

impl ProofreadEngine<TextRope> {
    /// Engine over a ropey buffer holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self::new(TextRope::from_str(text))
    }
}

impl<T: TextBuffer> ProofreadEngine<T> {
    pub fn new(buffer: T) -> Self {
        Self {
            buffer,
            version: 0,
            store: CorrectionStore::new(),
            overlay: HighlightOverlay::new(),
            state: EngineState::Idle,
            current: None,
            corrected_input: None,
            next_request: 0,
            pending: None,
        }
    }

    /// Use `overlay` (typically one with legend labels) for highlights.
    pub fn with_overlay(mut self, overlay: HighlightOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn buffer(&self) -> &T {
        &self.buffer
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    /// Bumped on every buffer change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn corrections(&self) -> &CorrectionStore {
        &self.store
    }

    pub fn overlay(&self) -> &HighlightOverlay {
        &self.overlay
    }

    /// The correction whose popover is open, if any.
    pub fn current(&self) -> Option<&Correction> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> Option<RequestToken> {
        self.pending
    }

    /// The fully corrected text from the last applied answer.
    ///
    /// Cleared by a new request or an edit; accepting corrections keeps it.
    pub fn corrected_input(&self) -> Option<&str> {
        self.corrected_input.as_deref()
    }

    /// Apply one event and return what the host should do.
    pub fn handle(&mut self, event: EngineEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            EngineEvent::SubmitProofread => self.submit(&mut effects),
            EngineEvent::ProofreadCompleted { token, result } => {
                self.complete(token, result, &mut effects)
            }
            EngineEvent::CaretMoved { offset, rect } => {
                self.caret_moved(offset, rect, &mut effects)
            }
            EngineEvent::Accept => self.accept(&mut effects),
            EngineEvent::Dismiss => self.dismiss(&mut effects),
            EngineEvent::BufferEdited { text } => self.edited(&text, &mut effects),
        }
        tracing::trace!(
            target: "redline::engine",
            state = ?self.state,
            effects = effects.len(),
            "handled event"
        );
        effects
    }

    /// Submit the buffer to `proofreader` and apply the answer.
    ///
    /// The request effect is consumed here; every other effect is returned.
    pub async fn proofread_with<M: LanguageModel>(
        &mut self,
        proofreader: &Proofreader<M>,
    ) -> Vec<Effect> {
        let mut effects = self.handle(EngineEvent::SubmitProofread);
        let request = effects.iter().find_map(|effect| match effect {
            Effect::RequestProofread { token, text } => Some((*token, text.clone())),
            _ => None,
        });
        effects.retain(|effect| !matches!(effect, Effect::RequestProofread { .. }));

        let Some((token, text)) = request else {
            return effects;
        };

        let result = proofreader.proofread(&text).await;
        effects.extend(self.handle(EngineEvent::ProofreadCompleted { token, result }));
        effects
    }

    fn submit(&mut self, effects: &mut Vec<Effect>) {
        self.overlay.clear_all();
        self.store.clear();
        self.current = None;
        self.corrected_input = None;
        self.close_popover(effects);

        let text = self.buffer.to_string();
        if text.trim().is_empty() {
            tracing::warn!(target: "redline::engine", "no text to proofread");
            self.pending = None;
            self.state = EngineState::Idle;
            self.flush_highlights(effects);
            effects.push(Effect::Notify(Notice::EmptyInput));
            return;
        }

        self.next_request += 1;
        let token = RequestToken {
            id: self.next_request,
            buffer_version: self.version,
        };
        if let Some(previous) = self.pending.replace(token) {
            tracing::debug!(
                target: "redline::engine",
                superseded = previous.id,
                "superseding pending request"
            );
        }
        tracing::debug!(target: "redline::engine", request = token.id, "proofreading requested");

        self.state = EngineState::Proofreading { token };
        self.flush_highlights(effects);
        effects.push(Effect::RequestProofread { token, text });
    }

    fn complete(
        &mut self,
        token: RequestToken,
        result: Result<ProofreadResponse, ModelError>,
        effects: &mut Vec<Effect>,
    ) {
        if self.pending != Some(token) || token.buffer_version != self.version {
            tracing::debug!(
                target: "redline::engine",
                request = token.id,
                latest = ?self.pending.map(|t| t.id),
                "discarding stale proofreading result"
            );
            return;
        }
        self.pending = None;

        match result {
            Ok(response) => {
                let located = locate_reported(&self.buffer, &response.corrections);
                let unlocated = located.unlocated.len();
                if unlocated > 0 {
                    tracing::warn!(
                        target: "redline::engine",
                        unlocated,
                        "some corrections could not be placed"
                    );
                }

                self.corrected_input = Some(response.corrected_input);
                self.store.replace(located.corrections);
                self.overlay.render(self.store.as_slice());
                self.flush_highlights(effects);

                if self.store.is_empty() {
                    self.state = EngineState::Idle;
                    effects.push(Effect::Notify(Notice::NoCorrections { unlocated }));
                } else {
                    self.state = EngineState::ShowingHighlights;
                    effects.push(Effect::Notify(Notice::Located {
                        found: self.store.len(),
                        unlocated,
                    }));
                }
            }
            Err(err) => {
                tracing::warn!(target: "redline::engine", error = %err, "proofreading failed");
                self.store.clear();
                self.state = EngineState::Idle;
                let notice = if err.is_unavailable() {
                    Notice::FeatureUnavailable(err.to_string())
                } else {
                    Notice::ModelFailed(err.to_string())
                };
                effects.push(Effect::Notify(notice));
            }
        }
    }

    fn caret_moved(&mut self, offset: usize, rect: Option<CaretRect>, effects: &mut Vec<Effect>) {
        match self.store.find_at(offset).cloned() {
            Some(correction) => {
                tracing::debug!(
                    target: "redline::engine",
                    offset,
                    kind = %correction.kind,
                    "correction at caret"
                );
                let popover = Popover::for_correction(&correction, rect);
                self.overlay
                    .mark_heading(correction.kind, popover.heading.chars().count());
                self.current = Some(correction);
                self.state = EngineState::ShowingPopover;
                self.flush_highlights(effects);
                effects.push(Effect::ShowPopover(popover));
            }
            None => {
                self.current = None;
                self.close_popover(effects);
            }
        }
    }

    fn accept(&mut self, effects: &mut Vec<Effect>) {
        let Some(accepted) = self.current.take() else {
            tracing::warn!(target: "redline::engine", "no correction to accept");
            return;
        };

        let range = accepted.span.to_range();
        let still_matches =
            self.buffer.slice(range.clone()).as_deref() == Some(accepted.original_text.as_str());

        self.overlay.clear_all();

        if !still_matches {
            tracing::warn!(
                target: "redline::engine",
                text = %accepted.original_text,
                "text under correction changed, dropping all corrections"
            );
            self.store.clear();
            self.state = EngineState::Idle;
            self.flush_highlights(effects);
            effects.push(Effect::HidePopover);
            return;
        }

        tracing::debug!(
            target: "redline::engine",
            kind = %accepted.kind,
            from = %accepted.original_text,
            to = %accepted.corrected_text,
            "accepting correction"
        );
        self.buffer.replace(range, &accepted.corrected_text);
        self.bump_version();

        let next = self
            .store
            .reindex_after_accept(&accepted, accepted.length_delta());
        self.store.replace(next);
        let dropped = self.store.retain_within(self.buffer.len_chars());
        if dropped > 0 {
            tracing::warn!(
                target: "redline::engine",
                dropped,
                "dropped corrections outside the text"
            );
        }

        if self.store.is_empty() {
            self.state = EngineState::Idle;
        } else {
            self.overlay.render(self.store.as_slice());
            self.state = EngineState::ShowingHighlights;
        }

        effects.push(Effect::TextReplaced {
            text: self.buffer.to_string(),
        });
        self.flush_highlights(effects);
        effects.push(Effect::HidePopover);
    }

    fn dismiss(&mut self, effects: &mut Vec<Effect>) {
        self.current = None;
        self.close_popover(effects);
    }

    fn edited(&mut self, text: &str, effects: &mut Vec<Effect>) {
        if self.buffer.to_string() == text {
            return;
        }

        self.buffer.set_text(text);
        self.bump_version();
        self.store.clear();
        self.overlay.clear_all();
        self.current = None;
        self.corrected_input = None;
        self.close_popover(effects);
        self.state = EngineState::Idle;
        self.flush_highlights(effects);
    }

    fn bump_version(&mut self) {
        self.version += 1;
        if let Some(token) = self.pending.take() {
            tracing::debug!(
                target: "redline::engine",
                request = token.id,
                "buffer changed, invalidating pending request"
            );
            self.state = EngineState::Idle;
        }
    }

    fn close_popover(&mut self, effects: &mut Vec<Effect>) {
        if self.state == EngineState::ShowingPopover {
            self.state = if self.store.is_empty() {
                EngineState::Idle
            } else {
                EngineState::ShowingHighlights
            };
            effects.push(Effect::HidePopover);
        }
    }

    fn flush_highlights(&mut self, effects: &mut Vec<Effect>) {
        let dirty = self.overlay.take_dirty();
        if !dirty.is_empty() {
            effects.push(Effect::HighlightsChanged(dirty));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorrectionFormat, ProofreadConfig};
    use crate::model::testing::{Reply, ScriptedModel, answer, answer_indexed};
    use crate::model::{Availability, parse_response};

    fn response(corrections: &[(&str, &str, &str)]) -> ProofreadResponse {
        parse_response(&answer("", corrections), CorrectionFormat::Snippet).unwrap()
    }

    fn indexed_response(
        corrected_input: &str,
        corrections: &[(usize, usize, &str, &str)],
    ) -> ProofreadResponse {
        let json = answer_indexed(corrected_input, corrections);
        parse_response(&json, CorrectionFormat::Indexed).unwrap()
    }

    /// Submit and answer in one go, returning the completion effects.
    fn proofread(
        engine: &mut ProofreadEngine,
        corrections: &[(&str, &str, &str)],
    ) -> Vec<Effect> {
        complete_with(engine, response(corrections))
    }

    fn complete_with(engine: &mut ProofreadEngine, response: ProofreadResponse) -> Vec<Effect> {
        let token = request_token(&engine.handle(EngineEvent::SubmitProofread)).unwrap();
        engine.handle(EngineEvent::ProofreadCompleted {
            token,
            result: Ok(response),
        })
    }

    fn request_token(effects: &[Effect]) -> Option<RequestToken> {
        effects.iter().find_map(|e| match e {
            Effect::RequestProofread { token, .. } => Some(*token),
            _ => None,
        })
    }

    fn accept_at(engine: &mut ProofreadEngine, offset: usize) -> Vec<Effect> {
        engine.handle(EngineEvent::CaretMoved { offset, rect: None });
        engine.handle(EngineEvent::Accept)
    }

    #[test]
    fn test_accept_single_correction() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        proofread(&mut engine, &[("seen", "saw", "grammar")]);

        assert_eq!(engine.state(), EngineState::ShowingHighlights);
        let c = &engine.corrections().as_slice()[0];
        assert_eq!(c.span, Span::new(2, 6));
        assert_eq!(c.corrected_text, "saw");

        let effects = accept_at(&mut engine, 3);
        assert_eq!(engine.text(), "I saw him");
        assert!(effects.contains(&Effect::TextReplaced {
            text: "I saw him".into()
        }));
        assert!(effects.contains(&Effect::HidePopover));
        assert!(engine.corrections().is_empty());
        assert!(engine.current().is_none());
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.overlay().editor_range_count(), 0);
    }

    #[test]
    fn test_accept_first_of_two_keeps_second() {
        let mut engine = ProofreadEngine::from_text("i think he is gud");
        proofread(
            &mut engine,
            &[("i", "I", "capitalization"), ("gud", "good", "spelling")],
        );
        assert_eq!(
            engine.corrections().spans(),
            vec![Span::new(0, 1), Span::new(14, 17)]
        );

        accept_at(&mut engine, 0);
        assert_eq!(engine.text(), "I think he is gud");
        assert_eq!(engine.corrections().spans(), vec![Span::new(14, 17)]);
        assert_eq!(engine.state(), EngineState::ShowingHighlights);
        assert_eq!(
            engine.overlay().channel(ErrorKind::Spelling).editor_ranges(),
            &[Span::new(14, 17)]
        );
        assert!(engine
            .overlay()
            .channel(ErrorKind::Capitalization)
            .editor_ranges()
            .is_empty());

        accept_at(&mut engine, 15);
        assert_eq!(engine.text(), "I think he is good");
        assert!(engine.corrections().is_empty());
    }

    #[test]
    fn test_accept_later_then_earlier() {
        let mut engine = ProofreadEngine::from_text("teh cat sat on teh mat");
        proofread(
            &mut engine,
            &[("teh", "the", "spelling"), ("teh mat", "the mat", "spelling")],
        );
        accept_at(&mut engine, 16);
        assert_eq!(engine.text(), "teh cat sat on the mat");
        accept_at(&mut engine, 1);
        assert_eq!(engine.text(), "the cat sat on the mat");
    }

    #[test]
    fn test_accept_drops_touching_correction() {
        let mut engine = ProofreadEngine::from_text("ab");
        proofread(
            &mut engine,
            &[("a", "A", "capitalization"), ("b", "B", "capitalization")],
        );
        assert_eq!(engine.corrections().len(), 2);

        accept_at(&mut engine, 0);
        assert_eq!(engine.text(), "Ab");
        assert!(engine.corrections().is_empty());
    }

    #[test]
    fn test_accepting_in_any_order_stays_in_bounds() {
        let text = "i has went too the store , and buyed three apple";
        let batch = [
            ("i", "I", "capitalization"),
            ("has went", "went", "grammar"),
            ("too", "to", "preposition"),
            (" ,", ",", "punctuation"),
            ("buyed", "bought", "spelling"),
            ("three apple", "three apples", "grammar"),
        ];

        for first in 0..batch.len() {
            let mut engine = ProofreadEngine::from_text(text);
            proofread(&mut engine, &batch);
            assert_eq!(engine.corrections().len(), batch.len());

            let start = engine.corrections().as_slice()[first].span.start;
            accept_at(&mut engine, start);

            while let Some(next) = engine.corrections().as_slice().first().cloned() {
                let len = engine.buffer().len_chars();
                assert!(engine.corrections().is_consistent(len));
                for c in engine.corrections().iter() {
                    assert_eq!(
                        engine.buffer().slice(c.span.to_range()).as_deref(),
                        Some(c.original_text.as_str())
                    );
                }
                accept_at(&mut engine, next.span.start);
            }
        }
    }

    #[test]
    fn test_caret_shows_and_hides_popover() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        proofread(&mut engine, &[("seen", "saw", "grammar")]);

        let effects = engine.handle(EngineEvent::CaretMoved {
            offset: 6,
            rect: Some(CaretRect::new(100.0, 40.0, 0.0, 18.0)),
        });
        let popover = effects
            .iter()
            .find_map(|e| match e {
                Effect::ShowPopover(p) => Some(p.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(popover.heading, "Grammar");
        assert_eq!(popover.corrected_text, "saw");
        assert_eq!(popover.anchor, Some((100.0, 58.0)));
        assert_eq!(engine.state(), EngineState::ShowingPopover);
        assert_eq!(
            engine.overlay().channel(ErrorKind::Grammar).heading_marks(),
            &[Span::new(0, 7)]
        );

        let effects = engine.handle(EngineEvent::CaretMoved {
            offset: 8,
            rect: None,
        });
        assert_eq!(effects, vec![Effect::HidePopover]);
        assert!(engine.current().is_none());
        assert_eq!(engine.state(), EngineState::ShowingHighlights);
    }

    #[test]
    fn test_accept_without_current_is_noop() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        proofread(&mut engine, &[("seen", "saw", "grammar")]);

        let effects = engine.handle(EngineEvent::Accept);
        assert!(effects.is_empty());
        assert_eq!(engine.text(), "I seen him");
        assert_eq!(engine.corrections().len(), 1);
    }

    #[test]
    fn test_dismiss_hides_popover_only() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        proofread(&mut engine, &[("seen", "saw", "grammar")]);
        engine.handle(EngineEvent::CaretMoved { offset: 2, rect: None });

        let effects = engine.handle(EngineEvent::Dismiss);
        assert_eq!(effects, vec![Effect::HidePopover]);
        assert_eq!(engine.corrections().len(), 1);
        assert_eq!(engine.state(), EngineState::ShowingHighlights);

        // Popover already closed: nothing to do.
        assert!(engine.handle(EngineEvent::Dismiss).is_empty());
        assert!(engine.handle(EngineEvent::Accept).is_empty());
    }

    #[test]
    fn test_stale_token_is_discarded() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        let first = request_token(&engine.handle(EngineEvent::SubmitProofread)).unwrap();
        let second = request_token(&engine.handle(EngineEvent::SubmitProofread)).unwrap();
        assert!(second.id > first.id);

        let effects = engine.handle(EngineEvent::ProofreadCompleted {
            token: first,
            result: Ok(response(&[("seen", "saw", "grammar")])),
        });
        assert!(effects.is_empty());
        assert!(engine.corrections().is_empty());
        assert_eq!(engine.state(), EngineState::Proofreading { token: second });

        engine.handle(EngineEvent::ProofreadCompleted {
            token: second,
            result: Ok(response(&[("seen", "saw", "grammar")])),
        });
        assert_eq!(engine.corrections().len(), 1);

        // A late duplicate of an applied answer is ignored too.
        let effects = engine.handle(EngineEvent::ProofreadCompleted {
            token: second,
            result: Ok(response(&[])),
        });
        assert!(effects.is_empty());
        assert_eq!(engine.corrections().len(), 1);
    }

    #[test]
    fn test_edit_while_pending_invalidates_result() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        let token = request_token(&engine.handle(EngineEvent::SubmitProofread)).unwrap();

        engine.handle(EngineEvent::BufferEdited {
            text: "He seen me".into(),
        });
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.pending().is_none());

        let effects = engine.handle(EngineEvent::ProofreadCompleted {
            token,
            result: Ok(response(&[("I", "We", "grammar")])),
        });
        assert!(effects.is_empty());
        assert!(engine.corrections().is_empty());
        assert_eq!(engine.text(), "He seen me");
    }

    #[test]
    fn test_edit_clears_live_corrections() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        proofread(&mut engine, &[("seen", "saw", "grammar")]);
        engine.handle(EngineEvent::CaretMoved { offset: 3, rect: None });

        let effects = engine.handle(EngineEvent::BufferEdited {
            text: "I seen them".into(),
        });
        assert!(effects.contains(&Effect::HidePopover));
        assert!(effects.contains(&Effect::HighlightsChanged(vec![ErrorKind::Grammar])));
        assert!(engine.corrections().is_empty());
        assert!(engine.current().is_none());

        // Same text again is not an edit.
        let version = engine.version();
        assert!(engine
            .handle(EngineEvent::BufferEdited {
                text: "I seen them".into()
            })
            .is_empty());
        assert_eq!(engine.version(), version);
    }

    #[test]
    fn test_model_failure_means_no_corrections() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        let token = request_token(&engine.handle(EngineEvent::SubmitProofread)).unwrap();
        let malformed = serde_json::from_str::<serde_json::Value>("{").unwrap_err();

        let effects = engine.handle(EngineEvent::ProofreadCompleted {
            token,
            result: Err(malformed.into()),
        });
        assert!(matches!(
            effects.as_slice(),
            [Effect::Notify(Notice::ModelFailed(_))]
        ));
        assert_eq!(engine.text(), "I seen him");
        assert!(engine.corrections().is_empty());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_unavailable_model_notice() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        let token = request_token(&engine.handle(EngineEvent::SubmitProofread)).unwrap();
        let effects = engine.handle(EngineEvent::ProofreadCompleted {
            token,
            result: Err(ModelError::Unavailable),
        });
        assert!(matches!(
            effects.as_slice(),
            [Effect::Notify(Notice::FeatureUnavailable(_))]
        ));
    }

    #[test]
    fn test_blank_input_is_not_sent() {
        let mut engine = ProofreadEngine::from_text("   \n ");
        let effects = engine.handle(EngineEvent::SubmitProofread);
        assert_eq!(effects, vec![Effect::Notify(Notice::EmptyInput)]);
        assert!(engine.pending().is_none());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_resubmit_discards_previous_set() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        proofread(&mut engine, &[("seen", "saw", "grammar")]);

        let effects = engine.handle(EngineEvent::SubmitProofread);
        assert!(effects.contains(&Effect::HighlightsChanged(vec![ErrorKind::Grammar])));
        assert!(engine.corrections().is_empty());
        assert_eq!(engine.overlay().editor_range_count(), 0);
    }

    #[test]
    fn test_resubmit_forgets_open_correction() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        proofread(&mut engine, &[("seen", "saw", "grammar")]);
        engine.handle(EngineEvent::CaretMoved { offset: 3, rect: None });
        assert!(engine.current().is_some());

        let effects = engine.handle(EngineEvent::SubmitProofread);
        assert!(effects.contains(&Effect::HidePopover));
        assert!(engine.current().is_none());

        // The popover is gone, so there is nothing to accept.
        assert!(engine.handle(EngineEvent::Accept).is_empty());
        assert_eq!(engine.text(), "I seen him");
        assert!(engine.pending().is_some());

        // The new answer applies to the untouched text.
        let token = engine.pending().unwrap();
        engine.handle(EngineEvent::ProofreadCompleted {
            token,
            result: Ok(response(&[("seen", "saw", "grammar")])),
        });
        assert_eq!(engine.corrections().spans(), vec![Span::new(2, 6)]);
        assert!(engine.handle(EngineEvent::Accept).is_empty());
        assert_eq!(engine.text(), "I seen him");
    }

    #[test]
    fn test_indexed_answer_is_reconciled() {
        let mut engine = ProofreadEngine::from_text("i think he is gud");
        let effects = complete_with(
            &mut engine,
            indexed_response(
                "I think he is good",
                &[(0, 1, "I", "capitalization"), (14, 17, "good", "spelling")],
            ),
        );
        assert!(effects.contains(&Effect::Notify(Notice::Located {
            found: 2,
            unlocated: 0
        })));
        assert_eq!(engine.corrected_input(), Some("I think he is good"));

        accept_at(&mut engine, 15);
        accept_at(&mut engine, 0);
        assert_eq!(engine.text(), "I think he is good");
        assert!(engine.corrections().is_empty());
        assert_eq!(engine.corrected_input(), Some("I think he is good"));
    }

    #[test]
    fn test_invalid_indexed_spans_are_unlocated() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        let effects = complete_with(
            &mut engine,
            indexed_response(
                "I saw him",
                &[
                    (2, 6, "saw", "grammar"),
                    (4, 8, "x", "spelling"),
                    (8, 40, "x", "spelling"),
                ],
            ),
        );
        assert!(effects.contains(&Effect::Notify(Notice::Located {
            found: 1,
            unlocated: 2
        })));
        assert_eq!(engine.corrections().spans(), vec![Span::new(2, 6)]);

        let reversed = indexed_response("I seen him", &[(6, 2, "x", "grammar")]);
        let effects = complete_with(&mut engine, reversed);
        assert!(effects.contains(&Effect::Notify(Notice::NoCorrections { unlocated: 1 })));
        assert!(engine.corrections().is_empty());
    }

    #[test]
    fn test_edit_forgets_corrected_input() {
        let mut engine = ProofreadEngine::from_text("I seen him");
        complete_with(&mut engine, indexed_response("I saw him", &[(2, 6, "saw", "grammar")]));
        assert_eq!(engine.corrected_input(), Some("I saw him"));

        engine.handle(EngineEvent::BufferEdited {
            text: "You seen him".into(),
        });
        assert!(engine.corrected_input().is_none());

        engine.handle(EngineEvent::SubmitProofread);
        assert!(engine.corrected_input().is_none());
    }

    #[test]
    fn test_unlocated_and_noop_are_reported() {
        let mut engine = ProofreadEngine::from_text("the cat sat");
        let effects = proofread(
            &mut engine,
            &[("cat", "cat", "spelling"), ("dog", "Dog", "capitalization")],
        );
        assert!(effects.contains(&Effect::Notify(Notice::NoCorrections { unlocated: 1 })));
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_legend_survives_reconciliation() {
        let overlay = HighlightOverlay::with_legend(
            "Spelling Punctuation Capitalization Preposition Missing-words Grammar",
        );
        let mut engine = ProofreadEngine::from_text("i think he is gud").with_overlay(overlay);
        proofread(
            &mut engine,
            &[("i", "I", "capitalization"), ("gud", "good", "spelling")],
        );
        accept_at(&mut engine, 0);
        accept_at(&mut engine, 14);
        engine.handle(EngineEvent::SubmitProofread);

        for channel in engine.overlay().channels() {
            assert!(channel.label().is_some());
        }
    }

    #[tokio::test]
    async fn test_proofread_with_model() {
        let model = ScriptedModel::new(vec![Reply::Json(answer(
            "I think he is good",
            &[("i", "I", "capitalization"), ("gud", "good", "spelling")],
        ))]);
        let proofreader = Proofreader::new(model.clone(), ProofreadConfig::default());
        let mut engine = ProofreadEngine::from_text("i think he is gud");

        let effects = engine.proofread_with(&proofreader).await;
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::RequestProofread { .. })));
        assert!(effects.contains(&Effect::Notify(Notice::Located {
            found: 2,
            unlocated: 0
        })));
        assert_eq!(engine.corrections().len(), 2);
        assert_eq!(model.destroyed(), 1);
    }

    #[tokio::test]
    async fn test_proofread_with_unavailable_model() {
        let mut model = ScriptedModel::new(vec![]);
        model.availability = Availability::Unavailable;
        let proofreader = Proofreader::new(model, ProofreadConfig::default());
        let mut engine = ProofreadEngine::from_text("I seen him");

        let effects = engine.proofread_with(&proofreader).await;
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Notify(Notice::FeatureUnavailable(_)))));
        assert_eq!(engine.text(), "I seen him");
        assert!(engine.corrections().is_empty());
    }
}

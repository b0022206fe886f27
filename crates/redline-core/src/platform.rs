//! Host surface abstraction.
//!
//! The engine never touches a UI. It hands back [`Effect`]s, and the host
//! (terminal, browser extension, native editor) implements [`HostSurface`] to
//! paint them. [`apply_effects`] does the dispatch.

use crate::engine::{Effect, Notice, Popover};
use crate::overlay::{HighlightOverlay, HighlightRange};
use crate::types::ErrorKind;

/// Error from a host surface operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// Where corrections get displayed.
pub trait HostSurface {
    /// Replace the visible text with `text`.
    fn set_text(&mut self, text: &str) -> Result<(), PlatformError>;

    /// Replace every range painted for `kind` with `ranges`.
    ///
    /// Channels are independent; painting one never disturbs another.
    fn set_highlights(
        &mut self,
        kind: ErrorKind,
        ranges: &[HighlightRange],
    ) -> Result<(), PlatformError>;

    fn show_popover(&mut self, popover: &Popover) -> Result<(), PlatformError>;

    fn hide_popover(&mut self) -> Result<(), PlatformError>;

    /// Show a status message. Hosts may ignore notices they have no room for.
    fn notify(&mut self, notice: &Notice);
}

/// Apply `effects` to `host`, reading highlight ranges from `overlay`.
///
/// [`Effect::RequestProofread`] is left to the caller, which owns the model.
pub fn apply_effects<H: HostSurface + ?Sized>(
    host: &mut H,
    overlay: &HighlightOverlay,
    effects: &[Effect],
) -> Result<(), PlatformError> {
    for effect in effects {
        match effect {
            Effect::RequestProofread { token, .. } => {
                tracing::trace!(
                    target: "redline::platform",
                    request = token.id,
                    "request left to caller"
                );
            }
            Effect::TextReplaced { text } => host.set_text(text)?,
            Effect::HighlightsChanged(kinds) => {
                for &kind in kinds {
                    host.set_highlights(kind, &overlay.channel(kind).ranges())?;
                }
            }
            Effect::ShowPopover(popover) => host.show_popover(popover)?,
            Effect::HidePopover => host.hide_popover()?,
            Effect::Notify(notice) => host.notify(notice),
        }
    }
    Ok(())
}

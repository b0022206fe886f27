//! redline-core: inline proofreading without framework dependencies.
//!
//! This crate provides:
//! - `TextBuffer` trait for text storage, with the ropey-backed `TextRope`
//! - `locate` / `locate_indexed` to pin model-reported corrections to character spans
//! - `CorrectionStore` holding the live corrections and re-indexing them on accept
//! - `HighlightOverlay` with one highlight channel per error category
//! - `ProofreadEngine`, the state machine tying it all together
//! - `LanguageModel` / `ModelSession` traits for the model collaborator
//! - `HostSurface` for whatever displays the result

pub mod config;
pub mod engine;
pub mod error;
pub mod locate;
pub mod model;
pub mod overlay;
pub mod platform;
pub mod store;
pub mod text;
pub mod types;

pub use config::{CorrectionFormat, ProofreadConfig};
pub use engine::{
    Effect, EngineEvent, EngineState, Notice, Popover, ProofreadEngine, RequestToken,
};
pub use error::{LocateError, ModelError};
pub use locate::{Located, Unlocated, locate, locate_indexed, locate_reported};
pub use model::{
    Availability, LanguageModel, ModelCapabilities, ModelSession, ProofreadResponse, Proofreader,
    ReportedCorrections, SessionGuard, parse_response, proofreading_schema,
};
pub use overlay::{
    HighlightChannel, HighlightOverlay, HighlightRange, HighlightTarget, legend_spans,
};
pub use platform::{HostSurface, PlatformError, apply_effects};
pub use smol_str::SmolStr;
pub use store::CorrectionStore;
pub use text::{TextBuffer, TextRope};
pub use types::{
    CaretRect, Correction, ErrorKind, IndexedCorrection, RawCorrection, Span, apply_delta,
};

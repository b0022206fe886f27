//! Error types for proofreading.

use miette::Diagnostic;

/// Errors from the language model collaborator.
///
/// None of these are fatal to the engine: every variant degrades to
/// "no corrections" with the buffer left untouched.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ModelError {
    /// The model cannot be used on this host at all.
    #[error("language model is unavailable")]
    #[diagnostic(
        code(redline::model::unavailable),
        help("check that the model endpoint is reachable and the model is installed")
    )]
    Unavailable,

    /// The host does not support the requested capabilities.
    #[error("not supported: {0}")]
    #[diagnostic(code(redline::model::not_supported))]
    NotSupported(String),

    /// Connectivity problem while creating a session or prompting.
    #[error("network error: {0}")]
    #[diagnostic(code(redline::model::network))]
    Network(String),

    /// The collaborator did not answer in time.
    #[error("model request timed out")]
    #[diagnostic(code(redline::model::timeout))]
    Timeout,

    /// The model answered with text that is not JSON matching the schema.
    #[error("model output did not match the proofreading schema")]
    #[diagnostic(
        code(redline::model::malformed),
        help("the model couldn't generate valid JSON, this can happen with complex text")
    )]
    Malformed(#[from] serde_json::Error),

    /// Anything else the collaborator reported.
    #[error("model error: {0}")]
    #[diagnostic(code(redline::model::other))]
    Other(String),
}

impl ModelError {
    /// Whether this error means the feature is unusable, rather than a one-off failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable | Self::NotSupported(_))
    }
}

/// Why a reported correction could not be placed in the text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum LocateError {
    /// The reported text does not occur after the search cursor.
    #[error("could not find {0:?} in the text")]
    #[diagnostic(code(redline::locate::not_found))]
    NotFound(String),

    /// The reported text is empty, so it has no span to highlight.
    #[error("correction has no original text to locate")]
    #[diagnostic(code(redline::locate::empty))]
    EmptyOriginal,

    /// A reported position range that is empty or reversed.
    #[error("reported span {start}..{end} is empty")]
    #[diagnostic(code(redline::locate::empty_span))]
    EmptySpan { start: usize, end: usize },

    /// A reported position range that runs past the end of the text.
    #[error("reported span {start}..{end} is outside the text ({len} chars)")]
    #[diagnostic(code(redline::locate::out_of_bounds))]
    OutOfBounds { start: usize, end: usize, len: usize },

    /// A reported position range starting before an earlier correction ends.
    #[error("reported span {start}..{end} overlaps or precedes an earlier correction")]
    #[diagnostic(
        code(redline::locate::out_of_order),
        help("positions must be listed in text order without overlaps")
    )]
    OutOfOrder { start: usize, end: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(ModelError::Unavailable.is_unavailable());
        assert!(ModelError::NotSupported("no text output".into()).is_unavailable());
        assert!(!ModelError::Timeout.is_unavailable());
        assert!(!ModelError::Network("reset".into()).is_unavailable());
    }

    #[test]
    fn test_malformed_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ModelError = err.into();
        assert!(matches!(err, ModelError::Malformed(_)));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_locate_error_messages() {
        let err = LocateError::OutOfBounds {
            start: 14,
            end: 30,
            len: 17,
        };
        assert_eq!(err.to_string(), "reported span 14..30 is outside the text (17 chars)");
        assert_eq!(
            LocateError::EmptySpan { start: 5, end: 5 }.to_string(),
            "reported span 5..5 is empty"
        );
    }
}

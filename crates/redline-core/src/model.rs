//! Interface to the language model collaborator.
//!
//! The model is a black box: it is asked whether it can run, a session is
//! created with a system prompt, the session is prompted with the text and a
//! JSON schema constraining the answer, and the session is destroyed.
//!
//! [`Proofreader`] wraps that sequence. Each call acquires its own session
//! through a [`SessionGuard`], which destroys it exactly once however the call
//! ends.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use smol_str::SmolStr;

use crate::config::{CorrectionFormat, ProofreadConfig};
use crate::error::ModelError;
use crate::types::{ErrorKind, IndexedCorrection, RawCorrection};

/// Whether the model can be used on this host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Unavailable,
    Downloadable,
    Downloading,
    Available,
}

impl Availability {
    /// Anything but `Unavailable` can be used, possibly after a download.
    pub fn is_usable(self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    pub fn needs_download(self) -> bool {
        matches!(self, Self::Downloadable | Self::Downloading)
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unavailable => "unavailable",
            Self::Downloadable => "downloadable",
            Self::Downloading => "downloading",
            Self::Available => "available",
        })
    }
}

/// One expected input or output modality.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedIo {
    #[serde(rename = "type")]
    pub kind: SmolStr,
    pub languages: Vec<SmolStr>,
}

/// What the session will be asked to consume and produce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModelCapabilities {
    pub expected_inputs: Vec<ExpectedIo>,
    pub expected_outputs: Vec<ExpectedIo>,
}

impl ModelCapabilities {
    /// Text in, text out, in the given languages.
    pub fn text(languages: &[SmolStr]) -> Self {
        let io = ExpectedIo {
            kind: SmolStr::new_static("text"),
            languages: languages.to_vec(),
        };
        Self {
            expected_inputs: vec![io.clone()],
            expected_outputs: vec![io],
        }
    }
}

/// Corrections as the model reported them, before they are placed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportedCorrections {
    /// Incorrect text to search for.
    Snippets(Vec<RawCorrection>),
    /// Char offsets into the submitted text.
    Indexed(Vec<IndexedCorrection>),
}

impl ReportedCorrections {
    pub fn len(&self) -> usize {
        match self {
            Self::Snippets(raw) => raw.len(),
            Self::Indexed(indexed) => indexed.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structured proofreading answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofreadResponse {
    /// The fully corrected text, as the model sees it.
    pub corrected_input: String,
    pub corrections: ReportedCorrections,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Answer<C> {
    corrected_input: String,
    corrections: Vec<C>,
}

/// Parse a raw model answer in `format`, rejecting anything outside the schema.
pub fn parse_response(
    raw: &str,
    format: CorrectionFormat,
) -> Result<ProofreadResponse, ModelError> {
    Ok(match format {
        CorrectionFormat::Snippet => {
            let answer: Answer<RawCorrection> = serde_json::from_str(raw)?;
            ProofreadResponse {
                corrected_input: answer.corrected_input,
                corrections: ReportedCorrections::Snippets(answer.corrections),
            }
        }
        CorrectionFormat::Indexed => {
            let answer: Answer<IndexedCorrection> = serde_json::from_str(raw)?;
            ProofreadResponse {
                corrected_input: answer.corrected_input,
                corrections: ReportedCorrections::Indexed(answer.corrections),
            }
        }
    })
}

/// JSON schema the model's answer must satisfy.
///
/// Extra properties are forbidden at every level.
pub fn proofreading_schema(format: CorrectionFormat) -> Value {
    let kinds: Vec<&str> = ErrorKind::ALL.iter().map(|k| k.channel_name()).collect();
    let kind = json!({
        "type": "string",
        "enum": kinds,
        "description": "Type of correction"
    });
    let explanation = json!({
        "type": "string",
        "description": "Explanation of why this correction was made"
    });

    let items = match format {
        CorrectionFormat::Snippet => json!({
            "type": "object",
            "required": ["originalText", "correctedText", "type", "explanation"],
            "additionalProperties": false,
            "properties": {
                "originalText": {
                    "type": "string",
                    "description": "The original incorrect text that was found"
                },
                "correctedText": {
                    "type": "string",
                    "description": "The corrected version of the text"
                },
                "type": kind,
                "explanation": explanation
            }
        }),
        CorrectionFormat::Indexed => json!({
            "type": "object",
            "required": ["startIndex", "endIndex", "correction", "type", "explanation"],
            "additionalProperties": false,
            "properties": {
                "startIndex": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Starting character index of the error"
                },
                "endIndex": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Ending character index (exclusive) of the error"
                },
                "correction": {
                    "type": "string",
                    "description": "The corrected text for this error"
                },
                "type": kind,
                "explanation": explanation
            }
        }),
    };

    json!({
        "type": "object",
        "required": ["correctedInput", "corrections"],
        "additionalProperties": false,
        "properties": {
            "correctedInput": {
                "type": "string",
                "description": "The corrected version of the input text"
            },
            "corrections": {
                "type": "array",
                "description": "Array of corrections made to the text",
                "items": items
            }
        }
    })
}

/// A live model session.
pub trait ModelSession {
    /// Prompt the session; the answer must be JSON matching `schema`.
    fn prompt(
        &mut self,
        user_text: &str,
        schema: &Value,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;

    /// Release the session. Consumes it, so it can only happen once.
    fn destroy(self);
}

/// The host-provided language model.
pub trait LanguageModel {
    type Session: ModelSession + Send;

    /// Report whether the model can run with these capabilities.
    fn availability(
        &self,
        capabilities: &ModelCapabilities,
    ) -> impl Future<Output = Result<Availability, ModelError>> + Send;

    /// Create a session primed with `system_prompt`.
    fn create_session(
        &self,
        system_prompt: &str,
        capabilities: &ModelCapabilities,
    ) -> impl Future<Output = Result<Self::Session, ModelError>> + Send;
}

/// Owns a session for one scoped use and destroys it on every exit path.
pub struct SessionGuard<S: ModelSession> {
    session: Option<S>,
}

impl<S: ModelSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub async fn prompt(
        &mut self,
        user_text: &str,
        schema: &Value,
    ) -> Result<String, ModelError> {
        match self.session.as_mut() {
            Some(session) => session.prompt(user_text, schema).await,
            None => Err(ModelError::Other("session already destroyed".into())),
        }
    }

    /// Destroy the session now rather than at end of scope.
    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(target: "redline::model", "destroying model session");
            session.destroy();
        }
    }
}

impl<S: ModelSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Runs proofreading requests against a model.
pub struct Proofreader<M> {
    model: M,
    config: ProofreadConfig,
    schema: Value,
}

impl<M: LanguageModel> Proofreader<M> {
    pub fn new(model: M, config: ProofreadConfig) -> Self {
        Self {
            model,
            schema: proofreading_schema(config.format),
            config,
        }
    }

    pub async fn availability(&self) -> Result<Availability, ModelError> {
        self.model.availability(&self.config.capabilities()).await
    }

    /// Proofread `text` in a fresh session.
    pub async fn proofread(&self, text: &str) -> Result<ProofreadResponse, ModelError> {
        let capabilities = self.config.capabilities();

        let availability = self.model.availability(&capabilities).await?;
        tracing::debug!(target: "redline::model", %availability, "model availability");
        if !availability.is_usable() {
            return Err(ModelError::Unavailable);
        }
        if availability.needs_download() {
            tracing::info!(target: "redline::model", "model download required");
        }

        let session = self
            .model
            .create_session(&self.config.system_prompt, &capabilities)
            .await?;
        let mut session = SessionGuard::new(session);

        tracing::debug!(
            target: "redline::model",
            chars = text.chars().count(),
            format = ?self.config.format,
            "prompting model"
        );
        let raw = session
            .prompt(&self.config.user_prompt(text), &self.schema)
            .await?;
        session.finish();

        tracing::trace!(target: "redline::model", raw = %raw, "raw model response");
        parse_response(&raw, self.config.format)
    }
}

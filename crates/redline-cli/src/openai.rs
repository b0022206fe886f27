//! Language model collaborator backed by an OpenAI-compatible HTTP API.
//!
//! Works against anything that serves `/models` and `/chat/completions` with
//! JSON-schema structured output (OpenAI, Ollama, llama.cpp server, vLLM).

use std::time::Duration;

use redline_core::model::{Availability, LanguageModel, ModelCapabilities, ModelSession};
use redline_core::ModelError;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// A model served over HTTP.
#[derive(Clone, Debug)]
pub struct OpenAiModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiModel {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Other(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }
}

impl LanguageModel for OpenAiModel {
    type Session = OpenAiSession;

    async fn availability(
        &self,
        _capabilities: &ModelCapabilities,
    ) -> Result<Availability, ModelError> {
        let request = authorize(self.client.get(self.url("models")), self.api_key.as_deref());
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => {
                tracing::warn!(target: "redline::openai", error = %e, "model endpoint unreachable");
                return Ok(Availability::Unavailable);
            }
            Err(e) => return Err(request_error(e)),
        };

        let status = response.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED) {
            tracing::warn!(target: "redline::openai", %status, "endpoint does not list models");
            return Ok(Availability::Unavailable);
        }
        let body = response.text().await.map_err(request_error)?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let list: ModelList = serde_json::from_str(&body)?;
        let installed = list.data.iter().any(|entry| entry.id == self.model);
        tracing::debug!(
            target: "redline::openai",
            model = %self.model,
            installed,
            "checked model list"
        );
        Ok(if installed {
            Availability::Available
        } else {
            Availability::Downloadable
        })
    }

    async fn create_session(
        &self,
        system_prompt: &str,
        capabilities: &ModelCapabilities,
    ) -> Result<OpenAiSession, ModelError> {
        if let Some(io) = capabilities
            .expected_inputs
            .iter()
            .chain(&capabilities.expected_outputs)
            .find(|io| io.kind != "text")
        {
            return Err(ModelError::NotSupported(format!("{} input/output", io.kind)));
        }

        // Chat completions are stateless, so a session is just the primed
        // system prompt plus a handle on the client.
        Ok(OpenAiSession {
            client: self.client.clone(),
            url: self.url("chat/completions"),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            system_prompt: system_prompt.to_string(),
        })
    }
}

/// One proofreading conversation.
#[derive(Debug)]
pub struct OpenAiSession {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    system_prompt: String,
}

impl ModelSession for OpenAiSession {
    async fn prompt(&mut self, user_text: &str, schema: &Value) -> Result<String, ModelError> {
        let body = request_body(&self.model, &self.system_prompt, user_text, schema);
        let response = authorize(self.client.post(&self.url), self.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(request_error)?;
        tracing::debug!(
            target: "redline::openai",
            %status,
            bytes = text.len(),
            "chat completion response"
        );

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let completion: ChatCompletion = serde_json::from_str(&text)?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::Other("completion has no message content".into()))
    }

    fn destroy(self) {
        tracing::trace!(target: "redline::openai", model = %self.model, "session closed");
    }
}

fn authorize(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

/// Chat completion request constrained to the proofreading schema.
fn request_body(model: &str, system_prompt: &str, user_text: &str, schema: &Value) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_text },
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": "proofreading",
                "strict": true,
                "schema": schema,
            },
        },
    })
}

fn request_error(e: reqwest::Error) -> ModelError {
    tracing::error!(target: "redline::openai", error = %e, "model request failed");
    if e.is_timeout() {
        ModelError::Timeout
    } else if e.is_connect() {
        ModelError::Network(e.to_string())
    } else {
        ModelError::Other(e.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> ModelError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|response| response.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    tracing::error!(target: "redline::openai", %status, %message, "model API error");

    match status {
        StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED => ModelError::NotSupported(message),
        StatusCode::UNAUTHORIZED => ModelError::Other(format!("invalid API key: {message}")),
        _ => ModelError::Other(format!("API error ({status}): {message}")),
    }
}

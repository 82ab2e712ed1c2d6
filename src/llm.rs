#![doc = "Chat-completion client for an OpenRouter-compatible endpoint."]
//
//! # LLM client
//!
//! [`OpenRouterClient`] implements [`ChatClient`] with one POST per call: fixed
//! model, bearer authorization, JSON in and out. The assistant text of the
//! first choice is returned with non-ASCII characters stripped.
//!
//! There is no retry and no backoff. A non-success status or a body that does
//! not contain `choices[0].message.content` is an error for the caller. The
//! client holds no mutable state, so one instance is shared by every
//! concurrent per-file task.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::contract::ChatClient;
use crate::load_config::ConfigError;
use crate::sanitize::strip_non_ascii;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to chat endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed chat response: {0}")]
    MalformedResponse(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenRouterClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenRouterClient {
    /// Fails with [`ConfigError::MissingApiKey`] when no credential was configured.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key().map_err(|e| {
            tracing::error!("Cannot build chat client without an API key");
            e
        })?;
        tracing::info!(endpoint = %config.endpoint, model = %config.model, "Initialized chat client");
        Ok(Self {
            http: Client::new(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn complete<'a>(&self, system: &'a str, prompt: &'a str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
        };
        tracing::debug!(endpoint = %self.endpoint, prompt_chars = prompt.len(), "Sending chat request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "http://localhost")
            .header("X-Title", "Code Explainer")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, endpoint = %self.endpoint, "Failed to reach chat endpoint");
                LlmError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = %status, endpoint = %self.endpoint, "Chat endpoint returned error. Response body: {body}");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content = parse_completion(&body)?;
        Ok(strip_non_ascii(&content))
    }
}

/// Extracts `choices[0].message.content` from a chat-completion body.
pub fn parse_completion(body: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = ?e, "Failed to parse chat response JSON");
        LlmError::MalformedResponse(e.to_string())
    })?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::MalformedResponse("response has no choices[0].message.content".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"id":"x","choices":[{"message":{"role":"assistant","content":"Prints hello."}},{"message":{"content":"second"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Prints hello.");
    }

    #[test]
    fn empty_choices_is_malformed() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[test]
    fn non_json_is_malformed() {
        let err = parse_completion("<html>gateway timeout</html>").unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[test]
    fn null_content_is_malformed() {
        let err = parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }
}

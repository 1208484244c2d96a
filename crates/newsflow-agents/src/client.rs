//! HTTP client for an OpenAI-compatible chat-completions endpoint.
//!
//! Wraps `reqwest` with typed request/response bodies and normalizes the
//! failure modes: non-2xx statuses become [`AgentError::Generation`] and
//! empty or shapeless responses become [`AgentError::MalformedOutput`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Client for the text-generation service.
///
/// Use [`GenerationClient::new`] for production or point `base_url` at a
/// mock server in tests.
pub struct GenerationClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl GenerationClient {
    /// Create a client for `base_url`.
    ///
    /// The overall request timeout is deliberately generous; callers apply
    /// their own per-capability timeout around `complete`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}/v1/chat/completions",
                base_url.trim_end_matches('/')
            ),
            api_key,
        })
    }

    /// Run one completion and return the assistant message text.
    ///
    /// # Errors
    ///
    /// - [`AgentError::Http`] on network failure.
    /// - [`AgentError::Generation`] on a non-2xx response.
    /// - [`AgentError::MalformedOutput`] if the response carries no usable
    ///   message content.
    pub async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String, AgentError> {
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.3,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AgentError::Generation {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::MalformedOutput(format!("unparseable response body: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(AgentError::MalformedOutput(
                "response contained no message content".to_string(),
            ));
        }

        Ok(content)
    }
}

/// Truncate to `max` characters on a char boundary.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}

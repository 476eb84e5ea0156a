use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{POLISH_PROMPT, PolishError, Polisher, clean_markup};
use crate::config::PolishConfig;

/// Polisher backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiPolisher {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
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
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiPolisher {
    pub fn new(config: &PolishConfig) -> Result<Self, PolishError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PolishError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            timeout,
        })
    }
}

#[async_trait]
impl Polisher for OpenAiPolisher {
    async fn polish(&self, raw_text: &str) -> Result<String, PolishError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: POLISH_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: raw_text,
                },
            ],
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PolishError::Timeout(self.timeout)
                } else {
                    PolishError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PolishError::Status { status, body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PolishError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .and_then(|content| clean_markup(&content))
            .ok_or(PolishError::EmptyResponse)
    }
}

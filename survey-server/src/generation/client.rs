//! Chat completion client

use super::GenerationError;
use crate::config::OpenAiSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Source of JSON-mode chat completions
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a system prompt and optional user message; returns the raw
    /// message content, expected to be a JSON object
    async fn complete_json(
        &self,
        system: &str,
        user: Option<&str>,
    ) -> Result<String, GenerationError>;

    /// Model name reported with generated surveys
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

/// OpenAI-compatible `/chat/completions` client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Build a client from resolved settings; fails without an API key
    pub fn from_settings(settings: &OpenAiSettings) -> Result<Self, GenerationError> {
        let key = settings
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;
        Self::new(key, settings.model.as_str(), settings.base_url.as_str())
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete_json(
        &self,
        system: &str,
        user: Option<&str>,
    ) -> Result<String, GenerationError> {
        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        }];
        if let Some(user) = user {
            messages.push(ChatMessage {
                role: "user".to_string(),
                content: user.to_string(),
            });
        }

        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!(model = %self.model, "Sending chat completion request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("OpenAI API error {}: {}", status, body);
            return Err(GenerationError::Api(status.as_u16(), body));
        }

        let completion: ChatResponse = response.json().await?;
        if let Some(usage) = &completion.usage {
            info!(
                "Token usage - prompt: {}, completion: {}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

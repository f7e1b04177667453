//! OpenAI-compatible chat endpoint
//!
//! Posts `{ "messages": [ {role, content}, ... ] }` to one fixed URL, usually a
//! small proxy worker in front of a chat-completions API. The reply text is read
//! from `choices[0].message.content`; older proxies answer with a top-level
//! `reply`, `routine` or `content` field instead.
//!
//! # Configuration
//!
//! ```toml
//! [chat]
//! endpoint = "https://my-worker.example.workers.dev/"
//! api_key_env = "OPENAI_API_KEY"   # optional
//! timeout_secs = 120
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::conversation::{Message, Role};

use super::{ChatError, ChatService};

/// Top-level fields used by legacy proxies, in lookup order
const LEGACY_REPLY_FIELDS: [&str; 3] = ["reply", "routine", "content"];

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: msg.content.clone(),
        }
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
}

/// Chat endpoint configuration
#[derive(Debug, Clone)]
pub struct ChatEndpointConfig {
    /// Full URL requests are posted to
    pub endpoint: String,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    /// Forwarded to the endpoint when present; proxies usually pick their own
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ChatEndpointConfig {
    #[cfg(test)]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: None,
            timeout_secs: 120,
        }
    }
}

pub struct HttpChatService {
    config: ChatEndpointConfig,
    client: Client,
}

impl HttpChatService {
    pub fn new(config: ChatEndpointConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { config, client }
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn complete(&self, messages: &[Message]) -> Result<Option<String>, ChatError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(ChatMessage::from).collect(),
        };

        let mut req_builder = self.client.post(&self.config.endpoint);

        if let Some(ref api_key) = self.config.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ChatError::RemoteServiceFailure(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            ChatError::RemoteServiceFailure(format!("Failed to parse response: {} - Body: {}", e, body))
        })?;

        Ok(extract_reply(&value))
    }
}

/// Pull the assistant text out of a response body. Empty text counts as absent.
pub fn extract_reply(body: &Value) -> Option<String> {
    let from_choices = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str);

    let text = from_choices.or_else(|| {
        LEGACY_REPLY_FIELDS
            .iter()
            .find_map(|field| body.get(*field).and_then(Value::as_str))
    })?;

    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

// src/placement/completion.rs

use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::CompletionConfig;

#[derive(Debug)]
pub enum CompletionError {
    Config(String),
    Request(String),
    Status(u16, String),
    Empty,
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Config(msg) => write!(f, "completion misconfigured: {}", msg),
            CompletionError::Request(msg) => write!(f, "completion request failed: {}", msg),
            CompletionError::Status(code, body) => {
                write!(f, "completion service returned {}: {}", code, body)
            }
            CompletionError::Empty => f.write_str("completion service returned no text"),
        }
    }
}

impl std::error::Error for CompletionError {}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Request(err.to_string())
    }
}

/// A pluggable `(prompt) -> text` capability. Callers must treat every
/// error as "unavailable" and fall back to local output.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompletion {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl OpenAiCompletion {
    pub fn new(config: &CompletionConfig, timeout: Duration) -> Result<Self, CompletionError> {
        // A base without a trailing slash would lose its last segment on join.
        let base = if config.api_url.ends_with('/') {
            config.api_url.clone()
        } else {
            format!("{}/", config.api_url)
        };
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join("chat/completions"))
            .map_err(|e| CompletionError::Config(e.to_string()))?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TextCompletion for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You write short, encouraging study plan text. Plain text only.",
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.4,
            max_tokens: 200,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status(status.as_u16(), body));
        }

        let payload: ChatResponse = response.json().await?;
        let text = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        clean_output(&text)
    }
}

/// Removes a surrounding markdown code fence, including its language tag.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop an info string such as ```text on the opening line.
    match inner.split_once('\n') {
        Some((info, body)) if !info.trim().contains(' ') => body.trim(),
        _ => inner.trim(),
    }
}

/// Strips fences and rejects blank output.
pub fn clean_output(raw: &str) -> Result<String, CompletionError> {
    let text = strip_code_fence(raw);
    if text.is_empty() {
        Err(CompletionError::Empty)
    } else {
        Ok(text.to_string())
    }
}

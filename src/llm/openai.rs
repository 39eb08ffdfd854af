//! OpenAI-compatible Chat Completions client.
//!
//! Works against any endpoint speaking the `/v1/chat/completions` shape
//! (OpenAI, OpenRouter, local servers). One attempt per call; a failed
//! completion is retried by the next polling cycle.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::CompletionBackend;
use crate::config::LlmConfig;
use crate::error::{AgentError, Result};

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u32,
}

impl ChatResponse {
    /// First choice's text, trimmed; `None` if absent or blank.
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OpenAiClient {
    http: Client,
    api_url: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    total_calls: AtomicU64,
    total_tokens: AtomicU64,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            total_calls: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
        })
    }

    fn build_request(&self, system: &str, user_message: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(system.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(user_message.to_string()),
                },
            ],
        }
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, system: &str, user_message: &str) -> Result<String> {
        let request = self.build_request(system, user_message);
        let endpoint = format!("POST {}", self.api_url);

        debug!(model = %self.model, "Requesting completion");

        let resp = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(AgentError::Transport {
                endpoint,
                status: status.as_u16(),
                body: text,
            });
        }

        let body: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| AgentError::malformed(endpoint, e.to_string()))?;

        self.total_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(usage) = &body.usage {
            self.total_tokens
                .fetch_add(u64::from(usage.total_tokens), Ordering::Relaxed);
        }

        body.into_text().ok_or(AgentError::EmptyCompletion)
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

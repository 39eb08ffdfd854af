//! LLM integration for comment replies.
//!
//! Defines the `CompletionBackend` trait and an OpenAI-compatible chat
//! completions client.

pub mod openai;

use async_trait::async_trait;

use crate::error::Result;

/// Abstraction over chat-style completion providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete `user_message` under the `system` instruction.
    ///
    /// Implementations return [`crate::error::AgentError::EmptyCompletion`]
    /// rather than an empty string.
    async fn complete(&self, system: &str, user_message: &str) -> Result<String>;

    /// Model identifier string.
    fn model_name(&self) -> String;
}

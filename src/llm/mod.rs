//! LLM completion collaborator.
//!
//! The engine treats the language model as an opaque function
//! `complete(prompt, temperature) -> text`. Prompt formatting happens in
//! [`crate::utilities::prompts`]; transport, model selection, and timeouts
//! belong to the [`CompletionProvider`] implementation.
//!
//! [`OpenAICompatibleClient`] is the bundled implementation: a chat-completions
//! client for any OpenAI-compatible endpoint (Groq by default).

pub mod openai_compatible;

use async_trait::async_trait;
use thiserror::Error;

pub use openai_compatible::OpenAICompatibleClient;

/// Errors raised by a completion provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured for the provider.
    #[error("LLM API key not set")]
    MissingApiKey,

    /// Transport-level failure (connect, timeout, body read).
    #[error("LLM request failed: {0}")]
    Request(String),

    /// The provider answered with an error status.
    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider answered with something that is not a completion.
    #[error("failed to parse LLM response: {0}")]
    InvalidResponse(String),

    /// All retries were spent on transient failures.
    #[error("LLM call failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// The external completion function.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt` at `temperature`, returning the model's text.
    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

//! Test doubles shared across module tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::llm::{CompletionProvider, LlmError};
use crate::utilities::prompts::{END_DELIMITER, START_DELIMITER};

/// Wrap a tool document in the synthesis delimiters.
pub fn tool_response(body: &str) -> String {
    format!("{}\n{}\n{}", START_DELIMITER, body, END_DELIMITER)
}

/// A completion provider that replays queued responses in order.
///
/// Once the queue is empty every call fails with `InvalidResponse`.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str, _temperature: f64) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        // Let concurrent callers interleave.
        tokio::task::yield_now().await;
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

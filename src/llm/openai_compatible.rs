//! Chat-completions client for OpenAI-compatible endpoints.
//!
//! Sends a single user message to `{api_base}/chat/completions` and returns
//! `choices[0].message.content`. Rate-limit (429) and server (5xx) responses
//! are retried with exponential back-off; client errors are returned as-is.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{CompletionProvider, LlmError};
use crate::config::EngineConfig;
use crate::utilities::formatter::truncate;

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct OpenAICompatibleClient {
    model: String,
    api_base: String,
    api_key: Option<String>,
    max_tokens: u32,
    max_retries: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAICompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAICompatibleClient")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl OpenAICompatibleClient {
    /// Build a client from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;
        Ok(Self {
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    fn build_request_body(&self, prompt: &str, temperature: f64) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": temperature,
            "max_tokens": self.max_tokens,
        })
    }

    /// Extract `choices[0].message.content` from a completion body.
    fn extract_text(response: &Value) -> Result<String, LlmError> {
        response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                LlmError::InvalidResponse(truncate(&response.to_string(), 500))
            })
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompatibleClient {
    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;
        let body = self.build_request_body(prompt, temperature);
        let endpoint = self.endpoint();

        log::debug!(
            "complete: model={}, prompt_chars={}, temperature={}",
            self.model,
            prompt.len(),
            temperature
        );

        let mut last_error = String::new();
        let mut retry_delay = Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!("LLM retry attempt {} after {:?}", attempt, retry_delay);
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let response = match self
                .client
                .post(&endpoint)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                last_error = format!("transient status {}", status);
                continue;
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    last_error = e.to_string();
                    continue;
                }
            };

            if !status.is_success() {
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let json: Value = serde_json::from_str(&text)
                .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
            return Self::extract_text(&json);
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAICompatibleClient {
        OpenAICompatibleClient::from_config(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = client().build_request_body("hello", 0.7);
        assert_eq!(body["model"], "llama3-8b-8192");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 2048);
    }

    #[test]
    fn test_extract_text() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Calculator" } }]
        });
        assert_eq!(
            OpenAICompatibleClient::extract_text(&response).unwrap(),
            "Calculator"
        );
        assert!(matches!(
            OpenAICompatibleClient::extract_text(&json!({"error": "x"})),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let mut config = EngineConfig::default();
        config.api_key = Some("sk-secret".to_string());
        let client = OpenAICompatibleClient::from_config(&config).unwrap();
        assert!(!format!("{:?}", client).contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let err = client().complete("hi", 0.0).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }
}

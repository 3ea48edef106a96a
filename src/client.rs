//! Chat client adapter for OpenAI-compatible endpoints.
//!
//! One network round trip per call, no retry here; the retry policy lives
//! in `extract`. Drivers talk to the `ChatApi` trait so tests can swap in
//! a scripted client.

use crate::config::{ApiConfig, SamplingParams};
use crate::error::ChatError;
use crate::types::ChatMessage;
use async_trait::async_trait;
use serde_json::json;

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send one chat completion request and return the text of the first
    /// choice.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: SamplingParams,
    ) -> Result<String, ChatError>;
}

/// Adapter over a hosted OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl OpenAiChatClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn request_body(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: SamplingParams,
    ) -> serde_json::Value {
        // Unsupported parameters are omitted entirely; some backends
        // reject requests carrying unknown keys.
        let params = params.filtered_for(model);

        let mut body = json!({
            "model": model,
            "messages": messages,
        });
        let obj = body.as_object_mut().expect("body is an object");
        if let Some(t) = params.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(p) = params.top_p {
            obj.insert("top_p".to_string(), json!(p));
        }
        if let Some(p) = params.presence_penalty {
            obj.insert("presence_penalty".to_string(), json!(p));
        }
        if let Some(p) = params.frequency_penalty {
            obj.insert("frequency_penalty".to_string(), json!(p));
        }
        body
    }
}

/// Rate limiting sometimes arrives as a 429 and sometimes only as a phrase
/// in the error body, so both are checked.
fn looks_rate_limited(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("rate") || m.contains("limit")
}

#[async_trait]
impl ChatApi for OpenAiChatClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: SamplingParams,
    ) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = self.request_body(model, messages, params);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Transport {
                rate_limited: looks_rate_limited(&e.to_string()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChatError::Transport {
                rate_limited: status.as_u16() == 429 || looks_rate_limited(&error_text),
                message: format!("HTTP {status}: {error_text}"),
            });
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|e| ChatError::Transport {
                rate_limited: false,
                message: format!("invalid response body: {e}"),
            })?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(content)
    }
}

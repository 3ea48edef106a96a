//! Structured-output extraction with bounded retries.
//!
//! Every LLM call that must yield machine-readable JSON goes through
//! [`extract_json`]: it strips markdown code fences, parses, and on any
//! recoverable failure retries with progressively more conservative
//! sampling parameters and a failure-specific backoff. After the retry
//! budget is spent the last failure is surfaced with the raw text kept
//! for diagnosis.

use crate::client::ChatApi;
use crate::config::SamplingParams;
use crate::error::ChatError;
use crate::types::ChatMessage;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Retry budget and sampling-parameter ramp for extraction calls.
///
/// `pause_unit` scales every backoff; production uses one second, tests
/// use `Duration::ZERO` so the retry loop runs without sleeping.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_temperature: f64,
    pub base_top_p: f64,
    pub pause_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_temperature: 0.7,
            base_top_p: 0.9,
            pause_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Later attempts raise temperature and lower top_p, nudging the model
    /// out of whatever produced the bad output.
    pub fn params_for_attempt(&self, attempt: u32) -> SamplingParams {
        let temperature = (self.base_temperature + 0.1 * attempt as f64).min(1.0);
        let top_p = (self.base_top_p - 0.05 * attempt as f64).max(0.5);
        SamplingParams {
            temperature: Some(temperature),
            top_p: Some(top_p),
            presence_penalty: None,
            frequency_penalty: None,
        }
    }

    fn backoff(&self, error: &ChatError, attempt: u32) -> Duration {
        let units = match error {
            ChatError::Transport {
                rate_limited: true, ..
            } => 5 + 2 * attempt,
            ChatError::Transport { .. } => 2 + attempt,
            ChatError::EmptyResponse => 2,
        };
        self.pause_unit * units
    }
}

/// Terminal extraction failure, tagged by what went wrong on the final
/// attempt.
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("transport failed after {attempts} attempts: {message}")]
    Transport {
        message: String,
        rate_limited: bool,
        attempts: u32,
    },
    #[error("model returned an empty response after {attempts} attempts")]
    Empty { attempts: u32 },
    #[error("response was not valid JSON after {attempts} attempts")]
    MalformedJson { attempts: u32, raw: String },
}

impl ExtractionFailure {
    /// Short stable label for failure accounting.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionFailure::Transport { .. } => "transport",
            ExtractionFailure::Empty { .. } => "empty_response",
            ExtractionFailure::MalformedJson { .. } => "json_parse",
        }
    }
}

/// A successfully extracted value plus how much retrying it took.
#[derive(Debug)]
pub struct Extracted<T> {
    pub value: T,
    pub retries: u32,
}

/// Remove a markdown code fence around a JSON payload. Looks for a
/// ```json fence first, then a plain one; an unterminated fence keeps
/// everything after the opener.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    for opener in ["```json", "```"] {
        if let Some(start) = text.find(opener) {
            let after = &text[start + opener.len()..];
            return match after.find("```") {
                Some(end) => after[..end].trim(),
                None => after.trim(),
            };
        }
    }
    text
}

/// Run one extraction call with up to `policy.max_retries` attempts.
pub async fn extract_json<T: DeserializeOwned>(
    client: &dyn ChatApi,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
    policy: &RetryPolicy,
) -> Result<Extracted<T>, ExtractionFailure> {
    let messages = vec![
        ChatMessage::System(system_prompt.to_string()),
        ChatMessage::User(user_prompt.to_string()),
    ];

    let mut last_raw = String::new();
    for attempt in 0..policy.max_retries {
        let params = policy.params_for_attempt(attempt);
        debug!(attempt, model, "extraction attempt");

        match client.complete(model, &messages, params).await {
            Ok(text) => {
                let stripped = strip_code_fence(&text);
                match serde_json::from_str::<T>(stripped) {
                    Ok(value) => {
                        if attempt > 0 {
                            debug!(retries = attempt, "extraction succeeded after retries");
                        }
                        return Ok(Extracted {
                            value,
                            retries: attempt,
                        });
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "response failed JSON parsing");
                        last_raw = stripped.to_string();
                        if attempt + 1 < policy.max_retries {
                            tokio::time::sleep(policy.pause_unit * 2).await;
                        }
                    }
                }
            }
            Err(error) => {
                warn!(attempt, %error, "chat call failed");
                if attempt + 1 < policy.max_retries {
                    tokio::time::sleep(policy.backoff(&error, attempt)).await;
                } else {
                    return Err(match error {
                        ChatError::Transport {
                            message,
                            rate_limited,
                        } => ExtractionFailure::Transport {
                            message,
                            rate_limited,
                            attempts: policy.max_retries,
                        },
                        ChatError::EmptyResponse => ExtractionFailure::Empty {
                            attempts: policy.max_retries,
                        },
                    });
                }
            }
        }
    }

    Err(ExtractionFailure::MalformedJson {
        attempts: policy.max_retries,
        raw: last_raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{Scripted, ScriptedChat};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        status: String,
    }

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            pause_unit: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn fence_stripping_variants() {
        assert_eq!(
            strip_code_fence("```json\n{\"a\": 1}\n```"),
            "{\"a\": 1}"
        );
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
        // Unterminated fence keeps the tail.
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(
            strip_code_fence("here you go:\n```json\n{}\n```\nhope that helps"),
            "{}"
        );
    }

    #[test]
    fn parameter_ramp_is_clamped() {
        let policy = RetryPolicy::default();
        let p0 = policy.params_for_attempt(0);
        assert_eq!(p0.temperature, Some(0.7));
        assert_eq!(p0.top_p, Some(0.9));

        let p2 = policy.params_for_attempt(2);
        assert!((p2.temperature.unwrap() - 0.9).abs() < 1e-9);
        assert!((p2.top_p.unwrap() - 0.8).abs() < 1e-9);

        let p9 = policy.params_for_attempt(9);
        assert_eq!(p9.temperature, Some(1.0));
        assert_eq!(p9.top_p, Some(0.5));
    }

    #[tokio::test]
    async fn recovers_after_two_malformed_responses() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Text("not json at all"),
            Scripted::Text("```json\nstill broken\n```"),
            Scripted::Text("{\"status\": \"ok\"}"),
        ]);

        let out: Extracted<Probe> =
            extract_json(&client, "gpt-4o", "sys", "user", &instant_policy())
                .await
                .unwrap();

        assert_eq!(out.value, Probe { status: "ok".into() });
        assert_eq!(out.retries, 2);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget_and_keeps_raw_text() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Text("garbage one"),
            Scripted::Text("garbage two"),
            Scripted::Text("garbage three"),
        ]);

        let err = extract_json::<Probe>(&client, "gpt-4o", "sys", "user", &instant_policy())
            .await
            .unwrap_err();

        match err {
            ExtractionFailure::MalformedJson { attempts, raw } => {
                assert_eq!(attempts, 3);
                assert_eq!(raw, "garbage three");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn rate_limit_is_retried_then_succeeds() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Transport { rate_limited: true },
            Scripted::Text("{\"status\": \"ok\"}"),
        ]);

        let out: Extracted<Probe> =
            extract_json(&client, "gpt-4o", "sys", "user", &instant_policy())
                .await
                .unwrap();
        assert_eq!(out.retries, 1);
    }

    #[tokio::test]
    async fn terminal_transport_failure_reports_attempts() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Transport { rate_limited: false },
            Scripted::Transport { rate_limited: false },
            Scripted::Transport { rate_limited: false },
        ]);

        let err = extract_json::<Probe>(&client, "gpt-4o", "sys", "user", &instant_policy())
            .await
            .unwrap_err();
        match err {
            ExtractionFailure::Transport {
                attempts,
                rate_limited,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(!rate_limited);
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_responses_become_terminal_empty() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Empty,
            Scripted::Empty,
            Scripted::Empty,
        ]);

        let err = extract_json::<Probe>(&client, "gpt-4o", "sys", "user", &instant_policy())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "empty_response");
    }

    #[tokio::test]
    async fn retry_params_ramp_is_passed_to_the_client() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Text("broken"),
            Scripted::Text("broken"),
            Scripted::Text("{\"status\": \"ok\"}"),
        ]);

        let _ = extract_json::<Probe>(&client, "gpt-4o", "sys", "user", &instant_policy())
            .await
            .unwrap();

        let seen = client.seen_params.lock().unwrap();
        assert_eq!(seen[0].temperature, Some(0.7));
        assert!((seen[1].temperature.unwrap() - 0.8).abs() < 1e-9);
        assert!((seen[2].top_p.unwrap() - 0.8).abs() < 1e-9);
    }
}

//! Environment-driven configuration and per-model parameter support.
//!
//! The supported-parameter table is deliberately hand-maintained
//! configuration data: which sampling knobs a hosted model accepts is an
//! upstream API fact that changes independently of this codebase. Models
//! not listed are assumed to accept only `temperature`.

use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://api.metisai.ir/openai/v1";
pub const DEFAULT_MODEL: &str = "gpt-5-mini";

pub const AVAILABLE_MODELS: &[&str] = &[
    "gpt-5",
    "gpt-5-mini",
    "gpt-5-nano",
    "gpt-4o",
    "grok-3",
    "gemini-2.5-pro-preview-06-05",
];

/// Default generation parameters for the role-play calls.
pub const TEMPERATURE: f64 = 1.0;
pub const TOP_P: f64 = 0.9;
pub const PRESENCE_PENALTY: f64 = 0.3;
pub const FREQUENCY_PENALTY: f64 = 0.4;

/// Persona attributes fixed by statistical sampling. The LLM completion
/// step must not alter these; `validate` diffs them post-hoc.
pub const BASE_PERSONA_FIELDS: &[&str] = &[
    "age",
    "gender",
    "marital_status",
    "children",
    "living_situation",
    "ethnicity",
    "language",
    "religion_and_sect",
];

/// API connection settings, read once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
}

impl ApiConfig {
    /// Load from the environment, honoring a `.env` file if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let api_key = env::var("METIS_API_KEY")
            .context("METIS_API_KEY is not set (add it to your environment or .env)")?;
        let base_url =
            env::var("METIS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let default_model =
            env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key,
            base_url,
            default_model,
        })
    }
}

/// Sampling parameters for one generation call. `None` means "do not send".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingParams {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
}

impl SamplingParams {
    /// Defaults used for persona role-play generation.
    pub fn roleplay_defaults() -> Self {
        Self {
            temperature: Some(TEMPERATURE),
            top_p: Some(TOP_P),
            presence_penalty: Some(PRESENCE_PENALTY),
            frequency_penalty: Some(FREQUENCY_PENALTY),
        }
    }

    /// Drop every parameter the given model does not support. Some backends
    /// reject unknown parameters outright, so unsupported knobs are omitted
    /// from the request instead of being sent with default values.
    pub fn filtered_for(self, model: &str) -> Self {
        let supported = supported_params(model);
        let keep = |name: &str, value: Option<f64>| {
            if supported.contains(&name) {
                value
            } else {
                None
            }
        };
        Self {
            temperature: keep("temperature", self.temperature),
            top_p: keep("top_p", self.top_p),
            presence_penalty: keep("presence_penalty", self.presence_penalty),
            frequency_penalty: keep("frequency_penalty", self.frequency_penalty),
        }
    }
}

/// Which sampling parameters a model accepts. Unlisted models get the
/// conservative temperature-only set.
pub fn supported_params(model: &str) -> &'static [&'static str] {
    const FULL: &[&str] = &[
        "temperature",
        "top_p",
        "presence_penalty",
        "frequency_penalty",
    ];
    const TEMPERATURE_ONLY: &[&str] = &["temperature"];

    match model {
        "gpt-5" | "gpt-4o" | "grok-3" | "gemini-2.5-pro-preview-06-05" => FULL,
        _ => TEMPERATURE_ONLY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_models_keep_all_params() {
        let params = SamplingParams::roleplay_defaults().filtered_for("gpt-4o");
        assert_eq!(params.temperature, Some(TEMPERATURE));
        assert_eq!(params.top_p, Some(TOP_P));
        assert_eq!(params.presence_penalty, Some(PRESENCE_PENALTY));
        assert_eq!(params.frequency_penalty, Some(FREQUENCY_PENALTY));
    }

    #[test]
    fn limited_models_keep_only_temperature() {
        let params = SamplingParams::roleplay_defaults().filtered_for("gpt-5-mini");
        assert_eq!(params.temperature, Some(TEMPERATURE));
        assert_eq!(params.top_p, None);
        assert_eq!(params.presence_penalty, None);
        assert_eq!(params.frequency_penalty, None);
    }

    #[test]
    fn unknown_models_default_to_temperature_only() {
        let params = SamplingParams::roleplay_defaults().filtered_for("some-new-model");
        assert_eq!(params.temperature, Some(TEMPERATURE));
        assert_eq!(params.top_p, None);
    }
}

//! Synthetic elder-interview pipeline.
//!
//! Builds Persian-language interview datasets about the spiritual health
//! of elderly Iranians, in three stages:
//!
//! 1. **Personas** - eight demographic fields are drawn from weighted
//!    distributions of the Iranian elderly population, then an LLM fills
//!    in the open-ended profile around them (`sampler`, `generator`).
//! 2. **Interviews** - each persona is interviewed in character by a
//!    role-playing model over a fixed Persian question catalog, one
//!    batch file per persona-model pair (`questions`, `interview`).
//! 3. **Analysis** - a second model scores every answer against a
//!    spiritual-health mind-map taxonomy, with bounded retries around
//!    structured-output extraction (`extract`, `analyzer`).
//!
//! # Quick start
//!
//! ```rust,ignore
//! use elder_interviews::{
//!     client::OpenAiChatClient, config::ApiConfig,
//!     generator::PersonaGenerator, interview::DatasetRunner,
//! };
//!
//! let client = OpenAiChatClient::new(ApiConfig::from_env()?);
//! let generator = PersonaGenerator::new(&client, "gpt-5-mini");
//! let personas = generator.generate_with_stats(10, &mut rng).await?;
//! ```
//!
//! The `validate` module checks that the LLM completion step never
//! changed the sampled demographics, and `repl` runs the same interview
//! interactively against a human on the terminal.

pub mod analyzer;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod generator;
pub mod interview;
pub mod io;
pub mod prompts;
pub mod questions;
pub mod repl;
pub mod sampler;
pub mod types;
pub mod validate;

pub use client::{ChatApi, OpenAiChatClient};
pub use config::{ApiConfig, SamplingParams};
pub use error::{ChatError, PipelineError};
pub use extract::{ExtractionFailure, RetryPolicy};
pub use types::{AnswerAnalysis, BasePersona, Interaction, Persona};

//! Failure taxonomy for the pipeline.
//!
//! Two tiers: `ChatError` covers what a single chat-completion round trip
//! can do wrong, and is absorbed by the retry loop in `extract`.
//! `PipelineError` covers programming/input defects that must propagate to
//! the caller immediately instead of being retried.

use thiserror::Error;

/// Errors from one chat-completion round trip.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP failure, timeout, or rate limiting from the upstream endpoint.
    #[error("transport failure: {message}")]
    Transport {
        message: String,
        /// Set when the provider signalled backpressure (HTTP 429 or a
        /// rate-limit phrase in the error body). Drives the longer backoff.
        rate_limited: bool,
    },

    /// The call succeeded but the first choice carried no usable text.
    #[error("provider returned no usable text")]
    EmptyResponse,
}

impl ChatError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            ChatError::Transport {
                rate_limited: true,
                ..
            }
        )
    }
}

/// Defects in our own input or wiring. Never retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A prompt template referenced a persona attribute that is absent.
    #[error("persona is missing field `{0}` referenced by the prompt template")]
    MissingField(String),

    /// The aggregate failure ceiling for a batch run was exceeded.
    #[error("too many errors ({count}), stopping the run")]
    TooManyErrors { count: u32 },
}

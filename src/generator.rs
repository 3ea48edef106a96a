//! LLM-backed persona generation.
//!
//! Two modes: fully generated personas, where the model invents
//! everything, and statistically grounded personas, where the eight base
//! fields are sampled first and the model only fills in the open-ended
//! profile around them.

use crate::client::ChatApi;
use crate::extract::{extract_json, RetryPolicy};
use crate::io::record_to_persona;
use crate::prompts::{constrained_persona_prompt, PERSONA_GENERATION_PROMPT};
use crate::sampler::sample_base_persona;
use crate::types::{BasePersona, Persona};
use anyhow::{bail, Context, Result};
use rand::Rng;
use serde_json::{Map, Value};
use tracing::{info, warn};

pub struct PersonaGenerator<'a> {
    client: &'a dyn ChatApi,
    model: String,
    policy: RetryPolicy,
}

impl<'a> PersonaGenerator<'a> {
    pub fn new(client: &'a dyn ChatApi, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Let the model invent `count` complete personas from scratch.
    pub async fn generate_full(&self, count: usize) -> Result<Vec<Persona>> {
        let user_prompt = format!(
            "Generate {count} personas now. Return only a JSON array of persona objects."
        );
        let extracted = extract_json::<Vec<Map<String, Value>>>(
            self.client,
            &self.model,
            PERSONA_GENERATION_PROMPT,
            &user_prompt,
            &self.policy,
        )
        .await
        .context("persona generation failed")?;

        let personas = self.normalize(extracted.value)?;
        info!(
            count = personas.len(),
            retries = extracted.retries,
            "generated personas"
        );
        Ok(personas)
    }

    /// Complete the given base records into full personas. The model must
    /// return exactly one persona per input, base fields unchanged.
    pub async fn complete_personas(&self, base: &[BasePersona]) -> Result<Vec<Persona>> {
        if base.is_empty() {
            return Ok(Vec::new());
        }
        let user_prompt = constrained_persona_prompt(base);
        let extracted = extract_json::<Vec<Map<String, Value>>>(
            self.client,
            &self.model,
            PERSONA_GENERATION_PROMPT,
            &user_prompt,
            &self.policy,
        )
        .await
        .context("persona completion failed")?;

        if extracted.value.len() != base.len() {
            bail!(
                "model returned {} personas for {} base records",
                extracted.value.len(),
                base.len()
            );
        }

        let personas = self.normalize(extracted.value)?;
        for (persona, expected) in personas.iter().zip(base) {
            if persona.base != *expected {
                // Drift here is caught properly by `validate`; flag it
                // early so batch runs are not silently skewed.
                warn!(persona_id = %persona.id, "completed persona drifted from its base fields");
            }
        }
        info!(
            count = personas.len(),
            retries = extracted.retries,
            "completed personas from sampled bases"
        );
        Ok(personas)
    }

    /// Sample `count` base records from the demographic distributions,
    /// then have the model fill in the rest.
    pub async fn generate_with_stats(
        &self,
        count: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<Persona>> {
        let base: Vec<BasePersona> = (0..count).map(|_| sample_base_persona(rng)).collect();
        self.complete_personas(&base).await
    }

    fn normalize(&self, records: Vec<Map<String, Value>>) -> Result<Vec<Persona>> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| record_to_persona(i, record))
            .collect()
    }
}

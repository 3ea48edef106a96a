//! Interview drivers.
//!
//! `InterviewRunner` holds one persona in character through a full pass
//! over the question catalog, carrying the running chat history so later
//! answers stay consistent with earlier ones. `DatasetRunner` sweeps the
//! persona-model grid and writes one batch file per pair.

use crate::client::ChatApi;
use crate::config::SamplingParams;
use crate::error::PipelineError;
use crate::io::{write_interactions, OutputFormat};
use crate::prompts::{format_answer_prompt, format_system_prompt};
use crate::types::{ChatMessage, Interaction, InterviewQuestion, Persona, QuestionType};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Errors tolerated across a dataset run before the whole sweep aborts.
const ERROR_CEILING: u32 = 10;

pub struct InterviewRunner<'a> {
    client: &'a dyn ChatApi,
    /// Pause between consecutive questions to one model.
    delay: Duration,
}

impl<'a> InterviewRunner<'a> {
    pub fn new(client: &'a dyn ChatApi, delay: Duration) -> Self {
        Self { client, delay }
    }

    /// One in-character answer. The system prompt pins the persona, the
    /// history keeps the character consistent, and no retry happens here:
    /// a role-play answer is free text, so there is nothing to re-parse.
    pub async fn generate_response(
        &self,
        persona: &Persona,
        question: &str,
        history: &[ChatMessage],
        model: &str,
    ) -> Result<String> {
        let system = format_system_prompt(persona)?;
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::System(system));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::User(format_answer_prompt(question)));

        let answer = self
            .client
            .complete(model, &messages, SamplingParams::roleplay_defaults())
            .await
            .with_context(|| format!("answer generation failed for persona {}", persona.id))?;
        Ok(answer)
    }

    /// Run one persona through the whole catalog with one model. History
    /// starts empty and accumulates across every question and follow-up.
    pub async fn run_interview(
        &self,
        persona: &Persona,
        questions: &[InterviewQuestion],
        model: &str,
    ) -> Result<Vec<Interaction>> {
        let mut history: Vec<ChatMessage> = Vec::new();
        let mut interactions = Vec::new();

        for question in questions {
            self.ask(
                persona,
                question,
                question.main_question,
                QuestionType::Main,
                model,
                &mut history,
                &mut interactions,
            )
            .await?;

            for follow_up in &question.follow_ups {
                self.ask(
                    persona,
                    question,
                    follow_up,
                    QuestionType::FollowUp,
                    model,
                    &mut history,
                    &mut interactions,
                )
                .await?;
            }
        }

        info!(
            persona_id = %persona.id,
            model,
            exchanges = interactions.len(),
            "interview complete"
        );
        Ok(interactions)
    }

    #[allow(clippy::too_many_arguments)]
    async fn ask(
        &self,
        persona: &Persona,
        question: &InterviewQuestion,
        text: &str,
        question_type: QuestionType,
        model: &str,
        history: &mut Vec<ChatMessage>,
        interactions: &mut Vec<Interaction>,
    ) -> Result<()> {
        let answer = self
            .generate_response(persona, text, history, model)
            .await?;

        history.push(ChatMessage::User(text.to_string()));
        history.push(ChatMessage::Assistant(answer.clone()));

        interactions.push(Interaction {
            id: Uuid::new_v4(),
            question_id: question.id.to_string(),
            question_type,
            subject: question.subject,
            question: text.to_string(),
            answer,
            model: model.to_string(),
            persona_id: persona.id.clone(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }
}

/// Sweeps personas x models, resetting history per pair and writing one
/// batch file per pair.
pub struct DatasetRunner<'a> {
    runner: InterviewRunner<'a>,
    personas: Vec<Persona>,
    models: Vec<String>,
    questions: Vec<InterviewQuestion>,
    output_dir: PathBuf,
    format: OutputFormat,
    /// Timestamp component of batch file names, fixed once per session.
    session_stamp: String,
}

impl<'a> DatasetRunner<'a> {
    pub fn new(
        client: &'a dyn ChatApi,
        personas: Vec<Persona>,
        models: Vec<String>,
        questions: Vec<InterviewQuestion>,
        output_dir: impl Into<PathBuf>,
        format: OutputFormat,
        delay: Duration,
    ) -> Self {
        Self {
            runner: InterviewRunner::new(client, delay),
            personas,
            models,
            questions,
            output_dir: output_dir.into(),
            format,
            session_stamp: chrono::Local::now().format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    fn batch_path(&self, model: &str, persona_id: &str) -> PathBuf {
        self.output_dir.join(format!(
            "synthetic_elder_fa_{}_{}_{}.{}",
            self.session_stamp,
            model,
            persona_id,
            self.format.extension()
        ))
    }

    /// Generate the full dataset. A failed persona-model pair is logged
    /// and skipped; more than `ERROR_CEILING` failures aborts the run.
    pub async fn generate(&self) -> Result<Vec<Interaction>> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("failed to create {}", self.output_dir.display()))?;

        let mut all = Vec::new();
        let mut error_count = 0u32;

        for persona in &self.personas {
            for model in &self.models {
                match self
                    .runner
                    .run_interview(persona, &self.questions, model)
                    .await
                {
                    Ok(interactions) => {
                        let path = self.batch_path(model, &persona.id);
                        write_interactions(&path, &interactions, self.format)?;
                        all.extend(interactions);
                    }
                    Err(e) => {
                        error_count += 1;
                        warn!(
                            persona_id = %persona.id,
                            model,
                            error = %e,
                            errors_so_far = error_count,
                            "interview failed, skipping pair"
                        );
                        if error_count > ERROR_CEILING {
                            error!("too many failed interviews, aborting the run");
                            return Err(PipelineError::TooManyErrors { count: error_count }.into());
                        }
                    }
                }
            }
        }

        info!(
            interactions = all.len(),
            personas = self.personas.len(),
            models = self.models.len(),
            "dataset generation complete"
        );
        Ok(all)
    }
}

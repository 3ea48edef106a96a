//! Second-pass analysis of interview answers.
//!
//! Each question-answer pair is sent to the analysis model together with
//! the mind-map taxonomy and subject list, and the structured verdict is
//! extracted through the retry loop. Failures never abort a session; the
//! pair is recorded as failed and the run continues.

use crate::client::ChatApi;
use crate::extract::{extract_json, RetryPolicy};
use crate::prompts::{analysis_system_prompt, analysis_user_prompt};
use crate::types::AnswerAnalysis;
use anyhow::{bail, Context, Result};
use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Counters accumulated over one analysis session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    pub total_questions: u32,
    pub successful_analyses: u32,
    pub failed_analyses: u32,
    pub retry_attempts: u32,
    pub errors_by_type: BTreeMap<String, u32>,
}

/// One analyzed question-answer pair.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedExchange {
    pub question_number: u32,
    pub question: String,
    pub answer: String,
    pub analysis: Option<AnswerAnalysis>,
}

/// Everything written to the per-interview results file.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResults {
    pub interview_id: String,
    pub timestamp: String,
    pub total_questions: u32,
    pub analyses: Vec<AnalyzedExchange>,
    pub processing_stats: AnalysisStats,
}

pub struct InterviewAnalyzer<'a> {
    client: &'a dyn ChatApi,
    model: String,
    mindmap: Value,
    subjects: Value,
    policy: RetryPolicy,
    /// Pause between consecutive pairs.
    delay: Duration,
    output_dir: PathBuf,
    stats: AnalysisStats,
}

impl<'a> InterviewAnalyzer<'a> {
    pub fn new(
        client: &'a dyn ChatApi,
        model: impl Into<String>,
        mindmap: Value,
        subjects: Value,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            mindmap,
            subjects,
            policy: RetryPolicy::default(),
            delay: Duration::from_secs(1),
            output_dir: output_dir.into(),
            stats: AnalysisStats::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    /// Analyze one answer. A terminal extraction failure is absorbed into
    /// the session stats and returns `None`.
    pub async fn analyze_answer(&mut self, question: &str, answer: &str) -> Option<AnswerAnalysis> {
        self.stats.total_questions += 1;
        let user_prompt = analysis_user_prompt(question, answer, &self.mindmap, &self.subjects);

        match extract_json::<AnswerAnalysis>(
            self.client,
            &self.model,
            analysis_system_prompt(),
            &user_prompt,
            &self.policy,
        )
        .await
        {
            Ok(extracted) => {
                self.stats.successful_analyses += 1;
                self.stats.retry_attempts += extracted.retries;
                Some(extracted.value)
            }
            Err(failure) => {
                self.stats.failed_analyses += 1;
                *self
                    .stats
                    .errors_by_type
                    .entry(failure.kind().to_string())
                    .or_insert(0) += 1;
                warn!(%failure, "analysis failed for one answer");
                None
            }
        }
    }

    /// Analyze a full interview transcript and write the results file.
    pub async fn process_interview(
        &mut self,
        questions: &[String],
        answers: &[String],
        interview_id: Option<String>,
    ) -> Result<SessionResults> {
        if questions.len() != answers.len() {
            bail!(
                "transcript has {} questions but {} answers",
                questions.len(),
                answers.len()
            );
        }

        let interview_id = interview_id
            .unwrap_or_else(|| format!("interview_{}", Local::now().format("%Y%m%d_%H%M%S")));

        let mut analyses = Vec::with_capacity(questions.len());
        for (i, (question, answer)) in questions.iter().zip(answers).enumerate() {
            let analysis = self.analyze_answer(question, answer).await;
            analyses.push(AnalyzedExchange {
                question_number: i as u32 + 1,
                question: question.clone(),
                answer: answer.clone(),
                analysis,
            });
            if !self.delay.is_zero() && i + 1 < questions.len() {
                tokio::time::sleep(self.delay).await;
            }
        }

        self.finalize_session(interview_id, analyses)
    }

    /// Assemble and persist the results file for exchanges that were
    /// already analyzed one by one.
    pub fn finalize_session(
        &self,
        interview_id: String,
        analyses: Vec<AnalyzedExchange>,
    ) -> Result<SessionResults> {
        let results = SessionResults {
            interview_id: interview_id.clone(),
            timestamp: Local::now().to_rfc3339(),
            total_questions: analyses.len() as u32,
            analyses,
            processing_stats: self.stats.clone(),
        };

        self.save_results(&results)
            .with_context(|| format!("failed to save analysis for {interview_id}"))?;

        info!(
            interview_id,
            successful = self.stats.successful_analyses,
            failed = self.stats.failed_analyses,
            retries = self.stats.retry_attempts,
            "analysis session complete"
        );
        Ok(results)
    }

    fn results_path(&self, interview_id: &str) -> PathBuf {
        self.output_dir
            .join(format!("{interview_id}_analysis.json"))
    }

    fn save_results(&self, results: &SessionResults) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("failed to create {}", self.output_dir.display()))?;
        let path = self.results_path(&results.interview_id);
        std::fs::write(&path, serde_json::to_string_pretty(results)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote analysis results");
        Ok(())
    }
}

/// Reload a saved interview batch and analyze every answer in it.
pub async fn analyze_batch_file(
    analyzer: &mut InterviewAnalyzer<'_>,
    batch_path: &Path,
) -> Result<SessionResults> {
    let interactions = crate::io::load_raw_records(batch_path)?;
    let mut questions = Vec::with_capacity(interactions.len());
    let mut answers = Vec::with_capacity(interactions.len());
    for record in &interactions {
        let question = record
            .get("question")
            .and_then(Value::as_str)
            .context("interaction record has no question")?;
        let answer = record
            .get("answer")
            .and_then(Value::as_str)
            .context("interaction record has no answer")?;
        questions.push(question.to_string());
        answers.push(answer.to_string());
    }

    let stem = batch_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("batch")
        .to_string();
    analyzer
        .process_interview(&questions, &answers, Some(stem))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{Scripted, ScriptedChat};
    use serde_json::json;

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            pause_unit: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    fn analyzer<'a>(
        client: &'a ScriptedChat,
        dir: &Path,
    ) -> InterviewAnalyzer<'a> {
        InterviewAnalyzer::new(
            client,
            "gpt-4o",
            json!({"root": "سلامت معنوی"}),
            json!(["loss_of_income"]),
            dir,
        )
        .with_policy(instant_policy())
        .with_delay(Duration::ZERO)
    }

    const GOOD_ANALYSIS: &str = r#"```json
{
    "healthy": [{
        "aspect": "belief",
        "subject": "توکل",
        "based_on_answer": "خدا را شکر می کنم",
        "reasoning": "نگرش مثبت"
    }],
    "unhealthy": []
}
```"#;

    #[tokio::test]
    async fn session_file_carries_analyses_and_stats() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Text(GOOD_ANALYSIS),
            Scripted::Text("not json"),
            Scripted::Text("not json"),
            Scripted::Text("not json"),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = analyzer(&client, dir.path());

        let questions = vec!["سوال اول؟".to_string(), "سوال دوم؟".to_string()];
        let answers = vec!["جواب اول".to_string(), "جواب دوم".to_string()];
        let results = analyzer
            .process_interview(&questions, &answers, Some("test_run".to_string()))
            .await
            .unwrap();

        assert_eq!(results.total_questions, 2);
        assert!(results.analyses[0].analysis.is_some());
        assert!(results.analyses[1].analysis.is_none());

        let stats = &results.processing_stats;
        assert_eq!(stats.successful_analyses, 1);
        assert_eq!(stats.failed_analyses, 1);
        assert_eq!(stats.errors_by_type["json_parse"], 1);

        let saved = std::fs::read_to_string(dir.path().join("test_run_analysis.json")).unwrap();
        let saved: Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(saved["interview_id"], "test_run");
        assert_eq!(saved["analyses"][0]["analysis"]["healthy"][0]["aspect"], "belief");
    }

    #[tokio::test]
    async fn retry_attempts_accumulate_in_stats() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Text("broken"),
            Scripted::Text(GOOD_ANALYSIS),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = analyzer(&client, dir.path());

        let analysis = analyzer.analyze_answer("سوال؟", "جواب").await;
        assert!(analysis.is_some());
        assert_eq!(analyzer.stats().retry_attempts, 1);
    }

    #[tokio::test]
    async fn mismatched_transcript_is_rejected() {
        let client = ScriptedChat::from_script(vec![]);
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = analyzer(&client, dir.path());

        let err = analyzer
            .process_interview(&["q".to_string()], &[], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 questions but 0 answers"));
    }

    #[tokio::test]
    async fn batch_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("synthetic_elder_fa_x_gpt-4o_p1.jsonl");
        std::fs::write(
            &batch,
            r#"{"question": "سوال؟", "answer": "جواب"}"#.to_string() + "\n",
        )
        .unwrap();

        let client = ScriptedChat::from_script(vec![Scripted::Text(GOOD_ANALYSIS)]);
        let mut analyzer = analyzer(&client, dir.path());

        let results = analyze_batch_file(&mut analyzer, &batch).await.unwrap();
        assert_eq!(results.interview_id, "synthetic_elder_fa_x_gpt-4o_p1");
        assert_eq!(results.processing_stats.successful_analyses, 1);
    }
}

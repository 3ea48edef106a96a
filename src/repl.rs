//! Interactive interview session on the terminal.
//!
//! A small explicit state machine drives the conversation: greet, ask the
//! next question, collect the answer, analyze it, repeat. The human being
//! interviewed answers in Persian; each answer goes through the same
//! analysis pass as the batch pipeline, and the whole session lands in
//! one results file at the end.

use crate::analyzer::{AnalyzedExchange, InterviewAnalyzer, SessionResults};
use crate::questions::question_catalog;
use anyhow::Result;
use chrono::Local;
use std::io::{BufRead, Write};
use tracing::debug;

/// Words that end the session from the answer prompt.
const EXIT_TOKENS: &[&str] = &["exit", "quit", "خروج"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplState {
    Greet,
    AskQuestion,
    GetAnswer,
    AnalyzeAnswer,
    Finish,
}

pub struct InterviewRepl<'a> {
    analyzer: InterviewAnalyzer<'a>,
    questions: Vec<String>,
}

impl<'a> InterviewRepl<'a> {
    /// A session over the main catalog questions.
    pub fn new(analyzer: InterviewAnalyzer<'a>) -> Self {
        let questions = question_catalog()
            .into_iter()
            .map(|q| q.main_question.to_string())
            .collect();
        Self { analyzer, questions }
    }

    pub fn with_questions(analyzer: InterviewAnalyzer<'a>, questions: Vec<String>) -> Self {
        Self { analyzer, questions }
    }

    /// Run on stdin/stdout.
    pub async fn run(&mut self) -> Result<Option<SessionResults>> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.run_with_io(stdin.lock(), stdout.lock()).await
    }

    /// Run against explicit streams.
    pub async fn run_with_io<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut out: W,
    ) -> Result<Option<SessionResults>> {
        let mut state = ReplState::Greet;
        let mut index = 0usize;
        let mut pending_answer = String::new();
        let mut exchanges: Vec<AnalyzedExchange> = Vec::new();

        loop {
            debug!(?state, index, "repl transition");
            state = match state {
                ReplState::Greet => {
                    writeln!(out, "سلام! به مصاحبه سلامت معنوی سالمندان خوش آمدید.")?;
                    writeln!(
                        out,
                        "برای پایان دادن به مصاحبه در هر زمان «خروج» را بنویسید.\n"
                    )?;
                    ReplState::AskQuestion
                }
                ReplState::AskQuestion => {
                    if index >= self.questions.len() {
                        ReplState::Finish
                    } else {
                        writeln!(
                            out,
                            "سوال {} از {}: {}",
                            index + 1,
                            self.questions.len(),
                            self.questions[index]
                        )?;
                        ReplState::GetAnswer
                    }
                }
                ReplState::GetAnswer => {
                    write!(out, "> ")?;
                    out.flush()?;
                    let mut line = String::new();
                    if input.read_line(&mut line)? == 0 {
                        ReplState::Finish
                    } else {
                        let answer = line.trim();
                        if EXIT_TOKENS.contains(&answer.to_lowercase().as_str()) {
                            ReplState::Finish
                        } else if answer.is_empty() {
                            ReplState::GetAnswer
                        } else {
                            pending_answer = answer.to_string();
                            ReplState::AnalyzeAnswer
                        }
                    }
                }
                ReplState::AnalyzeAnswer => {
                    let question = self.questions[index].clone();
                    let analysis = self
                        .analyzer
                        .analyze_answer(&question, &pending_answer)
                        .await;
                    if analysis.is_none() {
                        writeln!(
                            out,
                            "متاسفانه تحلیل این پاسخ ممکن نشد؛ به سوال بعدی می رویم."
                        )?;
                    }
                    exchanges.push(AnalyzedExchange {
                        question_number: index as u32 + 1,
                        question,
                        answer: std::mem::take(&mut pending_answer),
                        analysis,
                    });
                    index += 1;
                    writeln!(out)?;
                    ReplState::AskQuestion
                }
                ReplState::Finish => {
                    writeln!(out, "مصاحبه به پایان رسید. از شرکت شما سپاسگزاریم.")?;
                    if exchanges.is_empty() {
                        return Ok(None);
                    }
                    let interview_id =
                        format!("interview_{}", Local::now().format("%Y%m%d_%H%M%S"));
                    let results = self.analyzer.finalize_session(interview_id, exchanges)?;
                    writeln!(
                        out,
                        "نتایج در فایل {}_analysis.json ذخیره شد.",
                        results.interview_id
                    )?;
                    return Ok(Some(results));
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{Scripted, ScriptedChat};
    use crate::extract::RetryPolicy;
    use serde_json::json;
    use std::io::Cursor;
    use std::time::Duration;

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            pause_unit: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    fn analyzer<'a>(client: &'a ScriptedChat, dir: &std::path::Path) -> InterviewAnalyzer<'a> {
        InterviewAnalyzer::new(client, "gpt-4o", json!({}), json!([]), dir)
            .with_policy(instant_policy())
            .with_delay(Duration::ZERO)
    }

    const GOOD_ANALYSIS: &str = r#"{"healthy": [], "unhealthy": []}"#;

    #[tokio::test]
    async fn answers_flow_through_analysis_and_land_in_the_session() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Text(GOOD_ANALYSIS),
            Scripted::Text(GOOD_ANALYSIS),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let mut repl = InterviewRepl::with_questions(
            analyzer(&client, dir.path()),
            vec!["سوال اول؟".to_string(), "سوال دوم؟".to_string()],
        );

        let input = Cursor::new("جواب اول\nجواب دوم\n");
        let mut output = Vec::new();
        let results = repl.run_with_io(input, &mut output).await.unwrap().unwrap();

        assert_eq!(results.analyses.len(), 2);
        assert!(results.analyses.iter().all(|a| a.analysis.is_some()));
        assert!(dir
            .path()
            .join(format!("{}_analysis.json", results.interview_id))
            .exists());
    }

    #[tokio::test]
    async fn persian_exit_token_ends_the_session_early() {
        let client = ScriptedChat::from_script(vec![Scripted::Text(GOOD_ANALYSIS)]);
        let dir = tempfile::tempdir().unwrap();
        let mut repl = InterviewRepl::with_questions(
            analyzer(&client, dir.path()),
            vec!["سوال اول؟".to_string(), "سوال دوم؟".to_string()],
        );

        let input = Cursor::new("جواب اول\nخروج\n");
        let mut output = Vec::new();
        let results = repl.run_with_io(input, &mut output).await.unwrap().unwrap();

        // Only the first question was answered.
        assert_eq!(results.analyses.len(), 1);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn quitting_before_any_answer_saves_nothing() {
        let client = ScriptedChat::from_script(vec![]);
        let dir = tempfile::tempdir().unwrap();
        let mut repl = InterviewRepl::with_questions(
            analyzer(&client, dir.path()),
            vec!["سوال اول؟".to_string()],
        );

        let input = Cursor::new("quit\n");
        let mut output = Vec::new();
        let results = repl.run_with_io(input, &mut output).await.unwrap();

        assert!(results.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_analysis_warns_in_persian_and_continues() {
        let client = ScriptedChat::from_script(vec![
            Scripted::Text("not json"),
            Scripted::Text("not json"),
            Scripted::Text("not json"),
            Scripted::Text(GOOD_ANALYSIS),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let mut repl = InterviewRepl::with_questions(
            analyzer(&client, dir.path()),
            vec!["سوال اول؟".to_string(), "سوال دوم؟".to_string()],
        );

        let input = Cursor::new("جواب اول\nجواب دوم\n");
        let mut output = Vec::new();
        let results = repl.run_with_io(input, &mut output).await.unwrap().unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("تحلیل این پاسخ ممکن نشد"));
        assert!(results.analyses[0].analysis.is_none());
        assert!(results.analyses[1].analysis.is_some());
    }
}

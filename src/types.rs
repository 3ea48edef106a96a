//! Core types for the elder-interview pipeline.
//!
//! Wire strings match the original dataset files exactly ("Female",
//! "2-3", "Shia Muslim", ...) so records round-trip against existing data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One chat message. Serializes to the OpenAI-compatible
/// `{"role": ..., "content": ...}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant(String),
}

impl ChatMessage {
    pub fn content(&self) -> &str {
        match self {
            ChatMessage::System(s) | ChatMessage::User(s) | ChatMessage::Assistant(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaritalStatus {
    Married,
    Single,
    Divorced,
    Widowed,
}

/// Categorical band for number of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildrenBand {
    None,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2-3")]
    TwoToThree,
    #[serde(rename = "4+")]
    FourPlus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivingSituation {
    #[serde(rename = "Living with Family")]
    WithFamily,
    #[serde(rename = "Living Alone")]
    Alone,
    #[serde(rename = "Shared Housing")]
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ethnicity {
    Persian,
    Azeri,
    Kurdish,
    Lur,
    Baloch,
    Arab,
    Turkmen,
    Gilaki,
    Mazandarani,
    Qashqai,
}

impl Ethnicity {
    /// Mother tongue typically matches ethnicity; this lookup is
    /// deterministic, not sampled.
    pub fn language(&self) -> &'static str {
        match self {
            Ethnicity::Persian => "Persian",
            Ethnicity::Azeri => "Azeri",
            Ethnicity::Kurdish => "Kurdish",
            Ethnicity::Lur => "Luri",
            Ethnicity::Baloch => "Balochi",
            Ethnicity::Arab => "Arabic",
            Ethnicity::Turkmen => "Turkmen",
            Ethnicity::Gilaki => "Gilaki",
            Ethnicity::Mazandarani => "Mazandarani",
            Ethnicity::Qashqai => "Qashqai",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Religion {
    #[serde(rename = "Shia Muslim")]
    ShiaMuslim,
    #[serde(rename = "Sunni Muslim")]
    SunniMuslim,
    Zoroastrian,
    Christian,
    Jewish,
}

/// The eight demographic fields fixed by statistical sampling.
///
/// These are the "base fields": once sampled they are immutable, and the
/// LLM completion step must return them unchanged (checked by `validate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasePersona {
    pub age: u32,
    pub gender: Gender,
    pub marital_status: MaritalStatus,
    pub children: ChildrenBand,
    pub living_situation: LivingSituation,
    pub ethnicity: Ethnicity,
    pub language: String,
    pub religion_and_sect: Religion,
}

/// A full persona: sampled base fields plus the open-ended profile
/// attributes the LLM fills in (personality traits, background, the nine
/// spiritual-health stances, and so on). Profile attributes stay a flat
/// map because their set is owned by the prompt, not by this code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    #[serde(flatten)]
    pub base: BasePersona,
    #[serde(flatten)]
    pub profile: BTreeMap<String, serde_json::Value>,
}

impl Persona {
    /// Flatten every attribute (base and profile) into one string map for
    /// prompt templating. List values are comma-joined, matching the CSV
    /// encoding of the dataset files.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("id".to_string(), self.id.clone());

        let base = serde_json::to_value(&self.base).expect("base persona serializes");
        if let serde_json::Value::Object(fields) = base {
            for (k, v) in fields {
                map.insert(k, value_to_text(&v));
            }
        }
        for (k, v) in &self.profile {
            map.insert(k.clone(), value_to_text(v));
        }
        map
    }
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// The closed set of spiritual-health interview subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    LossOfIndependence,
    LossOfSocialActivity,
    PhysicalHealthAndSexualIssues,
    LossOfCloseOnesAndFearOfDeath,
    LossOfFamilyConnections,
    LifestyleChanges,
    LossOfIncome,
    LossOfAspiration,
    LifeIntegrity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// The open warm-up question that starts every interview.
    Starter,
    Main,
}

/// One entry of the static question catalog.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewQuestion {
    pub id: &'static str,
    pub kind: QuestionKind,
    pub subject: Option<Subject>,
    pub main_question: &'static str,
    pub follow_ups: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Main,
    FollowUp,
}

/// One question-answer exchange with its metadata: the unit of output in
/// the interview dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub question_id: String,
    pub question_type: QuestionType,
    pub subject: Option<Subject>,
    pub question: String,
    pub answer: String,
    pub model: String,
    pub persona_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorAspect {
    Emotion,
    Belief,
    Behavior,
}

/// A single psychological indicator the analysis model identified in an
/// answer. `subject` names a node of the mind-map taxonomy; it stays free
/// text because the taxonomy file is an opaque input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthIndicator {
    pub aspect: IndicatorAspect,
    pub subject: String,
    pub based_on_answer: String,
    pub reasoning: String,
}

/// Analysis result for one question-answer pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerAnalysis {
    #[serde(default)]
    pub healthy: Vec<HealthIndicator>,
    #[serde(default)]
    pub unhealthy: Vec<HealthIndicator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_assessment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

//! File I/O for personas, interaction batches, and knowledge files.
//!
//! Personas load from JSON arrays, JSONL, or CSV; interaction batches
//! write as JSONL or CSV. The CSV handling is deliberately small: quoted
//! fields with doubled quotes, comma-joined lists, nothing more, which is
//! exactly what the dataset files use.

use crate::config::BASE_PERSONA_FIELDS;
use crate::types::{Interaction, Persona};
use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Profile fields that hold lists. CSV flattens them to comma-joined
/// strings, so they get re-split on load.
const LIST_FIELDS: &[&str] = &[
    "personality_traits",
    "moral_traits",
    "internalized_moral_traits",
    "personal_experiences",
    "historical_events",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "jsonl" => Ok(OutputFormat::Jsonl),
            other => bail!("unknown output format `{other}` (expected csv or jsonl)"),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

/// Load raw persona records without interpreting them, keyed by field
/// name. CSV values all arrive as strings; JSON keeps its types. The
/// validator works on these so it can diff files with arbitrary columns.
pub fn load_raw_records(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let records = match ext.as_str() {
        "csv" => parse_csv(&text)?
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect()
            })
            .collect(),
        "jsonl" => {
            let mut records = Vec::new();
            for (n, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let value: Value = serde_json::from_str(line)
                    .with_context(|| format!("{}:{} is not valid JSON", path.display(), n + 1))?;
                records.push(as_object(value)?);
            }
            records
        }
        _ => {
            let value: Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", path.display()))?;
            match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(as_object)
                    .collect::<Result<Vec<_>>>()?,
                single @ Value::Object(_) => vec![as_object(single)?],
                _ => bail!("{} does not contain persona records", path.display()),
            }
        }
    };

    Ok(records)
}

fn as_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {other}"),
    }
}

/// Load personas from JSON, JSONL, or CSV.
pub fn load_personas(path: &Path) -> Result<Vec<Persona>> {
    let records = load_raw_records(path)?;
    let personas = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| record_to_persona(i, record))
        .collect::<Result<Vec<_>>>()?;
    info!(count = personas.len(), path = %path.display(), "loaded personas");
    Ok(personas)
}

/// Normalize one raw record into a typed persona: numeric ids become
/// strings, missing ids get a positional one, CSV ages parse to numbers,
/// and comma-joined list fields are re-split.
pub(crate) fn record_to_persona(index: usize, mut record: Map<String, Value>) -> Result<Persona> {
    let id = match record.remove("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("persona_{}", index + 1),
    };
    record.insert("id".to_string(), Value::String(id.clone()));

    if let Some(Value::String(age)) = record.get("age") {
        let parsed: u64 = age
            .trim()
            .parse()
            .with_context(|| format!("persona {id} has a non-numeric age `{age}`"))?;
        record.insert("age".to_string(), Value::Number(parsed.into()));
    }

    for field in LIST_FIELDS {
        if let Some(Value::String(joined)) = record.get(*field) {
            let items: Vec<Value> = joined
                .split(',')
                .map(|part| Value::String(part.trim().to_string()))
                .filter(|v| v.as_str().map(|s| !s.is_empty()).unwrap_or(true))
                .collect();
            record.insert(field.to_string(), Value::Array(items));
        }
    }

    serde_json::from_value(Value::Object(record))
        .with_context(|| format!("persona {id} has invalid base fields"))
}

pub fn save_personas_json(path: &Path, personas: &[Persona]) -> Result<()> {
    let json = serde_json::to_string_pretty(personas)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!(count = personas.len(), path = %path.display(), "saved personas");
    Ok(())
}

pub fn save_personas_csv(path: &Path, personas: &[Persona]) -> Result<()> {
    // Base fields first in their canonical order, then whatever profile
    // attributes showed up, alphabetically.
    let mut columns: Vec<String> = vec!["id".to_string()];
    columns.extend(BASE_PERSONA_FIELDS.iter().map(|f| f.to_string()));
    let mut extra: BTreeSet<String> = BTreeSet::new();
    for persona in personas {
        for key in persona.profile.keys() {
            if !columns.iter().any(|c| c == key) {
                extra.insert(key.clone());
            }
        }
    }
    columns.extend(extra);

    let mut out = String::new();
    out.push_str(&csv_row(&columns.iter().map(String::as_str).collect::<Vec<_>>()));
    for persona in personas {
        let attrs = persona.attributes();
        let fields: Vec<&str> = columns
            .iter()
            .map(|c| attrs.get(c).map(String::as_str).unwrap_or(""))
            .collect();
        out.push_str(&csv_row(&fields));
    }

    fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))?;
    info!(count = personas.len(), path = %path.display(), "saved personas");
    Ok(())
}

const INTERACTION_COLUMNS: &[&str] = &[
    "id",
    "persona_id",
    "model",
    "question_id",
    "question_type",
    "subject",
    "question",
    "answer",
];

/// Write one interaction batch in the requested format.
pub fn write_interactions(
    path: &Path,
    interactions: &[Interaction],
    format: OutputFormat,
) -> Result<()> {
    let text = match format {
        OutputFormat::Jsonl => {
            let mut out = String::new();
            for interaction in interactions {
                out.push_str(&serde_json::to_string(interaction)?);
                out.push('\n');
            }
            out
        }
        OutputFormat::Csv => {
            let mut out = csv_row(INTERACTION_COLUMNS);
            for i in interactions {
                let id = i.id.to_string();
                let question_type = wire_string(&i.question_type)?;
                let subject = match &i.subject {
                    Some(s) => wire_string(s)?,
                    None => String::new(),
                };
                out.push_str(&csv_row(&[
                    &id,
                    &i.persona_id,
                    &i.model,
                    &i.question_id,
                    &question_type,
                    &subject,
                    &i.question,
                    &i.answer,
                ]));
            }
            out
        }
    };

    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    info!(count = interactions.len(), path = %path.display(), "wrote interaction batch");
    Ok(())
}

/// Serialize an enum to its wire string without the surrounding quotes.
fn wire_string<T: serde::Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// Load an opaque JSON knowledge file (mind map, subject list).
pub fn load_json_value(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_row(fields: &[&str]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_escape(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

/// Minimal CSV reader: quoted fields, doubled quotes, LF or CRLF rows.
fn parse_csv(text: &str) -> Result<Vec<std::collections::BTreeMap<String, String>>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => row.push(std::mem::take(&mut field)),
                '\r' => {}
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    let mut iter = rows.into_iter();
    let header = match iter.next() {
        Some(h) => h,
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::new();
    for (n, row) in iter.enumerate() {
        if row.len() != header.len() {
            bail!(
                "CSV row {} has {} fields, header has {}",
                n + 2,
                row.len(),
                header.len()
            );
        }
        records.push(header.iter().cloned().zip(row).collect());
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QuestionType, Subject};
    use uuid::Uuid;

    fn persona_json() -> &'static str {
        r#"[{
            "id": 3,
            "age": 72,
            "gender": "Female",
            "marital_status": "Widowed",
            "children": "2-3",
            "living_situation": "Living Alone",
            "ethnicity": "Persian",
            "language": "Persian",
            "religion_and_sect": "Shia Muslim",
            "occupation": "معلم بازنشسته"
        }]"#
    }

    #[test]
    fn numeric_ids_become_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("personas.json");
        fs::write(&path, persona_json()).unwrap();

        let personas = load_personas(&path).unwrap();
        assert_eq!(personas[0].id, "3");
        assert_eq!(personas[0].base.age, 72);
    }

    #[test]
    fn jsonl_personas_load_line_by_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("personas.jsonl");
        let record = r#"{"age": 68, "gender": "Male", "marital_status": "Married", "children": "4+", "living_situation": "Living with Family", "ethnicity": "Azeri", "language": "Azeri", "religion_and_sect": "Shia Muslim"}"#;
        fs::write(&path, format!("{record}\n{record}\n")).unwrap();

        let personas = load_personas(&path).unwrap();
        assert_eq!(personas.len(), 2);
        // No id in the file, so positional ids are assigned.
        assert_eq!(personas[0].id, "persona_1");
        assert_eq!(personas[1].id, "persona_2");
    }

    #[test]
    fn csv_personas_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("personas.csv");

        let json_path = dir.path().join("personas.json");
        fs::write(&json_path, persona_json()).unwrap();
        let personas = load_personas(&json_path).unwrap();

        save_personas_csv(&path, &personas).unwrap();
        let reloaded = load_personas(&path).unwrap();

        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].id, "3");
        assert_eq!(reloaded[0].base.age, 72);
        assert_eq!(
            reloaded[0].profile["occupation"],
            Value::String("معلم بازنشسته".to_string())
        );
    }

    #[test]
    fn csv_list_fields_are_resplit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("personas.csv");
        fs::write(
            &path,
            "id,age,gender,marital_status,children,living_situation,ethnicity,language,religion_and_sect,personality_traits\n\
             p1,80,Male,Married,4+,Living with Family,Kurdish,Kurdish,Sunni Muslim,\"صبور, مهربان\"\n",
        )
        .unwrap();

        let personas = load_personas(&path).unwrap();
        let traits = personas[0].profile["personality_traits"].as_array().unwrap();
        assert_eq!(traits.len(), 2);
        assert_eq!(traits[0], "صبور");
    }

    #[test]
    fn interaction_batch_writes_jsonl_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let interaction = Interaction {
            id: Uuid::new_v4(),
            question_id: "q1".to_string(),
            question_type: QuestionType::Main,
            subject: Some(Subject::LossOfIncome),
            question: "سوال؟".to_string(),
            answer: "جواب, با ویرگول".to_string(),
            model: "gpt-4o".to_string(),
            persona_id: "p1".to_string(),
        };

        let jsonl = dir.path().join("batch.jsonl");
        write_interactions(&jsonl, &[interaction.clone()], OutputFormat::Jsonl).unwrap();
        let text = fs::read_to_string(&jsonl).unwrap();
        assert_eq!(text.lines().count(), 1);
        let parsed: Interaction = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.question_id, "q1");

        let csv = dir.path().join("batch.csv");
        write_interactions(&csv, &[interaction], OutputFormat::Csv).unwrap();
        let text = fs::read_to_string(&csv).unwrap();
        assert!(text.starts_with("id,persona_id,model,"));
        assert!(text.contains("loss_of_income"));
        // The comma in the answer forces quoting.
        assert!(text.contains("\"جواب, با ویرگول\""));
    }

    #[test]
    fn csv_parser_handles_quotes_and_crlf() {
        let records =
            parse_csv("a,b\r\n\"x,y\",\"he said \"\"hi\"\"\"\r\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["a"], "x,y");
        assert_eq!(records[0]["b"], "he said \"hi\"");
    }
}

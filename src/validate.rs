//! Base-field preservation check.
//!
//! The persona completion step must copy the sampled demographic fields
//! through unchanged. This module diffs a base persona file against the
//! completed one, field by field, and reports every drift.

use crate::config::BASE_PERSONA_FIELDS;
use crate::io::load_raw_records;
use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

/// One field that differs between the base and completed record.
#[derive(Debug, Clone, Serialize)]
pub struct FieldMismatch {
    pub persona_index: usize,
    pub persona_id: String,
    pub field: String,
    pub base_value: String,
    pub final_value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub total_personas: usize,
    pub fields_checked: Vec<String>,
    pub total_comparisons: usize,
    pub total_mismatches: usize,
    pub perfect_personas: usize,
    pub mismatches: Vec<FieldMismatch>,
}

impl ValidationSummary {
    pub fn passed(&self) -> bool {
        self.total_mismatches == 0
    }

    pub fn match_percentage(&self) -> f64 {
        if self.total_comparisons == 0 {
            return 100.0;
        }
        100.0 * (self.total_comparisons - self.total_mismatches) as f64
            / self.total_comparisons as f64
    }
}

/// Values compare as trimmed strings so a CSV base file diffs cleanly
/// against a JSON output file.
fn normalize(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

fn record_id(index: usize, record: &Map<String, Value>) -> String {
    match record.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("persona_{}", index + 1),
    }
}

/// Compare two record lists pairwise over the base fields present in both.
pub fn compare_records(
    base: &[Map<String, Value>],
    completed: &[Map<String, Value>],
) -> Result<ValidationSummary> {
    if base.len() != completed.len() {
        bail!(
            "base file has {} personas, completed file has {}",
            base.len(),
            completed.len()
        );
    }

    let fields_checked: Vec<String> = BASE_PERSONA_FIELDS
        .iter()
        .filter(|f| {
            base.iter().any(|r| r.contains_key(**f))
                && completed.iter().any(|r| r.contains_key(**f))
        })
        .map(|f| f.to_string())
        .collect();

    let mut mismatches = Vec::new();
    let mut perfect_personas = 0;

    for (index, (base_record, final_record)) in base.iter().zip(completed).enumerate() {
        let before = mismatches.len();
        for field in &fields_checked {
            let base_value = normalize(base_record.get(field));
            let final_value = normalize(final_record.get(field));
            if base_value != final_value {
                mismatches.push(FieldMismatch {
                    persona_index: index,
                    persona_id: record_id(index, final_record),
                    field: field.clone(),
                    base_value,
                    final_value,
                });
            }
        }
        if mismatches.len() == before {
            perfect_personas += 1;
        }
    }

    Ok(ValidationSummary {
        total_personas: base.len(),
        total_comparisons: base.len() * fields_checked.len(),
        total_mismatches: mismatches.len(),
        perfect_personas,
        fields_checked,
        mismatches,
    })
}

/// Validate a completed persona file against its base file.
pub fn validate_files(base_path: &Path, final_path: &Path) -> Result<ValidationSummary> {
    let base = load_raw_records(base_path)?;
    let completed = load_raw_records(final_path)?;
    let summary = compare_records(&base, &completed)?;

    if summary.passed() {
        info!(
            personas = summary.total_personas,
            fields = summary.fields_checked.len(),
            "all base fields preserved"
        );
    } else {
        for m in &summary.mismatches {
            warn!(
                persona = %m.persona_id,
                field = %m.field,
                base = %m.base_value,
                r#final = %m.final_value,
                "base field changed"
            );
        }
        warn!(
            mismatches = summary.total_mismatches,
            match_percentage = format!("{:.1}", summary.match_percentage()),
            "validation failed"
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(age: u64) -> Map<String, Value> {
        json!({
            "id": "p1",
            "age": age,
            "gender": "Female",
            "marital_status": "Widowed",
            "children": "2-3",
            "living_situation": "Living Alone",
            "ethnicity": "Persian",
            "language": "Persian",
            "religion_and_sect": "Shia Muslim"
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn identical_records_pass() {
        let summary = compare_records(&[record(72)], &[record(72)]).unwrap();
        assert!(summary.passed());
        assert_eq!(summary.perfect_personas, 1);
        assert_eq!(summary.match_percentage(), 100.0);
    }

    #[test]
    fn altered_age_is_exactly_one_mismatch() {
        let summary = compare_records(&[record(72)], &[record(73)]).unwrap();
        assert!(!summary.passed());
        assert_eq!(summary.total_mismatches, 1);
        assert_eq!(summary.mismatches[0].field, "age");
        assert_eq!(summary.mismatches[0].base_value, "72");
        assert_eq!(summary.mismatches[0].final_value, "73");
        assert_eq!(summary.perfect_personas, 0);
    }

    #[test]
    fn string_and_number_ages_compare_equal() {
        let mut base = record(72);
        base.insert("age".to_string(), json!("72"));
        let summary = compare_records(&[base], &[record(72)]).unwrap();
        assert!(summary.passed());
    }

    #[test]
    fn extra_profile_fields_are_ignored() {
        let mut completed = record(72);
        completed.insert("occupation".to_string(), json!("کشاورز"));
        let summary = compare_records(&[record(72)], &[completed]).unwrap();
        assert!(summary.passed());
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = compare_records(&[record(72)], &[]).unwrap_err();
        assert!(err.to_string().contains("1 personas"));
    }

    #[test]
    fn file_level_validation_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("base.json");
        let final_path = dir.path().join("final.json");

        std::fs::write(&base_path, json!([record(80)]).to_string()).unwrap();
        let mut completed = record(80);
        completed.insert("ethnicity".to_string(), json!("Azeri"));
        std::fs::write(&final_path, json!([completed]).to_string()).unwrap();

        let summary = validate_files(&base_path, &final_path).unwrap();
        assert_eq!(summary.total_mismatches, 1);
        assert_eq!(summary.mismatches[0].field, "ethnicity");
    }
}

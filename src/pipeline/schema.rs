//! Schema validation: raw sanitised text → typed [`ExtractionPayload`].
//!
//! Two distinct failure kinds come out of this stage, on purpose:
//!
//! * [`GradeScanError::MalformedResponse`] — the text does not decode as JSON
//!   at all. The model produced prose or broken output; re-photographing the
//!   card is the likely fix.
//! * [`GradeScanError::SchemaInvalid`] — valid JSON, wrong shape. The model
//!   answered but not in the contracted format.
//!
//! Everything downstream of this module works against the typed payload; no
//! code indexes into an untyped map after validation succeeds.

use crate::error::GradeScanError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The validated extraction payload, mirroring the wire contract promised in
/// [`crate::prompts::EXTRACTION_PROMPT`].
///
/// Field types are deliberately loose where the model is unreliable:
/// `semester` arrives as string, number, or null, and per-subject `credits`
/// may be any JSON number. The normaliser owns coercion and defaulting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionPayload {
    pub student_info: StudentInfo,
    pub subjects: Vec<RawSubject>,
    /// Validated for presence only; the engine recomputes SGPA/CGPA itself
    /// rather than trusting the model's figures.
    pub semester_summary: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
    /// String, number, or null on the wire.
    #[serde(default)]
    pub semester: Option<Value>,
}

/// One subject row exactly as extracted, before normalisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSubject {
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub credits: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
    /// Ignored numerically; kept so the full wire row round-trips.
    #[serde(default)]
    pub grade_points: Option<Value>,
}

/// Parse sanitised text into a validated [`ExtractionPayload`].
pub fn parse_extraction(clean: &str) -> Result<ExtractionPayload, GradeScanError> {
    let value: Value =
        serde_json::from_str(clean).map_err(|e| GradeScanError::MalformedResponse {
            detail: e.to_string(),
        })?;

    validate_shape(&value)?;

    serde_json::from_value(value).map_err(|e| GradeScanError::SchemaInvalid {
        reason: format!("payload did not deserialize: {e}"),
    })
}

/// Confirm the decoded JSON has the required extraction shape.
///
/// Checks, in order: the three top-level keys exist, `subjects` is a
/// non-empty array, every subject carries the four required fields, and
/// `credits` is numeric. No partial recovery is attempted.
pub fn validate_shape(value: &Value) -> Result<(), GradeScanError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("top level is not a JSON object"))?;

    for key in ["student_info", "subjects", "semester_summary"] {
        if !obj.contains_key(key) {
            return Err(invalid(&format!("missing required key '{key}'")));
        }
    }

    let subjects = obj["subjects"]
        .as_array()
        .ok_or_else(|| invalid("'subjects' is not an array"))?;
    if subjects.is_empty() {
        return Err(invalid("'subjects' is empty"));
    }

    for (i, subject) in subjects.iter().enumerate() {
        let s = subject
            .as_object()
            .ok_or_else(|| invalid(&format!("subjects[{i}] is not an object")))?;
        for key in ["subject_code", "subject_name", "credits", "grade"] {
            if !s.contains_key(key) {
                return Err(invalid(&format!("subjects[{i}] missing '{key}'")));
            }
        }
        if !s["credits"].is_number() {
            return Err(invalid(&format!("subjects[{i}].credits is not numeric")));
        }
    }

    Ok(())
}

fn invalid(reason: &str) -> GradeScanError {
    GradeScanError::SchemaInvalid {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> String {
        r#"{
            "student_info": {"name": "A. Student", "registration_number": "RA191100301", "semester": "3"},
            "subjects": [
                {"subject_code": "CSE201", "subject_name": "Data Structures", "credits": 4, "grade": "A+", "grade_points": 9.0},
                {"subject_code": "CSE202", "subject_name": "Algorithms", "credits": 3, "grade": "A", "grade_points": 8.0}
            ],
            "semester_summary": {"total_credits": 7, "sgpa": 8.57, "cgpa": 8.57}
        }"#
        .to_string()
    }

    #[test]
    fn parses_valid_payload() {
        let payload = parse_extraction(&valid_payload()).unwrap();
        assert_eq!(payload.subjects.len(), 2);
        assert_eq!(payload.subjects[0].subject_code.as_deref(), Some("CSE201"));
        assert_eq!(payload.subjects[0].credits, Some(4.0));
        assert_eq!(
            payload.student_info.semester,
            Some(serde_json::json!("3"))
        );
    }

    #[test]
    fn non_json_is_malformed_not_schema_error() {
        let err = parse_extraction("not json at all").unwrap_err();
        assert!(matches!(err, GradeScanError::MalformedResponse { .. }));
    }

    #[test]
    fn missing_subjects_key_is_schema_error() {
        let raw = r#"{"student_info": {}, "semester_summary": {}}"#;
        let err = parse_extraction(raw).unwrap_err();
        match err {
            GradeScanError::SchemaInvalid { reason } => {
                assert!(reason.contains("subjects"), "got: {reason}")
            }
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
    }

    #[test]
    fn empty_subjects_list_rejected() {
        let raw = r#"{"student_info": {}, "subjects": [], "semester_summary": {}}"#;
        assert!(matches!(
            parse_extraction(raw),
            Err(GradeScanError::SchemaInvalid { .. })
        ));
    }

    #[test]
    fn subject_missing_grade_rejected() {
        let raw = r#"{
            "student_info": {},
            "subjects": [{"subject_code": "CSE201", "subject_name": "DS", "credits": 4}],
            "semester_summary": {}
        }"#;
        let err = parse_extraction(raw).unwrap_err();
        match err {
            GradeScanError::SchemaInvalid { reason } => {
                assert!(reason.contains("grade"), "got: {reason}")
            }
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
    }

    #[test]
    fn string_credits_rejected() {
        let raw = r#"{
            "student_info": {},
            "subjects": [{"subject_code": "CSE201", "subject_name": "DS", "credits": "four", "grade": "A"}],
            "semester_summary": {}
        }"#;
        assert!(matches!(
            parse_extraction(raw),
            Err(GradeScanError::SchemaInvalid { .. })
        ));
    }

    #[test]
    fn null_student_fields_tolerated() {
        let raw = r#"{
            "student_info": {"name": null, "registration_number": null, "semester": null},
            "subjects": [{"subject_code": "C", "subject_name": "N", "credits": 3, "grade": "B", "grade_points": null}],
            "semester_summary": {"total_credits": 3, "sgpa": 6.0, "cgpa": 6.0}
        }"#;
        let payload = parse_extraction(raw).unwrap();
        assert!(payload.student_info.name.is_none());
        assert!(matches!(
            payload.student_info.semester,
            None | Some(Value::Null)
        ));
    }

    #[test]
    fn top_level_array_rejected() {
        let err = parse_extraction("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, GradeScanError::SchemaInvalid { .. }));
    }
}

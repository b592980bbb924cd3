//! Grade normalisation: per-subject cleanup, defaults, and point lookup.
//!
//! Everything here is pure — no I/O, no store access — so every skip rule and
//! default is testable in isolation. Duplicate detection needs the database
//! and therefore lives in [`crate::ingest`], which calls these functions
//! per subject before staging.
//!
//! Subject-level problems never become errors: a subject that cannot be
//! cleaned is skipped with a `warn!` and shows up only in the outcome counts.

use crate::pipeline::schema::{RawSubject, StudentInfo};
use crate::scale::GradeScale;
use serde_json::Value;
use tracing::{debug, warn};

/// Bounds for a plausible semester number.
pub const SEMESTER_RANGE: std::ops::RangeInclusive<i64> = 1..=12;
/// Bounds for plausible course credits.
pub const CREDITS_RANGE: std::ops::RangeInclusive<i64> = 1..=6;

/// A subject that survived normalisation and is ready to stage.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSubject {
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub letter_grade: String,
    pub grade_points: f64,
}

/// Resolve the semester number from extracted student info.
///
/// Missing or non-numeric values default to 1. An out-of-range value is
/// logged (with the rejected input, before the reset) and reset to 1.
pub fn resolve_semester(info: &StudentInfo) -> i64 {
    let parsed = match &info.semester {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(semester) if SEMESTER_RANGE.contains(&semester) => semester,
        Some(out_of_range) => {
            warn!(
                "extracted semester {} outside {:?}, resetting to 1",
                out_of_range, SEMESTER_RANGE
            );
            1
        }
        None => {
            debug!("no usable semester in student_info, defaulting to 1");
            1
        }
    }
}

/// Clean one extracted subject, or decide to skip it.
///
/// Skip rules (each logged, never an error):
/// * `subject_code` or `subject_name` empty after trimming
/// * grade missing, empty after trimming, or the literal `"NONE"`
///
/// Recoverable defaults (not skips):
/// * credits missing, non-finite, or outside [1, 6] → `default_credits`
/// * unknown letter grade → 0.0 points via [`GradeScale`]
pub fn normalize_subject(
    raw: &RawSubject,
    scale: &GradeScale,
    default_credits: i64,
) -> Option<NormalizedSubject> {
    let course_code = raw.subject_code.as_deref().unwrap_or("").trim().to_string();
    let course_name = raw.subject_name.as_deref().unwrap_or("").trim().to_string();
    if course_code.is_empty() || course_name.is_empty() {
        warn!("skipping subject with missing code/name: {raw:?}");
        return None;
    }

    let letter_grade = raw
        .grade
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_uppercase();
    if letter_grade.is_empty() || letter_grade == "NONE" {
        warn!(
            "skipping subject {} with unusable grade: {:?}",
            course_code, raw.grade
        );
        return None;
    }

    let credits = coerce_credits(raw.credits, default_credits, &course_code);
    let grade_points = scale.points(&letter_grade);

    Some(NormalizedSubject {
        course_code,
        course_name,
        credits,
        letter_grade,
        grade_points,
    })
}

fn coerce_credits(raw: Option<f64>, default_credits: i64, course_code: &str) -> i64 {
    let coerced = match raw {
        Some(c) if c.is_finite() => c as i64,
        _ => {
            warn!("missing credits for {course_code}, defaulting to {default_credits}");
            return default_credits;
        }
    };
    if CREDITS_RANGE.contains(&coerced) {
        coerced
    } else {
        warn!(
            "credits {} for {} outside {:?}, defaulting to {}",
            coerced, course_code, CREDITS_RANGE, default_credits
        );
        default_credits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(semester: Value) -> StudentInfo {
        StudentInfo {
            name: None,
            registration_number: None,
            semester: Some(semester),
        }
    }

    fn subject(code: &str, name: &str, credits: Option<f64>, grade: Option<&str>) -> RawSubject {
        RawSubject {
            subject_code: Some(code.to_string()),
            subject_name: Some(name.to_string()),
            credits,
            grade: grade.map(str::to_string),
            grade_points: None,
        }
    }

    // ── resolve_semester ────────────────────────────────────────────────

    #[test]
    fn semester_from_string() {
        assert_eq!(resolve_semester(&info(json!("3"))), 3);
        assert_eq!(resolve_semester(&info(json!(" 7 "))), 7);
    }

    #[test]
    fn semester_from_number() {
        assert_eq!(resolve_semester(&info(json!(5))), 5);
        assert_eq!(resolve_semester(&info(json!(5.0))), 5);
    }

    #[test]
    fn missing_semester_defaults_to_one() {
        let no_semester = StudentInfo {
            name: None,
            registration_number: None,
            semester: None,
        };
        assert_eq!(resolve_semester(&no_semester), 1);
        assert_eq!(resolve_semester(&info(Value::Null)), 1);
        assert_eq!(resolve_semester(&info(json!("spring"))), 1);
    }

    #[test]
    fn out_of_range_semester_resets_to_one() {
        assert_eq!(resolve_semester(&info(json!(0))), 1);
        assert_eq!(resolve_semester(&info(json!(15))), 1);
        assert_eq!(resolve_semester(&info(json!("-2"))), 1);
        // boundaries stay put
        assert_eq!(resolve_semester(&info(json!(1))), 1);
        assert_eq!(resolve_semester(&info(json!(12))), 12);
    }

    // ── normalize_subject ───────────────────────────────────────────────

    #[test]
    fn clean_subject_normalises() {
        let scale = GradeScale::default();
        let raw = subject("  CSE201 ", " Data Structures ", Some(4.0), Some("a+"));
        let n = normalize_subject(&raw, &scale, 3).unwrap();
        assert_eq!(n.course_code, "CSE201");
        assert_eq!(n.course_name, "Data Structures");
        assert_eq!(n.credits, 4);
        assert_eq!(n.letter_grade, "A+");
        assert_eq!(n.grade_points, 9.0);
    }

    #[test]
    fn empty_code_or_name_is_skipped() {
        let scale = GradeScale::default();
        assert!(normalize_subject(&subject("  ", "DS", Some(4.0), Some("A")), &scale, 3).is_none());
        assert!(normalize_subject(&subject("CSE201", "", Some(4.0), Some("A")), &scale, 3).is_none());
        let missing_code = RawSubject {
            subject_code: None,
            subject_name: Some("DS".into()),
            credits: Some(4.0),
            grade: Some("A".into()),
            grade_points: None,
        };
        assert!(normalize_subject(&missing_code, &scale, 3).is_none());
    }

    #[test]
    fn unusable_grade_is_skipped() {
        let scale = GradeScale::default();
        assert!(normalize_subject(&subject("C1", "N", Some(3.0), Some("")), &scale, 3).is_none());
        assert!(normalize_subject(&subject("C1", "N", Some(3.0), Some("none")), &scale, 3).is_none());
        assert!(normalize_subject(&subject("C1", "N", Some(3.0), Some("NONE")), &scale, 3).is_none());
        assert!(normalize_subject(&subject("C1", "N", Some(3.0), None), &scale, 3).is_none());
    }

    #[test]
    fn boundary_credits_default_to_three() {
        let scale = GradeScale::default();
        let zero = normalize_subject(&subject("C1", "N", Some(0.0), Some("A")), &scale, 3).unwrap();
        assert_eq!(zero.credits, 3);
        let nine = normalize_subject(&subject("C1", "N", Some(9.0), Some("A")), &scale, 3).unwrap();
        assert_eq!(nine.credits, 3);
        let missing = normalize_subject(&subject("C1", "N", None, Some("A")), &scale, 3).unwrap();
        assert_eq!(missing.credits, 3);
        // in-range values are kept, including boundaries
        let one = normalize_subject(&subject("C1", "N", Some(1.0), Some("A")), &scale, 3).unwrap();
        assert_eq!(one.credits, 1);
        let six = normalize_subject(&subject("C1", "N", Some(6.0), Some("A")), &scale, 3).unwrap();
        assert_eq!(six.credits, 6);
    }

    #[test]
    fn unknown_grade_maps_to_zero_points() {
        let scale = GradeScale::default();
        let n = normalize_subject(&subject("C1", "N", Some(3.0), Some("Z")), &scale, 3).unwrap();
        assert_eq!(n.grade_points, 0.0);
        assert_eq!(n.letter_grade, "Z");
    }

    #[test]
    fn injected_scale_is_respected() {
        let four_point = GradeScale::new([("A", 4.0), ("B", 3.0)]);
        let n =
            normalize_subject(&subject("C1", "N", Some(3.0), Some("A")), &four_point, 3).unwrap();
        assert_eq!(n.grade_points, 4.0);
    }
}

//! The extraction prompt: the schema contract with the vision model.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the JSON shape promised to the model is
//!    exactly the shape [`crate::pipeline::schema`] validates; changing either
//!    means editing two adjacent files, not hunting through call sites.
//!
//! 2. **Testability** — unit tests can inspect the prompt directly without a
//!    live provider, so schema drift between prompt and validator is caught
//!    in CI.
//!
//! Callers can override it via [`crate::config::IngestConfig::prompt`]; the
//! constant here is used only when no override is provided.

/// Default instruction sent with every result-card image.
///
/// Requires a single JSON object with exactly three top-level keys:
/// `student_info`, `subjects`, `semester_summary`.
pub const EXTRACTION_PROMPT: &str = r#"You are a data extraction expert. Analyze this grade/result card image and extract ONLY a valid JSON object with this exact structure:

{
    "student_info": {
        "name": "student name or null",
        "registration_number": "reg number or null",
        "semester": "semester number or null"
    },
    "subjects": [
        {
            "subject_code": "course code",
            "subject_name": "full course name",
            "credits": 3,
            "grade": "A+",
            "grade_points": 9.0
        }
    ],
    "semester_summary": {
        "total_credits": 20,
        "sgpa": 8.5,
        "cgpa": 8.2
    }
}

CRITICAL INSTRUCTIONS:
1. Return ONLY the JSON object, no explanations or markdown
2. Use null for missing information
3. Calculate grade_points: O=10, A+=9, A=8, B+=7, B=6, C=5, D=4, F=0
4. Ensure all numbers are numeric (not strings)
5. Start your response with { and end with }"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_required_key() {
        for key in [
            "student_info",
            "subjects",
            "semester_summary",
            "subject_code",
            "subject_name",
            "credits",
            "grade",
            "grade_points",
        ] {
            assert!(EXTRACTION_PROMPT.contains(key), "missing key: {key}");
        }
    }

    #[test]
    fn prompt_demands_bare_json() {
        assert!(EXTRACTION_PROMPT.contains("ONLY the JSON object"));
    }
}

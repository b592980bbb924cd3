//! Output types: ingestion outcomes and derived academic summaries.
//!
//! Everything here is serialisable so an HTTP layer can relay these shapes
//! verbatim; presentation concerns (greetings, motivational copy) belong to
//! that layer, not this crate.

use serde::{Deserialize, Serialize};

/// Terminal status of one ingestion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Transaction opened, subjects not yet staged.
    Processing,
    /// At least one grade row committed.
    Completed,
    /// Every presented subject was skipped (duplicate or invalid); the upload
    /// record still commits with this status as an audit trail.
    AllDuplicates,
}

impl UploadStatus {
    /// Stable string form used in the database `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::AllDuplicates => "all_duplicates",
        }
    }
}

/// One course result as echoed back to the caller after ingestion, or as part
/// of a [`SemesterSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectResult {
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub grade: String,
    pub grade_points: f64,
}

/// Result of one ingestion run.
///
/// `status` is [`UploadStatus::Completed`] when at least one subject was
/// staged, [`UploadStatus::AllDuplicates`] when everything was skipped.
/// In the latter case `subjects_stored`, `total_credits`, and
/// `calculated_sgpa` are all zero and `duplicate_count` carries the number of
/// subjects originally presented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub upload_id: String,
    pub owner_id: String,
    pub filename: String,
    pub semester: i64,
    pub status: UploadStatus,
    pub message: String,
    pub subjects_stored: usize,
    pub total_credits: i64,
    pub calculated_sgpa: f64,
    pub duplicate_count: usize,
    pub grades: Vec<SubjectResult>,
}

/// Derived per-semester statistics. Not persisted; recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterSummary {
    pub semester: i64,
    pub subjects_count: usize,
    pub total_credits: i64,
    /// Credit-weighted mean of grade points, rounded to 2 decimals.
    pub sgpa: f64,
    pub subjects: Vec<SubjectResult>,
}

/// Derived cumulative statistics across all semesters. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgpaSummary {
    pub owner_id: String,
    pub total_subjects: usize,
    pub total_credits: i64,
    /// Credit-weighted mean of grade points across all semesters, 2 decimals.
    pub cgpa: f64,
    pub semesters_completed: usize,
    /// Ascending by semester number.
    pub semesters: Vec<SemesterSummary>,
}

impl CgpaSummary {
    /// The all-zero summary returned when an owner has no grades yet.
    pub fn empty(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            total_subjects: 0,
            total_credits: 0,
            cgpa: 0.0,
            semesters_completed: 0,
            semesters: Vec::new(),
        }
    }
}

/// Aggregate trend statistics over an owner's semesters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceOverview {
    pub owner_id: String,
    pub highest_sgpa: f64,
    pub lowest_sgpa: f64,
    pub average_sgpa: f64,
    /// SGPA per semester, ascending by semester number.
    pub sgpa_trend: Vec<f64>,
    /// Letter grade → occurrence count, sorted by letter.
    pub grade_distribution: Vec<(String, usize)>,
    pub total_semesters: usize,
}

/// Counts removed by a deletion operation. Deletes are idempotent: repeating
/// one on already-absent data reports zeros, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub deleted_grades: u64,
    pub deleted_uploads: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&UploadStatus::AllDuplicates).unwrap();
        assert_eq!(json, "\"all_duplicates\"");
        let back: UploadStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UploadStatus::AllDuplicates);
    }

    #[test]
    fn status_as_str_matches_serde_form() {
        for status in [
            UploadStatus::Processing,
            UploadStatus::Completed,
            UploadStatus::AllDuplicates,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.as_str());
        }
    }

    #[test]
    fn empty_cgpa_summary() {
        let s = CgpaSummary::empty("user-1");
        assert_eq!(s.total_subjects, 0);
        assert_eq!(s.cgpa, 0.0);
        assert!(s.semesters.is_empty());
    }
}

//! Aggregation engine: SGPA/CGPA statistics over persisted grades.
//!
//! Pure reads — nothing here mutates grade or upload rows. The arithmetic
//! lives in standalone functions over row slices so it is testable without a
//! database; the public operations just fetch rows and delegate.
//!
//! SGPA and CGPA are credit-weighted means of grade points. A group with
//! zero total credits yields 0.0, never a division error.

use crate::error::GradeScanError;
use crate::output::{CgpaSummary, PerformanceOverview, SemesterSummary, SubjectResult};
use crate::store::{GradeRow, GradeStore};
use std::collections::BTreeMap;

/// Round half-up to two decimal places.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Credit-weighted grade-point average of a set of rows, 2-decimal rounded.
fn weighted_gpa(rows: &[&GradeRow]) -> f64 {
    let total_credits: i64 = rows.iter().map(|g| g.credits).sum();
    if total_credits == 0 {
        return 0.0;
    }
    let weighted_points: f64 = rows
        .iter()
        .map(|g| g.grade_points * g.credits as f64)
        .sum();
    round2(weighted_points / total_credits as f64)
}

/// Build the summary for one semester's rows.
fn summarize(semester: i64, rows: &[&GradeRow]) -> SemesterSummary {
    let subjects: Vec<SubjectResult> = rows
        .iter()
        .map(|g| SubjectResult {
            course_code: g.course_code.clone(),
            course_name: g.course_name.clone(),
            credits: g.credits,
            grade: g.letter_grade.clone(),
            grade_points: g.grade_points,
        })
        .collect();

    SemesterSummary {
        semester,
        subjects_count: subjects.len(),
        total_credits: rows.iter().map(|g| g.credits).sum(),
        sgpa: weighted_gpa(rows),
        subjects,
    }
}

/// Group rows by semester, ascending.
fn by_semester(rows: &[GradeRow]) -> BTreeMap<i64, Vec<&GradeRow>> {
    let mut groups: BTreeMap<i64, Vec<&GradeRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.semester).or_default().push(row);
    }
    groups
}

/// Assemble the cumulative summary from an owner's full grade list.
///
/// Exposed for the ingestion layer and tests; most callers want
/// [`compute_cgpa`].
pub fn summarize_all(owner_id: &str, rows: &[GradeRow]) -> CgpaSummary {
    if rows.is_empty() {
        return CgpaSummary::empty(owner_id);
    }

    let groups = by_semester(rows);
    let semesters: Vec<SemesterSummary> = groups
        .iter()
        .map(|(semester, group)| summarize(*semester, group))
        .collect();

    let all: Vec<&GradeRow> = rows.iter().collect();
    CgpaSummary {
        owner_id: owner_id.to_string(),
        total_subjects: rows.len(),
        total_credits: rows.iter().map(|g| g.credits).sum(),
        cgpa: weighted_gpa(&all),
        semesters_completed: semesters.len(),
        semesters,
    }
}

/// Cumulative grade-point average across every semester an owner has
/// recorded. Returns the all-zero summary (not an error) when no grades
/// exist yet.
pub async fn compute_cgpa(
    store: &GradeStore,
    owner_id: &str,
) -> Result<CgpaSummary, GradeScanError> {
    let rows = store.grades_for_owner(owner_id).await?;
    Ok(summarize_all(owner_id, &rows))
}

/// Summary for a single semester, or `None` (not an error) when the owner
/// has no rows for it.
pub async fn semester_summary(
    store: &GradeStore,
    owner_id: &str,
    semester: i64,
) -> Result<Option<SemesterSummary>, GradeScanError> {
    let rows = store.grades_for_semester(owner_id, semester).await?;
    if rows.is_empty() {
        return Ok(None);
    }
    let refs: Vec<&GradeRow> = rows.iter().collect();
    Ok(Some(summarize(semester, &refs)))
}

/// Trend statistics derived from the cumulative summary: best/worst/average
/// SGPA and the letter-grade distribution.
pub async fn performance_overview(
    store: &GradeStore,
    owner_id: &str,
) -> Result<PerformanceOverview, GradeScanError> {
    let summary = compute_cgpa(store, owner_id).await?;

    let sgpa_trend: Vec<f64> = summary.semesters.iter().map(|s| s.sgpa).collect();
    let (highest, lowest, average) = if sgpa_trend.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        (
            sgpa_trend.iter().copied().fold(f64::MIN, f64::max),
            sgpa_trend.iter().copied().fold(f64::MAX, f64::min),
            round2(sgpa_trend.iter().sum::<f64>() / sgpa_trend.len() as f64),
        )
    };

    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for sem in &summary.semesters {
        for subject in &sem.subjects {
            *distribution.entry(subject.grade.clone()).or_default() += 1;
        }
    }

    Ok(PerformanceOverview {
        owner_id: owner_id.to_string(),
        highest_sgpa: highest,
        lowest_sgpa: lowest,
        average_sgpa: average,
        sgpa_trend,
        grade_distribution: distribution.into_iter().collect(),
        total_semesters: summary.semesters_completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(semester: i64, code: &str, credits: i64, points: f64) -> GradeRow {
        GradeRow {
            id: format!("id-{semester}-{code}"),
            owner_id: "owner-1".to_string(),
            course_code: code.to_string(),
            course_name: format!("Course {code}"),
            credits,
            letter_grade: "A".to_string(),
            semester,
            grade_points: points,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn round2_half_up() {
        assert_eq!(round2(8.565), 8.57);
        assert_eq!(round2(8.571428), 8.57);
        assert_eq!(round2(8.2777), 8.28);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn sgpa_is_credit_weighted() {
        // credits [4,3,3], points [10,8,7] → (40+24+21)/10 = 8.5
        let rows = vec![
            row(1, "C1", 4, 10.0),
            row(1, "C2", 3, 8.0),
            row(1, "C3", 3, 7.0),
        ];
        let refs: Vec<&GradeRow> = rows.iter().collect();
        let summary = summarize(1, &refs);
        assert_eq!(summary.sgpa, 8.5);
        assert_eq!(summary.total_credits, 10);
        assert_eq!(summary.subjects_count, 3);
    }

    #[test]
    fn cgpa_weights_across_semesters() {
        // Semester A: 10 credits / 85 weighted points, semester B: 8 / 64.
        // CGPA = 149/18 ≈ 8.28
        let rows = vec![
            row(1, "A1", 4, 10.0),
            row(1, "A2", 3, 8.0),
            row(1, "A3", 3, 7.0),
            row(2, "B1", 4, 8.0),
            row(2, "B2", 4, 8.0),
        ];
        let summary = summarize_all("owner-1", &rows);
        assert_eq!(summary.cgpa, 8.28);
        assert_eq!(summary.total_credits, 18);
        assert_eq!(summary.total_subjects, 5);
        assert_eq!(summary.semesters_completed, 2);
        assert_eq!(summary.semesters[0].sgpa, 8.5);
        assert_eq!(summary.semesters[1].sgpa, 8.0);
    }

    #[test]
    fn semesters_are_sorted_ascending() {
        let rows = vec![row(7, "C1", 3, 9.0), row(2, "C2", 3, 8.0), row(4, "C3", 3, 7.0)];
        let summary = summarize_all("owner-1", &rows);
        let order: Vec<i64> = summary.semesters.iter().map(|s| s.semester).collect();
        assert_eq!(order, vec![2, 4, 7]);
    }

    #[test]
    fn empty_rows_yield_zero_summary() {
        let summary = summarize_all("owner-1", &[]);
        assert_eq!(summary, CgpaSummary::empty("owner-1"));
    }

    #[test]
    fn zero_credit_guard() {
        // Cannot be built through the store (CHECK forbids 0 credits), but
        // the arithmetic must still never divide by zero.
        let mut r = row(1, "C1", 0, 10.0);
        r.credits = 0;
        let rows = vec![r];
        let refs: Vec<&GradeRow> = rows.iter().collect();
        assert_eq!(weighted_gpa(&refs), 0.0);
    }

    #[tokio::test]
    async fn semester_summary_absent_is_none() {
        let store = GradeStore::open_in_memory().await.unwrap();
        let result = semester_summary(&store, "nobody", 3).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn compute_cgpa_for_unknown_owner_is_empty() {
        let store = GradeStore::open_in_memory().await.unwrap();
        let summary = compute_cgpa(&store, "nobody").await.unwrap();
        assert_eq!(summary, CgpaSummary::empty("nobody"));
    }

    #[tokio::test]
    async fn performance_overview_trends() {
        use crate::pipeline::normalize::NormalizedSubject;
        let store = GradeStore::open_in_memory().await.unwrap();
        let mut tx = store.begin().await.unwrap();
        for (sem, code, credits, grade, points) in [
            (1i64, "A1", 4i64, "O", 10.0),
            (1, "A2", 3, "B+", 7.0),
            (2, "B1", 3, "A", 8.0),
            (2, "B2", 3, "A", 8.0),
        ] {
            GradeStore::insert_grade(
                tx.as_mut(),
                "o",
                sem,
                &NormalizedSubject {
                    course_code: code.into(),
                    course_name: "N".into(),
                    credits,
                    letter_grade: grade.into(),
                    grade_points: points,
                },
            )
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let overview = performance_overview(&store, "o").await.unwrap();
        // sem 1: (40+21)/7 ≈ 8.71, sem 2: 8.0
        assert_eq!(overview.sgpa_trend, vec![8.71, 8.0]);
        assert_eq!(overview.highest_sgpa, 8.71);
        assert_eq!(overview.lowest_sgpa, 8.0);
        assert_eq!(overview.average_sgpa, 8.36);
        assert_eq!(overview.total_semesters, 2);
        let dist: Vec<(String, usize)> = overview.grade_distribution;
        assert_eq!(
            dist,
            vec![
                ("A".to_string(), 2),
                ("B+".to_string(), 1),
                ("O".to_string(), 1)
            ]
        );
    }
}

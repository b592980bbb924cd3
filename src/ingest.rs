//! Ingestion entry point: one result-card image → committed grade rows.
//!
//! Runs the stages strictly in order: precondition checks, image
//! enhancement, vision extraction, sanitisation, schema validation, then
//! normalisation and staging inside a single transaction. Each run is
//! independent; the only state shared with concurrent runs is the store,
//! and the dedup UNIQUE index makes the overlap harmless.
//!
//! The transaction spans the upload record and every staged grade row.
//! Any error after [`GradeStore::begin`] drops the transaction, which rolls
//! everything back — there is no partial-write exit path.

use crate::analytics::round2;
use crate::config::IngestConfig;
use crate::error::GradeScanError;
use crate::output::{IngestOutcome, SubjectResult, UploadStatus};
use crate::pipeline::{extract, normalize, preprocess, sanitize, schema};
use crate::prompts::EXTRACTION_PROMPT;
use crate::store::GradeStore;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ingest one result-card image for `owner_id`.
///
/// # Arguments
/// * `store` — the grades database
/// * `model` — the vision model (injected; see [`extract::GeminiVision`])
/// * `owner_id` — opaque identity of the grades' owner
/// * `filename` — original upload filename, recorded for audit
/// * `content_type` — declared content type, checked against the allow-list
/// * `image_bytes` — the raw image
///
/// # Returns
/// `Ok(IngestOutcome)` with status `completed` or `all_duplicates`. Partial
/// subject-level problems (missing fields, bad credits, duplicates) are skip
/// decisions, not errors; they only affect the outcome counts.
///
/// # Errors
/// Typed [`GradeScanError`] for precondition, extraction, schema, or storage
/// failures. On a storage failure nothing is committed, including the upload
/// record.
pub async fn ingest_result_card(
    store: &GradeStore,
    model: &dyn extract::VisionModel,
    owner_id: &str,
    filename: &str,
    content_type: &str,
    image_bytes: &[u8],
    config: &IngestConfig,
) -> Result<IngestOutcome, GradeScanError> {
    let run_start = Instant::now();
    info!(owner_id, filename, "starting result-card ingestion");

    // ── Step 0: preconditions ────────────────────────────────────────────
    if !config.content_type_allowed(content_type) {
        return Err(GradeScanError::UnsupportedContentType {
            content_type: content_type.to_string(),
        });
    }
    if image_bytes.len() > config.max_file_size {
        return Err(GradeScanError::FileTooLarge {
            size: image_bytes.len(),
            limit: config.max_file_size,
        });
    }

    // ── Step 1: enhance image (best effort) ──────────────────────────────
    let (enhanced, enhanced_type) = preprocess::enhance(image_bytes, content_type);

    // ── Step 2: vision extraction with bounded retry ─────────────────────
    let image = extract::encode_image(&enhanced, &enhanced_type);
    let prompt = config.prompt.as_deref().unwrap_or(EXTRACTION_PROMPT);
    let raw_text = extract::extract_with_retry(model, &image, prompt, config).await?;
    debug!(response_bytes = raw_text.len(), "raw extraction response");

    // ── Step 3: sanitise ─────────────────────────────────────────────────
    let clean = sanitize::isolate_json(&raw_text);

    // ── Step 4: validate schema ──────────────────────────────────────────
    let payload = schema::parse_extraction(&clean)?;
    info!(subjects = payload.subjects.len(), "extraction validated");

    // ── Step 5 + 6: normalise, deduplicate, stage, commit ────────────────
    let semester = normalize::resolve_semester(&payload.student_info);
    let presented = payload.subjects.len();

    let mut tx = store.begin().await?;
    let upload = GradeStore::create_upload(tx.as_mut(), owner_id, filename).await?;

    let mut stored: Vec<SubjectResult> = Vec::new();
    let mut total_credits: i64 = 0;
    let mut total_grade_points: f64 = 0.0;

    for raw_subject in &payload.subjects {
        let Some(subject) =
            normalize::normalize_subject(raw_subject, &config.scale, config.default_credits)
        else {
            continue;
        };

        if GradeStore::grade_exists(tx.as_mut(), owner_id, &subject.course_code, semester).await? {
            warn!(
                "duplicate grade for {} in semester {}, skipping",
                subject.course_code, semester
            );
            continue;
        }

        // A concurrent run may have won the race since the check above; a
        // conflicting insert affects zero rows and counts as a skip too.
        if GradeStore::insert_grade(tx.as_mut(), owner_id, semester, &subject)
            .await?
            .is_none()
        {
            warn!(
                "lost insert race for {} in semester {}, skipping",
                subject.course_code, semester
            );
            continue;
        }

        total_credits += subject.credits;
        total_grade_points += subject.grade_points * subject.credits as f64;
        stored.push(SubjectResult {
            course_code: subject.course_code,
            course_name: subject.course_name,
            credits: subject.credits,
            grade: subject.letter_grade,
            grade_points: subject.grade_points,
        });
    }

    // ── Outcome branching ────────────────────────────────────────────────
    if stored.is_empty() {
        GradeStore::finalize_upload(tx.as_mut(), &upload.id, UploadStatus::AllDuplicates.as_str())
            .await?;
        tx.commit().await?;
        info!(
            owner_id,
            semester, presented, "all presented subjects were skipped"
        );
        return Ok(IngestOutcome {
            upload_id: upload.id,
            owner_id: owner_id.to_string(),
            filename: filename.to_string(),
            semester,
            status: UploadStatus::AllDuplicates,
            message: format!(
                "All {presented} subjects were already recorded or invalid; nothing new stored."
            ),
            subjects_stored: 0,
            total_credits: 0,
            calculated_sgpa: 0.0,
            duplicate_count: presented,
            grades: Vec::new(),
        });
    }

    let sgpa = if total_credits > 0 {
        round2(total_grade_points / total_credits as f64)
    } else {
        0.0
    };

    GradeStore::finalize_upload(tx.as_mut(), &upload.id, UploadStatus::Completed.as_str()).await?;
    tx.commit().await?;

    info!(
        owner_id,
        semester,
        stored = stored.len(),
        sgpa,
        elapsed_ms = run_start.elapsed().as_millis() as u64,
        "ingestion committed"
    );

    Ok(IngestOutcome {
        upload_id: upload.id,
        owner_id: owner_id.to_string(),
        filename: filename.to_string(),
        semester,
        status: UploadStatus::Completed,
        message: format!(
            "Stored {} of {presented} subjects for semester {semester}.",
            stored.len()
        ),
        subjects_stored: stored.len(),
        total_credits,
        calculated_sgpa: sgpa,
        duplicate_count: presented - stored.len(),
        grades: stored,
    })
}

//! # gradescan
//!
//! Turn photographed result cards into structured grade records, with
//! SGPA/CGPA analytics on top.
//!
//! ## Why this crate?
//!
//! Result cards arrive as phone photos and scans — OCR on them produces
//! garbled tables and misread grade letters. Instead this crate enhances
//! the image and lets a vision language model read it as a human would,
//! returning a strict JSON contract that is sanitised, schema-validated,
//! normalised, deduplicated, and committed atomically.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image (png/jpeg)
//!  │
//!  ├─ 0. Gate       content-type allow-list + size limit
//!  ├─ 1. Enhance    sharpen + contrast boost (best effort)
//!  ├─ 2. Extract    vision model call with bounded retry
//!  ├─ 3. Sanitise   strip fences, preamble, trailing prose
//!  ├─ 4. Validate   JSON shape → typed ExtractionPayload
//!  ├─ 5. Normalise  semester/credits defaults, grade → points
//!  └─ 6. Persist    one transaction: upload record + deduped grade rows
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gradescan::{ingest_result_card, GeminiVision, GradeStore, IngestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from config or the GEMINI_API_KEY environment variable
//!     let config = IngestConfig::builder().build()?;
//!     let model = GeminiVision::new(&config)?;
//!     let store = GradeStore::open("grades.db").await?;
//!
//!     let bytes = std::fs::read("result_card.png")?;
//!     let outcome = ingest_result_card(
//!         &store, &model, "student-42", "result_card.png", "image/png", &bytes, &config,
//!     )
//!     .await?;
//!     println!("stored {} subjects, SGPA {}", outcome.subjects_stored, outcome.calculated_sgpa);
//!
//!     let cgpa = gradescan::compute_cgpa(&store, "student-42").await?;
//!     println!("CGPA {}", cgpa.cgpa);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gradescan` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! gradescan = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analytics;
pub mod config;
pub mod error;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod scale;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analytics::{compute_cgpa, performance_overview, semester_summary, summarize_all};
pub use config::{IngestConfig, IngestConfigBuilder, ALLOWED_CONTENT_TYPES, MAX_FILE_SIZE};
pub use error::{GradeScanError, StorageErrorKind};
pub use ingest::ingest_result_card;
pub use output::{
    CgpaSummary, DeleteOutcome, IngestOutcome, PerformanceOverview, SemesterSummary,
    SubjectResult, UploadStatus,
};
pub use pipeline::extract::{GeminiVision, VisionModel};
pub use scale::GradeScale;
pub use store::{GradeRow, GradeStore, UploadRow};

//! Pipeline stages for result-card ingestion.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap an
//! implementation (e.g. a different vision provider) without touching the
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! preprocess ──▶ extract ──▶ sanitize ──▶ schema ──▶ normalize
//! (enhance)      (vision AI)  (isolate    (validate   (clean, default,
//!                              JSON)       shape)      grade points)
//! ```
//!
//! 1. [`preprocess`] — sharpen/contrast-boost the image; best effort, never
//!    fails the request
//! 2. [`extract`]    — drive the vision API call with retry/backoff; the only
//!    stage with network I/O
//! 3. [`sanitize`]   — strip fences and prose around the JSON the model returned
//! 4. [`schema`]     — parse and validate into a typed extraction payload
//! 5. [`normalize`]  — per-subject cleanup, defaults, and grade-point lookup
//!
//! Staging into the store and the transaction boundary live in
//! [`crate::ingest`]; they need database access and are not pure stages.

pub mod extract;
pub mod normalize;
pub mod preprocess;
pub mod sanitize;
pub mod schema;

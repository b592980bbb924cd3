//! Error types for the gradescan library.
//!
//! One flat [`GradeScanError`] covers every failure the ingestion pipeline or
//! the aggregation engine can surface. Grouping mirrors the pipeline stages:
//!
//! * **Input errors** — precondition failures raised before any processing
//!   (wrong content type, oversized upload). The caller can fix these without
//!   retrying the AI call.
//! * **Extraction errors** — the vision model is unreachable, misconfigured,
//!   rate limited, or returned text that is not JSON. Transient kinds are
//!   retried internally; the variant that finally escapes is the last attempt.
//! * **Schema errors** — the response parsed as JSON but does not have the
//!   required extraction shape. Distinct from a JSON decode failure so callers
//!   can word user-facing messages differently ("image unclear" vs "try again").
//! * **Storage errors** — the transaction failed and was rolled back in full.
//!
//! Per-subject problems (missing fields, bad credits, duplicates) are *not*
//! errors. They are skip decisions logged with `warn!` and reflected in the
//! final [`crate::output::IngestOutcome`] counts.

use thiserror::Error;

/// All errors returned by the gradescan library.
#[derive(Debug, Error)]
pub enum GradeScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Upload content type is not in the image allow-list.
    #[error("Unsupported content type '{content_type}'\nAllowed: image/png, image/jpeg, image/jpg.")]
    UnsupportedContentType { content_type: String },

    /// Upload exceeds the configured size cap.
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: usize, limit: usize },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// No API key could be resolved for the vision provider.
    #[error("Vision provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider rejected our credentials (401/403) — retry will not help.
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthFailed { provider: String, detail: String },

    /// Provider returned HTTP 429 — caller should back off.
    ///
    /// Check `retry_after_secs` for a server-specified delay, or use
    /// exponential backoff if `None`.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// The HTTP request could not reach the provider at all.
    #[error("Network error reaching the vision provider: {detail}\nCheck your internet connection.")]
    NetworkFailed { detail: String },

    /// The call exceeded the configured per-call timeout.
    #[error("Vision API call timed out after {elapsed_ms}ms")]
    ApiTimeout { elapsed_ms: u64 },

    /// Any other provider failure, tagged with the HTTP status. 5xx responses
    /// are transient and retried; 4xx responses are not.
    #[error("Vision provider error (HTTP {status}): {message}")]
    ProviderError { status: u16, message: String },

    /// The provider responded, but the text is not parseable JSON even after
    /// sanitisation. The image may not contain clear grade information.
    #[error("Could not parse the extraction response as JSON: {detail}")]
    MalformedResponse { detail: String },

    // ── Schema errors ─────────────────────────────────────────────────────
    /// Extraction JSON parsed but is missing the required shape.
    #[error("Extraction payload failed schema validation: {reason}")]
    SchemaInvalid { reason: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// A persistence operation failed; the surrounding transaction was
    /// rolled back and no partial writes survive.
    #[error("Storage failure ({kind:?}): {detail}")]
    Storage {
        kind: StorageErrorKind,
        detail: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Sub-reason for a [`GradeScanError::Storage`] failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Unique-constraint violation (duplicate dedup key).
    UniqueViolation,
    /// Foreign-key violation (stale owner reference).
    ForeignKeyViolation,
    /// Check-constraint violation (out-of-range credits/semester/points).
    CheckViolation,
    /// Everything else: connection loss, I/O, corrupt database.
    Other,
}

impl GradeScanError {
    /// Whether this error kind is worth an automatic retry.
    ///
    /// Rate limits, network blips, timeouts, and provider 5xx responses are
    /// transient; auth failures and malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GradeScanError::RateLimited { .. }
            | GradeScanError::NetworkFailed { .. }
            | GradeScanError::ApiTimeout { .. } => true,
            GradeScanError::ProviderError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<sqlx::Error> for GradeScanError {
    fn from(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::Database(db) => match db.kind() {
                sqlx::error::ErrorKind::UniqueViolation => StorageErrorKind::UniqueViolation,
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    StorageErrorKind::ForeignKeyViolation
                }
                sqlx::error::ErrorKind::CheckViolation => StorageErrorKind::CheckViolation,
                _ => StorageErrorKind::Other,
            },
            _ => StorageErrorKind::Other,
        };
        GradeScanError::Storage {
            kind,
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_display() {
        let e = GradeScanError::RateLimited {
            provider: "gemini".into(),
            retry_after_secs: Some(60),
        };
        assert!(e.to_string().contains("gemini"));
    }

    #[test]
    fn file_too_large_display() {
        let e = GradeScanError::FileTooLarge {
            size: 11 * 1024 * 1024,
            limit: 10 * 1024 * 1024,
        };
        let msg = e.to_string();
        assert!(msg.contains("11534336"), "got: {msg}");
    }

    #[test]
    fn transient_kinds() {
        assert!(GradeScanError::NetworkFailed {
            detail: "reset".into()
        }
        .is_transient());
        assert!(GradeScanError::ApiTimeout { elapsed_ms: 5000 }.is_transient());
        assert!(GradeScanError::ProviderError {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
        assert!(!GradeScanError::ProviderError {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!GradeScanError::AuthFailed {
            provider: "gemini".into(),
            detail: "bad key".into()
        }
        .is_transient());
        assert!(!GradeScanError::SchemaInvalid {
            reason: "subjects missing".into()
        }
        .is_transient());
    }

    #[test]
    fn storage_kind_display() {
        let e = GradeScanError::Storage {
            kind: StorageErrorKind::UniqueViolation,
            detail: "UNIQUE constraint failed: grades".into(),
        };
        assert!(e.to_string().contains("UniqueViolation"));
    }
}

//! Configuration for result-card ingestion.
//!
//! All pipeline behaviour is controlled through [`IngestConfig`], built via
//! its [`IngestConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outcomes differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::GradeScanError;
use crate::scale::GradeScale;
use std::fmt;

/// Content types the ingestion precondition accepts.
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// Default upload size cap: 10 MiB.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Configuration for one ingestion pipeline.
///
/// Built via [`IngestConfig::builder()`] or [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use gradescan::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .model("gemini-1.5-flash")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct IngestConfig {
    /// Vision model identifier. Default: `"gemini-1.5-flash"`.
    pub model: String,

    /// API key for the vision provider. If `None`, the client reads the
    /// `GEMINI_API_KEY` environment variable at construction time.
    pub api_key: Option<String>,

    /// Base URL of the Generative Language API. Default: the public Google
    /// endpoint. Overridable so tests can point the client at a local stub.
    pub api_base_url: String,

    /// Sampling temperature for the extraction call. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to what it sees on the card.
    /// Higher values introduce creativity that worsens extraction accuracy.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// A dense result card with 10+ subjects stays well under this; setting it
    /// too low silently truncates the JSON mid-object.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient API failure. Default: 3.
    ///
    /// Rate-limit, network, and timeout errors are retried; auth failures and
    /// malformed responses are not.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds for the vision API. Default: 60.
    ///
    /// The extraction call is the longest-running suspension point in the
    /// pipeline: without a bound it can block the requesting task forever.
    pub api_timeout_secs: u64,

    /// Upload size cap in bytes. Default: 10 MiB.
    pub max_file_size: usize,

    /// Credits substituted when a subject's credits are missing, non-numeric,
    /// or outside [1, 6]. Default: 3. A recoverable default, not an error.
    pub default_credits: i64,

    /// The grade-point table the normaliser uses. Default: the 10-point scale.
    pub scale: GradeScale,

    /// Custom extraction prompt. If `None`, uses the built-in default.
    pub prompt: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            max_file_size: MAX_FILE_SIZE,
            default_credits: 3,
            scale: GradeScale::default(),
            prompt: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_file_size", &self.max_file_size)
            .field("default_credits", &self.default_credits)
            .finish()
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether an upload content type is acceptable.
    pub fn content_type_allowed(&self, content_type: &str) -> bool {
        ALLOWED_CONTENT_TYPES.contains(&content_type)
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn default_credits(mut self, credits: i64) -> Self {
        self.config.default_credits = credits;
        self
    }

    pub fn scale(mut self, scale: GradeScale) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, GradeScanError> {
        let c = &self.config;
        if c.model.is_empty() {
            return Err(GradeScanError::InvalidConfig(
                "Model name must not be empty".into(),
            ));
        }
        if c.default_credits < 1 || c.default_credits > 6 {
            return Err(GradeScanError::InvalidConfig(format!(
                "default_credits must be 1–6, got {}",
                c.default_credits
            )));
        }
        if c.max_file_size == 0 {
            return Err(GradeScanError::InvalidConfig(
                "max_file_size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = IngestConfig::default();
        assert_eq!(c.model, "gemini-1.5-flash");
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.default_credits, 3);
        assert_eq!(c.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = IngestConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn rejects_out_of_range_default_credits() {
        assert!(IngestConfig::builder().default_credits(0).build().is_err());
        assert!(IngestConfig::builder().default_credits(7).build().is_err());
        assert!(IngestConfig::builder().default_credits(6).build().is_ok());
    }

    #[test]
    fn content_type_allow_list() {
        let c = IngestConfig::default();
        assert!(c.content_type_allowed("image/png"));
        assert!(c.content_type_allowed("image/jpg"));
        assert!(!c.content_type_allowed("application/pdf"));
        assert!(!c.content_type_allowed("image/webp"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = IngestConfig::builder().api_key("secret-key").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}

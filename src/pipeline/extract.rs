//! Extraction client: send the result-card image to a vision model.
//!
//! The AI collaborator hides behind the [`VisionModel`] trait so tests can
//! inject a canned responder and alternative providers can be slotted in
//! without touching the pipeline. [`GeminiVision`] is the production
//! implementation, speaking the Generative Language REST API directly over
//! `reqwest`.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx / network errors are transient and frequent. Exponential
//! backoff (`retry_backoff_ms * 2^attempt`) avoids hammering a recovering
//! endpoint: with 500 ms base and 3 retries the wait sequence is
//! 500 ms → 1 s → 2 s, under 4 s of back-off total. Auth failures and
//! malformed responses are never retried — they cannot heal on their own.

use crate::config::IngestConfig;
use crate::error::GradeScanError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// A base64-encoded image ready for a multimodal API request body.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

/// Encode raw image bytes for the vision API.
pub fn encode_image(bytes: &[u8], mime_type: &str) -> EncodedImage {
    let b64 = STANDARD.encode(bytes);
    debug!("encoded image → {} bytes base64", b64.len());
    EncodedImage {
        data: b64,
        mime_type: mime_type.to_string(),
    }
}

/// A vision-capable model that turns an image plus instruction into raw text.
///
/// Object-safe so callers hold `Arc<dyn VisionModel>` and tests inject mocks.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send one image with the extraction instruction; return the raw
    /// response text (which may include fences and prose — sanitisation is
    /// the next stage's job).
    async fn extract(&self, image: &EncodedImage, prompt: &str)
        -> Result<String, GradeScanError>;

    /// Provider name for error messages and logs.
    fn provider_name(&self) -> &str;
}

/// Call the model with bounded retry on transient failures.
///
/// Non-transient errors (auth, 4xx, malformed) surface immediately; transient
/// ones (rate limit, network, timeout, 5xx) are retried up to
/// `config.max_retries` times with doubling backoff.
pub async fn extract_with_retry(
    model: &dyn VisionModel,
    image: &EncodedImage,
    prompt: &str,
    config: &IngestConfig,
) -> Result<String, GradeScanError> {
    let mut last_err: Option<GradeScanError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "extraction retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match model.extract(image, prompt).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() => {
                warn!("extraction attempt {} failed: {e}", attempt + 1);
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err
        .unwrap_or_else(|| GradeScanError::Internal("retry loop exited without error".into())))
}

// ── Gemini implementation ─────────────────────────────────────────────────

/// Vision client for Google's Generative Language API.
#[derive(Debug)]
pub struct GeminiVision {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl GeminiVision {
    /// Build a client from the ingest config.
    ///
    /// The API key comes from `config.api_key` or the `GEMINI_API_KEY`
    /// environment variable; a missing key is a configuration error, not a
    /// request-time failure.
    pub fn new(config: &IngestConfig) -> Result<Self, GradeScanError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GradeScanError::ProviderNotConfigured {
                provider: "gemini".into(),
                hint: "Set GEMINI_API_KEY or provide IngestConfig::api_key.".into(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| GradeScanError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl VisionModel for GeminiVision {
    async fn extract(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<String, GradeScanError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: image.data.clone(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, start))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(self.provider_name(), &response, status));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            GradeScanError::ProviderError {
                status: status.as_u16(),
                message: format!("response body was not valid JSON: {e}"),
            }
        })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GradeScanError::ProviderError {
                status: status.as_u16(),
                message: "response contained no candidate text (content may have been blocked)"
                    .into(),
            })?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            response_bytes = text.len(),
            "extraction call succeeded"
        );
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}

fn map_request_error(err: reqwest::Error, start: Instant) -> GradeScanError {
    if err.is_timeout() {
        GradeScanError::ApiTimeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    } else if err.is_connect() || err.is_request() {
        GradeScanError::NetworkFailed {
            detail: err.to_string(),
        }
    } else {
        GradeScanError::ProviderError {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            message: err.to_string(),
        }
    }
}

fn map_status_error(
    provider: &str,
    response: &reqwest::Response,
    status: reqwest::StatusCode,
) -> GradeScanError {
    match status.as_u16() {
        401 | 403 => GradeScanError::AuthFailed {
            provider: provider.to_string(),
            detail: format!("provider returned HTTP {status}"),
        },
        429 => {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            GradeScanError::RateLimited {
                provider: provider.to_string(),
                retry_after_secs,
            }
        }
        code => GradeScanError::ProviderError {
            status: code,
            message: format!("provider returned HTTP {status}"),
        },
    }
}

// ── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

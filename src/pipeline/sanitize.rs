//! Response sanitisation: isolate the JSON object in raw model output.
//!
//! ## Why is sanitisation necessary?
//!
//! Even when the prompt says "return ONLY the JSON object", vision models
//! routinely wrap the payload anyway:
//!
//! - ` ```json ... ``` ` fences despite the instruction
//! - a conversational preamble ("Here's the extracted data:")
//! - trailing commentary after the closing brace
//!
//! This stage is lossy-tolerant by design: it discards everything around the
//! first `{` … last `}` span. It never judges whether the remainder *parses*
//! — that is the schema stage's job, which keeps "model wrapped the JSON" and
//! "model produced broken JSON" as separately testable failures.
//!
//! ## Rule Order
//!
//! Fences come off before preamble stripping (a fence can hide the phrase),
//! and brace isolation runs last so it sees the narrowest candidate text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Preamble phrases models are known to prepend. Compared case-sensitively
/// at the start of the (trimmed) response.
const KNOWN_PREAMBLES: [&str; 4] = [
    "Here's the extracted data:",
    "Here is the extracted information:",
    "The extracted data is:",
    "Based on the image, here's the data:",
];

/// Isolate the JSON substring from raw model output.
///
/// Applies three passes in order:
/// 1. Strip an outer ```json / ``` fence pair
/// 2. Strip a known preamble phrase
/// 3. Slice from the first `{` to the last `}` inclusive
///
/// Returns the original trimmed text when no brace pair exists; the schema
/// stage then reports the decode failure with the full context.
pub fn isolate_json(raw: &str) -> String {
    let s = strip_code_fences(raw.trim());
    let s = strip_preamble(&s);
    slice_brace_span(&s)
}

// ── Pass 1: strip outer code fences ─────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n?(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input) {
        return caps[1].trim().to_string();
    }
    // An unterminated opening fence still hides the payload.
    if let Some(rest) = input.strip_prefix("```json").or_else(|| input.strip_prefix("```")) {
        return rest.trim().to_string();
    }
    input.to_string()
}

// ── Pass 2: strip known preamble phrases ────────────────────────────────────

fn strip_preamble(input: &str) -> String {
    let trimmed = input.trim_start();
    for prefix in KNOWN_PREAMBLES {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest.trim_start().to_string();
        }
    }
    trimmed.to_string()
}

// ── Pass 3: slice from first `{` to last `}` ────────────────────────────────

fn slice_brace_span(input: &str) -> String {
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if end > start => input[start..=end].to_string(),
        _ => input.trim().to_string(),
    }
}

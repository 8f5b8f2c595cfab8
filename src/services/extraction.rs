//! Best-effort recovery of a JSON value from free-text model output.
//!
//! Models are told to answer with bare JSON but routinely wrap it in markdown
//! fences or prose. Recovery runs in tiers, each only after the previous one
//! has definitively failed:
//!
//! 1. strip every code-fence marker and trim,
//! 2. strict parse of the whole text,
//! 3. strict parse of the greedy span from the first `{`/`[` to the last `}`/`]`,
//! 4. give up, keeping the cleaned text for diagnosis.
//!
//! Tier 3 is greedy: two sibling objects separated by prose are captured as a
//! single span, which then fails to parse.

use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

const PARSE_FAILURE: &str = "Unable to parse JSON response";

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+\-]*").expect("static regex"))
}

fn span_pattern() -> &'static Regex {
    static SPAN: OnceLock<Regex> = OnceLock::new();
    SPAN.get_or_init(|| Regex::new(r"(?s)(\{.*\}|\[.*\])").expect("static regex"))
}

/// Which tier produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTier {
    Direct,
    Span,
}

impl ExtractionTier {
    fn as_str(self) -> &'static str {
        match self {
            ExtractionTier::Direct => "direct",
            ExtractionTier::Span => "span",
        }
    }
}

/// Extraction gave up. Serializes as `{success: false, error, rawResponse}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionFailure {
    pub error: String,
    /// Fence-stripped, trimmed model output.
    pub raw_response: String,
}

impl Serialize for ExtractionFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExtractionFailure", 3)?;
        state.serialize_field("success", &false)?;
        state.serialize_field("error", &self.error)?;
        state.serialize_field("rawResponse", &self.raw_response)?;
        state.end()
    }
}

/// Remove markdown fence markers (with optional language tag) and trim.
pub fn strip_fences(text: &str) -> String {
    fence_pattern().replace_all(text, "").trim().to_string()
}

/// Recover a JSON value from model output, reporting the tier that succeeded.
pub fn extract_json_with_tier(text: &str) -> Result<(Value, ExtractionTier), ExtractionFailure> {
    let cleaned = strip_fences(text);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => return Ok((value, ExtractionTier::Direct)),
        Err(e) => debug!(error = %e, "Direct JSON parse failed, searching for embedded span"),
    }

    if let Some(span) = span_pattern().find(&cleaned) {
        match serde_json::from_str::<Value>(span.as_str()) {
            Ok(value) => return Ok((value, ExtractionTier::Span)),
            Err(e) => debug!(error = %e, "Embedded JSON span failed to parse"),
        }
    }

    Err(ExtractionFailure {
        error: PARSE_FAILURE.to_string(),
        raw_response: cleaned,
    })
}

/// Recover a JSON value from model output.
pub fn extract_json(text: &str) -> Result<Value, ExtractionFailure> {
    match extract_json_with_tier(text) {
        Ok((value, tier)) => {
            metrics::counter!("json_extraction_total", "tier" => tier.as_str()).increment(1);
            Ok(value)
        }
        Err(failure) => {
            metrics::counter!("json_extraction_total", "tier" => "failed").increment(1);
            warn!(
                raw_len = failure.raw_response.len(),
                "Model output could not be coerced to JSON"
            );
            Err(failure)
        }
    }
}

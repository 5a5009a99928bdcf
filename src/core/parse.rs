//! Oracle response parsing.
//!
//! The oracle is asked for `{"status": "...", "confidence": N}` but does not
//! always comply. Parsing runs three stages, most to least structured:
//!
//! 1. The whole response (after stripping markdown fences) as a JSON object.
//! 2. The first `{...}` object embedded in prose that carries a `status`.
//! 3. A word scan for `open` / `closed`, assigned [`FALLBACK_CONFIDENCE`].
//!
//! When none of them yields a status the answer is `Unknown` at zero
//! confidence. Only an empty response is an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::status::{ClassificationResult, GateStatus, MIN_CONFIDENCE_THRESHOLD};
use crate::error::{GateWatchError, Result};

/// Confidence given to answers recovered by the word scan.
///
/// One below the lowest accepted threshold, so keyword answers never pass
/// the gate at any valid setting.
pub const FALLBACK_CONFIDENCE: u8 = MIN_CONFIDENCE_THRESHOLD - 1;

/// Loose shape of the structured answer.
#[derive(Debug, Deserialize)]
struct RawClassification {
    status: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
}

impl RawClassification {
    fn into_result(self) -> Option<ClassificationResult> {
        let status = GateStatus::from_label(self.status.as_deref()?)?;
        let confidence = self.confidence.as_ref().map(confidence_value).unwrap_or(0);
        Some(ClassificationResult::new(status, confidence))
    }
}

/// Which stage produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSource {
    /// The response was a JSON object.
    Structured,
    /// A JSON object was found inside surrounding prose.
    Embedded,
    /// A status word was found in free text.
    Keyword,
    /// Nothing recognizable; the result is `Unknown` at zero confidence.
    Unrecognized,
}

/// A classification together with the stage that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedClassification {
    pub result: ClassificationResult,
    pub source: ParseSource,
}

/// Parse a raw oracle response into a classification.
pub fn parse(raw: &str) -> Result<ClassificationResult> {
    parse_detailed(raw).map(|parsed| parsed.result)
}

/// Parse a raw oracle response, reporting which stage matched.
pub fn parse_detailed(raw: &str) -> Result<ParsedClassification> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GateWatchError::parse("empty oracle response"));
    }

    if let Some(result) = parse_structured(text) {
        return Ok(ParsedClassification {
            result,
            source: ParseSource::Structured,
        });
    }

    if let Some(result) = parse_embedded(text) {
        return Ok(ParsedClassification {
            result,
            source: ParseSource::Embedded,
        });
    }

    if let Some(status) = scan_keywords(text) {
        return Ok(ParsedClassification {
            result: ClassificationResult::new(status, FALLBACK_CONFIDENCE as i64),
            source: ParseSource::Keyword,
        });
    }

    Ok(ParsedClassification {
        result: ClassificationResult::unknown(),
        source: ParseSource::Unrecognized,
    })
}

fn parse_structured(text: &str) -> Option<ClassificationResult> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str::<RawClassification>(cleaned)
        .ok()?
        .into_result()
}

/// Try each brace-delimited span in turn.
///
/// Objects are assumed flat (no nested braces), which is the only shape the
/// prompt asks for.
fn parse_embedded(text: &str) -> Option<ClassificationResult> {
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        let candidate = &rest[start..];
        let end = candidate.find('}')?;
        let object = &candidate[..=end];

        if object.contains("\"status\"") {
            if let Some(result) = serde_json::from_str::<RawClassification>(object)
                .ok()
                .and_then(RawClassification::into_result)
            {
                return Some(result);
            }
        }

        rest = &candidate[1..];
    }
    None
}

/// Look for status words. `open` wins when both appear.
fn scan_keywords(text: &str) -> Option<GateStatus> {
    let lowered = text.to_ascii_lowercase();
    let mut saw_closed = false;

    for word in lowered.split(|c: char| !c.is_ascii_alphanumeric()) {
        match word {
            "open" => return Some(GateStatus::Open),
            "closed" => saw_closed = true,
            _ => {}
        }
    }

    saw_closed.then_some(GateStatus::Closed)
}

fn strip_code_fences(text: &str) -> &str {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        cleaned = rest.trim_start();
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim_end();
    }

    cleaned
}

/// Read a confidence from a JSON number or numeric string.
///
/// Fractions are truncated; out-of-range values are clamped later.
fn confidence_value(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .map(|f| f as i64)
            .unwrap_or(0),
        _ => 0,
    }
}

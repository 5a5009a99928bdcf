//! Gate status and classification value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest confidence an oracle answer can carry.
pub const MAX_CONFIDENCE: u8 = 100;

/// Lowest confidence threshold the engine accepts.
pub const MIN_CONFIDENCE_THRESHOLD: u8 = 50;

/// Gate status reported by the oracle and by the confirmation engine.
///
/// `Unknown` is both a legitimate oracle answer and the engine's own
/// fallback when confidence is insufficient or the answer is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Open,
    Closed,
    #[default]
    Unknown,
}

impl GateStatus {
    /// Map an oracle label to a status, case-insensitively.
    ///
    /// Returns `None` for anything outside `open`/`closed`/`unknown`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Lowercase wire label, as published on the state topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Unknown => "unknown",
        }
    }

    /// Check if this status is `Open`.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One oracle answer: a status plus an advisory confidence in `[0, 100]`.
///
/// Produced once per oracle call and never mutated afterwards; coercion
/// returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub status: GateStatus,
    pub confidence: u8,
}

impl ClassificationResult {
    /// Create a result, clamping the confidence into `[0, 100]`.
    pub fn new(status: GateStatus, confidence: i64) -> Self {
        Self {
            status,
            confidence: confidence.clamp(0, MAX_CONFIDENCE as i64) as u8,
        }
    }

    /// The zero-confidence `Unknown` answer.
    pub fn unknown() -> Self {
        Self {
            status: GateStatus::Unknown,
            confidence: 0,
        }
    }

    /// Apply the confidence gate.
    ///
    /// Below `threshold` the status becomes `Unknown`; the confidence is kept
    /// so the sample history still shows what the oracle said.
    pub fn coerce(self, threshold: u8) -> Self {
        if self.confidence < threshold {
            Self {
                status: GateStatus::Unknown,
                confidence: self.confidence,
            }
        } else {
            self
        }
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}%)", self.status, self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = GateStatus> {
        prop_oneof![
            Just(GateStatus::Open),
            Just(GateStatus::Closed),
            Just(GateStatus::Unknown),
        ]
    }

    #[test]
    fn test_from_label_is_case_insensitive() {
        assert_eq!(GateStatus::from_label("OPEN"), Some(GateStatus::Open));
        assert_eq!(GateStatus::from_label("Closed"), Some(GateStatus::Closed));
        assert_eq!(GateStatus::from_label(" unknown "), Some(GateStatus::Unknown));
        assert_eq!(GateStatus::from_label("ajar"), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&GateStatus::Open).unwrap(), "\"open\"");
        let parsed: GateStatus = serde_json::from_str("\"closed\"").unwrap();
        assert_eq!(parsed, GateStatus::Closed);
    }

    #[test]
    fn test_new_clamps_confidence() {
        assert_eq!(ClassificationResult::new(GateStatus::Open, 150).confidence, 100);
        assert_eq!(ClassificationResult::new(GateStatus::Open, -20).confidence, 0);
        assert_eq!(ClassificationResult::new(GateStatus::Open, 88).confidence, 88);
    }

    #[test]
    fn test_coerce_at_threshold_keeps_status() {
        let result = ClassificationResult::new(GateStatus::Open, 70);
        assert_eq!(result.coerce(70).status, GateStatus::Open);
    }

    #[test]
    fn test_coerce_keeps_confidence() {
        let result = ClassificationResult::new(GateStatus::Closed, 40).coerce(70);
        assert_eq!(result.status, GateStatus::Unknown);
        assert_eq!(result.confidence, 40);
    }

    #[test]
    fn test_display() {
        let result = ClassificationResult::new(GateStatus::Open, 90);
        assert_eq!(result.to_string(), "open (90%)");
    }

    proptest! {
        #[test]
        fn prop_below_threshold_is_always_unknown(
            status in any_status(),
            threshold in 50u8..=100,
            offset in 1u8..=50,
        ) {
            let confidence = threshold.saturating_sub(offset);
            let coerced = ClassificationResult::new(status, confidence as i64).coerce(threshold);
            prop_assert_eq!(coerced.status, GateStatus::Unknown);
        }

        #[test]
        fn prop_at_or_above_threshold_is_unchanged(
            status in any_status(),
            threshold in 50u8..=100,
            extra in 0u8..=50,
        ) {
            let confidence = threshold.saturating_add(extra).min(MAX_CONFIDENCE);
            let raw = ClassificationResult::new(status, confidence as i64);
            prop_assert_eq!(raw.coerce(threshold), raw);
        }
    }
}

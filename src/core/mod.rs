//! Core decision logic for gatewatch.
//!
//! Value types for gate status and oracle answers, the response parser, and
//! the confirmation engine that turns one to three noisy samples into a reported
//! status and an alert decision.

pub mod confirm;
pub mod parse;
pub mod status;

pub use confirm::{
    sample_or_unknown, ConfirmationEngine, ConfirmationOutcome, ConfirmationSession, Verdict,
    MAX_SAMPLES,
};
pub use parse::{parse, parse_detailed, ParseSource, ParsedClassification, FALLBACK_CONFIDENCE};
pub use status::{ClassificationResult, GateStatus, MAX_CONFIDENCE, MIN_CONFIDENCE_THRESHOLD};

//! Confirmation engine.
//!
//! A single "open" frame is the dominant false-positive source (glare, a
//! passing object, a gate caught mid-swing). Before alerting, an `Open`
//! first sample is checked against a second independent sample and, on
//! disagreement, a third tiebreaker. `Closed` and `Unknown` first samples end
//! the cycle immediately so the common case costs one oracle call.
//!
//! ```text
//!   first ──closed/unknown──▶ REPORT_CLOSED / REPORT_UNKNOWN   (1 call)
//!     │ open
//!     ▼
//!   second ──open──▶ CONFIRMED_OPEN                            (2 calls)
//!     │ closed/unknown
//!     ▼
//!   third ──majority of 3──▶ CONFIRMED_OPEN | REPORT_*         (3 calls)
//! ```

use serde::{Deserialize, Serialize};

use crate::core::status::{ClassificationResult, GateStatus};
use crate::error::{GateWatchError, Result};

/// Hard cap on samples in one confirmation session.
pub const MAX_SAMPLES: usize = 3;

/// Terminal state of a confirmation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    ConfirmedOpen,
    ReportClosed,
    ReportUnknown,
}

impl Verdict {
    /// The status reported for this verdict.
    pub fn status(&self) -> GateStatus {
        match self {
            Self::ConfirmedOpen => GateStatus::Open,
            Self::ReportClosed => GateStatus::Closed,
            Self::ReportUnknown => GateStatus::Unknown,
        }
    }

    fn for_status(status: GateStatus) -> Self {
        match status {
            GateStatus::Open => Self::ConfirmedOpen,
            GateStatus::Closed => Self::ReportClosed,
            GateStatus::Unknown => Self::ReportUnknown,
        }
    }
}

/// Result of one confirmation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationOutcome {
    /// Status to publish.
    pub final_status: GateStatus,
    /// Whether an open-gate alert should fire.
    pub alert: bool,
    /// Coerced samples in the order they were taken.
    pub samples: Vec<ClassificationResult>,
    /// Terminal state the session reached.
    pub verdict: Verdict,
}

impl ConfirmationOutcome {
    /// Number of oracle samples the session consumed.
    pub fn calls(&self) -> usize {
        self.samples.len()
    }
}

/// Samples collected during one check cycle.
///
/// Created fresh per cycle and dropped when the cycle ends. Every sample is
/// coerced through the confidence gate before it is stored.
#[derive(Debug, Clone)]
pub struct ConfirmationSession {
    threshold: u8,
    samples: Vec<ClassificationResult>,
}

impl ConfirmationSession {
    /// Start an empty session gated at `threshold`.
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            samples: Vec::with_capacity(MAX_SAMPLES),
        }
    }

    /// Coerce and store a raw sample, returning the stored value.
    pub fn record(&mut self, raw: ClassificationResult) -> Result<ClassificationResult> {
        if self.samples.len() >= MAX_SAMPLES {
            return Err(GateWatchError::invalid_state(format!(
                "confirmation session already holds {} samples",
                MAX_SAMPLES
            )));
        }

        let coerced = raw.coerce(self.threshold);
        if coerced.status != raw.status {
            tracing::debug!(
                confidence = raw.confidence,
                threshold = self.threshold,
                raw_status = %raw.status,
                "confidence below threshold, treating as unknown"
            );
        }
        self.samples.push(coerced);
        Ok(coerced)
    }

    /// Samples recorded so far.
    pub fn samples(&self) -> &[ClassificationResult] {
        &self.samples
    }

    /// Number of samples recorded so far.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if no sample has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Close the session with the given verdict.
    fn finish(self, verdict: Verdict) -> ConfirmationOutcome {
        ConfirmationOutcome {
            final_status: verdict.status(),
            alert: verdict == Verdict::ConfirmedOpen,
            samples: self.samples,
            verdict,
        }
    }
}

/// Drives confirmation sessions at a fixed confidence threshold.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationEngine {
    threshold: u8,
}

impl ConfirmationEngine {
    /// Create an engine gated at `threshold`.
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// The confidence threshold applied to every sample.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Decide the reported status starting from `initial`.
    ///
    /// `next_call` must produce an independent sample (a freshly captured
    /// frame sent through the oracle). It is called zero, one or two times.
    /// Errors that only mean "this answer was unusable" become `Unknown`
    /// samples; any other error aborts the session.
    pub fn evaluate<F>(
        &self,
        initial: ClassificationResult,
        mut next_call: F,
    ) -> Result<ConfirmationOutcome>
    where
        F: FnMut() -> Result<ClassificationResult>,
    {
        let mut session = ConfirmationSession::new(self.threshold);

        let first = session.record(initial)?;
        if !first.status.is_open() {
            return Ok(session.finish(Verdict::for_status(first.status)));
        }

        tracing::info!(
            confidence = first.confidence,
            "[1/3] gate appears open, confirming"
        );

        let second = session.record(sample_or_unknown(next_call())?)?;
        if second.status.is_open() {
            tracing::info!(confidence = second.confidence, "[2/3] open confirmed");
            return Ok(session.finish(Verdict::ConfirmedOpen));
        }

        tracing::info!(
            status = %second.status,
            confidence = second.confidence,
            "[2/3] disagreement, taking tiebreaker"
        );

        let third = session.record(sample_or_unknown(next_call())?)?;
        let verdict = majority(session.samples());
        tracing::info!(
            status = %third.status,
            confidence = third.confidence,
            verdict = ?verdict,
            "[3/3] tiebreaker decided"
        );

        Ok(session.finish(verdict))
    }
}

/// Turn an unusable-answer error into an `Unknown` sample.
pub fn sample_or_unknown(sample: Result<ClassificationResult>) -> Result<ClassificationResult> {
    match sample {
        Ok(result) => Ok(result),
        Err(err) if err.is_sample_noise() => {
            tracing::warn!(error = %err, "unusable oracle answer, counting as unknown");
            Ok(ClassificationResult::unknown())
        }
        Err(err) => Err(err),
    }
}

/// Majority vote over a full session.
///
/// Two or more `Open` confirm. Otherwise the more frequent non-open status
/// wins, with `Closed` taking a tie against `Unknown`.
fn majority(samples: &[ClassificationResult]) -> Verdict {
    let count = |status: GateStatus| samples.iter().filter(|s| s.status == status).count();

    let open = count(GateStatus::Open);
    let closed = count(GateStatus::Closed);
    let unknown = count(GateStatus::Unknown);

    if open >= 2 {
        Verdict::ConfirmedOpen
    } else if closed >= unknown {
        Verdict::ReportClosed
    } else {
        Verdict::ReportUnknown
    }
}

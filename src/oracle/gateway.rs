//! Oracle gateway: one logical classification per call.
//!
//! Builds the request, sends it under the retry policy, and parses the
//! answer. Holds no state between calls beyond its collaborators.

use crate::core::{parse_detailed, ClassificationResult, ParseSource};
use crate::error::Result;
use crate::oracle::error::OracleError;
use crate::oracle::models::SelectedModel;
use crate::oracle::prompt::OracleRequest;
use crate::oracle::references::ReferenceSet;
use crate::oracle::retry::{RetryPolicy, Sleeper};
use crate::oracle::traits::VisionOracle;

/// Wraps a [`VisionOracle`] with the parser and the retry policy.
pub struct OracleGateway<O: VisionOracle, S: Sleeper> {
    oracle: O,
    sleeper: S,
    policy: RetryPolicy,
}

impl<O: VisionOracle, S: Sleeper> OracleGateway<O, S> {
    /// Create a gateway with the rate-limit retry policy.
    pub fn new(oracle: O, sleeper: S) -> Self {
        Self::with_policy(oracle, sleeper, RetryPolicy::rate_limit())
    }

    pub fn with_policy(oracle: O, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            oracle,
            sleeper,
            policy,
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Classify one (already cropped) image.
    ///
    /// Rate limits are retried on the policy's schedule. Transport errors
    /// propagate at once. An answer with no usable text becomes
    /// `InvalidResponse`.
    pub fn classify(
        &self,
        image: &[u8],
        references: &ReferenceSet,
        model: &SelectedModel,
    ) -> Result<ClassificationResult> {
        let request = OracleRequest::classification(model, image, references);
        tracing::info!(
            model = %model,
            oracle = self.oracle.name(),
            references = references.len(),
            "analyzing image"
        );

        let raw = self
            .policy
            .run(&self.sleeper, |_| self.oracle.generate(&request))?;
        tracing::debug!(response = %raw.trim(), "oracle response");

        let parsed = parse_detailed(&raw)
            .map_err(|e| OracleError::unparsable_answer(e.to_string()))?;

        if parsed.source != ParseSource::Structured {
            tracing::warn!(source = ?parsed.source, "oracle answer was not clean JSON");
        }
        tracing::info!(
            status = %parsed.result.status,
            confidence = parsed.result.confidence,
            "parsed classification"
        );

        Ok(parsed.result)
    }
}

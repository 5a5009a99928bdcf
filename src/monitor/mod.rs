//! One gate check cycle.
//!
//! Capture a frame, classify it, let the confirmation engine decide how many
//! more samples it needs, then publish. A cycle either completes and
//! publishes, or fails and publishes nothing.

pub mod sink;
pub mod source;

pub use sink::{
    AlertEvent, AlertPayload, Availability, AvailabilityUpdate, MemorySink, PublishSink, Published,
    StateUpdate, Topics, GATE_OPEN_EVENT,
};
pub use source::{FileFrameSource, Frame, FrameSource, ScriptedFrameSource};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::core::{
    sample_or_unknown, ClassificationResult, ConfirmationEngine, ConfirmationOutcome, GateStatus,
    MAX_SAMPLES,
};
use crate::error::Result;
use crate::oracle::{OracleGateway, ReferenceSet, SelectedModel, Sleeper, VisionOracle};

/// Everything a cycle needs that does not change between cycles.
///
/// Built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct MonitorContext {
    pub model: SelectedModel,
    pub threshold: u8,
    pub references: ReferenceSet,
    pub topics: Topics,
}

impl MonitorContext {
    pub fn new(
        model: SelectedModel,
        threshold: u8,
        references: ReferenceSet,
        topics: Topics,
    ) -> Self {
        Self {
            model,
            threshold,
            references,
            topics,
        }
    }

    /// Build from loaded config plus the startup-time model choice and
    /// reference set.
    pub fn from_config(config: &Config, model: SelectedModel, references: ReferenceSet) -> Self {
        Self::new(
            model,
            config.detection.confidence_threshold,
            references,
            Topics::new(&config.publish.topic_prefix, &config.camera.name),
        )
    }

    pub fn camera(&self) -> &str {
        &self.topics.camera
    }
}

/// What a completed cycle decided and published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub model: String,
    pub outcome: ConfirmationOutcome,
    pub state: StateUpdate,
    pub alert: Option<AlertEvent>,
}

impl CycleReport {
    pub fn status(&self) -> GateStatus {
        self.outcome.final_status
    }
}

/// Where each sample's frame came from.
#[derive(Debug, Clone)]
struct FrameInfo {
    snapshot_ref: Option<String>,
    captured_at: DateTime<Utc>,
}

/// Runs check cycles through an oracle gateway.
pub struct Monitor<O: VisionOracle, S: Sleeper> {
    gateway: OracleGateway<O, S>,
}

impl<O: VisionOracle, S: Sleeper> Monitor<O, S> {
    pub fn new(gateway: OracleGateway<O, S>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &OracleGateway<O, S> {
        &self.gateway
    }

    /// Publish service availability.
    pub fn announce(
        &self,
        ctx: &MonitorContext,
        sink: &dyn PublishSink,
        availability: Availability,
    ) -> Result<()> {
        sink.publish_availability(&AvailabilityUpdate::new(&ctx.topics, availability))?;
        tracing::info!(status = %availability, "service status published");
        Ok(())
    }

    /// Run one full check cycle.
    ///
    /// Publishes the state, then the alert when the engine confirmed an open
    /// gate. When capture or classification fails nothing is published and
    /// the error is returned. A sink error is returned as soon as it happens,
    /// so a rejected alert leaves the state update already published.
    pub fn run_cycle(
        &self,
        ctx: &MonitorContext,
        source: &dyn FrameSource,
        sink: &dyn PublishSink,
    ) -> Result<CycleReport> {
        tracing::info!(camera = ctx.camera(), model = %ctx.model, "starting gate check");

        let (outcome, frames) = match self.decide(ctx, source) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(error = %e, "gate check failed, nothing published");
                return Err(e);
            }
        };

        let state = StateUpdate::new(&ctx.topics, outcome.final_status);
        sink.publish_state(&state)?;
        tracing::info!(topic = %state.topic, status = %state.status, "published state");

        let alert = if outcome.alert {
            let frame = confirming_frame(&outcome.samples, &frames);
            let alert = AlertEvent::gate_open(
                &ctx.topics,
                frame.map(|f| f.captured_at).unwrap_or_else(Utc::now),
                frame.and_then(|f| f.snapshot_ref.clone()),
            );
            sink.publish_alert(&alert)?;
            tracing::warn!(
                topic = %alert.topic,
                snapshot = ?alert.payload.snapshot,
                "gate is open, alert sent"
            );
            Some(alert)
        } else {
            let last = outcome.samples.last().copied();
            tracing::info!(
                status = %outcome.final_status,
                confidence = last.map(|s| s.confidence).unwrap_or(0),
                calls = outcome.calls(),
                "gate status"
            );
            None
        };

        Ok(CycleReport {
            model: ctx.model.as_str().to_string(),
            outcome,
            state,
            alert,
        })
    }

    fn decide(
        &self,
        ctx: &MonitorContext,
        source: &dyn FrameSource,
    ) -> Result<(ConfirmationOutcome, Vec<FrameInfo>)> {
        let engine = ConfirmationEngine::new(ctx.threshold);
        let mut frames = Vec::with_capacity(MAX_SAMPLES);

        let initial = sample_or_unknown(self.sample(ctx, source, &mut frames))?;
        let outcome = engine.evaluate(initial, || self.sample(ctx, source, &mut frames))?;

        Ok((outcome, frames))
    }

    /// Capture a fresh frame and classify it.
    fn sample(
        &self,
        ctx: &MonitorContext,
        source: &dyn FrameSource,
        frames: &mut Vec<FrameInfo>,
    ) -> Result<ClassificationResult> {
        let frame = source.capture()?;
        frames.push(FrameInfo {
            snapshot_ref: frame.snapshot_ref.clone(),
            captured_at: frame.captured_at,
        });
        self.gateway
            .classify(&frame.image, &ctx.references, &ctx.model)
    }
}

/// The frame behind the last `Open` sample.
fn confirming_frame<'a>(
    samples: &[ClassificationResult],
    frames: &'a [FrameInfo],
) -> Option<&'a FrameInfo> {
    samples
        .iter()
        .rposition(|s| s.status.is_open())
        .and_then(|i| frames.get(i))
}

//! Publish sink and payload shapes.
//!
//! The state topic carries the lowercase status and is retained. The alert
//! topic carries a JSON event and is not. The availability topic carries
//! `online` / `offline` and is retained.

use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::GateStatus;
use crate::error::{GateWatchError, Result};

/// Event name carried by every alert payload.
pub const GATE_OPEN_EVENT: &str = "gate_open";

/// Topic naming for one camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    pub prefix: String,
    pub camera: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>, camera: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            camera: camera.into(),
        }
    }

    /// `{prefix}/{camera}/status`
    pub fn state(&self) -> String {
        format!("{}/{}/status", self.prefix, self.camera)
    }

    /// `{prefix}/{camera}/alert`
    pub fn alert(&self) -> String {
        format!("{}/{}/alert", self.prefix, self.camera)
    }

    /// `{prefix}/status`
    pub fn availability(&self) -> String {
        format!("{}/status", self.prefix)
    }
}

/// A gate state update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub topic: String,
    pub status: GateStatus,
    pub retain: bool,
}

impl StateUpdate {
    pub fn new(topics: &Topics, status: GateStatus) -> Self {
        Self {
            topic: topics.state(),
            status,
            retain: true,
        }
    }

    pub fn payload(&self) -> &'static str {
        self.status.as_str()
    }
}

/// JSON body of an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub event: String,
    pub camera: String,
    /// RFC 3339 timestamp of the confirming frame.
    pub timestamp: String,
    pub snapshot: Option<String>,
}

/// A confirmed-open alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub topic: String,
    pub payload: AlertPayload,
}

impl AlertEvent {
    pub fn gate_open(
        topics: &Topics,
        captured_at: DateTime<Utc>,
        snapshot: Option<String>,
    ) -> Self {
        Self {
            topic: topics.alert(),
            payload: AlertPayload {
                event: GATE_OPEN_EVENT.to_string(),
                camera: topics.camera.clone(),
                timestamp: captured_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                snapshot,
            },
        }
    }

    /// Serialized payload as sent on the wire.
    pub fn payload_json(&self) -> Result<String> {
        serde_json::to_string(&self.payload).map_err(GateWatchError::from)
    }
}

/// Service availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Online,
    Offline,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An availability announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityUpdate {
    pub topic: String,
    pub availability: Availability,
    pub retain: bool,
}

impl AvailabilityUpdate {
    pub fn new(topics: &Topics, availability: Availability) -> Self {
        Self {
            topic: topics.availability(),
            availability,
            retain: true,
        }
    }
}

/// Destination for monitor output (an MQTT client in production).
pub trait PublishSink: Send + Sync {
    fn publish_state(&self, update: &StateUpdate) -> Result<()>;

    fn publish_alert(&self, alert: &AlertEvent) -> Result<()>;

    fn publish_availability(&self, update: &AvailabilityUpdate) -> Result<()>;
}

impl<T: PublishSink + ?Sized> PublishSink for &T {
    fn publish_state(&self, update: &StateUpdate) -> Result<()> {
        (**self).publish_state(update)
    }

    fn publish_alert(&self, alert: &AlertEvent) -> Result<()> {
        (**self).publish_alert(alert)
    }

    fn publish_availability(&self, update: &AvailabilityUpdate) -> Result<()> {
        (**self).publish_availability(update)
    }
}

/// Anything a sink received, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Published {
    State(StateUpdate),
    Alert(AlertEvent),
    Availability(AvailabilityUpdate),
}

/// In-memory sink that records every publish.
#[derive(Debug, Default)]
pub struct MemorySink {
    published: RwLock<Vec<Published>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> Vec<Published> {
        self.published
            .read()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn states(&self) -> Vec<StateUpdate> {
        self.published()
            .into_iter()
            .filter_map(|p| match p {
                Published::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.published()
            .into_iter()
            .filter_map(|p| match p {
                Published::Alert(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.published.read().map(|p| p.is_empty()).unwrap_or(true)
    }

    fn push(&self, item: Published) -> Result<()> {
        self.published
            .write()
            .map_err(|_| GateWatchError::publish("memory sink lock poisoned"))?
            .push(item);
        Ok(())
    }
}

impl PublishSink for MemorySink {
    fn publish_state(&self, update: &StateUpdate) -> Result<()> {
        self.push(Published::State(update.clone()))
    }

    fn publish_alert(&self, alert: &AlertEvent) -> Result<()> {
        self.push(Published::Alert(alert.clone()))
    }

    fn publish_availability(&self, update: &AvailabilityUpdate) -> Result<()> {
        self.push(Published::Availability(update.clone()))
    }
}

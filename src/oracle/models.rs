//! Model selection.
//!
//! Picks the one model identifier used for every classification call this
//! run. Selection never fails: it degrades to [`DEFAULT_MODEL`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FailOpen;
use crate::oracle::traits::VisionOracle;

/// Identifier used when the provider cannot tell us what is available.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Model family the fallbacks are restricted to. Providers also advertise
/// embedding and image-generation models that cannot classify a frame.
pub const FALLBACK_FAMILY: &str = "gemini";

/// Default preference order. Flash tiers come first for their higher free
/// quota.
pub const DEFAULT_PREFERENCE: &[&str] = &[
    "gemini-3-flash",
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "gemini-3-pro",
    "gemini-2.5-pro",
    "gemini-2.0-pro",
    "gemini-1.5-pro",
    "gemini-pro",
];

/// Ordered model-identifier patterns, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelPreference(Vec<String>);

impl ModelPreference {
    pub fn new(patterns: Vec<String>) -> Self {
        Self(patterns)
    }

    pub fn patterns(&self) -> &[String] {
        &self.0
    }
}

impl Default for ModelPreference {
    fn default() -> Self {
        Self(DEFAULT_PREFERENCE.iter().map(|s| s.to_string()).collect())
    }
}

/// The model chosen at startup. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedModel(String);

impl SelectedModel {
    /// Wrap an identifier, substituting [`DEFAULT_MODEL`] for a blank one.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.trim().is_empty() {
            Self(DEFAULT_MODEL.to_string())
        } else {
            Self(id)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the selected model was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Matched an entry of the preference list.
    Preferred,
    /// No preference matched; picked an advertised `gemini` `pro` model.
    ProFallback,
    /// No preference matched; picked the first advertised `gemini` model.
    FirstAvailable,
    /// Nothing usable was advertised; used the hard-coded default.
    Default,
}

/// A selected model and the reason it was picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub model: SelectedModel,
    pub reason: SelectionReason,
}

/// Strip the `models/` resource prefix the provider puts on identifiers.
pub fn normalize_model_id(id: &str) -> &str {
    let id = id.trim();
    id.strip_prefix("models/").unwrap_or(id)
}

/// Choose a model from the advertised identifiers.
pub fn select(available: &[String], preference: &ModelPreference) -> SelectedModel {
    select_with_reason(available, preference).model
}

/// Choose a model, reporting which rule decided.
///
/// Entries match exactly or by prefix, since provider names carry version
/// suffixes (`gemini-2.5-flash-001`).
pub fn select_with_reason(available: &[String], preference: &ModelPreference) -> Selection {
    let normalized: Vec<&str> = available
        .iter()
        .map(|id| normalize_model_id(id))
        .filter(|id| !id.is_empty())
        .collect();

    for pattern in preference.patterns() {
        if let Some(found) = normalized.iter().find(|id| id.starts_with(pattern.as_str())) {
            return Selection {
                model: SelectedModel::new(*found),
                reason: SelectionReason::Preferred,
            };
        }
    }

    let family: Vec<&str> = normalized
        .iter()
        .copied()
        .filter(|id| id.to_ascii_lowercase().contains(FALLBACK_FAMILY))
        .collect();

    if let Some(found) = family
        .iter()
        .find(|id| id.to_ascii_lowercase().contains("pro"))
    {
        return Selection {
            model: SelectedModel::new(*found),
            reason: SelectionReason::ProFallback,
        };
    }

    if let Some(first) = family.first() {
        return Selection {
            model: SelectedModel::new(*first),
            reason: SelectionReason::FirstAvailable,
        };
    }

    Selection {
        model: SelectedModel::new(DEFAULT_MODEL),
        reason: SelectionReason::Default,
    }
}

/// Ask the oracle what it offers and select from that.
///
/// A failed listing behaves like an empty one.
pub fn select_from_oracle(oracle: &dyn VisionOracle, preference: &ModelPreference) -> Selection {
    let available = oracle
        .list_models()
        .fail_open_default("listing available models");

    for id in &available {
        tracing::debug!(model = %id, "found model");
    }

    let selection = select_with_reason(&available, preference);
    tracing::info!(
        model = %selection.model,
        reason = ?selection.reason,
        advertised = available.len(),
        "selected model"
    );
    selection
}

//! Offline oracle driven by a JSON script.
//!
//! Each `generate` call pops the next scripted reply. Used by `replay` and by
//! tests to exercise the gateway and engine without a network.
//!
//! ```json
//! {
//!   "models": ["models/gemini-2.5-flash", "models/gemini-1.5-pro"],
//!   "responses": [
//!     {"error": {"kind": "rate_limited", "message": "quota"}},
//!     {"error": {"status": 503, "message": "backend unavailable"}},
//!     {"error": {"message": "429 RESOURCE_EXHAUSTED"}},
//!     "{\"status\": \"open\", \"confidence\": 90}"
//!   ]
//! }
//! ```
//!
//! An error names its kind directly, or is classified from an HTTP status
//! or from the provider message the way a live transport would.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{GateWatchError, Result};
use crate::oracle::error::{OracleError, OracleErrorKind};
use crate::oracle::prompt::OracleRequest;
use crate::oracle::traits::VisionOracle;
use crate::util::{read_to_string_with_limit, MAX_TEXT_SIZE};

/// A scripted failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OracleErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: String,
}

impl ScriptedError {
    fn to_oracle_error(&self) -> OracleError {
        match (self.kind, self.status) {
            (Some(kind), status) => OracleError {
                status,
                ..OracleError::new(kind, self.message.clone())
            },
            (None, Some(status)) => OracleError::from_status(status, &self.message),
            (None, None) => OracleError::from_message(self.message.clone()),
        }
    }
}

/// One scripted oracle answer: raw text or a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptedReply {
    Text(String),
    Error { error: ScriptedError },
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn error(kind: OracleErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            error: ScriptedError {
                kind: Some(kind),
                status: None,
                message: message.into(),
            },
        }
    }
}

/// On-disk script format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    /// Advertised models. `None` makes the listing fail.
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(default)]
    pub responses: Vec<ScriptedReply>,
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<OracleRequest>,
}

/// A [`VisionOracle`] that replays a fixed script.
#[derive(Debug)]
pub struct ScriptedOracle {
    models: Option<Vec<String>>,
    state: Mutex<ScriptState>,
}

impl ScriptedOracle {
    pub fn new(models: Vec<String>, replies: Vec<ScriptedReply>) -> Self {
        Self::from_script(Script {
            models: Some(models),
            responses: replies,
        })
    }

    pub fn from_script(script: Script) -> Self {
        Self {
            models: script.models,
            state: Mutex::new(ScriptState {
                replies: script.responses.into(),
                requests: Vec::new(),
            }),
        }
    }

    /// Load a script from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = read_to_string_with_limit(path, MAX_TEXT_SIZE)?;
        let script: Script = serde_json::from_str(&content).map_err(|e| {
            GateWatchError::serde(format!("invalid oracle script {}: {}", path.display(), e))
        })?;
        Ok(Self::from_script(script))
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.state.lock().map(|s| s.requests.len()).unwrap_or(0)
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.state.lock().map(|s| s.replies.len()).unwrap_or(0)
    }

    pub fn last_request(&self) -> Option<OracleRequest> {
        self.state.lock().ok()?.requests.last().cloned()
    }
}

impl VisionOracle for ScriptedOracle {
    fn generate(&self, request: &OracleRequest) -> std::result::Result<String, OracleError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| OracleError::transport("scripted oracle lock poisoned"))?;
        state.requests.push(request.clone());

        match state.replies.pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Error { error }) => Err(error.to_oracle_error()),
            None => Err(OracleError::transport("oracle script exhausted")),
        }
    }

    fn list_models(&self) -> Result<Vec<String>> {
        self.models
            .clone()
            .ok_or_else(|| OracleError::transport("model listing unavailable").into())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::models::SelectedModel;
    use crate::oracle::references::ReferenceSet;
    use std::fs;
    use tempfile::TempDir;

    fn request() -> OracleRequest {
        OracleRequest::classification(
            &SelectedModel::new("gemini-2.5-flash"),
            b"img",
            &ReferenceSet::empty(),
        )
    }

    #[test]
    fn test_replies_in_order_then_exhausts() {
        let oracle = ScriptedOracle::new(
            vec![],
            vec![
                ScriptedReply::text("first"),
                ScriptedReply::error(OracleErrorKind::RateLimited, "429"),
            ],
        );

        assert_eq!(oracle.generate(&request()).unwrap(), "first");
        assert!(oracle.generate(&request()).unwrap_err().is_retryable());
        let err = oracle.generate(&request()).unwrap_err();
        assert_eq!(err.kind, OracleErrorKind::Transport);
        assert_eq!(oracle.calls(), 3);
        assert_eq!(oracle.remaining(), 0);
    }

    #[test]
    fn test_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("script.json");
        fs::write(
            &path,
            r#"{
                "models": ["models/gemini-2.5-flash"],
                "responses": [
                    {"error": {"kind": "rate_limited", "message": "quota"}},
                    "{\"status\": \"open\", \"confidence\": 90}"
                ]
            }"#,
        )
        .unwrap();

        let oracle = ScriptedOracle::from_file(&path).unwrap();

        assert_eq!(oracle.list_models().unwrap(), vec!["models/gemini-2.5-flash"]);
        assert_eq!(oracle.remaining(), 2);
        let err = oracle.generate(&request()).unwrap_err();
        assert_eq!(err.kind, OracleErrorKind::RateLimited);
        assert_eq!(err.message, "quota");
    }

    #[test]
    fn test_errors_classified_like_a_live_transport() {
        let script: Script = serde_json::from_str(
            r#"{
                "responses": [
                    {"error": {"status": 429, "message": "Too Many Requests"}},
                    {"error": {"status": 503, "message": "backend unavailable"}},
                    {"error": {"message": "429 RESOURCE_EXHAUSTED"}},
                    {"error": {"message": "connection refused"}},
                    {"error": {"kind": "invalid_response", "status": 200, "message": "no candidates"}}
                ]
            }"#,
        )
        .unwrap();
        let oracle = ScriptedOracle::from_script(script);

        let rate_limited = oracle.generate(&request()).unwrap_err();
        assert_eq!(rate_limited.kind, OracleErrorKind::RateLimited);
        assert_eq!(rate_limited.status, Some(429));

        let unavailable = oracle.generate(&request()).unwrap_err();
        assert_eq!(unavailable.kind, OracleErrorKind::Transport);
        assert_eq!(unavailable.status, Some(503));

        assert!(oracle.generate(&request()).unwrap_err().is_retryable());
        assert_eq!(
            oracle.generate(&request()).unwrap_err().kind,
            OracleErrorKind::Transport
        );

        let invalid = oracle.generate(&request()).unwrap_err();
        assert_eq!(invalid.kind, OracleErrorKind::InvalidResponse);
        assert_eq!(invalid.status, Some(200));
        assert!(!invalid.parse_failure);
    }

    #[test]
    fn test_missing_models_makes_listing_fail() {
        let oracle = ScriptedOracle::from_script(Script::default());
        assert!(oracle.list_models().is_err());
    }

    #[test]
    fn test_invalid_script_is_serde_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "not json").unwrap();

        let err = ScriptedOracle::from_file(&path).unwrap_err();
        assert!(matches!(err, GateWatchError::Serde { .. }));
    }
}

//! Classified oracle failures.
//!
//! The kind tells the gateway whether a call is worth repeating: only rate
//! limits are retried.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an oracle call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleErrorKind {
    /// 429 / `RESOURCE_EXHAUSTED`: quota hit, retry after backoff.
    RateLimited,
    /// Network failure, auth failure, provider outage and anything else
    /// unclassified.
    Transport,
    /// The oracle answered but the answer held nothing usable.
    InvalidResponse,
}

impl fmt::Display for OracleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RateLimited => "rate_limited",
            Self::Transport => "transport",
            Self::InvalidResponse => "invalid_response",
        })
    }
}

/// A failed oracle call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("oracle error ({kind}): {message}")]
pub struct OracleError {
    pub kind: OracleErrorKind,
    /// HTTP status when the transport reported one.
    pub status: Option<u16>,
    pub message: String,
    /// The oracle answered but the parser could not read the answer.
    pub parse_failure: bool,
}

const MAX_MESSAGE_LEN: usize = 300;

impl OracleError {
    /// Create an error of the given kind.
    pub fn new(kind: OracleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: truncate(message.into()),
            parse_failure: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::RateLimited, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::Transport, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::InvalidResponse, message)
    }

    /// An answer that arrived but could not be parsed.
    ///
    /// Still `InvalidResponse`, but counted as an unknown sample rather than
    /// a failed cycle.
    pub fn unparsable_answer(message: impl Into<String>) -> Self {
        Self {
            parse_failure: true,
            ..Self::invalid_response(message)
        }
    }

    /// Classify an HTTP failure from the oracle provider.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = if status == 429 || is_quota_message(body) {
            OracleErrorKind::RateLimited
        } else {
            OracleErrorKind::Transport
        };

        Self {
            kind,
            status: Some(status),
            message: truncate(body.to_string()),
            parse_failure: false,
        }
    }

    /// Classify a failure known only by its message.
    ///
    /// Provider SDKs often surface quota errors as plain strings containing
    /// the status code or the `RESOURCE_EXHAUSTED` reason.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = if is_quota_message(&message) {
            OracleErrorKind::RateLimited
        } else {
            OracleErrorKind::Transport
        };
        Self::new(kind, message)
    }

    /// Whether waiting and repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind == OracleErrorKind::RateLimited
    }
}

fn is_quota_message(text: &str) -> bool {
    text.contains("429") || text.contains("RESOURCE_EXHAUSTED")
}

fn truncate(message: String) -> String {
    if message.chars().count() > MAX_MESSAGE_LEN {
        let head: String = message.chars().take(MAX_MESSAGE_LEN).collect();
        format!("{}...", head)
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_429_is_rate_limited() {
        let err = OracleError::from_status(429, "Too Many Requests");
        assert_eq!(err.kind, OracleErrorKind::RateLimited);
        assert_eq!(err.status, Some(429));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_status_resource_exhausted_body() {
        let body = r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#;
        let err = OracleError::from_status(400, body);
        assert_eq!(err.kind, OracleErrorKind::RateLimited);
    }

    #[test]
    fn test_from_status_other_is_transport() {
        for status in [401, 403, 404, 500, 503] {
            let err = OracleError::from_status(status, "nope");
            assert_eq!(err.kind, OracleErrorKind::Transport);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_from_message() {
        assert!(OracleError::from_message("429 RESOURCE_EXHAUSTED quota").is_retryable());
        assert!(!OracleError::from_message("connection refused").is_retryable());
    }

    #[test]
    fn test_invalid_response_is_not_retryable() {
        assert!(!OracleError::invalid_response("empty").is_retryable());
        assert!(!OracleError::unparsable_answer("empty").is_retryable());
    }

    #[test]
    fn test_only_unparsable_answers_are_parse_failures() {
        let unparsable = OracleError::unparsable_answer("empty oracle response");
        assert_eq!(unparsable.kind, OracleErrorKind::InvalidResponse);
        assert!(unparsable.parse_failure);

        assert!(!OracleError::invalid_response("no candidates").parse_failure);
        assert!(!OracleError::from_status(500, "boom").parse_failure);
    }

    #[test]
    fn test_long_messages_are_truncated() {
        let err = OracleError::transport("x".repeat(1000));
        assert_eq!(err.message.len(), MAX_MESSAGE_LEN + 3);
        assert!(err.message.ends_with("..."));
    }

    #[test]
    fn test_display() {
        let err = OracleError::rate_limited("quota");
        assert_eq!(err.to_string(), "oracle error (rate_limited): quota");
    }
}

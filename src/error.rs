//! Unified error types for gatewatch.
//!
//! Cycle-level failures (capture, oracle transport, exhausted rate limits)
//! propagate to the caller and abandon the cycle. Degradable concerns such as
//! model listing, reference loading and config loading go through [`FailOpen`]
//! and fall back to safe defaults instead of failing.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::oracle::OracleError;

/// The main error type for gatewatch operations.
#[derive(Error, Debug)]
pub enum GateWatchError {
    /// The frame source could not supply an image.
    #[error("capture error: {message}")]
    Capture { message: String },

    /// The vision oracle call failed.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// The oracle response contained no usable text at all.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Confirmation session misuse (e.g. recording past the sample cap).
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// Configuration loading or validation errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// I/O errors from config, fixture or reference image files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A frame, image or fixture file exceeded its read limit.
    #[error("file {path} is too large ({size} bytes, max {max} bytes)")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    /// JSON or TOML serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// The publish sink rejected an update.
    #[error("publish error: {message}")]
    Publish { message: String },
}

/// A specialized Result type for gatewatch operations.
pub type Result<T> = std::result::Result<T, GateWatchError>;

impl GateWatchError {
    /// Create a capture error.
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a publish error.
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    /// Whether this error describes a single noisy sample rather than a
    /// broken cycle.
    ///
    /// Unusable oracle output counts as an `UNKNOWN` sample inside a
    /// confirmation session. Everything else abandons the cycle.
    pub fn is_sample_noise(&self) -> bool {
        match self {
            Self::Parse { .. } => true,
            Self::Oracle(err) => err.parse_failure,
            _ => false,
        }
    }
}

impl From<io::Error> for GateWatchError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for GateWatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and return a safe default.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the gatewatch CLI.
pub mod exit_codes {
    /// Command completed.
    pub const SUCCESS: i32 = 0;

    /// Command failed (bad input, unreadable file).
    pub const ERROR: i32 = 1;

    /// A check cycle was abandoned; nothing was published.
    pub const CYCLE_FAILED: i32 = 2;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}

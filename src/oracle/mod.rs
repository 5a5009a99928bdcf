//! Vision oracle access for gatewatch.
//!
//! This module provides the transport trait, model selection, request
//! construction and the retrying gateway that turns one image into one
//! classification.
//!
//! Available oracles:
//! - **Scripted**: Replays a JSON script offline (replay command, tests)

pub mod error;
pub mod gateway;
pub mod models;
pub mod prompt;
pub mod references;
pub mod retry;
pub mod scripted;
pub mod traits;

pub use error::{OracleError, OracleErrorKind};
pub use gateway::OracleGateway;
pub use models::{
    normalize_model_id, select, select_from_oracle, select_with_reason, ModelPreference,
    SelectedModel, Selection, SelectionReason, DEFAULT_MODEL, DEFAULT_PREFERENCE, FALLBACK_FAMILY,
};
pub use prompt::{OracleRequest, RequestPart, CLASSIFICATION_TEMPERATURE};
pub use references::{ReferenceImage, ReferenceSet, REFERENCE_FILES};
pub use retry::{RecordingSleeper, RetryPolicy, Sleeper, ThreadSleeper, RATE_LIMIT_BACKOFF_SECS};
pub use scripted::{Script, ScriptedError, ScriptedOracle, ScriptedReply};
pub use traits::VisionOracle;

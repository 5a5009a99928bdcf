//! gatewatch - gate status confirmation engine
//!
//! gatewatch asks a vision oracle whether a gate is open, confirms an OPEN
//! answer with further samples before alerting, and survives oracle rate
//! limits and model churn.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod monitor;
pub mod oracle;
pub mod util;

pub use config::Config;
pub use crate::core::{
    parse, parse_detailed, ClassificationResult, ConfirmationEngine, ConfirmationOutcome,
    GateStatus, ParseSource, Verdict,
};
pub use error::{FailOpen, GateWatchError, Result};
pub use monitor::{
    Availability, CycleReport, FileFrameSource, Frame, FrameSource, MemorySink, Monitor,
    MonitorContext, PublishSink, Topics,
};
pub use oracle::{
    select, OracleError, OracleErrorKind, OracleGateway, ReferenceSet, RetryPolicy,
    ScriptedOracle, SelectedModel, VisionOracle,
};

// CLI commands
pub use cli::{ConfigCommand, InitCommand, ModelsCommand, ParseCommand, ReplayCommand};

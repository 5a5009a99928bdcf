//! CLI commands for gatewatch.
//!
//! This module provides the offline CLI commands, organized into:
//! - **Engine commands**: parse, models, replay (exercise the decision engine)
//! - **Utility commands**: init, config

// Engine commands
pub mod models_cmd;
pub mod parse_cmd;
pub mod replay;

// Utility commands
pub mod config_cmd;
pub mod init;

pub use config_cmd::ConfigCommand;
pub use init::InitCommand;
pub use models_cmd::ModelsCommand;
pub use parse_cmd::ParseCommand;
pub use replay::ReplayCommand;

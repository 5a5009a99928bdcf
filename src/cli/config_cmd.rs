//! Config command for gatewatch.
//!
//! Prints the effective configuration after layering and lists the values
//! that differ from the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{gatewatch_home, project_gatewatch_dir, Config};

/// Options for the config command.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// A value that differs from its default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigChange {
    pub key: String,
    pub default: String,
    pub effective: String,
}

/// Output format for the config command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOutput {
    pub success: bool,
    pub config: Config,
    /// Config files that exist and were consulted.
    pub sources: Vec<String>,
    pub changes: Vec<ConfigChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The config command implementation.
pub struct ConfigCommand {
    cwd: PathBuf,
}

impl ConfigCommand {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Load and report the effective configuration.
    pub fn run(&self, _options: &ConfigOptions) -> ConfigOutput {
        let config = Config::load_from_cwd(&self.cwd);

        let mut sources = Vec::new();
        if let Some(home) = gatewatch_home() {
            let user = home.join("config.toml");
            if user.is_file() {
                sources.push(user.display().to_string());
            }
        }
        let project = project_gatewatch_dir(&self.cwd).join("config.toml");
        if project.is_file() {
            sources.push(project.display().to_string());
        }

        let changes = Config::default()
            .diff(&config)
            .into_iter()
            .map(|(key, default, effective)| ConfigChange {
                key,
                default,
                effective,
            })
            .collect();

        let error = config.validate().err().map(|e| e.to_string());

        ConfigOutput {
            success: error.is_none(),
            config,
            sources,
            changes,
            error,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ConfigOutput, options: &ConfigOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ConfigOutput) -> String {
        let mut lines = Vec::new();

        if output.sources.is_empty() {
            lines.push("# Sources: defaults only".to_string());
        } else {
            lines.push("# Sources:".to_string());
            for source in &output.sources {
                lines.push(format!("#   {}", source));
            }
        }

        for change in &output.changes {
            lines.push(format!(
                "# {} = {} (default {})",
                change.key, change.effective, change.default
            ));
        }

        if let Some(error) = &output.error {
            lines.push(format!("# Invalid: {}", error));
        }

        lines.push(String::new());
        match output.config.to_toml() {
            Ok(text) => lines.push(text),
            Err(e) => lines.push(format!("# failed to render config: {}", e)),
        }

        lines.join("\n")
    }
}

//! Init command for gatewatch.
//!
//! Writes the default project config through [`Config::save_project`] and
//! creates the reference image directory next to it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{gatewatch_home, project_gatewatch_dir, Config};
use crate::error::{GateWatchError, Result};
use crate::oracle::REFERENCE_FILES;

/// Options for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Replace an existing config.toml with the defaults.
    pub force: bool,
}

/// Output format for the init command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitOutput {
    pub success: bool,
    /// Project config file, whether or not it was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    /// False when an existing config was kept.
    pub config_written: bool,
    /// Directory expected to hold the reference images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references_dir: Option<String>,
    /// Directories that did not exist before.
    pub created: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The init command implementation.
pub struct InitCommand {
    cwd: PathBuf,
}

impl InitCommand {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Scaffold the project. Everything already present is left alone
    /// unless `force` asks for a fresh config.
    pub fn run(&self, options: &InitOptions) -> InitOutput {
        let mut output = InitOutput::default();
        match self.scaffold(options, &mut output) {
            Ok(()) => output.success = true,
            Err(e) => {
                tracing::warn!(error = %e, "init failed");
                output.error = Some(e.to_string());
            }
        }
        output
    }

    fn scaffold(&self, options: &InitOptions, output: &mut InitOutput) -> Result<()> {
        let project_dir = project_gatewatch_dir(&self.cwd);
        let config_path = project_dir.join("config.toml");
        output.config_path = Some(config_path.display().to_string());

        if project_dir.exists() && !project_dir.is_dir() {
            return Err(GateWatchError::config(format!(
                "{} exists but is not a directory",
                project_dir.display()
            )));
        }

        let project_existed = project_dir.is_dir();
        if options.force || !config_path.exists() {
            Config::default().save_project(&self.cwd)?;
            output.config_written = true;
            if !project_existed {
                output.created.push(project_dir.display().to_string());
            }
        }

        let references = project_dir.join("references");
        output.references_dir = Some(references.display().to_string());

        // The user home holds the user config layer and crash.log.
        for dir in [Some(references), gatewatch_home()].into_iter().flatten() {
            if create_dir(&dir)? {
                output.created.push(dir.display().to_string());
            }
        }

        Ok(())
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InitOutput, options: &InitOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &InitOutput) -> String {
        if !output.success {
            return format!(
                "Init failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        if let Some(path) = &output.config_path {
            let action = if output.config_written {
                "written"
            } else {
                "kept existing"
            };
            lines.push(format!("Config:     {} ({})", path, action));
        }
        for dir in &output.created {
            lines.push(format!("Created:    {}", dir));
        }
        if let Some(references) = &output.references_dir {
            lines.push(String::new());
            lines.push(format!(
                "Few-shot mode uses {} from {}",
                REFERENCE_FILES
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
                references
            ));
        }

        lines.join("\n") + "\n"
    }
}

/// Create `dir` if missing. Returns whether it was created.
fn create_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(dir).map_err(|e| GateWatchError::storage(dir, e))?;
    Ok(true)
}

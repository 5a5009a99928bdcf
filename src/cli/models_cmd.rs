//! Models command for gatewatch.
//!
//! Shows which model would be selected from a set of advertised
//! identifiers, either given directly or listed by a scripted oracle.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;
use crate::oracle::{
    select_from_oracle, select_with_reason, ScriptedOracle, Selection, SelectionReason,
    VisionOracle,
};

/// Options for the models command.
#[derive(Debug, Clone, Default)]
pub struct ModelsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Oracle script whose model listing to use instead of explicit ids.
    pub fixture: Option<PathBuf>,
}

/// Output format for the models command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SelectionReason>,
    /// Identifiers considered (empty when the listing failed).
    pub advertised: Vec<String>,
    /// Preference list used.
    pub preference: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelsOutput {
    fn from_selection(selection: Selection, advertised: Vec<String>, preference: Vec<String>) -> Self {
        Self {
            success: true,
            selected: Some(selection.model.as_str().to_string()),
            reason: Some(selection.reason),
            advertised,
            preference,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            selected: None,
            reason: None,
            advertised: Vec::new(),
            preference: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The models command implementation.
pub struct ModelsCommand {
    config: Config,
}

impl ModelsCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Select a model from `available`, or from the fixture's listing.
    pub fn run(&self, available: &[String], options: &ModelsOptions) -> ModelsOutput {
        let preference = &self.config.models.preference;
        let patterns = preference.patterns().to_vec();

        match &options.fixture {
            Some(path) => {
                let oracle = match ScriptedOracle::from_file(path) {
                    Ok(oracle) => oracle,
                    Err(e) => return ModelsOutput::failure(e.to_string()),
                };
                let advertised = oracle.list_models().unwrap_or_default();
                let selection = select_from_oracle(&oracle, preference);
                ModelsOutput::from_selection(selection, advertised, patterns)
            }
            None => {
                let selection = select_with_reason(available, preference);
                ModelsOutput::from_selection(selection, available.to_vec(), patterns)
            }
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ModelsOutput, options: &ModelsOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ModelsOutput) -> String {
        if !output.success {
            return format!(
                "Model selection failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        if output.advertised.is_empty() {
            lines.push("Advertised: (none)".to_string());
        } else {
            lines.push("Advertised:".to_string());
            for id in &output.advertised {
                lines.push(format!("  {}", id));
            }
        }

        let reason = match output.reason {
            Some(SelectionReason::Preferred) => "matched preference list",
            Some(SelectionReason::ProFallback) => "no preference matched, picked a gemini pro model",
            Some(SelectionReason::FirstAvailable) => "no preference matched, picked first gemini model",
            Some(SelectionReason::Default) | None => "no usable model advertised, using default",
        };
        lines.push(String::new());
        lines.push(format!(
            "Selected: {} ({})",
            output.selected.as_deref().unwrap_or("-"),
            reason
        ));

        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::DEFAULT_MODEL;
    use std::fs;
    use tempfile::TempDir;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_from_explicit_ids() {
        let cmd = ModelsCommand::new(Config::default());
        let output = cmd.run(
            &ids(&["models/gemini-1.5-pro", "models/gemini-2.5-flash"]),
            &ModelsOptions::default(),
        );

        assert!(output.success);
        assert_eq!(output.selected.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(output.reason, Some(SelectionReason::Preferred));
        assert_eq!(output.preference.len(), 9);
    }

    #[test]
    fn test_no_ids_uses_default() {
        let cmd = ModelsCommand::new(Config::default());
        let output = cmd.run(&[], &ModelsOptions::default());
        assert_eq!(output.selected.as_deref(), Some(DEFAULT_MODEL));
        assert_eq!(output.reason, Some(SelectionReason::Default));
    }

    #[test]
    fn test_fixture_with_failing_listing_uses_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("script.json");
        fs::write(&path, r#"{"responses": []}"#).unwrap();

        let cmd = ModelsCommand::new(Config::default());
        let output = cmd.run(
            &[],
            &ModelsOptions {
                fixture: Some(path),
                ..Default::default()
            },
        );

        assert!(output.success);
        assert!(output.advertised.is_empty());
        assert_eq!(output.selected.as_deref(), Some(DEFAULT_MODEL));
    }

    #[test]
    fn test_custom_preference_from_config() {
        let mut config = Config::default();
        config.models.preference =
            crate::oracle::ModelPreference::new(ids(&["gemini-1.5-pro"]));

        let cmd = ModelsCommand::new(config);
        let output = cmd.run(
            &ids(&["gemini-2.5-flash", "gemini-1.5-pro-002"]),
            &ModelsOptions::default(),
        );
        assert_eq!(output.selected.as_deref(), Some("gemini-1.5-pro-002"));
    }

    #[test]
    fn test_missing_fixture_fails() {
        let cmd = ModelsCommand::new(Config::default());
        let output = cmd.run(
            &[],
            &ModelsOptions {
                fixture: Some(PathBuf::from("/nonexistent/script.json")),
                ..Default::default()
            },
        );
        assert!(!output.success);
    }

    #[test]
    fn test_format_output_human_readable() {
        let cmd = ModelsCommand::new(Config::default());
        let output = cmd.run(&ids(&["gemma-3", "gemini-exp-1206"]), &ModelsOptions::default());
        let formatted = cmd.format_output(&output, &ModelsOptions::default());

        assert!(formatted.contains("Advertised:"));
        assert!(formatted.contains("  gemma-3"));
        assert!(formatted.contains(
            "Selected: gemini-exp-1206 (no preference matched, picked first gemini model)"
        ));
    }
}

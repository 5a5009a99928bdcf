//! Parse command for gatewatch.
//!
//! Runs the classification parser over a raw oracle response and shows what
//! the confirmation engine would see after the confidence gate.

use serde::{Deserialize, Serialize};

use crate::config::{Config, DetectionConfig};
use crate::core::{parse_detailed, GateStatus, ParseSource};

/// Options for the parse command.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Threshold to gate with instead of the configured one.
    pub threshold: Option<u8>,
}

/// Output format for the parse command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOutput {
    pub success: bool,
    /// Status as parsed, before gating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GateStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    /// Which extraction stage produced the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ParseSource>,
    /// Threshold applied.
    pub threshold: u8,
    /// Status after the confidence gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gated_status: Option<GateStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseOutput {
    pub fn failure(threshold: u8, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status: None,
            confidence: None,
            source: None,
            threshold,
            gated_status: None,
            error: Some(error.into()),
        }
    }
}

/// The parse command implementation.
pub struct ParseCommand {
    config: Config,
}

impl ParseCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Parse `raw` and gate it.
    pub fn run(&self, raw: &str, options: &ParseOptions) -> ParseOutput {
        let threshold = options
            .threshold
            .unwrap_or(self.config.detection.confidence_threshold);

        if !DetectionConfig::is_valid_threshold(threshold) {
            return ParseOutput::failure(
                threshold,
                format!("threshold {} is outside 50-100", threshold),
            );
        }

        match parse_detailed(raw) {
            Ok(parsed) => {
                let gated = parsed.result.coerce(threshold);
                ParseOutput {
                    success: true,
                    status: Some(parsed.result.status),
                    confidence: Some(parsed.result.confidence),
                    source: Some(parsed.source),
                    threshold,
                    gated_status: Some(gated.status),
                    error: None,
                }
            }
            Err(e) => ParseOutput::failure(threshold, e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ParseOutput, options: &ParseOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ParseOutput) -> String {
        if !output.success {
            return format!(
                "Parse failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        if let (Some(status), Some(confidence)) = (output.status, output.confidence) {
            lines.push(format!("Parsed:    {} ({}%)", status, confidence));
        }
        if let Some(source) = output.source {
            lines.push(format!("Source:    {:?}", source));
        }
        if let Some(gated) = output.gated_status {
            lines.push(format!(
                "Reported:  {} (threshold {}%)",
                gated, output.threshold
            ));
        }
        lines.join("\n") + "\n"
    }
}

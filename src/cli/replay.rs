//! Replay command for gatewatch.
//!
//! Runs one full check cycle offline: model selection against a scripted
//! oracle, reference loading, capture from frame files, confirmation and
//! publishing into an in-memory sink whose contents are reported.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::core::{ClassificationResult, GateStatus, Verdict};
use crate::error::GateWatchError;
use crate::monitor::{
    Availability, FileFrameSource, MemorySink, Monitor, MonitorContext, Published,
};
use crate::oracle::{
    select_from_oracle, OracleGateway, RecordingSleeper, ReferenceSet, ScriptedOracle,
    SelectionReason, Sleeper, ThreadSleeper,
};

/// Options for the replay command.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Frame files, consumed one per capture.
    pub frames: Vec<PathBuf>,
    /// Actually sleep through rate-limit backoff instead of recording it.
    pub real_time: bool,
}

/// Output format for the replay command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionReason>,
    /// Reference images used (empty means zero-shot).
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GateStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    pub alert: bool,
    /// Coerced samples, in order.
    pub samples: Vec<ClassificationResult>,
    /// Oracle requests made, retries included.
    pub oracle_calls: usize,
    /// Backoff requested by the retry policy, in seconds.
    pub backoff_secs: u64,
    /// What reached the sink, in order.
    pub published: Vec<Published>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the failure was a check cycle failure (as opposed to bad input).
    #[serde(default)]
    pub cycle_failed: bool,
}

impl ReplayOutput {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            model: None,
            selection: None,
            references: Vec::new(),
            status: None,
            verdict: None,
            alert: false,
            samples: Vec::new(),
            oracle_calls: 0,
            backoff_secs: 0,
            published: Vec::new(),
            error: Some(error.into()),
            cycle_failed: false,
        }
    }
}

/// Records every wait, and sleeps through it when running in real time.
#[derive(Debug, Default)]
struct ReplaySleeper {
    recorded: RecordingSleeper,
    thread: Option<ThreadSleeper>,
}

impl Sleeper for ReplaySleeper {
    fn sleep(&self, duration: Duration) {
        self.recorded.sleep(duration);
        if let Some(thread) = &self.thread {
            thread.sleep(duration);
        }
    }
}

/// The replay command implementation.
pub struct ReplayCommand {
    cwd: PathBuf,
    config: Config,
}

impl ReplayCommand {
    pub fn new(cwd: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            cwd: cwd.into(),
            config,
        }
    }

    /// Replay one cycle against the oracle script at `fixture`.
    pub fn run(&self, fixture: &Path, options: &ReplayOptions) -> ReplayOutput {
        if options.frames.is_empty() {
            return ReplayOutput::failure("at least one frame file is required");
        }

        let oracle = match ScriptedOracle::from_file(fixture) {
            Ok(oracle) => oracle,
            Err(e) => return ReplayOutput::failure(e.to_string()),
        };

        let selection = select_from_oracle(&oracle, &self.config.models.preference);
        let references = ReferenceSet::load(&self.config.reference_dir(&self.cwd));
        let ctx = MonitorContext::from_config(&self.config, selection.model.clone(), references);

        let sleeper = ReplaySleeper {
            recorded: RecordingSleeper::new(),
            thread: options.real_time.then_some(ThreadSleeper),
        };
        let monitor = Monitor::new(OracleGateway::new(oracle, sleeper));
        let source = FileFrameSource::new(options.frames.clone());
        let sink = MemorySink::new();

        let cycle = monitor
            .announce(&ctx, &sink, Availability::Online)
            .and_then(|_| monitor.run_cycle(&ctx, &source, &sink));
        let offline = monitor.announce(&ctx, &sink, Availability::Offline);

        let gateway = monitor.gateway();
        let mut output = ReplayOutput {
            success: true,
            model: Some(selection.model.as_str().to_string()),
            selection: Some(selection.reason),
            references: ctx
                .references
                .file_names()
                .into_iter()
                .map(String::from)
                .collect(),
            status: None,
            verdict: None,
            alert: false,
            samples: Vec::new(),
            oracle_calls: gateway.oracle().calls(),
            backoff_secs: gateway.sleeper().recorded.total().as_secs(),
            published: sink.published(),
            error: None,
            cycle_failed: false,
        };

        match cycle.and_then(|report| offline.map(|_| report)) {
            Ok(report) => {
                output.status = Some(report.outcome.final_status);
                output.verdict = Some(report.outcome.verdict);
                output.alert = report.outcome.alert;
                output.samples = report.outcome.samples;
            }
            Err(e) => {
                output.success = false;
                output.cycle_failed = !matches!(e, GateWatchError::Publish { .. });
                output.error = Some(e.to_string());
            }
        }

        output
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ReplayOutput, options: &ReplayOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &ReplayOutput) -> String {
        let mut lines = Vec::new();

        if let Some(model) = &output.model {
            lines.push(format!("Model:      {}", model));
        }
        if output.model.is_some() {
            if output.references.is_empty() {
                lines.push("References: none (zero-shot)".to_string());
            } else {
                lines.push(format!("References: {}", output.references.join(", ")));
            }
        }

        for (i, sample) in output.samples.iter().enumerate() {
            lines.push(format!("Sample {}:   {}", i + 1, sample));
        }
        if output.backoff_secs > 0 {
            lines.push(format!("Backoff:    {}s", output.backoff_secs));
        }

        if !output.published.is_empty() {
            lines.push(String::new());
            lines.push("Published:".to_string());
            for item in &output.published {
                lines.push(format!("  {}", describe(item)));
            }
        }

        lines.push(String::new());
        if output.success {
            if let (Some(status), Some(verdict)) = (output.status, output.verdict) {
                lines.push(format!(
                    "Result: {} ({:?}, {} oracle call(s))",
                    status, verdict, output.oracle_calls
                ));
            }
        } else {
            lines.push(format!(
                "Replay failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            ));
        }

        lines.join("\n") + "\n"
    }
}

fn describe(item: &Published) -> String {
    match item {
        Published::State(update) => format!("{} <- {}", update.topic, update.payload()),
        Published::Alert(alert) => format!(
            "{} <- {}",
            alert.topic,
            alert.payload_json().unwrap_or_else(|_| "{}".to_string())
        ),
        Published::Availability(update) => {
            format!("{} <- {}", update.topic, update.availability)
        }
    }
}

//! gatewatch - gate status confirmation engine
//!
//! CLI entry point with global panic handler.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gatewatch::config::{crash_log_path, Config};
use gatewatch::error::exit_codes;
use gatewatch::util::{read_to_string_with_limit, MAX_TEXT_SIZE};

// =============================================================================
// CLI Definition
// =============================================================================

/// gatewatch - confirm gate status from a vision oracle before alerting
#[derive(Parser)]
#[command(name = "gatewatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a raw oracle answer into a classification
    Parse {
        /// File holding the answer (reads stdin when omitted)
        file: Option<PathBuf>,
        /// Confidence threshold override (50-100)
        #[arg(long, short)]
        threshold: Option<u8>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show which model would be selected
    Models {
        /// Advertised model identifiers
        ids: Vec<String>,
        /// Oracle script whose model listing to use
        #[arg(long, conflicts_with = "ids")]
        fixture: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Run one check cycle against a scripted oracle and frame files
    Replay {
        /// Oracle script (JSON)
        fixture: PathBuf,
        /// Frame image, one per capture; the last one repeats
        #[arg(long = "frame", required = true)]
        frames: Vec<PathBuf>,
        /// Sleep through rate-limit backoff instead of recording it
        #[arg(long)]
        real_time: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Create .gatewatch/ with a default config and reference directory
    Init {
        /// Overwrite an existing config.toml
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Print the effective layered configuration
    Config {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("gatewatch error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Log to stderr, filtered by `GATEWATCH_LOG` (defaults to `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("GATEWATCH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("gatewatch panic: {}", info);

        if let Some(crash_log) = crash_log_path() {
            if let Some(parent) = crash_log.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Parse {
            file,
            threshold,
            json,
            quiet,
        } => run_parse(file.as_deref(), threshold, json, quiet, &cwd),
        Commands::Models {
            ids,
            fixture,
            json,
            quiet,
        } => run_models(ids, fixture, json, quiet, &cwd),
        Commands::Replay {
            fixture,
            frames,
            real_time,
            json,
            quiet,
        } => run_replay(&fixture, frames, real_time, json, quiet, &cwd),
        Commands::Init { force, json, quiet } => run_init(json, quiet, force, &cwd),
        Commands::Config { json, quiet } => run_config(json, quiet, &cwd),
    }
}

fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn print_formatted(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

/// Read the raw answer from a file or stdin, bounded by `MAX_TEXT_SIZE`.
fn read_answer(file: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    match file {
        Some(path) => Ok(read_to_string_with_limit(path, MAX_TEXT_SIZE)?),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .take(MAX_TEXT_SIZE)
                .read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

// =============================================================================
// Engine commands
// =============================================================================

fn run_parse(
    file: Option<&Path>,
    threshold: Option<u8>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatewatch::cli::parse_cmd::{ParseCommand, ParseOptions};

    let raw = read_answer(file)?;
    let cmd = ParseCommand::new(Config::load_from_cwd(cwd));
    let options = ParseOptions {
        json,
        quiet,
        threshold,
    };

    let output = cmd.run(&raw, &options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_models(
    ids: Vec<String>,
    fixture: Option<PathBuf>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatewatch::cli::models_cmd::{ModelsCommand, ModelsOptions};

    let cmd = ModelsCommand::new(Config::load_from_cwd(cwd));
    let options = ModelsOptions {
        json,
        quiet,
        fixture,
    };

    let output = cmd.run(&ids, &options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_replay(
    fixture: &Path,
    frames: Vec<PathBuf>,
    real_time: bool,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatewatch::cli::replay::{ReplayCommand, ReplayOptions};

    let config = Config::load_from_cwd(cwd);
    config.validate()?;

    let cmd = ReplayCommand::new(cwd, config);
    let options = ReplayOptions {
        json,
        quiet,
        frames,
        real_time,
    };

    let output = cmd.run(fixture, &options);
    print_formatted(&cmd.format_output(&output, &options));

    if output.cycle_failed {
        return Ok(ExitCode::from(exit_codes::CYCLE_FAILED as u8));
    }
    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Utility commands
// =============================================================================

fn run_init(
    json: bool,
    quiet: bool,
    force: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatewatch::cli::init::{InitCommand, InitOptions};

    let cmd = InitCommand::new(cwd);
    let options = InitOptions { json, quiet, force };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_config(json: bool, quiet: bool, cwd: &Path) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatewatch::cli::config_cmd::{ConfigCommand, ConfigOptions};

    let cmd = ConfigCommand::new(cwd);
    let options = ConfigOptions { json, quiet };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================

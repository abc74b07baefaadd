// crates/conformance-cli/src/main.rs
// ============================================================================
// Module: Conformance CLI Entry Point
// Description: Command dispatcher for conformance runs, plans, and config checks.
// Purpose: Load a suite definition, run it against the target, and report.
// Dependencies: clap, conformance-config, conformance-core, conformance-http, serde_json, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! `conformance run` loads `conformance.toml`, builds the check suite,
//! resolves and executes it, and prints the report. The exit code is 0 when
//! the target conforms, 1 when a required check failed, and 2 on usage or
//! configuration errors. `conformance plan` stops after resolution and prints
//! the execution order. Security posture: configuration and target responses
//! are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use conformance_config::ConformanceConfig;
use conformance_config::OutputFormat;
use conformance_core::ExecutionPlan;
use conformance_core::FanoutEventSink;
use conformance_core::FileEventSink;
use conformance_core::NoopEventSink;
use conformance_core::Registry;
use conformance_core::RunEventSink;
use conformance_core::RunReport;
use conformance_core::StderrEventSink;
use conformance_core::UnitKind;
use conformance_core::resolve;
use conformance_core::resolve_all;
use conformance_core::run_suite;
use conformance_http::HttpClient;
use conformance_http::build_suite;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for a run where a required check failed.
const EXIT_NOT_CONFORMANT: u8 = 1;
/// Exit code for usage and configuration errors.
const EXIT_USAGE: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "conformance", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the configured suite against the target.
    Run(RunCommand),
    /// Resolve the suite and print the execution order without running it.
    Plan(PlanCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments selecting the configuration and requested checks.
#[derive(Args, Debug, Clone, Default)]
struct SuiteArgs {
    /// Optional config file path (defaults to conformance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Run only these check kinds and their prerequisites (repeatable).
    #[arg(long = "only", value_name = "KIND")]
    only: Vec<String>,
    /// Enable debug diagnostics and echo run events to stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

/// Configuration for the `run` command.
#[derive(Args, Debug, Clone, Default)]
struct RunCommand {
    /// Config and selection arguments.
    #[command(flatten)]
    suite: SuiteArgs,
    /// Report format (overrides `run.format`).
    #[arg(long, value_enum, value_name = "FORMAT")]
    format: Option<FormatArg>,
    /// JSON-lines run event log (overrides `run.event_log`).
    #[arg(long, value_name = "PATH")]
    event_log: Option<PathBuf>,
}

/// Configuration for the `plan` command.
#[derive(Args, Debug, Clone, Default)]
struct PlanCommand {
    /// Config and selection arguments.
    #[command(flatten)]
    suite: SuiteArgs,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a conformance configuration file.
    Validate(ConfigValidateCommand),
}

/// Configuration for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to conformance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Report format selector.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failures; every variant exits with the usage code.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration could not be loaded or validated.
    #[error("failed to load config: {0}")]
    Config(String),
    /// The suite could not be built from the configuration.
    #[error("failed to build suite: {0}")]
    Suite(String),
    /// The run event log could not be opened.
    #[error("failed to open event log {path}: {error}")]
    EventLog {
        /// Event log path.
        path: String,
        /// Underlying error.
        error: String,
    },
    /// Output could not be written.
    #[error("failed to write {stream}: {error}")]
    Output {
        /// Stream name.
        stream: &'static str,
        /// Underlying error.
        error: String,
    },
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli.command) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the selected command.
fn dispatch(command: Commands) -> CliResult<ExitCode> {
    match command {
        Commands::Run(command) => command_run(&command),
        Commands::Plan(command) => command_plan(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the configured suite and prints the report.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    init_tracing(command.suite.verbose);
    let config = load_config(command.suite.config.as_deref())?;
    let format = command.format.map_or(config.run.format, OutputFormat::from);
    let event_log = command.event_log.as_deref().or(config.run.event_log.as_deref());
    let events = build_event_sink(event_log, command.suite.verbose)?;
    let registry = build_registry(&config, events.as_ref())?;
    let requested = requested_kinds(&command.suite.only, &config);
    tracing::info!(checks = registry.len(), requested = requested.len(), "starting conformance run");
    let report = run_suite(registry, &requested, events.as_ref());
    write_stdout(&render_report(&report, format)?)?;
    Ok(exit_code_for(&report))
}

/// Maps a report to the process exit code.
fn exit_code_for(report: &RunReport) -> ExitCode {
    if report.is_conformant() { ExitCode::SUCCESS } else { ExitCode::from(EXIT_NOT_CONFORMANT) }
}

/// Renders a report in the selected format.
fn render_report(report: &RunReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(report.render_text()),
        OutputFormat::Json => serde_json::to_string_pretty(report).map_err(|err| CliError::Output {
            stream: "stdout",
            error: err.to_string(),
        }),
    }
}

// ============================================================================
// SECTION: Plan Command
// ============================================================================

/// Resolves the suite and prints the execution order.
fn command_plan(command: &PlanCommand) -> CliResult<ExitCode> {
    init_tracing(command.suite.verbose);
    let config = load_config(command.suite.config.as_deref())?;
    let events: Box<dyn RunEventSink> =
        if command.suite.verbose { Box::new(StderrEventSink) } else { Box::new(NoopEventSink) };
    let registry = build_registry(&config, events.as_ref())?;
    let requested = requested_kinds(&command.suite.only, &config);
    let plan = if requested.is_empty() {
        resolve_all(registry, events.as_ref())
    } else {
        resolve(registry, &requested, events.as_ref())
    };
    write_stdout(&render_plan(&plan))?;
    if plan.rejected().is_empty() && plan.unknown_requests().is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_NOT_CONFORMANT))
    }
}

/// Renders an execution plan as text.
fn render_plan(plan: &ExecutionPlan) -> String {
    let mut out = String::new();
    for (position, unit) in plan.units().iter().enumerate() {
        let marker = if unit.required() { "" } else { " (optional)" };
        let _ = write!(out, "{:>3}. {} [{}]{marker}", position + 1, unit.id(), unit.kind());
        let deps: Vec<&str> = unit.resolved_dependencies().iter().map(|link| link.id.as_str()).collect();
        if !deps.is_empty() {
            let _ = write!(out, " after {}", deps.join(", "));
        }
        out.push('\n');
    }
    for unit in plan.rejected() {
        let reason = unit.status_reason().unwrap_or("no reason recorded");
        let _ = writeln!(out, "  rejected {} [{}]: {reason}", unit.id(), unit.kind());
    }
    for kind in plan.unknown_requests() {
        let _ = writeln!(out, "  unknown kind {kind}");
    }
    let _ = writeln!(out, "{} planned, {} rejected", plan.len(), plan.rejected().len());
    out
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    write_stdout(&format!("config ok: {} checks against {}\n", config.checks.len(), config.target.base_url))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Suite Assembly
// ============================================================================

/// Loads and validates the configuration.
fn load_config(path: Option<&Path>) -> CliResult<ConformanceConfig> {
    ConformanceConfig::load(path).map_err(|err| CliError::Config(err.to_string()))
}

/// Builds the registry of configured checks.
fn build_registry(config: &ConformanceConfig, events: &dyn RunEventSink) -> CliResult<Registry> {
    let base_url = config.base_url().map_err(|err| CliError::Config(err.to_string()))?;
    let client = HttpClient::new(config.http.clone()).map_err(|err| CliError::Suite(err.to_string()))?;
    build_suite(&config.checks, &base_url, &Arc::new(client), events).map_err(|err| CliError::Suite(err.to_string()))
}

/// Returns the requested kinds: `--only` when given, else the configured list.
fn requested_kinds(only: &[String], config: &ConformanceConfig) -> Vec<UnitKind> {
    if only.is_empty() { config.requested_kinds() } else { only.iter().map(UnitKind::new).collect() }
}

/// Builds the run event sink from the log path and verbosity.
fn build_event_sink(event_log: Option<&Path>, verbose: bool) -> CliResult<Box<dyn RunEventSink>> {
    let mut sinks: Vec<Box<dyn RunEventSink>> = Vec::new();
    if let Some(path) = event_log {
        let sink = FileEventSink::new(path).map_err(|err| CliError::EventLog {
            path: path.display().to_string(),
            error: err.to_string(),
        })?;
        sinks.push(Box::new(sink));
    }
    if verbose {
        sinks.push(Box::new(StderrEventSink));
    }
    Ok(match sinks.len() {
        0 => Box::new(NoopEventSink),
        1 => sinks.remove(0),
        _ => Box::new(FanoutEventSink::new(sinks)),
    })
}

/// Installs the stderr diagnostic subscriber; `RUST_LOG` overrides the level.
fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).without_time())
        .try_init();
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes text to stdout, adding a trailing newline when missing.
fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    let result = if text.ends_with('\n') { stdout.write_all(text.as_bytes()) } else { writeln!(&mut stdout, "{text}") };
    result.map_err(|err| CliError::Output {
        stream: "stdout",
        error: err.to_string(),
    })
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns the usage exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_USAGE)
}

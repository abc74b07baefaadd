// crates/conformance-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing, suite assembly, and exit codes.
// Purpose: Ensure commands map reports and failures to the documented exit codes.
// Dependencies: conformance-cli main helpers
// ============================================================================

//! ## Overview
//! Exercises the command helpers directly with temporary configuration files.
//! The target used here is a closed local port, so runs fail fast without a
//! live server.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use conformance_config::ConformanceConfig;
use conformance_config::OutputFormat;
use conformance_core::NoopEventSink;
use conformance_core::UnitStatus;
use conformance_core::resolve_all;
use conformance_core::run_suite;
use tempfile::TempDir;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::ConfigValidateCommand;
use super::FormatArg;
use super::PlanCommand;
use super::RunCommand;
use super::SuiteArgs;
use super::build_event_sink;
use super::build_registry;
use super::command_config_validate;
use super::command_plan;
use super::command_run;
use super::exit_code_for;
use super::render_plan;
use super::render_report;
use super::requested_kinds;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Suite against a closed local port: the fetch fails and inspections are blocked.
const CLOSED_PORT_TOML: &str = r#"
[target]
base_url = "http://127.0.0.1:1/"

[http]
allow_http = true
allow_private_networks = true
timeout_ms = 2000

[[checks]]
id = "root"
type = "fetch"
path = "/"

[[checks]]
id = "root-status"
type = "status"
source = "root"
expect = [200]

[[checks]]
id = "root-body"
type = "body_contains"
source = "root"
text = "hello"
required = false
"#;

fn write_config(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conformance.toml");
    fs::write(&path, content).unwrap();
    (dir, path)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn run_arguments_parse() {
    let cli = Cli::try_parse_from([
        "conformance",
        "run",
        "--config",
        "suite.toml",
        "--only",
        "a",
        "--only",
        "b",
        "--format",
        "json",
        "--event-log",
        "events.jsonl",
        "--verbose",
    ])
    .unwrap();
    let Commands::Run(command) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(command.suite.config, Some(PathBuf::from("suite.toml")));
    assert_eq!(command.suite.only, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(command.format, Some(FormatArg::Json));
    assert_eq!(command.event_log, Some(PathBuf::from("events.jsonl")));
    assert!(command.suite.verbose);
}

#[test]
fn config_validate_arguments_parse() {
    let cli = Cli::try_parse_from(["conformance", "config", "validate", "--config", "x.toml"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Validate(ConfigValidateCommand {
                config: Some(_),
            }),
        }
    ));
}

#[test]
fn unknown_format_is_a_usage_error() {
    assert!(Cli::try_parse_from(["conformance", "run", "--format", "xml"]).is_err());
}

#[test]
fn only_overrides_configured_request() {
    let config = ConformanceConfig::from_toml(&format!("{CLOSED_PORT_TOML}\n[run]\nrequested = [\"root-status\"]\n"))
        .unwrap();
    let configured = requested_kinds(&[], &config);
    assert_eq!(configured.len(), 1);
    assert_eq!(configured[0].as_str(), "root-status");
    let overridden = requested_kinds(&["root-body".to_string()], &config);
    assert_eq!(overridden[0].as_str(), "root-body");
}

#[test]
fn unreachable_target_is_not_conformant() {
    let config = ConformanceConfig::from_toml(CLOSED_PORT_TOML).unwrap();
    let registry = build_registry(&config, &NoopEventSink).unwrap();
    let report = run_suite(registry, &[], &NoopEventSink);
    assert_eq!(report.status_of("root"), Some(UnitStatus::Failed));
    assert_eq!(report.status_of("root-status"), Some(UnitStatus::PrereqFailed));
    assert_eq!(report.status_of("root-body"), Some(UnitStatus::PrereqFailed));
    assert_eq!(exit_code_for(&report), ExitCode::from(1));

    let json = render_report(&report, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"]["required_failed"], 1);
    assert!(render_report(&report, OutputFormat::Text).unwrap().contains("NOT CONFORMANT"));
}

#[test]
fn run_command_writes_event_log_and_exits_not_conformant() {
    let (dir, path) = write_config(CLOSED_PORT_TOML);
    let log = dir.path().join("events.jsonl");
    let command = RunCommand {
        suite: SuiteArgs {
            config: Some(path),
            ..SuiteArgs::default()
        },
        format: Some(FormatArg::Json),
        event_log: Some(log.clone()),
    };
    let code = command_run(&command).unwrap();
    assert_eq!(code, ExitCode::from(1));
    let lines = fs::read_to_string(&log).unwrap();
    assert!(lines.lines().any(|line| line.contains("\"event\":\"run_completed\"")));
}

#[test]
fn missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let command = RunCommand {
        suite: SuiteArgs {
            config: Some(dir.path().join("absent.toml")),
            ..SuiteArgs::default()
        },
        ..RunCommand::default()
    };
    let err = command_run(&command).unwrap_err();
    assert!(err.to_string().starts_with("failed to load config"));
}

#[test]
fn plan_lists_order_and_rejections() {
    let extra = "[[checks]]\nid = \"late\"\ntype = \"status\"\nsource = \"root\"\nexpect = [200]\nrequires = [\"missing\"]\n";
    let config = ConformanceConfig::from_toml(&format!("{CLOSED_PORT_TOML}\n{extra}")).unwrap();
    let registry = build_registry(&config, &NoopEventSink).unwrap();
    let plan = resolve_all(registry, &NoopEventSink);
    let text = render_plan(&plan);
    assert!(text.contains("  1. root [root]"));
    assert!(text.contains("root-body [root-body] (optional) after root"));
    assert!(text.contains("rejected late [late]: prerequisite missing is not registered"));
    assert!(text.ends_with("3 planned, 1 rejected\n"));
}

#[test]
fn plan_command_exits_cleanly_when_everything_resolves() {
    let (_dir, path) = write_config(CLOSED_PORT_TOML);
    let command = PlanCommand {
        suite: SuiteArgs {
            config: Some(path),
            ..SuiteArgs::default()
        },
    };
    assert_eq!(command_plan(&command).unwrap(), ExitCode::SUCCESS);
}

#[test]
fn config_validate_accepts_valid_file() {
    let (_dir, path) = write_config(CLOSED_PORT_TOML);
    let command = ConfigValidateCommand {
        config: Some(path),
    };
    assert_eq!(command_config_validate(&command).unwrap(), ExitCode::SUCCESS);
}

#[test]
fn event_log_in_missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("events.jsonl");
    assert!(build_event_sink(Some(&path), false).is_err());
    assert!(build_event_sink(None, true).is_ok());
}

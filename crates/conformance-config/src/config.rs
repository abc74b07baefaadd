// crates/conformance-config/src/config.rs
// ============================================================================
// Module: Conformance Configuration
// Description: Configuration loading and validation for conformance runs.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: conformance-core, conformance-http, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a run never starts from a
//! partially understood suite.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use conformance_core::UnitKind;
use conformance_http::CheckDefinition;
use conformance_http::CheckSpec;
use conformance_http::HttpClientConfig;
use conformance_http::Url;
use conformance_http::validate_url;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "conformance.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "CONFORMANCE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of checks in one suite.
pub(crate) const MAX_CHECKS: usize = 1024;
/// Maximum length of a check identifier or kind.
pub(crate) const MAX_CHECK_NAME_LENGTH: usize = 128;
/// Minimum HTTP request timeout in milliseconds.
pub(crate) const MIN_HTTP_TIMEOUT_MS: u64 = 100;
/// Maximum HTTP request timeout in milliseconds.
pub(crate) const MAX_HTTP_TIMEOUT_MS: u64 = 120_000;
/// Maximum response size a check may capture.
pub(crate) const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Top-level conformance configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConformanceConfig {
    /// System under test.
    pub target: TargetConfig,
    /// HTTP collaborator limits.
    #[serde(default)]
    pub http: HttpClientConfig,
    /// Run options.
    #[serde(default)]
    pub run: RunConfig,
    /// Suite definition.
    #[serde(default)]
    pub checks: Vec<CheckSpec>,
}

/// Target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Base URL that fetch paths are joined onto.
    pub base_url: String,
}

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable text report.
    #[default]
    Text,
    /// JSON report.
    Json,
}

/// Run options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Optional JSON-lines run event log.
    pub event_log: Option<PathBuf>,
    /// Report output format.
    pub format: OutputFormat,
    /// Kinds to run; empty runs every check.
    pub requested: Vec<String>,
}

impl ConformanceConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http(&self.http)?;
        self.base_url()?;
        self.run.validate()?;
        validate_checks(&self.checks)?;
        Ok(())
    }

    /// Returns the parsed target base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the URL does not parse or is
    /// refused by the HTTP policy.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.target.base_url.trim())
            .map_err(|err| ConfigError::Invalid(format!("target.base_url is not a url: {err}")))?;
        validate_url(&url, &self.http).map_err(|err| ConfigError::Invalid(format!("target.base_url: {err}")))?;
        Ok(url)
    }

    /// Returns the configured requested kinds.
    #[must_use]
    pub fn requested_kinds(&self) -> Vec<UnitKind> {
        self.run.requested.iter().map(UnitKind::new).collect()
    }
}

impl RunConfig {
    /// Validates run options.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.event_log {
            validate_path_string("run.event_log", &path.to_string_lossy())?;
        }
        for kind in &self.requested {
            validate_name("run.requested", kind)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a check identifier or kind.
fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed != value {
        return Err(ConfigError::Invalid(format!("{field} must not have surrounding whitespace: {value}")));
    }
    if value.len() > MAX_CHECK_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds {MAX_CHECK_NAME_LENGTH} characters")));
    }
    Ok(())
}

/// Validates a millisecond value lies within bounds.
fn validate_timeout_range(field: &str, value_ms: u64, min_ms: u64, max_ms: u64) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!("{field} must be between {min_ms} and {max_ms} milliseconds")));
    }
    Ok(())
}

/// Validates HTTP collaborator limits.
fn validate_http(http: &HttpClientConfig) -> Result<(), ConfigError> {
    validate_timeout_range("http.timeout_ms", http.timeout_ms, MIN_HTTP_TIMEOUT_MS, MAX_HTTP_TIMEOUT_MS)?;
    if http.max_response_bytes == 0 || http.max_response_bytes > MAX_RESPONSE_BYTES {
        return Err(ConfigError::Invalid(format!(
            "http.max_response_bytes must be between 1 and {MAX_RESPONSE_BYTES}"
        )));
    }
    if http.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("http.user_agent must be non-empty".to_string()));
    }
    if let Some(hosts) = &http.allowed_hosts
        && hosts.iter().any(|host| host.trim().is_empty())
    {
        return Err(ConfigError::Invalid("http.allowed_hosts entries must be non-empty".to_string()));
    }
    Ok(())
}

/// Validates the suite definition.
///
/// Identifiers and kinds must be unique and every inspection must name a
/// fetch check as its source. Ordering-only `requires` entries are left to
/// resolution, which rejects the dependent when a kind is missing.
fn validate_checks(checks: &[CheckSpec]) -> Result<(), ConfigError> {
    if checks.is_empty() {
        return Err(ConfigError::Invalid("at least one check is required".to_string()));
    }
    if checks.len() > MAX_CHECKS {
        return Err(ConfigError::Invalid(format!("checks exceeds max of {MAX_CHECKS}")));
    }
    let mut ids: BTreeSet<&str> = BTreeSet::new();
    let mut kinds: BTreeMap<String, &CheckSpec> = BTreeMap::new();
    for check in checks {
        validate_name("checks.id", &check.id)?;
        if let Some(kind) = &check.kind {
            validate_name(&format!("checks[{}].kind", check.id), kind)?;
        }
        if !ids.insert(check.id.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate check id: {}", check.id)));
        }
        let kind = check.unit_kind().as_str().to_string();
        if let Some(existing) = kinds.insert(kind.clone(), check) {
            return Err(ConfigError::Invalid(format!(
                "check {} reuses kind {kind} of check {}",
                check.id, existing.id
            )));
        }
        for required in &check.requires {
            validate_name(&format!("checks[{}].requires", check.id), required)?;
        }
        validate_definition(check)?;
    }
    for check in checks {
        if let Some(source) = check.check.source() {
            match kinds.get(source).map(|spec| &spec.check) {
                Some(CheckDefinition::Fetch {
                    ..
                }) => {}
                Some(other) => {
                    return Err(ConfigError::Invalid(format!(
                        "check {} inspects {source}, which is a {} check, not a fetch",
                        check.id,
                        other.label()
                    )));
                }
                None => {
                    return Err(ConfigError::Invalid(format!(
                        "check {} inspects unknown fetch {source}",
                        check.id
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Validates the fields of one check definition.
fn validate_definition(check: &CheckSpec) -> Result<(), ConfigError> {
    match &check.check {
        CheckDefinition::Fetch {
            path, ..
        } => {
            if path.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("check {}: path must be non-empty", check.id)));
            }
        }
        CheckDefinition::Status {
            expect, ..
        } => {
            if expect.is_empty() {
                return Err(ConfigError::Invalid(format!("check {}: expect must list a status", check.id)));
            }
            if let Some(code) = expect.iter().find(|code| !(100 ..= 599).contains(*code)) {
                return Err(ConfigError::Invalid(format!("check {}: {code} is not an http status", check.id)));
            }
        }
        CheckDefinition::Header {
            name,
            equals,
            contains,
            ..
        } => {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("check {}: header name must be non-empty", check.id)));
            }
            if equals.is_some() && contains.is_some() {
                return Err(ConfigError::Invalid(format!(
                    "check {}: equals and contains are mutually exclusive",
                    check.id
                )));
            }
        }
        CheckDefinition::BodyContains {
            text, ..
        } => {
            if text.is_empty() {
                return Err(ConfigError::Invalid(format!("check {}: text must be non-empty", check.id)));
            }
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn validate_timeout_accepts_exact_boundaries() {
        assert!(validate_timeout_range("test", 100, 100, 1000).is_ok());
        assert!(validate_timeout_range("test", 1000, 100, 1000).is_ok());
        assert!(validate_timeout_range("test", 99, 100, 1000).is_err());
        assert!(validate_timeout_range("test", 1001, 100, 1000).is_err());
    }

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        let err = validate_path_string("run.event_log", "   ").unwrap_err();
        assert_eq!(err, ConfigError::Invalid("run.event_log must be non-empty".to_string()));
    }

    #[test]
    fn validate_path_string_rejects_component_too_long() {
        let path = format!("logs/{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
        assert!(validate_path_string("run.event_log", &path).is_err());
    }

    #[test]
    fn validate_name_rejects_padding() {
        assert!(validate_name("checks.id", " root").is_err());
        assert!(validate_name("checks.id", "root").is_ok());
    }

    #[test]
    fn validate_name_rejects_overlong_names() {
        let name = "k".repeat(MAX_CHECK_NAME_LENGTH + 1);
        assert!(validate_name("checks.id", &name).is_err());
    }

    #[test]
    fn explicit_path_wins_over_defaults() {
        let resolved = resolve_path(Some(Path::new("suite.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("suite.toml"));
    }
}

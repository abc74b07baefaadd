// crates/conformance-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Fixtures
// Description: Minimal valid configuration text shared by config tests.
// Purpose: Give each test a known-good baseline to mutate.
// =============================================================================

//! Shared fixtures for conformance-config tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use conformance_config::ConfigError;
use conformance_config::ConformanceConfig;

/// Minimal valid configuration: one fetch and one status check.
pub const MINIMAL_TOML: &str = r#"
[target]
base_url = "https://example.com/"

[[checks]]
id = "root"
type = "fetch"
path = "/"

[[checks]]
id = "root-status"
type = "status"
source = "root"
expect = [200]
"#;

/// Parses the minimal configuration.
pub fn minimal_config() -> Result<ConformanceConfig, ConfigError> {
    ConformanceConfig::from_toml(MINIMAL_TOML)
}

/// Parses the minimal configuration followed by `extra` TOML text.
pub fn config_with(extra: &str) -> Result<ConformanceConfig, ConfigError> {
    ConformanceConfig::from_toml(&format!("{MINIMAL_TOML}\n{extra}"))
}

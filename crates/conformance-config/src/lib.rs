// crates/conformance-config/src/lib.rs
// ============================================================================
// Module: Conformance Config Library
// Description: Configuration model and validation for conformance runs.
// Purpose: Single source of truth for conformance.toml semantics.
// Dependencies: conformance-core, conformance-http, serde, toml
// ============================================================================

//! ## Overview
//! `conformance-config` defines the `conformance.toml` model: the target under
//! test, HTTP collaborator limits, run options, and the `[[checks]]` suite
//! definition. Loading is strict and fails closed.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::ConformanceConfig;
pub use config::OutputFormat;
pub use config::RunConfig;
pub use config::TargetConfig;

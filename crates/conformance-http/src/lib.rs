// crates/conformance-http/src/lib.rs
// ============================================================================
// Module: Conformance HTTP Library
// Description: HTTP client and built-in clause checks for conformance runs.
// Purpose: Provide concrete test units that exercise a target over HTTP.
// Dependencies: conformance-core, reqwest, serde
// ============================================================================

//! ## Overview
//! This crate supplies the HTTP side of a conformance run: a bounded blocking
//! client, fetch and inspection checks implementing
//! [`conformance_core::ConformanceTest`], and a builder that turns declarative
//! check definitions into a registry.
//! Security posture: the target is untrusted; responses are size-capped and
//! redirects are never followed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod checks;
pub mod client;
pub mod suite;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use checks::BodyContainsCheck;
pub use checks::FetchCheck;
pub use checks::HeaderCheck;
pub use checks::HeaderExpectation;
pub use checks::Inspection;
pub use checks::StatusCheck;
pub use client::HttpClient;
pub use client::HttpClientConfig;
pub use client::HttpError;
pub use client::HttpMethod;
pub use client::RequestSpec;
pub use client::validate_url;
pub use reqwest::Url;
pub use suite::CheckDefinition;
pub use suite::CheckSpec;
pub use suite::SuiteError;
pub use suite::build_suite;
pub use suite::build_unit;

// crates/conformance-core/src/lib.rs
// ============================================================================
// Module: Conformance Core Library
// Description: Public API surface for the conformance orchestration core.
// Purpose: Expose unit types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The conformance core orchestrates clause checks against a target service.
//! Checks are registered as test units, requested kinds are resolved into a
//! dependency-ordered plan, and the plan is executed sequentially so that a
//! failing prerequisite blocks its dependents instead of producing misleading
//! failures. Dependents can configure prerequisites through deferred
//! properties, which are only honored across a declared dependency edge.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::ConformanceTest;
pub use interfaces::RunEvent;
pub use interfaces::RunEventKind;
pub use interfaces::RunEventSink;
pub use interfaces::TestFailure;
pub use interfaces::ensure;
pub use runtime::ExecutionEngine;
pub use runtime::ExecutionPlan;
pub use runtime::FanoutEventSink;
pub use runtime::FileEventSink;
pub use runtime::MemoryEventSink;
pub use runtime::NoopEventSink;
pub use runtime::Registry;
pub use runtime::RegistryError;
pub use runtime::Resolution;
pub use runtime::Resolver;
pub use runtime::RunReport;
pub use runtime::RunSummary;
pub use runtime::StderrEventSink;
pub use runtime::UnitReport;
pub use runtime::resolve;
pub use runtime::resolve_all;
pub use runtime::run_suite;

// crates/conformance-core/src/runtime/mod.rs
// ============================================================================
// Module: Conformance Runtime
// Description: Registry, dependency resolver, execution engine, and reporting.
// Purpose: Move registered units through planning, execution, and cleanup.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! A run has three phases: units are registered, requested kinds are resolved
//! into a dependency-ordered plan, and the plan is executed sequentially.
//! [`run_suite`] chains all three for callers that do not need to inspect the
//! plan in between.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod engine;
pub mod events;
pub mod registry;
pub mod report;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::ExecutionEngine;
pub use events::FanoutEventSink;
pub use events::FileEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use registry::Registry;
pub use registry::RegistryError;
pub use report::RunReport;
pub use report::RunSummary;
pub use report::UnitReport;
pub use resolver::ExecutionPlan;
pub use resolver::Resolution;
pub use resolver::Resolver;
pub use resolver::resolve;
pub use resolver::resolve_all;

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::UnitKind;
use crate::interfaces::RunEventSink;

// ============================================================================
// SECTION: Suite Runner
// ============================================================================

/// Resolves and executes a registry.
///
/// An empty `requested` slice runs every registered unit in registration order.
#[must_use]
pub fn run_suite(registry: Registry, requested: &[UnitKind], events: &dyn RunEventSink) -> RunReport {
    let mut plan = if requested.is_empty() {
        resolve_all(registry, events)
    } else {
        resolve(registry, requested, events)
    };
    ExecutionEngine::new(events).run(&mut plan)
}

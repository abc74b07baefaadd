// crates/conformance-core/src/interfaces/mod.rs
// ============================================================================
// Module: Conformance Interfaces
// Description: Contract surfaces between the orchestration core and its collaborators.
// Purpose: Define the per-clause test behavior and the run event sink.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! The core never knows what a clause check does. Each check implements
//! [`ConformanceTest`] and is wrapped in a [`crate::TestUnit`] that owns the
//! status, warnings, wiring, and retained artifact. Observers receive
//! [`RunEvent`] records through a [`RunEventSink`] so deployments can route run
//! logs wherever they like.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::UnitId;
use crate::core::identifiers::UnitKind;
use crate::core::property::PropertyError;
use crate::core::property::UnitProperty;
use crate::core::status::UnitStatus;
use crate::core::unit::ExecutionContext;

// ============================================================================
// SECTION: Test Failures
// ============================================================================

/// Failure raised from inside a unit's execution.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestFailure {
    /// The clause under test does not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),
    /// The check could not complete for a reason unrelated to the clause.
    #[error("unexpected failure: {0}")]
    Runtime(String),
}

impl TestFailure {
    /// Creates an assertion failure.
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Creates a runtime failure.
    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }
}

/// Returns an assertion failure carrying `message` when `condition` is false.
///
/// # Errors
///
/// Returns [`TestFailure::Assertion`] when the condition does not hold.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), TestFailure> {
    if condition { Ok(()) } else { Err(TestFailure::Assertion(message())) }
}

// ============================================================================
// SECTION: Conformance Test
// ============================================================================

/// Behavior of a single clause check.
///
/// Implementations are single-run objects: `execute` is called at most once
/// and `cleanup` exactly once per run.
pub trait ConformanceTest: Send {
    /// Returns the stable kind of this check.
    fn kind(&self) -> UnitKind;

    /// Returns the prerequisite kinds this check may depend on, in declaration order.
    fn dependencies(&self) -> Vec<UnitKind> {
        Vec::new()
    }

    /// Validates a property a dependent wants to apply to this check.
    ///
    /// The default accepts [`UnitProperty::RetainArtifact`] and refuses
    /// everything else.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError`] when the property is not accepted.
    fn validate_property(&self, property: &UnitProperty) -> Result<(), PropertyError> {
        match property {
            UnitProperty::RetainArtifact => Ok(()),
            other => Err(PropertyError::unsupported(other)),
        }
    }

    /// Applies a property previously accepted by [`ConformanceTest::validate_property`].
    ///
    /// [`UnitProperty::RetainArtifact`] is handled by the owning unit and never
    /// reaches this method.
    fn apply_property(&mut self, _property: &UnitProperty) {}

    /// Runs the check against the target.
    ///
    /// A check signals success through [`ExecutionContext::succeed`]; returning
    /// `Ok(())` without concluding is treated as a defect in the check.
    ///
    /// # Errors
    ///
    /// Returns [`TestFailure`] when the clause does not hold or the check cannot run.
    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), TestFailure>;

    /// Releases resources held by the check itself.
    fn cleanup(&mut self) {}
}

// ============================================================================
// SECTION: Run Events
// ============================================================================

/// Run event kinds.
///
/// # Invariants
/// - Variants are stable for serialization and log matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    /// A unit entered the registry.
    UnitRegistered,
    /// A unit was rejected while resolving the plan.
    UnitRejected,
    /// A unit was placed in the execution plan.
    UnitPlanned,
    /// A unit started executing.
    UnitStarted,
    /// A unit reached its terminal status.
    UnitConcluded,
    /// A unit was cleaned up.
    UnitCleaned,
    /// The core detected an internal inconsistency and continued.
    Inconsistency,
    /// The run finished.
    RunCompleted,
}

/// Structured run event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEvent {
    /// Event kind.
    pub event: RunEventKind,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Unit identifier when the event concerns a unit.
    pub unit_id: Option<UnitId>,
    /// Unit kind when the event concerns a unit.
    pub kind: Option<UnitKind>,
    /// Terminal status when known.
    pub status: Option<UnitStatus>,
    /// Position in the execution plan when known.
    pub position: Option<usize>,
    /// Explanation attached to the event.
    pub reason: Option<String>,
}

impl RunEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: RunEventKind) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_millis());
        Self {
            event,
            timestamp_ms,
            unit_id: None,
            kind: None,
            status: None,
            position: None,
            reason: None,
        }
    }

    /// Attaches the unit identity.
    #[must_use]
    pub fn unit(mut self, unit_id: &UnitId, kind: &UnitKind) -> Self {
        self.unit_id = Some(unit_id.clone());
        self.kind = Some(kind.clone());
        self
    }

    /// Attaches a kind without a unit identifier.
    #[must_use]
    pub fn kind(mut self, kind: &UnitKind) -> Self {
        self.kind = Some(kind.clone());
        self
    }

    /// Attaches a terminal status.
    #[must_use]
    pub const fn status(mut self, status: Option<UnitStatus>) -> Self {
        self.status = status;
        self
    }

    /// Attaches a plan position.
    #[must_use]
    pub const fn position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Attaches an explanation.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Sink for run events.
pub trait RunEventSink: Send + Sync {
    /// Records a run event.
    fn record(&self, event: &RunEvent);
}

// crates/conformance-core/src/core/unit.rs
// ============================================================================
// Module: Conformance Test Unit
// Description: Registered unit state and the context handed to a check while it runs.
// Purpose: Own everything the core tracks per unit, independent of the check itself.
// Dependencies: crate::core, crate::interfaces, tracing
// ============================================================================

//! ## Overview
//! [`TestUnit`] wraps a boxed [`ConformanceTest`] with identity, the required
//! flag, declared and resolved dependencies, pending deferred properties, the
//! write-once status, ordered distinct warnings, and the retained artifact.
//! Mutation of wiring and status is crate-private: only the resolver and the
//! execution engine move a unit through its lifecycle.
//!
//! [`ExecutionContext`] is the only surface a check sees while executing. It
//! exposes the verdict setters, warnings, artifact publication, and read-only
//! access to the unit's resolved prerequisites.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::panic;
use std::panic::AssertUnwindSafe;

use crate::core::artifact::Artifact;
use crate::core::artifact::ResponseRecord;
use crate::core::identifiers::UnitId;
use crate::core::identifiers::UnitKind;
use crate::core::property::PropertyError;
use crate::core::property::PropertyRequest;
use crate::core::property::UnitProperty;
use crate::core::status::StatusError;
use crate::core::status::StatusSlot;
use crate::core::status::UnitOutcome;
use crate::core::status::UnitStatus;
use crate::interfaces::ConformanceTest;
use crate::interfaces::TestFailure;

// ============================================================================
// SECTION: Dependency Links
// ============================================================================

/// A prerequisite wired to a unit during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyLink {
    /// Prerequisite kind.
    pub kind: UnitKind,
    /// Identifier of the registered unit that satisfies the kind.
    pub id: UnitId,
}

// ============================================================================
// SECTION: Test Unit
// ============================================================================

/// A registered conformance check and its per-run state.
///
/// # Invariants
/// - Declared dependencies are distinct and keep declaration order.
/// - Warnings are distinct and keep insertion order.
/// - `resolved` is written only by the resolver and is a subset of `declared`.
/// - The status slot is written at most once per run.
pub struct TestUnit {
    /// Unit identifier.
    id: UnitId,
    /// Unit kind, captured from the check at construction.
    kind: UnitKind,
    /// Whether a FAILED status fails the whole run.
    required: bool,
    /// Declared prerequisite kinds.
    declared: Vec<UnitKind>,
    /// Prerequisites wired by the resolver.
    resolved: Vec<DependencyLink>,
    /// Properties waiting for their dependency edge.
    pending: Vec<PropertyRequest>,
    /// Whether the artifact survives cleanup on success.
    retain: bool,
    /// Terminal status.
    status: StatusSlot,
    /// Distinct warnings in insertion order.
    warnings: Vec<String>,
    /// Artifact produced during execution.
    artifact: Option<Artifact>,
    /// Whether `execute` was invoked.
    executed: bool,
    /// Whether cleanup already ran.
    cleaned: bool,
    /// The check behavior.
    test: Box<dyn ConformanceTest>,
}

impl TestUnit {
    /// Wraps a check into a unit with no pending properties.
    #[must_use]
    pub fn new(id: impl Into<UnitId>, required: bool, test: impl ConformanceTest + 'static) -> Self {
        Self::from_boxed(id, required, Box::new(test))
    }

    /// Wraps an already boxed check into a unit.
    #[must_use]
    pub fn from_boxed(
        id: impl Into<UnitId>,
        required: bool,
        test: Box<dyn ConformanceTest>,
    ) -> Self {
        let kind = test.kind();
        let mut declared: Vec<UnitKind> = Vec::new();
        for dependency in test.dependencies() {
            if !declared.contains(&dependency) {
                declared.push(dependency);
            }
        }
        Self {
            id: id.into(),
            kind,
            required,
            declared,
            resolved: Vec::new(),
            pending: Vec::new(),
            retain: false,
            status: StatusSlot::new(),
            warnings: Vec::new(),
            artifact: None,
            executed: false,
            cleaned: false,
            test,
        }
    }

    /// Records a property to apply to a prerequisite once it is wired.
    #[must_use]
    pub fn with_property(mut self, target: impl Into<UnitKind>, property: UnitProperty) -> Self {
        self.request_property(PropertyRequest::new(target, property));
        self
    }

    /// Records a property request. Requests are kept in submission order.
    pub fn request_property(&mut self, request: PropertyRequest) {
        self.pending.push(request);
    }

    /// Returns the unit identifier.
    #[must_use]
    pub const fn id(&self) -> &UnitId {
        &self.id
    }

    /// Returns the unit kind.
    #[must_use]
    pub const fn kind(&self) -> &UnitKind {
        &self.kind
    }

    /// Returns true when a FAILED status fails the run.
    #[must_use]
    pub const fn required(&self) -> bool {
        self.required
    }

    /// Returns the declared prerequisite kinds.
    #[must_use]
    pub fn declared_dependencies(&self) -> &[UnitKind] {
        &self.declared
    }

    /// Returns the prerequisites wired during resolution.
    #[must_use]
    pub fn resolved_dependencies(&self) -> &[DependencyLink] {
        &self.resolved
    }

    /// Returns the property requests still attached to the unit.
    #[must_use]
    pub fn pending_properties(&self) -> &[PropertyRequest] {
        &self.pending
    }

    /// Returns true when a dependent asked this unit to retain its artifact.
    #[must_use]
    pub const fn retains_artifact(&self) -> bool {
        self.retain
    }

    /// Returns the terminal status, if any.
    #[must_use]
    pub fn status(&self) -> Option<UnitStatus> {
        self.status.status()
    }

    /// Returns the status reason, if any.
    #[must_use]
    pub fn status_reason(&self) -> Option<&str> {
        self.status.reason()
    }

    /// Returns the recorded warnings.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Returns the current artifact, if any.
    #[must_use]
    pub const fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Returns true once `execute` was invoked on the check.
    #[must_use]
    pub const fn was_executed(&self) -> bool {
        self.executed
    }

    /// Returns true once cleanup ran.
    #[must_use]
    pub const fn is_cleaned_up(&self) -> bool {
        self.cleaned
    }

    // ------------------------------------------------------------------------
    // Lifecycle hooks used by the resolver and engine.
    // ------------------------------------------------------------------------

    /// Records the terminal outcome.
    pub(crate) fn conclude(&mut self, outcome: UnitOutcome) -> Result<(), StatusError> {
        self.status.conclude(outcome)
    }

    /// Adds a warning unless an identical one exists.
    pub(crate) fn add_warning(&mut self, warning: impl Into<String>) {
        push_distinct(&mut self.warnings, warning.into());
    }

    /// Asks the check whether it accepts a property.
    pub(crate) fn validate_property(&self, property: &UnitProperty) -> Result<(), PropertyError> {
        self.test.validate_property(property)
    }

    /// Applies a property that already passed validation.
    pub(crate) fn apply_property(&mut self, property: &UnitProperty) {
        match property {
            UnitProperty::RetainArtifact => self.retain = true,
            other => self.test.apply_property(other),
        }
    }

    /// Stores the resolved prerequisites.
    pub(crate) fn wire(&mut self, links: Vec<DependencyLink>) {
        self.resolved = links;
    }

    /// Runs the check once and reports how it ended.
    pub(crate) fn run_check(&mut self, dependencies: Vec<&TestUnit>) -> ExecutionAttempt {
        self.executed = true;
        let Self {
            id,
            test,
            warnings,
            artifact,
            ..
        } = self;
        let mut ctx = ExecutionContext {
            unit_id: id,
            verdict: StatusSlot::new(),
            warnings,
            artifact,
            dependencies,
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| test.execute(&mut ctx)));
        let verdict = ctx.verdict;
        match result {
            Ok(Ok(())) => ExecutionAttempt::Returned(verdict),
            Ok(Err(failure)) => ExecutionAttempt::Failed(failure),
            Err(payload) => ExecutionAttempt::Panicked(panic_message(payload.as_ref())),
        }
    }

    /// Releases the artifact unless retention applies, then cleans the check.
    ///
    /// Returns false when cleanup already ran.
    pub(crate) fn cleanup_once(&mut self) -> bool {
        if self.cleaned {
            return false;
        }
        self.cleaned = true;
        let keep = self.retain && self.status.status() == Some(UnitStatus::Success);
        if !keep {
            self.artifact = None;
        }
        self.test.cleanup();
        true
    }
}

/// How a single `execute` call ended.
#[derive(Debug)]
pub(crate) enum ExecutionAttempt {
    /// The check returned normally with whatever verdict it set.
    Returned(StatusSlot),
    /// The check returned a failure.
    Failed(TestFailure),
    /// The check panicked.
    Panicked(String),
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "check panicked".to_string()
    }
}

/// Pushes a value unless it is already present.
fn push_distinct(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

// ============================================================================
// SECTION: Execution Context
// ============================================================================

/// Surface available to a check while it executes.
pub struct ExecutionContext<'a> {
    /// Identifier of the executing unit.
    unit_id: &'a UnitId,
    /// Verdict proposed by the check.
    verdict: StatusSlot,
    /// Warnings of the executing unit.
    warnings: &'a mut Vec<String>,
    /// Artifact slot of the executing unit.
    artifact: &'a mut Option<Artifact>,
    /// Resolved prerequisites, all concluded SUCCESS.
    dependencies: Vec<&'a TestUnit>,
}

impl ExecutionContext<'_> {
    /// Returns the identifier of the executing unit.
    #[must_use]
    pub const fn unit_id(&self) -> &UnitId {
        self.unit_id
    }

    /// Marks the unit SUCCESS.
    pub fn succeed(&mut self) {
        self.propose(UnitOutcome::bare(UnitStatus::Success));
    }

    /// Marks the unit SUCCESS with an explanation.
    pub fn succeed_with(&mut self, reason: impl Into<String>) {
        self.propose(UnitOutcome::with_reason(UnitStatus::Success, reason));
    }

    /// Marks the unit SKIPPED, for checks that find they cannot apply to the target.
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.propose(UnitOutcome::with_reason(UnitStatus::Skipped, reason));
    }

    /// Records a warning; duplicates are ignored.
    pub fn warn(&mut self, warning: impl Into<String>) {
        push_distinct(self.warnings, warning.into());
    }

    /// Stores the artifact the unit produced, replacing any earlier one.
    pub fn publish(&mut self, artifact: Artifact) {
        *self.artifact = Some(artifact);
    }

    /// Returns a resolved prerequisite by kind.
    #[must_use]
    pub fn dependency(&self, kind: &UnitKind) -> Option<&TestUnit> {
        self.dependencies.iter().copied().find(|unit| unit.kind() == kind)
    }

    /// Returns the artifact retained by a resolved prerequisite.
    #[must_use]
    pub fn dependency_artifact(&self, kind: &UnitKind) -> Option<&Artifact> {
        self.dependency(kind).and_then(TestUnit::artifact)
    }

    /// Returns the HTTP exchange retained by a resolved prerequisite.
    #[must_use]
    pub fn dependency_response(&self, kind: &UnitKind) -> Option<&ResponseRecord> {
        self.dependency_artifact(kind).map(Artifact::response)
    }

    /// Records the first verdict; later ones become warnings.
    fn propose(&mut self, outcome: UnitOutcome) {
        let attempted = outcome.status;
        if let Err(err) = self.verdict.conclude(outcome) {
            tracing::debug!(unit = %self.unit_id, %attempted, "ignoring second verdict");
            push_distinct(self.warnings, format!("ignored verdict {attempted}: {err}"));
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/conformance-core/src/runtime/engine.rs
// ============================================================================
// Module: Execution Engine
// Description: Sequential execution of a resolved plan with prerequisite gating.
// Purpose: Drive every planned unit to exactly one terminal status and one cleanup.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! The engine walks the plan strictly in order, one unit at a time. Before a
//! unit executes, its resolved prerequisites are inspected:
//! - any FAILED or PREREQ_FAILED prerequisite concludes it PREREQ_FAILED;
//! - otherwise any SKIPPED prerequisite concludes it SKIPPED;
//! - otherwise a prerequisite without SUCCESS is an internal inconsistency,
//!   logged and concluded SKIPPED with a diagnostic reason.
//!
//! A check that returns a failure or panics is concluded FAILED; one that
//! returns without a verdict is concluded SKIPPED. Cleanup runs exactly once
//! per unit, including units rejected during resolution, and releases the
//! artifact unless retention was requested and the unit succeeded.
//! Whether a unit is required never changes how it is gated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::identifiers::UnitKind;
use crate::core::status::UnitOutcome;
use crate::core::status::UnitStatus;
use crate::core::unit::ExecutionAttempt;
use crate::core::unit::TestUnit;
use crate::interfaces::RunEvent;
use crate::interfaces::RunEventKind;
use crate::interfaces::RunEventSink;
use crate::runtime::report::RunReport;
use crate::runtime::resolver::ExecutionPlan;

// ============================================================================
// SECTION: Gating
// ============================================================================

/// Decision taken before a unit executes.
enum Gate<'a> {
    /// All prerequisites succeeded.
    Open(Vec<&'a TestUnit>),
    /// A prerequisite outcome decides the unit.
    Blocked(UnitOutcome),
    /// The plan is not in the state the engine relies on.
    Inconsistent(String),
}

/// Inspects the resolved prerequisites of a unit.
fn gate<'a>(
    unit: &TestUnit,
    before: &'a [TestUnit],
    positions: &BTreeMap<UnitKind, usize>,
) -> Gate<'a> {
    let mut prerequisites = Vec::with_capacity(unit.resolved_dependencies().len());
    for link in unit.resolved_dependencies() {
        match positions.get(&link.kind).and_then(|position| before.get(*position)) {
            Some(prerequisite) => prerequisites.push(prerequisite),
            None => {
                return Gate::Inconsistent(format!(
                    "prerequisite {} is not ahead of the unit in the plan",
                    link.id
                ));
            }
        }
    }
    if let Some(failed) = prerequisites
        .iter()
        .find(|prerequisite| prerequisite.status().is_some_and(UnitStatus::blocks_as_failure))
    {
        let status = failed.status().unwrap_or(UnitStatus::Failed);
        return Gate::Blocked(UnitOutcome::with_reason(
            UnitStatus::PrereqFailed,
            format!("prerequisite {} ended {status}", failed.id()),
        ));
    }
    if let Some(skipped) =
        prerequisites.iter().find(|prerequisite| prerequisite.status() == Some(UnitStatus::Skipped))
    {
        return Gate::Blocked(UnitOutcome::with_reason(
            UnitStatus::Skipped,
            format!("prerequisite {} was skipped", skipped.id()),
        ));
    }
    if let Some(pending) =
        prerequisites.iter().find(|prerequisite| prerequisite.status() != Some(UnitStatus::Success))
    {
        return Gate::Inconsistent(format!("prerequisite {} has no terminal status", pending.id()));
    }
    Gate::Open(prerequisites)
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Sequential executor for resolved plans.
pub struct ExecutionEngine<'a> {
    /// Event sink for lifecycle events.
    events: &'a dyn RunEventSink,
}

impl<'a> ExecutionEngine<'a> {
    /// Creates an engine reporting to the given sink.
    #[must_use]
    pub const fn new(events: &'a dyn RunEventSink) -> Self {
        Self {
            events,
        }
    }

    /// Executes the plan and returns the run report.
    ///
    /// Units that already hold a status are reported as inconsistencies and
    /// left untouched, so running a plan a second time executes nothing.
    pub fn run(&self, plan: &mut ExecutionPlan) -> RunReport {
        for unit in &mut plan.rejected {
            self.clean(unit, None);
        }
        let positions: BTreeMap<UnitKind, usize> =
            plan.units.iter().enumerate().map(|(position, unit)| (unit.kind().clone(), position)).collect();
        for position in 0 .. plan.units.len() {
            let (before, rest) = plan.units.split_at_mut(position);
            if let Some(unit) = rest.first_mut() {
                self.step(position, before, &positions, unit);
            }
        }
        let report = RunReport::from_plan(plan);
        tracing::info!(
            total = report.summary.total,
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            conformant = report.is_conformant(),
            "conformance run completed"
        );
        self.events.record(
            &RunEvent::new(RunEventKind::RunCompleted).reason(format!(
                "{} units, {} required failures",
                report.summary.total, report.summary.required_failed
            )),
        );
        report
    }

    /// Drives one unit to its terminal status and cleans it up.
    fn step(
        &self,
        position: usize,
        before: &[TestUnit],
        positions: &BTreeMap<UnitKind, usize>,
        unit: &mut TestUnit,
    ) {
        if let Some(existing) = unit.status() {
            self.inconsistency(unit, &format!("unit already concluded {existing} before execution"));
            self.clean(unit, Some(position));
            return;
        }
        let outcome = match gate(unit, before, positions) {
            Gate::Blocked(outcome) => outcome,
            Gate::Inconsistent(reason) => {
                self.inconsistency(unit, &reason);
                UnitOutcome::with_reason(UnitStatus::Skipped, format!("internal inconsistency: {reason}"))
            }
            Gate::Open(prerequisites) => self.execute(position, unit, prerequisites),
        };
        let event = RunEvent::new(RunEventKind::UnitConcluded)
            .unit(unit.id(), unit.kind())
            .position(position)
            .status(Some(outcome.status));
        let event = match &outcome.reason {
            Some(reason) => event.reason(reason.clone()),
            None => event,
        };
        tracing::debug!(unit = %unit.id(), status = %outcome.status, "unit concluded");
        if let Err(err) = unit.conclude(outcome) {
            self.inconsistency(unit, &err.to_string());
        } else {
            self.events.record(&event);
        }
        self.clean(unit, Some(position));
    }

    /// Runs the check and maps how it ended to an outcome.
    fn execute(&self, position: usize, unit: &mut TestUnit, prerequisites: Vec<&TestUnit>) -> UnitOutcome {
        self.events
            .record(&RunEvent::new(RunEventKind::UnitStarted).unit(unit.id(), unit.kind()).position(position));
        match unit.run_check(prerequisites) {
            ExecutionAttempt::Returned(verdict) => verdict.into_outcome().unwrap_or_else(|| {
                unit.add_warning("check returned without a verdict");
                UnitOutcome::with_reason(UnitStatus::Skipped, "check returned without a verdict")
            }),
            ExecutionAttempt::Failed(failure) => {
                UnitOutcome::with_reason(UnitStatus::Failed, failure.to_string())
            }
            ExecutionAttempt::Panicked(message) => {
                tracing::error!(unit = %unit.id(), %message, "check panicked");
                UnitOutcome::with_reason(UnitStatus::Failed, format!("check panicked: {message}"))
            }
        }
    }

    /// Cleans a unit up once and reports it.
    fn clean(&self, unit: &mut TestUnit, position: Option<usize>) {
        if !unit.cleanup_once() {
            return;
        }
        let event = RunEvent::new(RunEventKind::UnitCleaned).unit(unit.id(), unit.kind()).status(unit.status());
        let event = match position {
            Some(position) => event.position(position),
            None => event,
        };
        let event =
            if unit.artifact().is_some() { event.reason("artifact retained for dependents") } else { event };
        self.events.record(&event);
    }

    /// Logs an internal inconsistency and keeps going.
    fn inconsistency(&self, unit: &TestUnit, reason: &str) {
        tracing::error!(unit = %unit.id(), kind = %unit.kind(), %reason, "execution inconsistency");
        self.events.record(
            &RunEvent::new(RunEventKind::Inconsistency).unit(unit.id(), unit.kind()).reason(reason),
        );
    }
}

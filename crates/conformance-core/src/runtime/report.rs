// crates/conformance-core/src/runtime/report.rs
// ============================================================================
// Module: Run Report
// Description: Per-unit results and the conformance verdict of a run.
// Purpose: Summarize terminal statuses for humans and machines.
// Dependencies: crate::{core, runtime::resolver}, serde
// ============================================================================

//! ## Overview
//! A run is conformant when no required unit ended FAILED. Optional failures,
//! skips, and prerequisite failures are reported but do not change the
//! verdict; a required unit that never ran is visible through its own status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde::Serialize;

use crate::core::identifiers::UnitId;
use crate::core::identifiers::UnitKind;
use crate::core::status::UnitStatus;
use crate::core::unit::TestUnit;
use crate::runtime::resolver::ExecutionPlan;

// ============================================================================
// SECTION: Unit Report
// ============================================================================

/// Result of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    /// Unit identifier.
    pub id: UnitId,
    /// Unit kind.
    pub kind: UnitKind,
    /// Whether a failure fails the run.
    pub required: bool,
    /// Terminal status, `None` only when the run was interrupted.
    pub status: Option<UnitStatus>,
    /// Status reason.
    pub reason: Option<String>,
    /// Warnings in insertion order.
    pub warnings: Vec<String>,
    /// Identifiers of resolved prerequisites.
    pub dependencies: Vec<UnitId>,
    /// Plan position; `None` for units rejected during resolution.
    pub position: Option<usize>,
    /// Whether the check was executed.
    pub executed: bool,
    /// Whether the artifact survived cleanup.
    pub artifact_retained: bool,
}

impl UnitReport {
    /// Builds the report of a unit.
    fn from_unit(unit: &TestUnit, position: Option<usize>) -> Self {
        Self {
            id: unit.id().clone(),
            kind: unit.kind().clone(),
            required: unit.required(),
            status: unit.status(),
            reason: unit.status_reason().map(str::to_string),
            warnings: unit.warnings().to_vec(),
            dependencies: unit.resolved_dependencies().iter().map(|link| link.id.clone()).collect(),
            position,
            executed: unit.was_executed(),
            artifact_retained: unit.artifact().is_some(),
        }
    }

    /// Returns true when this unit fails the run.
    #[must_use]
    pub fn is_required_failure(&self) -> bool {
        self.required && self.status == Some(UnitStatus::Failed)
    }
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Status counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Units reported.
    pub total: usize,
    /// Units that ended SUCCESS.
    pub succeeded: usize,
    /// Units that ended FAILED.
    pub failed: usize,
    /// Required units that ended FAILED.
    pub required_failed: usize,
    /// Units that ended SKIPPED.
    pub skipped: usize,
    /// Units that ended PREREQ_FAILED.
    pub prereq_failed: usize,
    /// Units with no terminal status.
    pub unconcluded: usize,
    /// Units rejected during resolution.
    pub rejected: usize,
}

impl RunSummary {
    /// Counts one unit.
    fn count(&mut self, unit: &UnitReport) {
        self.total += 1;
        match unit.status {
            Some(UnitStatus::Success) => self.succeeded += 1,
            Some(UnitStatus::Failed) => {
                self.failed += 1;
                if unit.required {
                    self.required_failed += 1;
                }
            }
            Some(UnitStatus::Skipped) => self.skipped += 1,
            Some(UnitStatus::PrereqFailed) => self.prereq_failed += 1,
            None => self.unconcluded += 1,
        }
        if unit.position.is_none() {
            self.rejected += 1;
        }
    }
}

// ============================================================================
// SECTION: Run Report
// ============================================================================

/// Results of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Planned units in execution order, then rejected units.
    pub units: Vec<UnitReport>,
    /// Requested kinds with no registered unit.
    pub unknown_requests: Vec<UnitKind>,
    /// Status counts.
    pub summary: RunSummary,
}

impl RunReport {
    /// Builds a report from the current state of a plan.
    #[must_use]
    pub fn from_plan(plan: &ExecutionPlan) -> Self {
        let units: Vec<UnitReport> = plan
            .units()
            .iter()
            .enumerate()
            .map(|(position, unit)| UnitReport::from_unit(unit, Some(position)))
            .chain(plan.rejected().iter().map(|unit| UnitReport::from_unit(unit, None)))
            .collect();
        let mut summary = RunSummary::default();
        for unit in &units {
            summary.count(unit);
        }
        Self {
            units,
            unknown_requests: plan.unknown_requests().to_vec(),
            summary,
        }
    }

    /// Returns true when no required unit ended FAILED.
    #[must_use]
    pub fn is_conformant(&self) -> bool {
        self.summary.required_failed == 0
    }

    /// Returns the report of a unit by identifier.
    #[must_use]
    pub fn unit(&self, id: &UnitId) -> Option<&UnitReport> {
        self.units.iter().find(|unit| &unit.id == id)
    }

    /// Returns the status of a unit by identifier.
    #[must_use]
    pub fn status_of(&self, id: &str) -> Option<UnitStatus> {
        self.units.iter().find(|unit| unit.id.as_str() == id).and_then(|unit| unit.status)
    }

    /// Renders a plain-text report.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for unit in &self.units {
            let label = unit.status.map_or("UNSET", UnitStatus::label);
            let marker = if unit.required { "required" } else { "optional" };
            let _ = write!(out, "{label:<13} {} [{}] ({marker})", unit.id, unit.kind);
            if let Some(reason) = &unit.reason {
                let _ = write!(out, ": {reason}");
            }
            out.push('\n');
            for warning in &unit.warnings {
                let _ = writeln!(out, "              warning: {warning}");
            }
        }
        for kind in &self.unknown_requests {
            let _ = writeln!(out, "UNKNOWN       {kind}: no registered unit provides this kind");
        }
        let summary = &self.summary;
        let _ = writeln!(
            out,
            "\n{} units: {} succeeded, {} failed ({} required), {} skipped, {} prerequisite failures",
            summary.total,
            summary.succeeded,
            summary.failed,
            summary.required_failed,
            summary.skipped,
            summary.prereq_failed
        );
        let verdict = if self.is_conformant() { "CONFORMANT" } else { "NOT CONFORMANT" };
        let _ = writeln!(out, "verdict: {verdict}");
        out
    }
}

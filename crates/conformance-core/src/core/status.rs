// crates/conformance-core/src/core/status.rs
// ============================================================================
// Module: Conformance Unit Status
// Description: Terminal statuses and the write-once status slot of a test unit.
// Purpose: Encode the unset -> terminal state machine with no way back.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A unit starts without a status. Exactly one transition to a terminal
//! [`UnitStatus`] is allowed per run; [`StatusSlot::conclude`] rejects any
//! second write so a unit can never be reported twice or re-executed.
//! The `required` flag of a unit plays no part here; it only matters when a
//! report decides whether a FAILED unit is a hard conformance failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Terminal status of a test unit.
///
/// # Invariants
/// - Variants are stable for serialization and report matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// The unit executed and its clause holds.
    Success,
    /// The unit executed and its clause does not hold.
    Failed,
    /// The unit was not executed (configuration defect, skipped prerequisite, or
    /// the unit itself declined to run).
    Skipped,
    /// The unit was not executed because a prerequisite failed.
    PrereqFailed,
}

impl UnitStatus {
    /// Returns the stable uppercase label used in text reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::PrereqFailed => "PREREQ_FAILED",
        }
    }

    /// Returns true when dependents of a unit with this status must not run
    /// and must be marked as prerequisite failures.
    #[must_use]
    pub const fn blocks_as_failure(self) -> bool {
        matches!(self, Self::Failed | Self::PrereqFailed)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Terminal status paired with its optional explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutcome {
    /// Terminal status.
    pub status: UnitStatus,
    /// Optional human-readable explanation.
    pub reason: Option<String>,
}

impl UnitOutcome {
    /// Creates an outcome with no reason attached.
    #[must_use]
    pub const fn bare(status: UnitStatus) -> Self {
        Self {
            status,
            reason: None,
        }
    }

    /// Creates an outcome with an explanation.
    #[must_use]
    pub fn with_reason(status: UnitStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// SECTION: Write-Once Slot
// ============================================================================

/// Errors raised when a status transition is not allowed.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// The unit already reached a terminal status.
    #[error("status already concluded as {existing}")]
    AlreadyConcluded {
        /// Status recorded by the first transition.
        existing: UnitStatus,
    },
}

/// Write-once holder for a unit outcome.
///
/// # Invariants
/// - Once `Some`, the inner outcome never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSlot {
    /// Recorded outcome, `None` while unset.
    outcome: Option<UnitOutcome>,
}

impl StatusSlot {
    /// Creates an unset slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outcome: None,
        }
    }

    /// Records the terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::AlreadyConcluded`] when an outcome was already recorded.
    pub fn conclude(&mut self, outcome: UnitOutcome) -> Result<(), StatusError> {
        if let Some(existing) = &self.outcome {
            return Err(StatusError::AlreadyConcluded {
                existing: existing.status,
            });
        }
        self.outcome = Some(outcome);
        Ok(())
    }

    /// Returns the terminal status, if any.
    #[must_use]
    pub fn status(&self) -> Option<UnitStatus> {
        self.outcome.as_ref().map(|outcome| outcome.status)
    }

    /// Returns the recorded reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(|outcome| outcome.reason.as_deref())
    }

    /// Consumes the slot, yielding the recorded outcome.
    #[must_use]
    pub fn into_outcome(self) -> Option<UnitOutcome> {
        self.outcome
    }

    /// Returns true while no outcome has been recorded.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        self.outcome.is_none()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

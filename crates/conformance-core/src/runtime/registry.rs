// crates/conformance-core/src/runtime/registry.rs
// ============================================================================
// Module: Test Unit Registry
// Description: Registration and lookup of test units by kind and identifier.
// Purpose: Hold the population of units a run may draw its plan from.
// Dependencies: crate::{core, interfaces}, thiserror, tracing
// ============================================================================

//! ## Overview
//! The registry owns every unit submitted for a run, in registration order.
//! Kind is the lookup key for dependency resolution, so at most one unit may
//! exist per kind; identifiers must also be unique because reports and failure
//! reasons refer to units by id. Rejected registrations discard the unit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::identifiers::UnitId;
use crate::core::identifiers::UnitKind;
use crate::core::unit::TestUnit;
use crate::interfaces::RunEvent;
use crate::interfaces::RunEventKind;
use crate::interfaces::RunEventSink;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registration failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The unit identifier is empty.
    #[error("unit id must not be empty")]
    EmptyId,
    /// The unit kind is empty.
    #[error("unit {0} has an empty kind")]
    EmptyKind(UnitId),
    /// Another unit already uses the identifier.
    #[error("unit id already registered: {0}")]
    DuplicateId(UnitId),
    /// Another unit already provides the kind.
    #[error("unit kind {kind} already registered by {existing}")]
    DuplicateKind {
        /// Duplicated kind.
        kind: UnitKind,
        /// Identifier of the unit already registered for the kind.
        existing: UnitId,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of test units keyed by kind.
///
/// # Invariants
/// - Kinds and identifiers are unique.
/// - `units` keeps registration order.
#[derive(Default)]
pub struct Registry {
    /// Units in registration order.
    units: Vec<TestUnit>,
    /// Position of each unit in `units`, by kind.
    by_kind: BTreeMap<UnitKind, usize>,
    /// Registered identifiers.
    ids: BTreeSet<UnitId>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the id or kind is empty or already taken.
    pub fn register(&mut self, unit: TestUnit) -> Result<(), RegistryError> {
        if unit.id().is_blank() {
            return Err(RegistryError::EmptyId);
        }
        if unit.kind().is_blank() {
            return Err(RegistryError::EmptyKind(unit.id().clone()));
        }
        if self.ids.contains(unit.id()) {
            return Err(RegistryError::DuplicateId(unit.id().clone()));
        }
        if let Some(existing) = self.lookup(unit.kind()) {
            return Err(RegistryError::DuplicateKind {
                kind: unit.kind().clone(),
                existing: existing.id().clone(),
            });
        }
        self.by_kind.insert(unit.kind().clone(), self.units.len());
        self.ids.insert(unit.id().clone());
        self.units.push(unit);
        Ok(())
    }

    /// Registers a unit and reports the outcome to an event sink.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when registration is rejected.
    pub fn register_observed(
        &mut self,
        unit: TestUnit,
        events: &dyn RunEventSink,
    ) -> Result<(), RegistryError> {
        let id = unit.id().clone();
        let kind = unit.kind().clone();
        match self.register(unit) {
            Ok(()) => {
                events.record(&RunEvent::new(RunEventKind::UnitRegistered).unit(&id, &kind));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(unit = %id, %kind, error = %err, "registration rejected");
                events.record(
                    &RunEvent::new(RunEventKind::UnitRejected)
                        .unit(&id, &kind)
                        .reason(err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// Returns the unit registered for a kind.
    #[must_use]
    pub fn lookup(&self, kind: &UnitKind) -> Option<&TestUnit> {
        self.by_kind.get(kind).and_then(|index| self.units.get(*index))
    }

    /// Returns the unit registered under an identifier.
    #[must_use]
    pub fn lookup_id(&self, id: &UnitId) -> Option<&TestUnit> {
        self.units.iter().find(|unit| unit.id() == id)
    }

    /// Returns true when a unit provides the kind.
    #[must_use]
    pub fn contains(&self, kind: &UnitKind) -> bool {
        self.by_kind.contains_key(kind)
    }

    /// Returns registered kinds in registration order.
    #[must_use]
    pub fn kinds(&self) -> Vec<UnitKind> {
        self.units.iter().map(|unit| unit.kind().clone()).collect()
    }

    /// Iterates over units in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TestUnit> {
        self.units.iter()
    }

    /// Returns the number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns the registration position of a kind.
    pub(crate) fn position(&self, kind: &UnitKind) -> Option<usize> {
        self.by_kind.get(kind).copied()
    }

    /// Returns a unit by registration position.
    pub(crate) fn unit_at(&self, index: usize) -> Option<&TestUnit> {
        self.units.get(index)
    }

    /// Returns a mutable unit by registration position.
    pub(crate) fn unit_at_mut(&mut self, index: usize) -> Option<&mut TestUnit> {
        self.units.get_mut(index)
    }

    /// Consumes the registry, yielding units in registration order.
    pub(crate) fn into_units(self) -> Vec<TestUnit> {
        self.units
    }
}

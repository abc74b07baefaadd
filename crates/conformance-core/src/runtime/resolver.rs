// crates/conformance-core/src/runtime/resolver.rs
// ============================================================================
// Module: Dependency Resolver
// Description: Turns requested unit kinds into a dependency-ordered execution plan.
// Purpose: Wire prerequisites, apply deferred properties, and reject broken units.
// Dependencies: crate::{core, interfaces, runtime::registry}, tracing
// ============================================================================

//! ## Overview
//! Resolution is a depth-first postorder walk over declared dependencies.
//! A unit lands in the plan only after every prerequisite it declares has
//! landed, so plan order is a topological order and each unit appears once.
//!
//! A unit is rejected (concluded SKIPPED, never executed) when:
//! - it declares its own kind as a dependency;
//! - one of its property requests targets a kind it did not declare;
//! - a prerequisite is unregistered, rejected, or closes a cycle;
//! - a prerequisite refuses one of its property requests.
//!
//! Property requests are validated against every target before any is
//! applied, so a rejection never leaves a prerequisite half configured.
//! Rejecting one unit never prevents unrelated requested units from resolving.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::identifiers::UnitId;
use crate::core::identifiers::UnitKind;
use crate::core::status::UnitOutcome;
use crate::core::status::UnitStatus;
use crate::core::unit::DependencyLink;
use crate::core::unit::TestUnit;
use crate::interfaces::RunEvent;
use crate::interfaces::RunEventKind;
use crate::interfaces::RunEventSink;
use crate::runtime::registry::Registry;

// ============================================================================
// SECTION: Execution Plan
// ============================================================================

/// Ordered units ready for the execution engine.
///
/// # Invariants
/// - Every resolved dependency of a unit precedes it in `units`.
/// - Units in `rejected` are concluded SKIPPED and are never executed.
pub struct ExecutionPlan {
    /// Planned units in execution order.
    pub(crate) units: Vec<TestUnit>,
    /// Units rejected during resolution, in rejection order.
    pub(crate) rejected: Vec<TestUnit>,
    /// Requested kinds with no registered unit.
    pub(crate) unknown_requests: Vec<UnitKind>,
}

impl ExecutionPlan {
    /// Returns the planned units in execution order.
    #[must_use]
    pub fn units(&self) -> &[TestUnit] {
        &self.units
    }

    /// Returns the units rejected during resolution.
    #[must_use]
    pub fn rejected(&self) -> &[TestUnit] {
        &self.rejected
    }

    /// Returns requested kinds that no registered unit provides.
    #[must_use]
    pub fn unknown_requests(&self) -> &[UnitKind] {
        &self.unknown_requests
    }

    /// Returns planned kinds in execution order.
    #[must_use]
    pub fn kinds(&self) -> Vec<UnitKind> {
        self.units.iter().map(|unit| unit.kind().clone()).collect()
    }

    /// Returns the plan position of a kind.
    #[must_use]
    pub fn position(&self, kind: &UnitKind) -> Option<usize> {
        self.units.iter().position(|unit| unit.kind() == kind)
    }

    /// Returns the number of planned units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true when nothing was planned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Outcome of requesting one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The unit is in the plan.
    Planned,
    /// The unit was rejected and concluded SKIPPED.
    Rejected,
    /// No unit provides the kind.
    NotRegistered,
}

/// Visit state of a kind during the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current walk path.
    InProgress,
    /// In the plan.
    Placed,
    /// Rejected and concluded SKIPPED.
    Rejected,
}

/// Result of visiting a kind.
enum Visit {
    /// The unit with this id is in the plan.
    Placed(UnitId),
    /// The unit with this id was rejected.
    Rejected(UnitId),
    /// The kind is already on the walk path.
    Cycle,
    /// No unit provides the kind.
    Missing,
}

/// Dependency resolver over a registry.
pub struct Resolver<'a> {
    /// Units available to the plan.
    registry: Registry,
    /// Event sink for planning decisions.
    events: &'a dyn RunEventSink,
    /// Visit state by kind.
    marks: BTreeMap<UnitKind, Mark>,
    /// Registry positions of planned units, in plan order.
    order: Vec<usize>,
    /// Registry positions of rejected units, in rejection order.
    rejected: Vec<usize>,
    /// Requested kinds with no registered unit.
    unknown: Vec<UnitKind>,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver that takes ownership of the registry.
    #[must_use]
    pub fn new(registry: Registry, events: &'a dyn RunEventSink) -> Self {
        Self {
            registry,
            events,
            marks: BTreeMap::new(),
            order: Vec::new(),
            rejected: Vec::new(),
            unknown: Vec::new(),
        }
    }

    /// Requests a kind and everything it depends on.
    ///
    /// Requesting a kind that is already planned or rejected is a no-op that
    /// reports the earlier outcome.
    pub fn request(&mut self, kind: &UnitKind) -> Resolution {
        match self.visit(kind) {
            Visit::Placed(_) => Resolution::Planned,
            Visit::Rejected(_) | Visit::Cycle => Resolution::Rejected,
            Visit::Missing => {
                if !self.unknown.contains(kind) {
                    tracing::warn!(%kind, "requested kind is not registered");
                    self.events.record(
                        &RunEvent::new(RunEventKind::UnitRejected)
                            .kind(kind)
                            .reason("no registered unit provides this kind"),
                    );
                    self.unknown.push(kind.clone());
                }
                Resolution::NotRegistered
            }
        }
    }

    /// Requests every registered kind in registration order.
    pub fn request_all(&mut self) {
        for kind in self.registry.kinds() {
            let _ = self.request(&kind);
        }
    }

    /// Finishes resolution. Units that were never requested are dropped.
    #[must_use]
    pub fn finish(self) -> ExecutionPlan {
        let Self {
            registry,
            order,
            rejected,
            unknown,
            ..
        } = self;
        let mut slots: Vec<Option<TestUnit>> = registry.into_units().into_iter().map(Some).collect();
        let units = take_positions(&mut slots, &order);
        let rejected = take_positions(&mut slots, &rejected);
        let unrequested = slots.into_iter().flatten().count();
        if unrequested > 0 {
            tracing::debug!(unrequested, "registered units left out of the plan");
        }
        ExecutionPlan {
            units,
            rejected,
            unknown_requests: unknown,
        }
    }

    /// Visits a kind, planning it on first visit.
    fn visit(&mut self, kind: &UnitKind) -> Visit {
        let Some(index) = self.registry.position(kind) else {
            return Visit::Missing;
        };
        let Some(id) = self.registry.unit_at(index).map(|unit| unit.id().clone()) else {
            return Visit::Missing;
        };
        match self.marks.get(kind) {
            Some(Mark::InProgress) => return Visit::Cycle,
            Some(Mark::Placed) => return Visit::Placed(id),
            Some(Mark::Rejected) => return Visit::Rejected(id),
            None => {}
        }
        self.marks.insert(kind.clone(), Mark::InProgress);
        match self.place(index) {
            Ok(links) => {
                if let Some(unit) = self.registry.unit_at_mut(index) {
                    unit.wire(links);
                }
                self.marks.insert(kind.clone(), Mark::Placed);
                let position = self.order.len();
                self.order.push(index);
                tracing::debug!(unit = %id, %kind, position, "unit planned");
                self.events
                    .record(&RunEvent::new(RunEventKind::UnitPlanned).unit(&id, kind).position(position));
                Visit::Placed(id)
            }
            Err(reason) => {
                self.reject(index, reason);
                self.marks.insert(kind.clone(), Mark::Rejected);
                Visit::Rejected(id)
            }
        }
    }

    /// Checks a unit, resolves its prerequisites, and applies its properties.
    fn place(&mut self, index: usize) -> Result<Vec<DependencyLink>, String> {
        let (kind, declared, pending) = match self.registry.unit_at(index) {
            Some(unit) => (
                unit.kind().clone(),
                unit.declared_dependencies().to_vec(),
                unit.pending_properties().to_vec(),
            ),
            None => return Err("unit is missing from the registry".to_string()),
        };
        if declared.contains(&kind) {
            return Err(format!("unit declares its own kind {kind} as a dependency"));
        }
        if let Some(stray) = pending.iter().find(|request| !declared.contains(&request.target)) {
            return Err(format!(
                "property {} targets {}, which is not a declared dependency",
                stray.property, stray.target
            ));
        }

        let mut links = Vec::with_capacity(declared.len());
        for dependency in &declared {
            match self.visit(dependency) {
                Visit::Placed(id) => links.push(DependencyLink {
                    kind: dependency.clone(),
                    id,
                }),
                Visit::Rejected(id) => {
                    return Err(format!("prerequisite {id} ({dependency}) could not be planned"));
                }
                Visit::Cycle => return Err(format!("dependency cycle through {dependency}")),
                Visit::Missing => return Err(format!("prerequisite {dependency} is not registered")),
            }
        }

        for request in &pending {
            let target = self
                .registry
                .lookup(&request.target)
                .ok_or_else(|| format!("prerequisite {} is not registered", request.target))?;
            target.validate_property(&request.property).map_err(|err| {
                format!("prerequisite {} refused {}: {err}", target.id(), request.property)
            })?;
        }
        for request in &pending {
            let position = self.registry.position(&request.target);
            if let Some(target) = position.and_then(|position| self.registry.unit_at_mut(position)) {
                target.apply_property(&request.property);
            }
        }
        Ok(links)
    }

    /// Concludes a unit SKIPPED and records it as rejected.
    fn reject(&mut self, index: usize, reason: String) {
        let Some(unit) = self.registry.unit_at_mut(index) else {
            return;
        };
        tracing::warn!(unit = %unit.id(), kind = %unit.kind(), %reason, "unit rejected during resolution");
        let event = RunEvent::new(RunEventKind::UnitRejected)
            .unit(unit.id(), unit.kind())
            .status(Some(UnitStatus::Skipped))
            .reason(reason.clone());
        if let Err(err) = unit.conclude(UnitOutcome::with_reason(UnitStatus::Skipped, reason)) {
            self.events.record(
                &RunEvent::new(RunEventKind::Inconsistency)
                    .unit(unit.id(), unit.kind())
                    .reason(format!("rejecting unit: {err}")),
            );
        }
        self.events.record(&event);
        self.rejected.push(index);
    }
}

/// Moves units out of `slots` in the order of `positions`.
fn take_positions(slots: &mut [Option<TestUnit>], positions: &[usize]) -> Vec<TestUnit> {
    positions.iter().filter_map(|index| slots.get_mut(*index).and_then(Option::take)).collect()
}

// ============================================================================
// SECTION: Convenience
// ============================================================================

/// Resolves the requested kinds, in request order, into a plan.
#[must_use]
pub fn resolve(
    registry: Registry,
    requested: &[UnitKind],
    events: &dyn RunEventSink,
) -> ExecutionPlan {
    let mut resolver = Resolver::new(registry, events);
    for kind in requested {
        let _ = resolver.request(kind);
    }
    resolver.finish()
}

/// Resolves every registered kind, in registration order, into a plan.
#[must_use]
pub fn resolve_all(registry: Registry, events: &dyn RunEventSink) -> ExecutionPlan {
    let mut resolver = Resolver::new(registry, events);
    resolver.request_all();
    resolver.finish()
}

// crates/conformance-core/tests/proptest_resolver.rs
// ============================================================================
// Module: Resolver Property-Based Tests
// Description: Property tests for plan ordering over random dependency graphs.
// Purpose: Detect ordering violations and duplicate placement across wide graph shapes.
// ============================================================================

//! Property-based tests for resolver invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::collections::BTreeSet;

use conformance_core::ExecutionPlan;
use conformance_core::NoopEventSink;
use conformance_core::Registry;
use conformance_core::UnitKind;
use conformance_core::UnitStatus;
use conformance_core::resolve;
use proptest::prelude::*;

use crate::common::Journal;
use crate::common::ScriptedTest;

fn name(index: usize) -> String {
    format!("k{index}")
}

/// Builds a registry where unit `i` depends on every `j` with `edges[i][j]`.
fn build(edges: &[Vec<bool>], journal: &Journal) -> Registry {
    let mut registry = Registry::new();
    for (index, row) in edges.iter().enumerate() {
        let deps: Vec<String> =
            row.iter().enumerate().filter(|(_, edge)| **edge).map(|(target, _)| name(target)).collect();
        let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
        registry.register(ScriptedTest::new(&name(index), journal).depends_on(&deps).unit()).unwrap();
    }
    registry
}

fn assert_topological(plan: &ExecutionPlan) -> Result<(), TestCaseError> {
    let mut seen: BTreeSet<UnitKind> = BTreeSet::new();
    for unit in plan.units() {
        for link in unit.resolved_dependencies() {
            prop_assert!(seen.contains(&link.kind), "{} placed before {}", unit.kind(), link.kind);
        }
        prop_assert!(seen.insert(unit.kind().clone()), "{} placed twice", unit.kind());
    }
    Ok(())
}

fn dag_strategy() -> impl Strategy<Value = Vec<Vec<bool>>> {
    (1usize .. 9).prop_flat_map(|size| {
        prop::collection::vec(prop::collection::vec(any::<bool>(), size), size).prop_map(|mut rows| {
            for (index, row) in rows.iter_mut().enumerate() {
                for (target, edge) in row.iter_mut().enumerate() {
                    if target >= index {
                        *edge = false;
                    }
                }
            }
            rows
        })
    })
}

fn graph_strategy() -> impl Strategy<Value = Vec<Vec<bool>>> {
    (1usize .. 9).prop_flat_map(|size| {
        prop::collection::vec(prop::collection::vec(prop::bool::weighted(0.25), size), size)
    })
}

proptest! {
    #[test]
    fn acyclic_graphs_plan_every_unit_in_topological_order(
        (edges, order) in dag_strategy().prop_flat_map(|edges| {
            let indices: Vec<usize> = (0 .. edges.len()).collect();
            (Just(edges), Just(indices).prop_shuffle())
        })
    ) {
        let journal = Journal::new();
        let requested: Vec<UnitKind> = order.iter().map(|index| UnitKind::new(name(*index))).collect();
        let plan = resolve(build(&edges, &journal), &requested, &NoopEventSink);
        prop_assert_eq!(plan.len(), edges.len());
        prop_assert!(plan.rejected().is_empty());
        assert_topological(&plan)?;
    }

    #[test]
    fn acyclic_plans_do_not_depend_on_request_order(edges in dag_strategy()) {
        let journal = Journal::new();
        let forward: Vec<UnitKind> = (0 .. edges.len()).map(|index| UnitKind::new(name(index))).collect();
        let mut backward = forward.clone();
        backward.reverse();
        let first = resolve(build(&edges, &journal), &forward, &NoopEventSink);
        let second = resolve(build(&edges, &journal), &backward, &NoopEventSink);
        let first_set: BTreeSet<UnitKind> = first.kinds().into_iter().collect();
        let second_set: BTreeSet<UnitKind> = second.kinds().into_iter().collect();
        prop_assert_eq!(first_set, second_set);
        assert_topological(&second)?;
    }

    #[test]
    fn arbitrary_graphs_place_or_reject_each_unit_once(edges in graph_strategy()) {
        let journal = Journal::new();
        let requested: Vec<UnitKind> = (0 .. edges.len()).map(|index| UnitKind::new(name(index))).collect();
        let plan = resolve(build(&edges, &journal), &requested, &NoopEventSink);
        prop_assert_eq!(plan.len() + plan.rejected().len(), edges.len());
        assert_topological(&plan)?;
        for unit in plan.rejected() {
            prop_assert_eq!(unit.status(), Some(UnitStatus::Skipped));
        }
        for unit in plan.units() {
            prop_assert!(unit.status().is_none());
        }
    }
}

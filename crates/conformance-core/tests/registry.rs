// crates/conformance-core/tests/registry.rs
// ============================================================================
// Module: Registry Tests
// Description: Validate unit registration and lookup.
// Purpose: Ensure ids and kinds stay unique and lookups are exact.
// Dependencies: conformance-core
// ============================================================================
//! ## Overview
//! Covers registration ordering, duplicate handling, empty identifiers, and
//! the events emitted by observed registration.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use conformance_core::MemoryEventSink;
use conformance_core::Registry;
use conformance_core::RegistryError;
use conformance_core::RunEventKind;
use conformance_core::TestUnit;
use conformance_core::UnitId;
use conformance_core::UnitKind;

use crate::common::Journal;
use crate::common::ScriptedTest;
use crate::common::kind_names;

// ============================================================================
// SECTION: Registration
// ============================================================================

#[test]
fn registry_keeps_registration_order_and_finds_by_kind() {
    let journal = Journal::new();
    let mut registry = Registry::new();
    registry.register(ScriptedTest::new("tls", &journal).unit()).unwrap();
    registry.register(ScriptedTest::new("cors", &journal).optional_unit()).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(kind_names(&registry.kinds()), vec!["tls", "cors"]);
    let cors = registry.lookup(&UnitKind::new("cors")).expect("cors registered");
    assert_eq!(cors.id().as_str(), "cors-id");
    assert!(!cors.required());
    assert!(registry.lookup_id(&UnitId::new("tls-id")).is_some());
    assert!(registry.lookup(&UnitKind::new("missing")).is_none());
}

#[test]
fn registry_rejects_duplicate_kind_and_keeps_first_unit() {
    let journal = Journal::new();
    let mut registry = Registry::new();
    registry.register(TestUnit::new("first", true, ScriptedTest::new("tls", &journal))).unwrap();
    let err = registry
        .register(TestUnit::new("second", true, ScriptedTest::new("tls", &journal)))
        .unwrap_err();

    assert_eq!(
        err,
        RegistryError::DuplicateKind {
            kind: UnitKind::new("tls"),
            existing: UnitId::new("first"),
        }
    );
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup(&UnitKind::new("tls")).unwrap().id().as_str(), "first");
}

#[test]
fn registry_rejects_duplicate_id() {
    let journal = Journal::new();
    let mut registry = Registry::new();
    registry.register(TestUnit::new("same", true, ScriptedTest::new("a", &journal))).unwrap();
    let err =
        registry.register(TestUnit::new("same", true, ScriptedTest::new("b", &journal))).unwrap_err();
    assert_eq!(err, RegistryError::DuplicateId(UnitId::new("same")));
    assert!(!registry.contains(&UnitKind::new("b")));
}

#[test]
fn registry_rejects_blank_identifiers() {
    let journal = Journal::new();
    let mut registry = Registry::new();
    let err = registry.register(TestUnit::new("  ", true, ScriptedTest::new("a", &journal))).unwrap_err();
    assert_eq!(err, RegistryError::EmptyId);
    let err = registry.register(TestUnit::new("x", true, ScriptedTest::new("", &journal))).unwrap_err();
    assert_eq!(err, RegistryError::EmptyKind(UnitId::new("x")));
    assert!(registry.is_empty());
}

#[test]
fn observed_registration_reports_accepts_and_rejects() {
    let journal = Journal::new();
    let events = MemoryEventSink::new();
    let mut registry = Registry::new();
    registry.register_observed(ScriptedTest::new("a", &journal).unit(), &events).unwrap();
    assert!(registry.register_observed(ScriptedTest::new("a", &journal).unit(), &events).is_err());

    let registered = events.events_of(RunEventKind::UnitRegistered);
    let rejected = events.events_of(RunEventKind::UnitRejected);
    assert_eq!(registered.len(), 1);
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].reason.as_deref().unwrap().contains("already registered"));
}

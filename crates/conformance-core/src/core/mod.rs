// crates/conformance-core/src/core/mod.rs
// ============================================================================
// Module: Conformance Core Types
// Description: Identifiers, statuses, properties, artifacts, and the unit model.
// Purpose: Provide the data model shared by the registry, resolver, and engine.
// Dependencies: serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! Core types are backend-agnostic. Nothing here knows about HTTP, files, or
//! configuration; concrete checks plug in through [`crate::ConformanceTest`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod artifact;
pub mod identifiers;
pub mod property;
pub mod status;
pub mod unit;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifact::Artifact;
pub use artifact::ResponseRecord;
pub use identifiers::UnitId;
pub use identifiers::UnitKind;
pub use property::PropertyError;
pub use property::PropertyRequest;
pub use property::PropertyValue;
pub use property::UnitProperty;
pub use status::StatusError;
pub use status::StatusSlot;
pub use status::UnitOutcome;
pub use status::UnitStatus;
pub use unit::DependencyLink;
pub use unit::ExecutionContext;
pub use unit::TestUnit;

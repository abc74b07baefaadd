// crates/conformance-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted conformance checks with a shared journal.
// Purpose: Drive the resolver and engine through every unit outcome.
// Dependencies: conformance-core
// ============================================================================

//! ## Overview
//! [`ScriptedTest`] behaves according to a [`Behavior`] and records every
//! lifecycle call (property application, execution, artifact reads, cleanup)
//! into a [`Journal`] shared by all units of a test.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(clippy::panic, reason = "Scripted checks panic on purpose.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use conformance_core::Artifact;
use conformance_core::ConformanceTest;
use conformance_core::ExecutionContext;
use conformance_core::PropertyError;
use conformance_core::PropertyValue;
use conformance_core::ResponseRecord;
use conformance_core::TestFailure;
use conformance_core::TestUnit;
use conformance_core::UnitKind;
use conformance_core::UnitProperty;

// ============================================================================
// SECTION: Journal
// ============================================================================

/// Shared, ordered record of lifecycle calls.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    /// Returns all entries.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Counts entries equal to `entry`.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|item| item.as_str() == entry).count()
    }

    /// Returns the kinds that executed, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter_map(|entry| entry.strip_prefix("execute:").map(str::to_string))
            .collect()
    }
}

// ============================================================================
// SECTION: Scripted Test
// ============================================================================

/// How a scripted check ends.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Concludes SUCCESS.
    Pass,
    /// Returns an assertion failure.
    Fail(&'static str),
    /// Returns a runtime failure.
    Error(&'static str),
    /// Panics.
    Panic,
    /// Concludes SKIPPED.
    Skip,
    /// Returns without a verdict.
    Silent,
}

/// Conformance check driven by a [`Behavior`].
pub struct ScriptedTest {
    /// Kind reported to the registry.
    kind: UnitKind,
    /// Declared prerequisites.
    deps: Vec<UnitKind>,
    /// How execution ends.
    behavior: Behavior,
    /// Shared lifecycle journal.
    journal: Journal,
    /// Whether a response artifact is published.
    publishes: bool,
    /// Whether request-header properties are accepted.
    accepts_headers: bool,
}

impl ScriptedTest {
    /// Creates a passing check with no prerequisites.
    #[must_use]
    pub fn new(kind: &str, journal: &Journal) -> Self {
        Self {
            kind: UnitKind::new(kind),
            deps: Vec::new(),
            behavior: Behavior::Pass,
            journal: journal.clone(),
            publishes: false,
            accepts_headers: false,
        }
    }

    /// Declares prerequisites.
    #[must_use]
    pub fn depends_on(mut self, kinds: &[&str]) -> Self {
        self.deps = kinds.iter().map(|kind| UnitKind::new(*kind)).collect();
        self
    }

    /// Sets how the check ends.
    #[must_use]
    pub fn behaves(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Publishes a response artifact before concluding.
    #[must_use]
    pub const fn publishing(mut self) -> Self {
        self.publishes = true;
        self
    }

    /// Accepts request-header properties.
    #[must_use]
    pub const fn accepting_headers(mut self) -> Self {
        self.accepts_headers = true;
        self
    }

    /// Wraps the check into a required unit whose id is `<kind>-id`.
    #[must_use]
    pub fn unit(self) -> TestUnit {
        let id = format!("{}-id", self.kind);
        TestUnit::new(id, true, self)
    }

    /// Wraps the check into an optional unit whose id is `<kind>-id`.
    #[must_use]
    pub fn optional_unit(self) -> TestUnit {
        let id = format!("{}-id", self.kind);
        TestUnit::new(id, false, self)
    }
}

impl ConformanceTest for ScriptedTest {
    fn kind(&self) -> UnitKind {
        self.kind.clone()
    }

    fn dependencies(&self) -> Vec<UnitKind> {
        self.deps.clone()
    }

    fn validate_property(&self, property: &UnitProperty) -> Result<(), PropertyError> {
        match property {
            UnitProperty::RetainArtifact => Ok(()),
            UnitProperty::RequestHeader {
                ..
            } if self.accepts_headers => Ok(()),
            UnitProperty::Setting {
                key,
                value,
            } if key == "attempts" => match value {
                PropertyValue::Integer(count) if *count > 0 => Ok(()),
                other => Err(PropertyError::InvalidValue {
                    key: key.clone(),
                    detail: format!("expected positive integer, got {}", other.shape()),
                }),
            },
            other => Err(PropertyError::unsupported(other)),
        }
    }

    fn apply_property(&mut self, property: &UnitProperty) {
        self.journal.push(format!("apply:{}:{property}", self.kind));
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), TestFailure> {
        self.journal.push(format!("execute:{}", self.kind));
        for dep in &self.deps {
            if let Some(response) = ctx.dependency_response(dep) {
                self.journal.push(format!("saw:{}:{}", self.kind, response.body_text()));
            }
        }
        if self.publishes {
            ctx.publish(Artifact::Response(ResponseRecord {
                method: "GET".to_string(),
                url: format!("http://target.test/{}", self.kind),
                status: 200,
                headers: BTreeMap::new(),
                body: format!("from {}", self.kind).into_bytes(),
            }));
        }
        match self.behavior {
            Behavior::Pass => {
                ctx.succeed();
                Ok(())
            }
            Behavior::Fail(message) => Err(TestFailure::assertion(message)),
            Behavior::Error(message) => Err(TestFailure::runtime(message)),
            Behavior::Panic => panic!("scripted panic in {}", self.kind),
            Behavior::Skip => {
                ctx.skip("not applicable to this target");
                Ok(())
            }
            Behavior::Silent => Ok(()),
        }
    }

    fn cleanup(&mut self) {
        self.journal.push(format!("cleanup:{}", self.kind));
    }
}

/// Returns kinds as owned values.
#[must_use]
pub fn kinds(names: &[&str]) -> Vec<UnitKind> {
    names.iter().map(|name| UnitKind::new(*name)).collect()
}

/// Returns the kind names of a plan in order.
#[must_use]
pub fn kind_names(kinds: &[UnitKind]) -> Vec<String> {
    kinds.iter().map(|kind| kind.as_str().to_string()).collect()
}

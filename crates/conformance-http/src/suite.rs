// crates/conformance-http/src/suite.rs
// ============================================================================
// Module: Suite Builder
// Description: Declarative check definitions and their translation into test units.
// Purpose: Build a registry of HTTP clause checks from configuration.
// Dependencies: conformance-core, reqwest, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! A [`CheckSpec`] is the declarative form of one clause check, as it appears
//! in a `[[checks]]` table. Inspection checks name the fetch they read through
//! `source`; the builder declares that dependency, asks the fetch to retain
//! its exchange, and forwards any `send_headers` to the fetch as deferred
//! request-header properties. `requires` adds ordering-only prerequisites.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use conformance_core::Registry;
use conformance_core::RunEventSink;
use conformance_core::TestUnit;
use conformance_core::UnitKind;
use conformance_core::UnitProperty;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::checks::BodyContainsCheck;
use crate::checks::FetchCheck;
use crate::checks::HeaderCheck;
use crate::checks::HeaderExpectation;
use crate::checks::Inspection;
use crate::checks::StatusCheck;
use crate::client::HttpClient;
use crate::client::HttpMethod;
use crate::client::RequestSpec;

// ============================================================================
// SECTION: Check Definitions
// ============================================================================

/// Declarative definition of one check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckSpec {
    /// Unit identifier.
    pub id: String,
    /// Unit kind; defaults to the identifier.
    #[serde(default)]
    pub kind: Option<String>,
    /// Whether a failure fails the run.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Ordering-only prerequisite kinds.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Headers the source fetch must send on this check's behalf; a fetch
    /// sends them itself.
    #[serde(default)]
    pub send_headers: BTreeMap<String, String>,
    /// Check behavior.
    #[serde(flatten)]
    pub check: CheckDefinition,
}

/// Returns the default `required` flag.
const fn default_required() -> bool {
    true
}

impl CheckSpec {
    /// Returns the unit kind.
    #[must_use]
    pub fn unit_kind(&self) -> UnitKind {
        UnitKind::new(self.kind.clone().unwrap_or_else(|| self.id.clone()))
    }
}

/// Behavior of a check, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckDefinition {
    /// Request a path from the target.
    Fetch {
        /// Request method.
        #[serde(default)]
        method: HttpMethod,
        /// Path joined onto the target base URL.
        path: String,
        /// Headers sent with the request.
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    /// Assert the fetched status code.
    Status {
        /// Kind of the fetch to inspect.
        source: String,
        /// Accepted status codes.
        expect: Vec<u16>,
    },
    /// Assert a fetched header.
    Header {
        /// Kind of the fetch to inspect.
        source: String,
        /// Header name.
        name: String,
        /// Exact expected value.
        #[serde(default)]
        equals: Option<String>,
        /// Expected fragment, compared without ASCII case.
        #[serde(default)]
        contains: Option<String>,
    },
    /// Assert the fetched body contains text.
    BodyContains {
        /// Kind of the fetch to inspect.
        source: String,
        /// Required text.
        text: String,
    },
}

impl CheckDefinition {
    /// Returns the inspected fetch kind for inspection checks.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Fetch {
                ..
            } => None,
            Self::Status {
                source, ..
            }
            | Self::Header {
                source, ..
            }
            | Self::BodyContains {
                source, ..
            } => Some(source),
        }
    }

    /// Returns the `type` label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Fetch {
                ..
            } => "fetch",
            Self::Status {
                ..
            } => "status",
            Self::Header {
                ..
            } => "header",
            Self::BodyContains {
                ..
            } => "body_contains",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures building units from definitions.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuiteError {
    /// A fetch path cannot be joined onto the base URL.
    #[error("check {id}: invalid path {path}: {detail}")]
    InvalidPath {
        /// Check identifier.
        id: String,
        /// Offending path.
        path: String,
        /// Parser message.
        detail: String,
    },
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builds the unit for one definition.
///
/// # Errors
///
/// Returns [`SuiteError::InvalidPath`] when a fetch path does not form a URL.
pub fn build_unit(spec: &CheckSpec, base_url: &Url, client: &Arc<HttpClient>) -> Result<TestUnit, SuiteError> {
    let kind = spec.unit_kind();
    let requires: Vec<UnitKind> = spec.requires.iter().map(UnitKind::new).collect();
    let mut unit = match &spec.check {
        CheckDefinition::Fetch {
            method,
            path,
            headers,
        } => {
            let url = base_url.join(path).map_err(|err| SuiteError::InvalidPath {
                id: spec.id.clone(),
                path: path.clone(),
                detail: err.to_string(),
            })?;
            let mut request = RequestSpec::new(*method, url);
            for (name, value) in headers.iter().chain(&spec.send_headers) {
                request.set_header(name, value.clone());
            }
            let check = FetchCheck::new(kind, request, requires, Arc::clone(client));
            TestUnit::new(spec.id.clone(), spec.required, check)
        }
        CheckDefinition::Status {
            source,
            expect,
        } => {
            let inspection = Inspection::new(UnitKind::new(source), requires);
            TestUnit::new(spec.id.clone(), spec.required, StatusCheck::new(kind, inspection, expect.clone()))
        }
        CheckDefinition::Header {
            source,
            name,
            equals,
            contains,
        } => {
            let inspection = Inspection::new(UnitKind::new(source), requires);
            let expectation = match (equals, contains) {
                (Some(value), _) => HeaderExpectation::Equals(value.clone()),
                (None, Some(fragment)) => HeaderExpectation::Contains(fragment.clone()),
                (None, None) => HeaderExpectation::Present,
            };
            let check = HeaderCheck::new(kind, inspection, name.clone(), expectation);
            TestUnit::new(spec.id.clone(), spec.required, check)
        }
        CheckDefinition::BodyContains {
            source,
            text,
        } => {
            let inspection = Inspection::new(UnitKind::new(source), requires);
            let check = BodyContainsCheck::new(kind, inspection, text.clone());
            TestUnit::new(spec.id.clone(), spec.required, check)
        }
    };
    if let Some(source) = spec.check.source() {
        unit = unit.with_property(source, UnitProperty::RetainArtifact);
        for (name, value) in &spec.send_headers {
            unit = unit.with_property(
                source,
                UnitProperty::RequestHeader {
                    name: name.clone(),
                    value: value.clone(),
                },
            );
        }
    }
    Ok(unit)
}

/// Builds a registry from definitions.
///
/// Definitions whose registration is rejected (duplicate id or kind) are
/// discarded and reported through `events`; the rest still register.
///
/// # Errors
///
/// Returns [`SuiteError`] when a definition cannot be turned into a unit.
pub fn build_suite(
    specs: &[CheckSpec],
    base_url: &Url,
    client: &Arc<HttpClient>,
    events: &dyn RunEventSink,
) -> Result<Registry, SuiteError> {
    let mut registry = Registry::new();
    for spec in specs {
        let unit = build_unit(spec, base_url, client)?;
        if let Err(err) = registry.register_observed(unit, events) {
            tracing::warn!(check = %spec.id, error = %err, "check discarded");
        }
    }
    Ok(registry)
}

// crates/conformance-http/src/checks.rs
// ============================================================================
// Module: Built-in HTTP Checks
// Description: Clause checks that fetch from the target or inspect a fetched exchange.
// Purpose: Provide the concrete test units a configured suite is built from.
// Dependencies: conformance-core, reqwest
// ============================================================================

//! ## Overview
//! A [`FetchCheck`] issues one request and publishes the exchange as its
//! artifact. Inspection checks ([`StatusCheck`], [`HeaderCheck`],
//! [`BodyContainsCheck`]) declare the fetch as their source prerequisite and
//! read the retained exchange instead of issuing their own request, so a
//! target that cannot be reached yields one FAILED fetch and PREREQ_FAILED
//! inspections rather than a cascade of misleading failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use conformance_core::Artifact;
use conformance_core::ConformanceTest;
use conformance_core::ExecutionContext;
use conformance_core::PropertyError;
use conformance_core::ResponseRecord;
use conformance_core::TestFailure;
use conformance_core::UnitKind;
use conformance_core::UnitProperty;
use conformance_core::ensure;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;

use crate::client::HttpClient;
use crate::client::RequestSpec;

// ============================================================================
// SECTION: Fetch
// ============================================================================

/// Issues a request against the target and publishes the exchange.
pub struct FetchCheck {
    /// Unit kind.
    kind: UnitKind,
    /// Request to issue; dependents may add headers but never replace one.
    request: RequestSpec,
    /// Ordering-only prerequisites.
    requires: Vec<UnitKind>,
    /// Shared client.
    client: Arc<HttpClient>,
}

impl FetchCheck {
    /// Creates a fetch check.
    #[must_use]
    pub const fn new(
        kind: UnitKind,
        request: RequestSpec,
        requires: Vec<UnitKind>,
        client: Arc<HttpClient>,
    ) -> Self {
        Self {
            kind,
            request,
            requires,
            client,
        }
    }

    /// Returns the request the check will issue.
    #[must_use]
    pub const fn request(&self) -> &RequestSpec {
        &self.request
    }
}

impl ConformanceTest for FetchCheck {
    fn kind(&self) -> UnitKind {
        self.kind.clone()
    }

    fn dependencies(&self) -> Vec<UnitKind> {
        self.requires.clone()
    }

    fn validate_property(&self, property: &UnitProperty) -> Result<(), PropertyError> {
        match property {
            UnitProperty::RetainArtifact => Ok(()),
            UnitProperty::RequestHeader {
                name,
                value,
            } => {
                if HeaderName::from_bytes(name.as_bytes()).is_err() {
                    return Err(PropertyError::InvalidValue {
                        key: name.clone(),
                        detail: "not a valid header name".to_string(),
                    });
                }
                if HeaderValue::from_str(value).is_err() {
                    return Err(PropertyError::InvalidValue {
                        key: name.clone(),
                        detail: "not a valid header value".to_string(),
                    });
                }
                if let Some(current) = self.request.headers.get(&name.to_ascii_lowercase())
                    && current != value
                {
                    return Err(PropertyError::InvalidValue {
                        key: name.clone(),
                        detail: format!("request already sends {current}"),
                    });
                }
                Ok(())
            }
            UnitProperty::Setting {
                ..
            } => Err(PropertyError::unsupported(property)),
        }
    }

    fn apply_property(&mut self, property: &UnitProperty) {
        if let UnitProperty::RequestHeader {
            name,
            value,
        } = property
        {
            self.request.set_header(name, value.clone());
        }
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), TestFailure> {
        let response = self.client.send(&self.request).map_err(|err| TestFailure::runtime(err.to_string()))?;
        let status = response.status;
        if status >= 500 {
            ctx.warn(format!("target answered with server error {status}"));
        }
        ctx.publish(Artifact::Response(response));
        ctx.succeed_with(format!("{} {} answered {status}", self.request.method.as_str(), self.request.url));
        Ok(())
    }
}

// ============================================================================
// SECTION: Inspection Helpers
// ============================================================================

/// Prerequisites shared by inspection checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    /// Kind of the fetch whose exchange is inspected.
    pub source: UnitKind,
    /// Ordering-only prerequisites.
    pub requires: Vec<UnitKind>,
}

impl Inspection {
    /// Creates an inspection of `source`.
    #[must_use]
    pub const fn new(source: UnitKind, requires: Vec<UnitKind>) -> Self {
        Self {
            source,
            requires,
        }
    }

    /// Returns the source followed by ordering-only prerequisites.
    fn dependencies(&self) -> Vec<UnitKind> {
        let mut deps = Vec::with_capacity(self.requires.len() + 1);
        deps.push(self.source.clone());
        deps.extend(self.requires.iter().cloned());
        deps
    }

    /// Returns the exchange retained by the source.
    fn response<'c>(&self, ctx: &'c ExecutionContext<'_>) -> Result<&'c ResponseRecord, TestFailure> {
        ctx.dependency_response(&self.source)
            .ok_or_else(|| TestFailure::runtime(format!("no retained exchange from {}", self.source)))
    }
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Asserts the fetched status code is one of the expected codes.
pub struct StatusCheck {
    /// Unit kind.
    kind: UnitKind,
    /// Source and ordering prerequisites.
    inspection: Inspection,
    /// Accepted status codes.
    expect: Vec<u16>,
}

impl StatusCheck {
    /// Creates a status check.
    #[must_use]
    pub const fn new(kind: UnitKind, inspection: Inspection, expect: Vec<u16>) -> Self {
        Self {
            kind,
            inspection,
            expect,
        }
    }
}

impl ConformanceTest for StatusCheck {
    fn kind(&self) -> UnitKind {
        self.kind.clone()
    }

    fn dependencies(&self) -> Vec<UnitKind> {
        self.inspection.dependencies()
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), TestFailure> {
        let status = self.inspection.response(ctx)?.status;
        ensure(self.expect.contains(&status), || {
            let expected: Vec<String> = self.expect.iter().map(u16::to_string).collect();
            format!("status {status} is not one of {}", expected.join(", "))
        })?;
        ctx.succeed();
        Ok(())
    }
}

// ============================================================================
// SECTION: Header
// ============================================================================

/// Expectation on a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderExpectation {
    /// The header only needs to be present.
    Present,
    /// The value must equal this text.
    Equals(String),
    /// The value must contain this text, ignoring ASCII case.
    Contains(String),
}

/// Asserts a header is present and optionally matches an expectation.
pub struct HeaderCheck {
    /// Unit kind.
    kind: UnitKind,
    /// Source and ordering prerequisites.
    inspection: Inspection,
    /// Header name.
    name: String,
    /// Value expectation.
    expectation: HeaderExpectation,
}

impl HeaderCheck {
    /// Creates a header check.
    #[must_use]
    pub fn new(
        kind: UnitKind,
        inspection: Inspection,
        name: impl Into<String>,
        expectation: HeaderExpectation,
    ) -> Self {
        Self {
            kind,
            inspection,
            name: name.into(),
            expectation,
        }
    }
}

impl ConformanceTest for HeaderCheck {
    fn kind(&self) -> UnitKind {
        self.kind.clone()
    }

    fn dependencies(&self) -> Vec<UnitKind> {
        self.inspection.dependencies()
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), TestFailure> {
        let value = self
            .inspection
            .response(ctx)?
            .header(&self.name)
            .map(str::to_string)
            .ok_or_else(|| TestFailure::assertion(format!("header {} is missing", self.name)))?;
        match &self.expectation {
            HeaderExpectation::Present => {}
            HeaderExpectation::Equals(expected) => {
                if value != *expected {
                    ensure(value.eq_ignore_ascii_case(expected), || {
                        format!("header {} is '{value}', expected '{expected}'", self.name)
                    })?;
                    ctx.warn(format!("header {} differs from {expected} only in letter case", self.name));
                }
            }
            HeaderExpectation::Contains(needle) => {
                ensure(value.to_ascii_lowercase().contains(&needle.to_ascii_lowercase()), || {
                    format!("header {} does not contain {needle}", self.name)
                })?;
            }
        }
        ctx.succeed();
        Ok(())
    }
}

// ============================================================================
// SECTION: Body
// ============================================================================

/// Asserts the fetched body contains a text fragment.
pub struct BodyContainsCheck {
    /// Unit kind.
    kind: UnitKind,
    /// Source and ordering prerequisites.
    inspection: Inspection,
    /// Required text.
    text: String,
}

impl BodyContainsCheck {
    /// Creates a body check.
    #[must_use]
    pub fn new(kind: UnitKind, inspection: Inspection, text: impl Into<String>) -> Self {
        Self {
            kind,
            inspection,
            text: text.into(),
        }
    }
}

impl ConformanceTest for BodyContainsCheck {
    fn kind(&self) -> UnitKind {
        self.kind.clone()
    }

    fn dependencies(&self) -> Vec<UnitKind> {
        self.inspection.dependencies()
    }

    fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), TestFailure> {
        let response = self.inspection.response(ctx)?;
        if response.method == "HEAD" {
            ctx.skip("HEAD responses carry no body");
            return Ok(());
        }
        let body = response.body_text();
        ensure(!body.is_empty(), || "response body is empty".to_string())?;
        ensure(body.contains(&self.text), || format!("body does not contain {}", self.text))?;
        ctx.succeed();
        Ok(())
    }
}

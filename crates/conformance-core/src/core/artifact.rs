// crates/conformance-core/src/core/artifact.rs
// ============================================================================
// Module: Conformance Artifacts
// Description: Values a unit produces while executing and may retain for dependents.
// Purpose: Give prerequisites a typed way to hand responses to dependent units.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Units that talk to the target service keep what they fetched as an
//! [`Artifact`]. Artifacts are released at cleanup unless the unit was asked to
//! retain them and it ended in SUCCESS; dependents then read the retained
//! artifact through their execution context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Response Record
// ============================================================================

/// Captured HTTP exchange as seen by a unit.
///
/// # Invariants
/// - Header names are lower-cased; repeated headers are joined with `", "`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Request method.
    pub method: String,
    /// Final request URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
    /// Response body bytes.
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl ResponseRecord {
    /// Returns a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ============================================================================
// SECTION: Artifact
// ============================================================================

/// Artifact retained by a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// HTTP exchange captured by the unit.
    Response(ResponseRecord),
}

impl Artifact {
    /// Returns the captured HTTP exchange.
    #[must_use]
    pub const fn response(&self) -> &ResponseRecord {
        match self {
            Self::Response(response) => response,
        }
    }
}

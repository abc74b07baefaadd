// crates/conformance-core/src/core/property.rs
// ============================================================================
// Module: Deferred Unit Properties
// Description: Typed configuration a unit requests against one of its prerequisites.
// Purpose: Let a dependent tune a prerequisite only through a declared dependency edge.
// Dependencies: crate::core::identifiers, serde, thiserror
// ============================================================================

//! ## Overview
//! A unit records [`PropertyRequest`] values before it is registered. Each
//! request names the prerequisite kind it targets and a typed [`UnitProperty`].
//! The resolver checks that the target kind is one of the requesting unit's
//! declared dependencies, and the target unit validates the property itself.
//! Any rejection lands on the requesting unit, never on the target.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::UnitKind;

// ============================================================================
// SECTION: Property Values
// ============================================================================

/// Scalar value carried by a [`UnitProperty::Setting`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag.
    Flag(bool),
    /// Signed integer.
    Integer(i64),
    /// Free-form text.
    Text(String),
}

impl PropertyValue {
    /// Returns a short label naming the value shape, used in rejection messages.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Flag(_) => "flag",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
        }
    }
}

/// Configuration a dependent may apply to a prerequisite.
///
/// # Invariants
/// - Variants are stable for serialization and configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "property", rename_all = "snake_case")]
pub enum UnitProperty {
    /// Keep the artifact produced by the prerequisite past its cleanup, provided
    /// the prerequisite succeeds.
    RetainArtifact,
    /// Send an extra header on the request the prerequisite issues.
    RequestHeader {
        /// Header name.
        name: String,
        /// Header value.
        value: String,
    },
    /// Unit-specific keyed setting.
    Setting {
        /// Setting key understood by the target unit.
        key: String,
        /// Setting value.
        value: PropertyValue,
    },
}

impl fmt::Display for UnitProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetainArtifact => f.write_str("retain_artifact"),
            Self::RequestHeader {
                name, ..
            } => write!(f, "request_header({name})"),
            Self::Setting {
                key, ..
            } => write!(f, "setting({key})"),
        }
    }
}

// ============================================================================
// SECTION: Property Requests
// ============================================================================

/// A deferred property recorded by a unit before registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRequest {
    /// Prerequisite kind the property is aimed at.
    pub target: UnitKind,
    /// Property to apply once the dependency edge is wired.
    pub property: UnitProperty,
}

impl PropertyRequest {
    /// Creates a property request against the given prerequisite kind.
    #[must_use]
    pub fn new(target: impl Into<UnitKind>, property: UnitProperty) -> Self {
        Self {
            target: target.into(),
            property,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rejection raised by a target unit that refuses a property.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - A rejected property leaves the target unit unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The target does not understand the property at all.
    #[error("unsupported property {property}")]
    Unsupported {
        /// Display form of the rejected property.
        property: String,
    },
    /// The target knows the key but not the supplied value.
    #[error("invalid value for {key}: {detail}")]
    InvalidValue {
        /// Property key.
        key: String,
        /// Explanation of the problem.
        detail: String,
    },
}

impl PropertyError {
    /// Builds a [`PropertyError::Unsupported`] rejection for a property.
    #[must_use]
    pub fn unsupported(property: &UnitProperty) -> Self {
        Self::Unsupported {
            property: property.to_string(),
        }
    }
}

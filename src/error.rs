//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `stackplan` engine. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors that can
//!   occur while validating a configuration set or resolving a provisioning
//!   plan. Each variant corresponds to a specific type of error and includes
//!   contextual information to aid in debugging.
//!
//! - **`ValidationErrorDescriptor`**: A single `{path, message}` pair
//!   describing one validation failure. Schema validation collects *all*
//!   descriptors before failing, so users can fix their configuration in one
//!   edit/validate cycle instead of many.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the crate to simplify function signatures.
//!
//! Validation errors (schema, environment) are batch-reported; resolution
//! errors (unsatisfied requirement, unknown service, cycle, ambiguity) fail
//! fast, since continuing would produce an incomplete, misleading artifact.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single validation failure, located by a dotted path into the
/// configuration list (e.g. `0.links.1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDescriptor {
    /// Dotted path into the configuration list (empty for list-level errors).
    pub path: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ValidationErrorDescriptor {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

fn render_descriptors(errors: &[ValidationErrorDescriptor]) -> String {
    errors
        .iter()
        .map(|e| format!("\n  - {e}"))
        .collect::<String>()
}

/// Main error type for stackplan operations
#[derive(Error, Debug)]
pub enum Error {
    /// One or more service configurations failed structural or semantic
    /// validation. Carries the full aggregated list of failures.
    #[error("Error while validating schema {schema_id}:{}", render_descriptors(errors))]
    SchemaValidation {
        schema_id: String,
        errors: Vec<ValidationErrorDescriptor>,
    },

    /// The composed schema itself could not be compiled by the validation
    /// engine. This indicates a defective service descriptor, not bad user
    /// input.
    #[error("The composed service schema is invalid: {message}")]
    SchemaCompile { message: String },

    /// Required environment variables are missing. Raised before any
    /// registration, so no resource handler has run when this surfaces.
    #[error("Your environment is missing some variables: {}", missing.join(", "))]
    EnvironmentValidation { missing: Vec<String> },

    /// A declared requirement association resolved to nothing during
    /// registration.
    #[error("Requirement {requirement} for service {service_type} is not satisfied")]
    UnsatisfiedRequirement {
        requirement: String,
        service_type: String,
    },

    /// A requirement association matched more than one candidate service.
    #[error(
        "Requirement {requirement} for service {service_type} is ambiguous, \
         it matches services: {}\n  hint: Tighten the association so exactly one service matches",
        candidates.join(", ")
    )]
    AmbiguousRequirement {
        requirement: String,
        service_type: String,
        candidates: Vec<String>,
    },

    /// Registration entered a requirement cycle.
    #[error(
        "Cycle detected in service requirements: {cycle}\n  \
         hint: Remove one of the associations to break the cycle"
    )]
    CyclicRequirement { cycle: String },

    /// A configuration references a `(provider, type)` pair that is not
    /// registered.
    #[error("Service {service_type} for provider {provider} was not found{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    UnknownService {
        provider: String,
        service_type: String,
        /// Optional "did you mean" hint listing close or valid choices
        hint: Option<String>,
    },

    /// A descriptor with the same `(provider, type)` pair is already
    /// registered.
    #[error("Service {service_type} for provider {provider} is already registered")]
    DuplicateService {
        provider: String,
        service_type: String,
    },

    /// A descriptor with the same schema id is already registered.
    #[error("A schema with id {schema_id} is already registered")]
    DuplicateSchema { schema_id: String },

    /// A service descriptor was assembled incorrectly.
    #[error("Invalid descriptor for service {service_type} (provider {provider}): {message}")]
    Descriptor {
        provider: String,
        service_type: String,
        message: String,
    },

    /// A configuration profile could not be resolved.
    #[error("Profile {profile} for {provider}/{service_type} is not available: {message}")]
    Profile {
        provider: String,
        service_type: String,
        profile: String,
        message: String,
    },

    /// A resource or association handler failed. Handler errors propagate
    /// unchanged, attributed to the resource that raised them.
    #[error("Handler for resource {resource_id} failed: {message}")]
    Handler {
        resource_id: String,
        message: String,
    },

    /// An address could not be parsed as an IPv4 address or CIDR block.
    #[error("Invalid IP address or CIDR block: {address}")]
    InvalidAddress { address: String },

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

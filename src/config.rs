//! # Service Configuration Access
//!
//! A service configuration is a JSON object carrying at minimum `name`,
//! `type` and `provider`, plus whatever attributes its service schema
//! declares. Configurations stay as `serde_json::Value` trees throughout the
//! engine: the schema that governs them is composed at runtime from the
//! registered service descriptors, so no closed Rust struct can describe
//! them up front.
//!
//! This module provides [`ServiceConfig`], a thin borrowing accessor over
//! one configuration value. All accessors are total: a missing or
//! wrongly-typed attribute reads as `None` (or an empty list), never a
//! panic, because raw configurations pass through here before validation
//! has vouched for their shape.

use serde_json::Value;

/// Allowed characters for a service name.
pub const NAME_PATTERN: &str = "^([a-zA-Z0-9_-]+)$";

/// Minimum length of a service name.
pub const MIN_NAME_LENGTH: u64 = 2;

/// Borrowing accessor over a single service configuration object.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig<'a> {
    inner: &'a Value,
}

impl<'a> ServiceConfig<'a> {
    pub fn new(inner: &'a Value) -> Self {
        Self { inner }
    }

    /// The underlying JSON value.
    pub fn as_value(&self) -> &'a Value {
        self.inner
    }

    /// Looks up a top-level attribute by key.
    pub fn attr(&self, key: &str) -> Option<&'a Value> {
        self.inner.get(key)
    }

    fn str_attr(&self, key: &str) -> Option<&'a str> {
        self.attr(key).and_then(Value::as_str)
    }

    /// The service's unique name within the configuration list.
    pub fn name(&self) -> Option<&'a str> {
        self.str_attr("name")
    }

    /// The provider discriminant (e.g. `aws`).
    pub fn provider(&self) -> Option<&'a str> {
        self.str_attr("provider")
    }

    /// The service type discriminant (e.g. `database`).
    pub fn service_type(&self) -> Option<&'a str> {
        self.str_attr("type")
    }

    /// The region the service deploys into, when the service is regional.
    pub fn region(&self) -> Option<&'a str> {
        self.str_attr("region")
    }

    /// The configuration profile name, when the service is profileable.
    pub fn profile(&self) -> Option<&'a str> {
        self.str_attr("profile")
    }

    /// Profile override attributes, when present.
    pub fn overrides(&self) -> Option<&'a serde_json::Map<String, Value>> {
        self.attr("overrides").and_then(Value::as_object)
    }

    /// The domain an application service is exposed under.
    pub fn domain(&self) -> Option<&'a str> {
        self.str_attr("domain")
    }

    /// Names of sibling services this one links to. Non-string entries are
    /// skipped; structural validation reports them separately.
    pub fn links(&self) -> Vec<&'a str> {
        self.attr("links")
            .and_then(Value::as_array)
            .map(|links| links.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

//! # Provisioning Stack
//!
//! The stack is the accumulator every resource handler writes into: one
//! addressable bag of resource fragments plus a map of local values, scoped
//! to a single named environment. The engine guarantees handlers run in
//! dependency order and then serializes whatever they produced; it never
//! interprets the fragments themselves.

use log::warn;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Aggregates the resources produced while registering provisionables.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    resources: BTreeMap<String, Value>,
    locals: BTreeMap<String, Value>,
}

impl Stack {
    /// Creates an empty stack for the given environment name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: BTreeMap::new(),
            locals: BTreeMap::new(),
        }
    }

    /// The environment name this stack deploys.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a resource fragment under the `<kind>.<resource_id>` address.
    ///
    /// Addresses are expected to be unique per run; a duplicate replaces the
    /// previous fragment and is logged, since it usually indicates a handler
    /// writing under the wrong id.
    pub fn add_resource(&mut self, kind: &str, resource_id: &str, attributes: Value) {
        let address = format!("{kind}.{resource_id}");
        if self.resources.insert(address.clone(), attributes).is_some() {
            warn!("Resource address {address} was overwritten");
        }
    }

    /// Looks up a resource fragment by kind and resource id.
    pub fn resource(&self, kind: &str, resource_id: &str) -> Option<&Value> {
        self.resources.get(&format!("{kind}.{resource_id}"))
    }

    /// The number of resource fragments registered so far.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Sets a local value (e.g. an environment variable wired into the
    /// artifact).
    pub fn set_local(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }

    /// Looks up a local value.
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Serializes the stack into the final provisioning artifact.
    pub fn to_object(&self) -> Value {
        json!({
            "name": self.name,
            "resources": self.resources,
            "locals": self.locals,
        })
    }
}

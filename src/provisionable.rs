//! # Provisionables
//!
//! A provisionable is one concrete, validated service instance awaiting
//! registration. Its identity is a content hash of its normalized
//! configuration, which makes the dependency graph collapse identical
//! configurations into a single node; its `resource_id` is the
//! human-readable, deterministic identifier downstream systems key physical
//! resources by.
//!
//! [`ProvisionableSet`] is the factory and container: it derives identities,
//! assigns resource ids from per-group counters seeded by input order, and
//! preserves insertion order for deterministic iteration. The set lives for
//! the duration of one operation; provisionables are mutated in place during
//! graph discovery and registration and never removed within a run.

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::hash;
use crate::registry::{ServiceDescriptor, ServiceRegistry};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The output of a service's resource handler.
pub type Provisions = Value;

/// One configured service instance awaiting registration.
#[derive(Debug, Clone)]
pub struct Provisionable {
    /// Content hash of the normalized configuration; the dependency-graph key.
    pub id: String,
    /// Deterministic, human-readable identifier (e.g. `aws_database_1`).
    ///
    /// Changing how this value is derived is a breaking change for any
    /// consumer that keys physical infrastructure by it.
    pub resource_id: String,
    /// The validated, defaulted configuration.
    pub config: Value,
    /// The service kind this instance belongs to.
    pub service: Arc<ServiceDescriptor>,
    /// Resolved requirement outputs, filled during registration.
    pub requirements: BTreeMap<String, Value>,
    /// Resource handler output, filled once on first registration.
    pub provisions: Provisions,
    /// Resolved side-effect outputs, filled after registration.
    pub side_effects: BTreeMap<String, Value>,
    /// Guard for at-most-once handler invocation.
    pub registered: bool,
}

/// Factory and container for the provisionables of one operation.
#[derive(Debug, Default, Clone)]
pub struct ProvisionableSet {
    items: BTreeMap<String, Provisionable>,
    order: Vec<String>,
    service_counts: BTreeMap<String, usize>,
}

impl ProvisionableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provisionable from a validated configuration and adds it to
    /// the set, returning its id.
    ///
    /// Identical configurations collapse to the same id: the second create
    /// is a no-op that returns the existing entry, so both the registration
    /// guarantee (handler runs once) and resource-id stability hold.
    pub fn create(&mut self, registry: &ServiceRegistry, config: &Value) -> Result<String> {
        let id = hash::hash_value(config);
        if self.items.contains_key(&id) {
            return Ok(id);
        }

        let attrs = ServiceConfig::new(config);
        let provider = attrs.provider().unwrap_or_default();
        let service_type = attrs.service_type().unwrap_or_default();
        let service = registry.get(provider, service_type)?;

        let resource_id = self.next_resource_id(provider, service_type, attrs.region());

        self.items.insert(
            id.clone(),
            Provisionable {
                id: id.clone(),
                resource_id,
                config: config.clone(),
                service,
                requirements: BTreeMap::new(),
                provisions: Value::Null,
                side_effects: BTreeMap::new(),
                registered: false,
            },
        );
        self.order.push(id.clone());

        Ok(id)
    }

    /// Derives the next resource id for a `(provider, type[, region])`
    /// group. The first occurrence of a group gets index 1; the counter is
    /// scoped to this set, i.e. to one operation run.
    fn next_resource_id(&mut self, provider: &str, service_type: &str, region: Option<&str>) -> String {
        let group = match region {
            Some(region) => format!("{provider}-{service_type}-{region}"),
            None => format!("{provider}-{service_type}"),
        };

        let index = self.service_counts.entry(group.clone()).or_insert(0);
        *index += 1;

        snake_case(&format!("{group} {index}"))
    }

    pub fn get(&self, id: &str) -> Option<&Provisionable> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Provisionable> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Provisionables in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Provisionable> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Finds a provisionable whose configuration equals the given one.
    pub fn find_by_config(&self, config: &Value) -> Option<&Provisionable> {
        self.values().find(|p| &p.config == config)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Renders a string as snake_case: separator runs collapse to single
/// underscores, uppercase boundaries split, everything lowercases.
fn snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_lower_or_digit = false;

    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() {
                if prev_lower_or_digit {
                    out.push('_');
                }
                out.extend(ch.to_lowercase());
                prev_lower_or_digit = false;
            } else {
                out.push(ch);
                prev_lower_or_digit = true;
            }
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower_or_digit = false;
        }
    }

    out.trim_end_matches('_').to_string()
}

//! # Stackplan Engine Library
//!
//! This library turns a declarative list of service configurations into a
//! fully resolved, dependency-ordered provisioning plan. Users describe
//! *what* they want; the engine validates the configurations, wires
//! cross-service relationships automatically, decides registration order
//! and produces the aggregated provisioning artifact.
//!
//! ## Quick Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use serde_json::json;
//! use stackplan::operation::Operation;
//! use stackplan::profile::MemoryProfileStore;
//! use stackplan::registry::{ServiceDescriptor, ServiceRegistry};
//!
//! // Describe a service kind: its schema fragment and resource handler
//! let mut registry = ServiceRegistry::new();
//! registry.register(
//!     ServiceDescriptor::builder("aws", "cache")
//!         .schema(json!({
//!             "type": "object",
//!             "properties": {"size": {"type": "string", "default": "small"}}
//!         }))
//!         .handler(|provisionable, stack| {
//!             stack.add_resource(
//!                 "cache_cluster",
//!                 &provisionable.resource_id,
//!                 json!({"size": provisionable.config["size"]}),
//!             );
//!             Ok(json!({"endpoint": format!("{}.cache.local", provisionable.resource_id)}))
//!         })
//!         .build()?,
//! )?;
//!
//! // Provision a configuration list against it
//! let configs = vec![json!({"name": "sessions", "type": "cache", "provider": "aws"})];
//! let profiles = MemoryProfileStore::new();
//! let mut operation =
//!     Operation::new(&registry, &profiles, &configs, "production", BTreeMap::new())?;
//! let artifact = operation.process()?;
//!
//! assert_eq!(artifact["name"], "production");
//! assert_eq!(
//!     artifact["resources"]["cache_cluster.aws_cache_1"]["size"],
//!     "small"
//! );
//! # Ok::<(), stackplan::error::Error>(())
//! ```
//!
//! ## Core Concepts
//!
//! The library is built around a few key concepts:
//!
//! - **Service Descriptors (`registry`)**: the static catalogue of available
//!   service kinds, each carrying a schema fragment, association rules,
//!   environment-variable declarations and a resource handler.
//! - **Validation (`validation`, `schema`)**: one discriminated schema is
//!   composed from every registered descriptor; configurations are
//!   normalized (defaults, coercion, stripping) and checked structurally and
//!   semantically, with all errors reported in one batch.
//! - **Provisionables (`provisionable`)**: validated service instances keyed
//!   by a content hash of their configuration, with deterministic,
//!   run-stable resource ids.
//! - **Operations (`operation`)**: the orchestrator that discovers the
//!   association graph between provisionables and registers them in
//!   dependency order, invoking each resource handler exactly once.
//! - **Stack (`stack`)**: the accumulator handlers provision into; its
//!   serialized form is the final artifact.
//!
//! ## Execution Flow
//!
//! 1. **Compose & validate**: merge every descriptor's schema fragment into
//!    one discriminated schema, normalize and validate the raw
//!    configurations.
//! 2. **Build provisionables**: derive content-hash identities and stable
//!    resource ids for every configuration.
//! 3. **Discover associations**: evaluate every association's type filter
//!    and predicate over every provisionable pair, bucketing matches into
//!    requirement and side-effect edges.
//! 4. **Register**: walk the requirement graph recursively, memoized for
//!    diamonds and guarded against cycles, resolving requirements before
//!    each handler runs and side effects after.
//! 5. **Serialize**: return the stack as the final provisioning artifact.

pub mod config;
pub mod environment;
pub mod error;
pub mod hash;
pub mod network;
pub mod operation;
pub mod profile;
pub mod provisionable;
pub mod registry;
pub mod schema;
pub mod stack;
pub mod suggestions;
pub mod validation;

#[cfg(test)]
mod hash_proptest;

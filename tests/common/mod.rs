//! Shared test fixtures for integration tests.
//!
//! This module provides a small but realistic service catalogue in the
//! shape embedders are expected to build: an account-level `provider`
//! service everything depends on, a `secrets` vault, a `database` that
//! requires credentials from the vault, and a linkable `app` with unique
//! domains. Resource handlers append to a shared registration log so tests
//! can assert ordering and at-most-once invocation.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then build a fixture per test:
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = common::Fixture::new();
//!     let mut operation = fixture.operation(vec![...]).unwrap();
//!     // ... test code
//! }
//! ```

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use serde_json::{json, Value};
use stackplan::config::ServiceConfig;
use stackplan::error::Result;
use stackplan::network;
use stackplan::operation::Operation;
use stackplan::profile::MemoryProfileStore;
use stackplan::registry::{Association, ServiceDescriptor, ServiceRegistry};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A service catalogue plus the registration log its handlers write into.
pub struct Fixture {
    pub registry: ServiceRegistry,
    pub profiles: MemoryProfileStore,
    /// Resource ids in the order their resource handlers ran.
    pub registration_log: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    pub fn new() -> Self {
        let registration_log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let registry = build_registry(&registration_log);
        let profiles = build_profiles();

        Self {
            registry,
            profiles,
            registration_log,
        }
    }

    /// Builds an operation with the fixture's default (complete) variables.
    pub fn operation(&self, configs: Vec<Value>) -> Result<Operation> {
        self.operation_with_variables(configs, variables())
    }

    pub fn operation_with_variables(
        &self,
        configs: Vec<Value>,
        variables: BTreeMap<String, String>,
    ) -> Result<Operation> {
        Operation::new(&self.registry, &self.profiles, &configs, "testing", variables)
    }

    /// The resource ids registered so far, in invocation order.
    pub fn registered(&self) -> Vec<String> {
        self.registration_log.lock().unwrap().clone()
    }
}

/// The variables the fixture's provider service requires.
pub fn variables() -> BTreeMap<String, String> {
    [
        ("AWS_ACCESS_KEY_ID".to_string(), "AKIATEST".to_string()),
        ("AWS_SECRET_ACCESS_KEY".to_string(), "secret".to_string()),
    ]
    .into()
}

/// A requirement on the account-level provider service of the same cloud
/// provider.
fn provider_setup() -> Association {
    Association::requirement(|target, _stack, _owner| {
        Ok(Some(json!({"account": target.provisions["account"]})))
    })
    .with_service_type("provider")
    .matching(|own, candidate| {
        ServiceConfig::new(own).provider() == ServiceConfig::new(candidate).provider()
    })
}

/// A side effect linking a service to every sibling named in its `links`.
fn linkable() -> Association {
    Association::side_effect(|target, _stack, _owner| {
        Ok(Some(json!({"linked_to": target.resource_id})))
    })
    .matching(|own, candidate| match ServiceConfig::new(candidate).name() {
        Some(name) => ServiceConfig::new(own).links().contains(&name),
        None => false,
    })
}

fn links_schema() -> Value {
    json!({
        "type": "array",
        "default": [],
        "items": {"type": "string"},
    })
}

fn build_registry(log: &Arc<Mutex<Vec<String>>>) -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();

    let provider_log = log.clone();
    registry
        .register(
            ServiceDescriptor::builder("aws", "provider")
                .schema(json!({
                    "type": "object",
                    "properties": {
                        "root_ip": {
                            "type": "string",
                            "format": "ip-or-cidr",
                            "default": "10.0.0.1",
                        },
                    }
                }))
                .environment("AWS_ACCESS_KEY_ID", true, "AWS access key id")
                .environment("AWS_SECRET_ACCESS_KEY", true, "AWS secret access key")
                .environment("AWS_PROFILE", false, "AWS credentials profile")
                .regions(["eu-central-1", "us-east-1"])
                .handler(move |provisionable, stack| {
                    provider_log
                        .lock()
                        .unwrap()
                        .push(provisionable.resource_id.clone());
                    let root_ip = provisionable.config["root_ip"].as_str().unwrap_or_default();
                    let blocks = network::cidr_blocks(root_ip, 16, 2, 24)?;
                    stack.add_resource(
                        "provider_account",
                        &provisionable.resource_id,
                        json!({"cidr_blocks": blocks.clone()}),
                    );
                    Ok(json!({
                        "account": provisionable.resource_id,
                        "cidr_blocks": blocks,
                    }))
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let secrets_log = log.clone();
    registry
        .register(
            ServiceDescriptor::builder("aws", "secrets")
                .association("providerSetup", provider_setup())
                .handler(move |provisionable, stack| {
                    secrets_log
                        .lock()
                        .unwrap()
                        .push(provisionable.resource_id.clone());
                    stack.add_resource("vault", &provisionable.resource_id, json!({}));
                    Ok(json!({"vault": provisionable.resource_id}))
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let database_log = log.clone();
    registry
        .register(
            ServiceDescriptor::builder("aws", "database")
                .schema(json!({
                    "type": "object",
                    "properties": {
                        "storage": {"type": "number", "default": 30},
                        "engine": {"type": "string", "default": "mysql"},
                        "profile": {"type": "string"},
                        "overrides": {"type": "object"},
                        "links": links_schema(),
                    }
                }))
                .association("providerSetup", provider_setup())
                .association(
                    "rootCredentials",
                    Association::requirement(|target, _stack, _owner| {
                        Ok(Some(json!({
                            "username": "root",
                            "vault": target.provisions["vault"],
                        })))
                    })
                    .with_service_type("secrets")
                    .matching(|own, candidate| {
                        ServiceConfig::new(own).provider()
                            == ServiceConfig::new(candidate).provider()
                    }),
                )
                .association("linkable", linkable())
                .handler(move |provisionable, stack| {
                    database_log
                        .lock()
                        .unwrap()
                        .push(provisionable.resource_id.clone());
                    stack.add_resource(
                        "db_instance",
                        &provisionable.resource_id,
                        json!({
                            "storage": provisionable.config["storage"],
                            "engine": provisionable.config["engine"],
                            "credentials": provisionable.requirements["rootCredentials"],
                        }),
                    );
                    Ok(json!({
                        "endpoint": format!("{}.db.internal", provisionable.resource_id),
                    }))
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let app_log = log.clone();
    registry
        .register(
            ServiceDescriptor::builder("aws", "app")
                .schema(json!({
                    "type": "object",
                    "properties": {
                        "domain": {"type": "string"},
                        "links": links_schema(),
                    }
                }))
                .unique_domains()
                .association("providerSetup", provider_setup())
                .association("linkable", linkable())
                .handler(move |provisionable, stack| {
                    app_log
                        .lock()
                        .unwrap()
                        .push(provisionable.resource_id.clone());
                    stack.add_resource("app_service", &provisionable.resource_id, json!({}));
                    Ok(json!({
                        "url": format!(
                            "https://{}",
                            provisionable.config["domain"].as_str().unwrap_or("localhost")
                        ),
                    }))
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    registry
}

fn build_profiles() -> MemoryProfileStore {
    let mut profiles = MemoryProfileStore::new();
    profiles.insert(
        "aws",
        "database",
        "default",
        json!({"instance_size": "db.t3.micro", "backup_retention": 7}),
    );
    profiles.insert(
        "aws",
        "database",
        "production",
        json!({"instance_size": "db.m5.large", "backup_retention": 30}),
    );
    profiles
}

/// Convenience constructors for commonly used configurations.
pub mod configs {
    use serde_json::{json, Value};

    pub fn provider() -> Value {
        json!({"name": "account", "type": "provider", "provider": "aws"})
    }

    pub fn database(name: &str) -> Value {
        json!({"name": name, "type": "database", "provider": "aws", "region": "eu-central-1"})
    }

    pub fn secrets(name: &str) -> Value {
        json!({"name": name, "type": "secrets", "provider": "aws", "region": "eu-central-1"})
    }

    pub fn app(name: &str, domain: &str) -> Value {
        json!({"name": name, "type": "app", "provider": "aws", "domain": domain})
    }
}

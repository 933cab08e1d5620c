//! Semantic validation rules.
//!
//! These are the engine's own invariants, layered on top of structural
//! schema validation: rules that need to see the whole configuration list,
//! the profile store, or a descriptor - context a per-item schema fragment
//! cannot express. Every rule collects descriptors instead of failing
//! early, so they report alongside structural errors in one batch.
//!
//! Rules operate on normalized configurations but stay total over malformed
//! shapes: structural validation owns those reports.

use crate::config::ServiceConfig;
use crate::error::ValidationErrorDescriptor;
use crate::network::is_address_valid;
use crate::profile::{ProfileStore, DEFAULT_PROFILE_NAME};
use crate::registry::ServiceRegistry;
use serde_json::Value;
use std::collections::BTreeMap;

/// Schema-fragment format marker for IPv4/CIDR string attributes.
pub const IP_OR_CIDR_FORMAT: &str = "ip-or-cidr";

/// Runs every semantic rule over the configuration list.
pub fn validate(
    registry: &ServiceRegistry,
    profiles: &dyn ProfileStore,
    configs: &[Value],
) -> Vec<ValidationErrorDescriptor> {
    let mut errors = Vec::new();
    errors.extend(validate_service_links(configs));
    errors.extend(validate_service_profiles(registry, profiles, configs));
    errors.extend(validate_addresses(registry, configs));
    errors.extend(validate_unique_domains(registry, configs));
    errors
}

/// Every entry in a `links` list must name a sibling service.
fn validate_service_links(configs: &[Value]) -> Vec<ValidationErrorDescriptor> {
    let names: Vec<&str> = configs
        .iter()
        .filter_map(|config| ServiceConfig::new(config).name())
        .collect();

    let mut errors = Vec::new();
    for (index, config) in configs.iter().enumerate() {
        for (position, link) in ServiceConfig::new(config).links().iter().enumerate() {
            if !names.contains(link) {
                errors.push(ValidationErrorDescriptor::new(
                    format!("{index}.links.{position}"),
                    format!("Linked service {link} does not exist in the configuration"),
                ));
            }
        }
    }
    errors
}

/// A named `profile` must exist for the service's `(provider, type)` pair,
/// and every `overrides` key must exist in the resolved profile.
fn validate_service_profiles(
    registry: &ServiceRegistry,
    profiles: &dyn ProfileStore,
    configs: &[Value],
) -> Vec<ValidationErrorDescriptor> {
    let mut errors = Vec::new();

    for (index, config) in configs.iter().enumerate() {
        let attrs = ServiceConfig::new(config);
        let (Some(provider), Some(service_type)) = (attrs.provider(), attrs.service_type()) else {
            continue;
        };
        if registry.get(provider, service_type).is_err() {
            continue;
        }

        if let Some(profile) = attrs.profile() {
            if profiles.get(provider, service_type, profile).is_err() {
                errors.push(ValidationErrorDescriptor::new(
                    format!("{index}.profile"),
                    format!("Profile {profile} is not available for {provider}/{service_type}"),
                ));
            }
        }

        let Some(overrides) = attrs.overrides() else {
            continue;
        };
        let profile_name = attrs.profile().unwrap_or(DEFAULT_PROFILE_NAME);
        match profiles.get(provider, service_type, profile_name) {
            Ok(profile) => {
                let irrelevant: Vec<&str> = overrides
                    .keys()
                    .filter(|key| profile.get(key.as_str()).is_none())
                    .map(String::as_str)
                    .collect();
                if !irrelevant.is_empty() {
                    errors.push(ValidationErrorDescriptor::new(
                        format!("{index}.overrides"),
                        format!(
                            "Override keys are not part of profile {profile_name}: {}",
                            irrelevant.join(", ")
                        ),
                    ));
                }
            }
            Err(_) => {
                errors.push(ValidationErrorDescriptor::new(
                    format!("{index}.overrides"),
                    format!(
                        "Overrides cannot be verified, profile {profile_name} is not \
                         available for {provider}/{service_type}"
                    ),
                ));
            }
        }
    }

    errors
}

/// String attributes tagged with the `ip-or-cidr` format must parse as a
/// dotted IPv4 address or IPv4 CIDR block.
fn validate_addresses(
    registry: &ServiceRegistry,
    configs: &[Value],
) -> Vec<ValidationErrorDescriptor> {
    let mut errors = Vec::new();

    for (index, config) in configs.iter().enumerate() {
        let attrs = ServiceConfig::new(config);
        let (Some(provider), Some(service_type)) = (attrs.provider(), attrs.service_type()) else {
            continue;
        };
        let Ok(descriptor) = registry.get(provider, service_type) else {
            continue;
        };
        let Some(properties) = descriptor.schema.get("properties").and_then(Value::as_object)
        else {
            continue;
        };

        for (key, property_schema) in properties {
            if property_schema.get("format").and_then(Value::as_str) != Some(IP_OR_CIDR_FORMAT) {
                continue;
            }
            if let Some(address) = attrs.attr(key).and_then(Value::as_str) {
                if !is_address_valid(address) {
                    errors.push(ValidationErrorDescriptor::new(
                        format!("{index}.{key}"),
                        format!("{address} is not a valid IPv4 address or CIDR block"),
                    ));
                }
            }
        }
    }

    errors
}

/// No two services of a domain-unique kind may declare the same `domain`.
fn validate_unique_domains(
    registry: &ServiceRegistry,
    configs: &[Value],
) -> Vec<ValidationErrorDescriptor> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    let mut errors = Vec::new();

    for (index, config) in configs.iter().enumerate() {
        let attrs = ServiceConfig::new(config);
        let (Some(provider), Some(service_type)) = (attrs.provider(), attrs.service_type()) else {
            continue;
        };
        let Ok(descriptor) = registry.get(provider, service_type) else {
            continue;
        };
        if !descriptor.unique_domains {
            continue;
        }
        let Some(domain) = attrs.domain() else {
            continue;
        };

        if let Some(first) = seen.get(domain) {
            errors.push(ValidationErrorDescriptor::new(
                format!("{index}.domain"),
                format!("Domain {domain} is already declared by service at index {first}"),
            ));
        } else {
            seen.insert(domain, index);
        }
    }

    errors
}

//! # Configuration Profiles
//!
//! A profile is a named bundle of preset attributes for one
//! `(provider, type)` pair - the dials a service kind exposes without
//! forcing every configuration to spell them out. Services opt into a
//! profile by name and may override individual keys through `overrides`;
//! the validator enforces that overridden keys actually exist in the
//! resolved profile, so typos never get silently ignored.
//!
//! The engine only depends on the [`ProfileStore`] trait. The in-memory
//! implementation backs tests and embedders that assemble profiles in code.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The profile used when a configuration does not name one.
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Looks up named configuration profiles per `(provider, type)` pair.
pub trait ProfileStore {
    /// Returns the named profile, failing if it does not exist.
    fn get(&self, provider: &str, service_type: &str, name: &str) -> Result<Value>;
}

/// Profile store backed by an in-memory map.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: BTreeMap<(String, String, String), Value>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a profile, replacing any previous one under the same key.
    pub fn insert(
        &mut self,
        provider: impl Into<String>,
        service_type: impl Into<String>,
        name: impl Into<String>,
        profile: Value,
    ) {
        self.profiles
            .insert((provider.into(), service_type.into(), name.into()), profile);
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, provider: &str, service_type: &str, name: &str) -> Result<Value> {
        self.profiles
            .get(&(
                provider.to_string(),
                service_type.to_string(),
                name.to_string(),
            ))
            .cloned()
            .ok_or_else(|| Error::Profile {
                provider: provider.to_string(),
                service_type: service_type.to_string(),
                profile: name.to_string(),
                message: "no such profile is registered".to_string(),
            })
    }
}

/// Resolves the effective profile for a service: the named (or default)
/// profile with the configuration's overrides applied on top.
pub fn resolve(
    store: &dyn ProfileStore,
    provider: &str,
    service_type: &str,
    profile: Option<&str>,
    overrides: Option<&Map<String, Value>>,
) -> Result<Value> {
    let name = profile.unwrap_or(DEFAULT_PROFILE_NAME);
    let mut resolved = store.get(provider, service_type, name)?;

    if let (Some(object), Some(overrides)) = (resolved.as_object_mut(), overrides) {
        for (key, value) in overrides {
            object.insert(key.clone(), value.clone());
        }
    }

    Ok(resolved)
}

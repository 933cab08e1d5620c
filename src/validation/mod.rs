//! # Configuration Validation
//!
//! The validation pipeline turns a raw service configuration list into its
//! normalized form, or into one aggregate error carrying every failure at
//! once. Batch reporting is deliberate: configuration mistakes tend to come
//! in groups, and reporting them together minimizes the user's
//! edit/validate cycles.
//!
//! The pipeline has three stages, all operating on a deep copy of the input
//! (the caller's configurations are never mutated, not even on success):
//!
//! 1. **Normalization** ([`normalize`]): defaults applied, scalar types
//!    coerced, unknown properties stripped - per the matching descriptor's
//!    schema fragment.
//! 2. **Structural validation**: the composed discriminated schema (see
//!    [`crate::schema`]) runs through the `jsonschema` engine, collecting
//!    all errors rather than failing fast.
//! 3. **Semantic validation** ([`semantic`]): the engine's own cross-item
//!    and cross-collaborator invariants.
//!
//! Error locations are reported as dotted paths into the list (`0.links.1`)
//! and deduplicated, with the discriminator's `if` bookkeeping filtered out.

pub mod normalize;
pub mod semantic;

pub use semantic::IP_OR_CIDR_FORMAT;

use crate::error::{Error, Result, ValidationErrorDescriptor};
use crate::profile::ProfileStore;
use crate::registry::ServiceRegistry;
use crate::schema::{self, SCHEMA_ID};
use serde_json::Value;

/// Validates and normalizes a raw configuration list.
///
/// Returns the normalized configurations, or a single
/// [`Error::SchemaValidation`] aggregating every structural and semantic
/// failure.
pub fn validate(
    registry: &ServiceRegistry,
    profiles: &dyn ProfileStore,
    raw_configs: &[Value],
) -> Result<Vec<Value>> {
    let mut configs = raw_configs.to_vec();
    normalize::apply(registry, &mut configs);

    let composed = schema::compose(registry);
    let validator = jsonschema::validator_for(&composed).map_err(|e| Error::SchemaCompile {
        message: e.to_string(),
    })?;

    let instance = Value::Array(configs);
    let mut errors = parse_errors(&validator, &instance);

    let configs = match instance {
        Value::Array(configs) => configs,
        _ => unreachable!(),
    };
    errors.extend(semantic::validate(registry, profiles, &configs));

    let errors = dedupe(errors);
    if !errors.is_empty() {
        return Err(Error::SchemaValidation {
            schema_id: SCHEMA_ID.to_string(),
            errors,
        });
    }

    Ok(configs)
}

/// Collects the engine's errors as descriptors with dotted instance paths.
fn parse_errors(validator: &jsonschema::Validator, instance: &Value) -> Vec<ValidationErrorDescriptor> {
    validator
        .iter_errors(instance)
        .filter(|error| {
            // The discriminator's failed `if` probes are bookkeeping, not
            // user-facing failures; errors inside `then` branches are real.
            !error.schema_path.to_string().ends_with("/if")
        })
        .map(|error| {
            let path = error
                .instance_path
                .to_string()
                .trim_start_matches('/')
                .replace('/', ".");
            ValidationErrorDescriptor::new(path, error.to_string())
        })
        .collect()
}

/// Drops duplicate `(path, message)` pairs while preserving order.
fn dedupe(errors: Vec<ValidationErrorDescriptor>) -> Vec<ValidationErrorDescriptor> {
    let mut unique = Vec::with_capacity(errors.len());
    for error in errors {
        if !unique.contains(&error) {
            unique.push(error);
        }
    }
    unique
}

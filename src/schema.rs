//! # Schema Composition
//!
//! Builds the one schema that validates a whole service configuration list.
//! For every registered descriptor the composer adds a conditional rule -
//! "if `provider` and `type` match this descriptor, then validate against
//! its fragment" - so the composed schema is extended purely by registering
//! new descriptors. There is no central schema file to edit.
//!
//! Fragments land under `$defs` keyed by their schema id and are referenced
//! through JSON-pointer `$ref`s, which keeps every fragment addressable even
//! when schema ids contain `/` separators.

use crate::config::{MIN_NAME_LENGTH, NAME_PATTERN};
use crate::registry::ServiceRegistry;
use serde_json::{json, Map, Value};

/// Identifier of the composed service-list schema.
pub const SCHEMA_ID: &str = "stackplan-services-configuration";

/// The shared schema fragment for service names.
pub fn name_schema() -> Value {
    json!({
        "type": "string",
        "pattern": NAME_PATTERN,
        "minLength": MIN_NAME_LENGTH,
        "description": "The name for the service to deploy",
    })
}

/// Escapes a schema id for use inside a JSON pointer (`~` -> `~0`,
/// `/` -> `~1`).
fn pointer_escape(id: &str) -> String {
    id.replace('~', "~0").replace('/', "~1")
}

/// Composes the discriminated array schema for the full configuration list.
///
/// The items schema requires `name`, `type` and `provider`, restricts the
/// discriminants to registered choices, and dispatches to the matching
/// descriptor fragment through an `allOf` of `if`/`then` rules.
pub fn compose(registry: &ServiceRegistry) -> Value {
    let all_of: Vec<Value> = registry
        .all()
        .iter()
        .map(|service| {
            json!({
                "if": {
                    "properties": {
                        "provider": {"const": service.provider},
                        "type": {"const": service.service_type},
                    },
                },
                "then": {"$ref": format!("#/$defs/{}", pointer_escape(&service.schema_id))},
            })
        })
        .collect();

    let mut defs = Map::new();
    for service in registry.all() {
        defs.insert(service.schema_id.clone(), service.schema.clone());
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": SCHEMA_ID,
        "type": "array",
        "minItems": 1,
        "uniqueItems": true,
        "items": {
            "type": "object",
            "required": ["name", "type", "provider"],
            "properties": {
                "name": name_schema(),
                "type": {"type": "string", "enum": registry.types()},
                "provider": {"type": "string", "enum": registry.providers()},
                "region": {"type": "string"},
            },
            "allOf": all_of,
        },
        "$defs": Value::Object(defs),
    })
}

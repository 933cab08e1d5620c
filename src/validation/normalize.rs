//! Configuration normalization: defaults, coercion, stripping.
//!
//! The external schema engine validates but never mutates, so the
//! normalization the validation contract promises - defaults applied,
//! permissive type coercion, unknown properties stripped - runs here, on the
//! validator's own deep copy of the input, before structural validation.
//! Normalizing first means defaulted values are themselves validated.
//!
//! Configurations whose `(provider, type)` pair is unknown are left
//! untouched; structural validation reports those discriminants separately.

use crate::config::ServiceConfig;
use crate::registry::ServiceRegistry;
use crate::schema::name_schema;
use serde_json::{json, Map, Value};

/// Normalizes every configuration in place against its descriptor fragment.
pub fn apply(registry: &ServiceRegistry, configs: &mut [Value]) {
    for config in configs {
        let Some(descriptor) = lookup(registry, config) else {
            continue;
        };

        let properties = effective_properties(&descriptor);
        if let Some(object) = config.as_object_mut() {
            strip_unknown(object, &properties);
            for (key, property_schema) in &properties {
                normalize_property(object, key, property_schema);
            }
        }
    }
}

fn lookup(
    registry: &ServiceRegistry,
    config: &Value,
) -> Option<std::sync::Arc<crate::registry::ServiceDescriptor>> {
    let attrs = ServiceConfig::new(config);
    registry
        .get(attrs.provider()?, attrs.service_type()?)
        .ok()
}

/// The property set a configuration may carry: the base item properties
/// plus everything its descriptor fragment declares.
fn effective_properties(descriptor: &crate::registry::ServiceDescriptor) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("name".to_string(), name_schema());
    properties.insert("type".to_string(), json!({"type": "string"}));
    properties.insert("provider".to_string(), json!({"type": "string"}));
    properties.insert("region".to_string(), json!({"type": "string"}));

    if let Some(declared) = descriptor.schema.get("properties").and_then(Value::as_object) {
        for (key, schema) in declared {
            properties.insert(key.clone(), schema.clone());
        }
    }

    properties
}

/// Removes keys the schema does not declare.
fn strip_unknown(object: &mut Map<String, Value>, properties: &Map<String, Value>) {
    object.retain(|key, _| properties.contains_key(key));
}

/// Applies the default and coercion rules for one property, recursing into
/// nested object schemas.
fn normalize_property(object: &mut Map<String, Value>, key: &str, property_schema: &Value) {
    if !object.contains_key(key) {
        if let Some(default) = property_schema.get("default") {
            object.insert(key.to_string(), default.clone());
        }
    }

    let Some(value) = object.get_mut(key) else {
        return;
    };

    coerce(property_schema, value);

    // Nested objects normalize against their own property map. Stripping
    // only applies where the nested schema forbids additional properties.
    if let (Some(nested_properties), Some(nested_object)) = (
        property_schema.get("properties").and_then(Value::as_object),
        value.as_object_mut(),
    ) {
        if property_schema.get("additionalProperties") == Some(&Value::Bool(false)) {
            strip_unknown(nested_object, nested_properties);
        }
        for (nested_key, nested_schema) in nested_properties {
            normalize_property(nested_object, nested_key, nested_schema);
        }
    }
}

/// Best-effort scalar coercion toward the declared type. Values that do not
/// coerce cleanly are left as-is for structural validation to report.
fn coerce(property_schema: &Value, value: &mut Value) {
    let Some(target) = property_schema.get("type").and_then(Value::as_str) else {
        return;
    };

    match target {
        "integer" => {
            if let Some(parsed) = value.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
                *value = json!(parsed);
            }
        }
        "number" => {
            if let Some(parsed) = value.as_str().and_then(|s| s.trim().parse::<f64>().ok()) {
                if let Some(number) = serde_json::Number::from_f64(parsed) {
                    *value = Value::Number(number);
                }
            }
        }
        "string" => match value {
            Value::Number(number) => *value = Value::String(number.to_string()),
            Value::Bool(boolean) => *value = Value::String(boolean.to_string()),
            _ => {}
        },
        "boolean" => {
            let coerced = match value {
                Value::String(s) if s == "true" => Some(true),
                Value::String(s) if s == "false" => Some(false),
                Value::Number(n) if n.as_i64() == Some(1) => Some(true),
                Value::Number(n) if n.as_i64() == Some(0) => Some(false),
                _ => None,
            };
            if let Some(boolean) = coerced {
                *value = Value::Bool(boolean);
            }
        }
        _ => {}
    }
}

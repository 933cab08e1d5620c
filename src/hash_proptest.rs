//! Property-based tests for identity hashing and resource-id derivation.
//!
//! These tests use proptest to generate random configurations and verify
//! that the stability contracts hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::hash::{hash_string, hash_value};
    use crate::provisionable::ProvisionableSet;
    use crate::registry::{ServiceDescriptor, ServiceRegistry};
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    fn registry() -> ServiceRegistry {
        let mut registry = ServiceRegistry::new();
        registry
            .register(
                ServiceDescriptor::builder("aws", "database")
                    .handler(|_, _| Ok(json!({})))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    /// An arbitrary flat JSON object with identifier-ish keys and scalar
    /// values.
    fn arb_object() -> impl Strategy<Value = Map<String, Value>> {
        proptest::collection::btree_map(
            "[a-z_]{1,12}",
            prop_oneof![
                any::<i64>().prop_map(Value::from),
                any::<bool>().prop_map(Value::from),
                "[a-zA-Z0-9 _-]{0,16}".prop_map(Value::from),
            ],
            0..8,
        )
        .prop_map(|entries| entries.into_iter().collect())
    }

    proptest! {
        /// Property: hashing is deterministic (same input = same output)
        #[test]
        fn hash_string_is_deterministic(input in ".*") {
            prop_assert_eq!(hash_string(&input), hash_string(&input));
        }

        /// Property: the hash of an object is independent of the order its
        /// keys were inserted in
        #[test]
        fn hash_value_is_key_order_independent(entries in arb_object()) {
            let forward = Value::Object(entries.clone());
            let reversed: Map<String, Value> =
                entries.into_iter().rev().collect();
            prop_assert_eq!(hash_value(&forward), hash_value(&Value::Object(reversed)));
        }

        /// Property: given the same ordered input list, resource ids come
        /// out identical across independent factory runs
        #[test]
        fn resource_ids_are_stable_across_runs(names in proptest::collection::vec("[a-z]{2,8}", 1..6)) {
            let registry = registry();

            let run = || -> Vec<String> {
                let mut set = ProvisionableSet::new();
                for name in &names {
                    set.create(
                        &registry,
                        &json!({"name": name, "type": "database", "provider": "aws"}),
                    )
                    .unwrap();
                }
                set.values().map(|p| p.resource_id.clone()).collect()
            };

            prop_assert_eq!(run(), run());
        }

        /// Property: resource ids are always snake_case over a restricted
        /// alphabet
        #[test]
        fn resource_ids_are_snake_case(name in "[a-z]{2,8}", region in "[a-z]{2,8}-[0-9]") {
            let registry = registry();
            let mut set = ProvisionableSet::new();
            let id = set
                .create(
                    &registry,
                    &json!({"name": name, "type": "database", "provider": "aws", "region": region}),
                )
                .unwrap();

            let resource_id = &set.get(&id).unwrap().resource_id;
            prop_assert!(resource_id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
            prop_assert!(!resource_id.starts_with('_'));
            prop_assert!(!resource_id.ends_with('_'));
        }
    }
}

//! # Environment Validation
//!
//! Before anything registers, the operation checks that every *required*
//! environment variable declared by the selected services is present in the
//! variables map. The check unions declarations across all provisionables,
//! deduplicates by variable name, and reports every missing name at once -
//! so a failed run has zero side effects and one complete error.

use crate::error::{Error, Result};
use crate::provisionable::Provisionable;
use std::collections::BTreeMap;

/// Validates the aggregate environment-variable contract of an operation.
pub fn validate_environment<'a, I>(
    provisionables: I,
    variables: &BTreeMap<String, String>,
) -> Result<()>
where
    I: IntoIterator<Item = &'a Provisionable>,
{
    let mut seen = Vec::new();
    let mut missing = Vec::new();

    for provisionable in provisionables {
        for variable in &provisionable.service.environment {
            if seen.contains(&variable.name) {
                continue;
            }
            seen.push(variable.name.clone());

            if variable.required && !variables.contains_key(&variable.name) {
                missing.push(variable.name.clone());
            }
        }
    }

    if !missing.is_empty() {
        return Err(Error::EnvironmentValidation { missing });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisionable::ProvisionableSet;
    use crate::registry::{ServiceDescriptor, ServiceRegistry};
    use serde_json::json;

    fn fixture(variables: &[(&str, bool)]) -> ProvisionableSet {
        let mut registry = ServiceRegistry::new();
        let mut builder = ServiceDescriptor::builder("aws", "database");
        for (name, required) in variables {
            builder = builder.environment(*name, *required, "test variable");
        }
        registry
            .register(builder.handler(|_, _| Ok(json!({}))).build().unwrap())
            .unwrap();

        let mut set = ProvisionableSet::new();
        set.create(
            &registry,
            &json!({"name": "db1", "type": "database", "provider": "aws"}),
        )
        .unwrap();
        set
    }

    fn vars(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_all_required_present() {
        let set = fixture(&[("AWS_ACCESS_KEY_ID", true)]);
        let variables = vars(&[("AWS_ACCESS_KEY_ID", "AKIA...")]);
        assert!(validate_environment(set.values(), &variables).is_ok());
    }

    #[test]
    fn test_missing_required_fails_with_all_names() {
        let set = fixture(&[
            ("AWS_ACCESS_KEY_ID", true),
            ("AWS_SECRET_ACCESS_KEY", true),
            ("AWS_PROFILE", false),
        ]);

        let error = validate_environment(set.values(), &BTreeMap::new()).unwrap_err();
        match error {
            Error::EnvironmentValidation { missing } => {
                assert_eq!(
                    missing,
                    vec!["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_optional_variables_never_fail() {
        let set = fixture(&[("AWS_PROFILE", false)]);
        assert!(validate_environment(set.values(), &BTreeMap::new()).is_ok());
    }

    #[test]
    fn test_declarations_dedupe_by_name() {
        // Two provisionables of the same kind declare the same variable;
        // the missing list must report it once.
        let mut registry = ServiceRegistry::new();
        registry
            .register(
                ServiceDescriptor::builder("aws", "database")
                    .environment("AWS_ACCESS_KEY_ID", true, "access key")
                    .handler(|_, _| Ok(json!({})))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let mut set = ProvisionableSet::new();
        set.create(
            &registry,
            &json!({"name": "db1", "type": "database", "provider": "aws"}),
        )
        .unwrap();
        set.create(
            &registry,
            &json!({"name": "db2", "type": "database", "provider": "aws"}),
        )
        .unwrap();

        let error = validate_environment(set.values(), &BTreeMap::new()).unwrap_err();
        match error {
            Error::EnvironmentValidation { missing } => {
                assert_eq!(missing, vec!["AWS_ACCESS_KEY_ID"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_set_is_valid() {
        let set = ProvisionableSet::new();
        assert!(validate_environment(set.values(), &BTreeMap::new()).is_ok());
    }
}

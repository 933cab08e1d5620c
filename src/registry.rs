//! # Service Descriptor Registry
//!
//! The registry is the static catalogue of available service kinds. Each
//! kind is one `(provider, type)` pair described by a [`ServiceDescriptor`]:
//! a schema fragment for its attributes, a named map of [`Association`]s
//! describing how instances relate to other services, the environment
//! variables it needs, and the resource handler that provisions it.
//!
//! Descriptors are assembled once through [`ServiceDescriptor::builder`] and
//! never mutated afterwards. The registry itself is an explicit value,
//! constructed at process start and passed by reference into the schema
//! composer, the provisionable factory and the operation; there is no global
//! singleton, which keeps test setups free to use fake service sets.
//!
//! ## Associations
//!
//! An association is a named rule for discovering relationships between
//! service instances. Candidate matches are narrowed by an optional service
//! `with` type and decided by the `where` predicate over the two
//! configurations. An absent `where` predicate means "match nothing", not
//! "match everything" - association edges only ever exist because a
//! predicate said so.
//!
//! A *requirement* association must resolve before its owner registers; its
//! output lands in the owner's requirements map. A *side effect* resolves
//! after the owner registers and never blocks it.

use crate::error::{Error, Result};
use crate::provisionable::{Provisionable, Provisions};
use crate::stack::Stack;
use crate::suggestions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Provisions a service instance onto the stack. Invoked exactly once per
/// provisionable, after all of its requirements are resolved.
pub type ResourceHandler = Arc<dyn Fn(&Provisionable, &mut Stack) -> Result<Provisions> + Send + Sync>;

/// Resolves one association edge. Receives the linked (already registered)
/// provisionable, the stack, and the association's owner. May return `None`
/// when the association produces no output.
pub type AssociationHandler =
    Arc<dyn Fn(&Provisionable, &mut Stack, &Provisionable) -> Result<Option<Value>> + Send + Sync>;

/// Decides whether two configurations are associated: `(own config,
/// candidate config) -> bool`. Predicates must be pure and total.
pub type AssociationPredicate = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// An environment variable a service kind depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// Variable name (e.g. `AWS_ACCESS_KEY_ID`)
    pub name: String,
    /// Whether the operation fails when the variable is absent
    pub required: bool,
    /// Human-readable description of what the variable is for
    pub description: String,
}

/// Whether an association gates registration or follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// Resolved before the owner registers; must produce output.
    Requirement,
    /// Resolved after the owner registers; informational only.
    SideEffect,
}

/// A named rule describing how a service instance relates to others.
#[derive(Clone)]
pub struct Association {
    /// Restricts candidate matches to a given service type.
    pub with: Option<String>,
    /// Predicate deciding whether two configurations match. Absent means
    /// the association matches nothing.
    pub r#where: Option<AssociationPredicate>,
    /// Resolves the matched edge into the association's output.
    pub handler: AssociationHandler,
    /// Requirement or side effect.
    pub kind: AssociationKind,
}

impl Association {
    /// Creates a requirement association with the given handler.
    pub fn requirement<F>(handler: F) -> Self
    where
        F: Fn(&Provisionable, &mut Stack, &Provisionable) -> Result<Option<Value>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            with: None,
            r#where: None,
            handler: Arc::new(handler),
            kind: AssociationKind::Requirement,
        }
    }

    /// Creates a side-effect association with the given handler.
    pub fn side_effect<F>(handler: F) -> Self
    where
        F: Fn(&Provisionable, &mut Stack, &Provisionable) -> Result<Option<Value>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            with: None,
            r#where: None,
            handler: Arc::new(handler),
            kind: AssociationKind::SideEffect,
        }
    }

    /// Restricts candidates to services of the given type.
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.with = Some(service_type.into());
        self
    }

    /// Sets the matching predicate over `(own config, candidate config)`.
    pub fn matching<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.r#where = Some(Arc::new(predicate));
        self
    }

    pub fn is_requirement(&self) -> bool {
        self.kind == AssociationKind::Requirement
    }

    pub fn is_side_effect(&self) -> bool {
        self.kind == AssociationKind::SideEffect
    }
}

impl std::fmt::Debug for Association {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Association")
            .field("with", &self.with)
            .field("where", &self.r#where.as_ref().map(|_| "<predicate>"))
            .field("kind", &self.kind)
            .finish()
    }
}

/// Immutable definition of one `(provider, type)` service kind.
#[derive(Clone)]
pub struct ServiceDescriptor {
    /// Provider discriminant (e.g. `aws`)
    pub provider: String,
    /// Service type discriminant (e.g. `database`)
    pub service_type: String,
    /// Unique key for this kind's schema fragment
    pub schema_id: String,
    /// JSON-Schema fragment describing valid attributes, including defaults
    pub schema: Value,
    /// Named association rules
    pub associations: BTreeMap<String, Association>,
    /// Environment variables this kind depends on
    pub environment: Vec<EnvironmentVariable>,
    /// Regions this kind is available in
    pub regions: Vec<String>,
    /// Whether instances of this kind must declare unique `domain` values
    pub unique_domains: bool,
    /// Provisions one instance onto the stack
    pub handler: ResourceHandler,
}

impl ServiceDescriptor {
    /// Starts assembling a descriptor for the given `(provider, type)` pair.
    pub fn builder(
        provider: impl Into<String>,
        service_type: impl Into<String>,
    ) -> ServiceDescriptorBuilder {
        ServiceDescriptorBuilder::new(provider.into(), service_type.into())
    }
}

impl std::fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("provider", &self.provider)
            .field("service_type", &self.service_type)
            .field("schema_id", &self.schema_id)
            .field("associations", &self.associations)
            .field("environment", &self.environment)
            .field("regions", &self.regions)
            .field("unique_domains", &self.unique_domains)
            .finish()
    }
}

/// Assembles a [`ServiceDescriptor`] from a fixed set of parts.
pub struct ServiceDescriptorBuilder {
    provider: String,
    service_type: String,
    schema_id: Option<String>,
    schema: Value,
    associations: BTreeMap<String, Association>,
    environment: Vec<EnvironmentVariable>,
    regions: Vec<String>,
    unique_domains: bool,
    handler: Option<ResourceHandler>,
}

impl ServiceDescriptorBuilder {
    fn new(provider: String, service_type: String) -> Self {
        Self {
            provider,
            service_type,
            schema_id: None,
            schema: json!({"type": "object", "properties": {}}),
            associations: BTreeMap::new(),
            environment: Vec::new(),
            regions: Vec::new(),
            unique_domains: false,
            handler: None,
        }
    }

    /// Overrides the schema id. Defaults to `services/<provider>/<type>`.
    pub fn schema_id(mut self, schema_id: impl Into<String>) -> Self {
        self.schema_id = Some(schema_id.into());
        self
    }

    /// Sets the JSON-Schema fragment for this kind's attributes.
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    /// Adds a named association rule.
    pub fn association(mut self, name: impl Into<String>, association: Association) -> Self {
        self.associations.insert(name.into(), association);
        self
    }

    /// Declares an environment variable dependency.
    pub fn environment(
        mut self,
        name: impl Into<String>,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        self.environment.push(EnvironmentVariable {
            name: name.into(),
            required,
            description: description.into(),
        });
        self
    }

    /// Declares the regions this kind is available in.
    pub fn regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Requires instances of this kind to declare unique `domain` values.
    pub fn unique_domains(mut self) -> Self {
        self.unique_domains = true;
        self
    }

    /// Sets the resource handler. Mandatory.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Provisionable, &mut Stack) -> Result<Provisions> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<ServiceDescriptor> {
        let handler = self.handler.ok_or_else(|| Error::Descriptor {
            provider: self.provider.clone(),
            service_type: self.service_type.clone(),
            message: "a resource handler is required".to_string(),
        })?;

        if !self.schema.is_object() {
            return Err(Error::Descriptor {
                provider: self.provider,
                service_type: self.service_type,
                message: "the schema fragment must be a JSON object".to_string(),
            });
        }

        let schema_id = self
            .schema_id
            .unwrap_or_else(|| format!("services/{}/{}", self.provider, self.service_type));

        Ok(ServiceDescriptor {
            provider: self.provider,
            service_type: self.service_type,
            schema_id,
            schema: self.schema,
            associations: self.associations,
            environment: self.environment,
            regions: self.regions,
            unique_domains: self.unique_domains,
            handler,
        })
    }
}

/// Catalogue of all registered service kinds.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    items: Vec<Arc<ServiceDescriptor>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor, failing if its `(provider, type)` pair or schema
    /// id is already taken.
    pub fn register(&mut self, descriptor: ServiceDescriptor) -> Result<()> {
        if self
            .items
            .iter()
            .any(|d| d.provider == descriptor.provider && d.service_type == descriptor.service_type)
        {
            return Err(Error::DuplicateService {
                provider: descriptor.provider,
                service_type: descriptor.service_type,
            });
        }

        if self.items.iter().any(|d| d.schema_id == descriptor.schema_id) {
            return Err(Error::DuplicateSchema {
                schema_id: descriptor.schema_id,
            });
        }

        self.items.push(Arc::new(descriptor));
        Ok(())
    }

    /// Finds a descriptor by provider and service type.
    ///
    /// Fails with an `UnknownService` error carrying a "did you mean" hint;
    /// a configuration referencing an unregistered kind cannot be resolved.
    pub fn get(&self, provider: &str, service_type: &str) -> Result<Arc<ServiceDescriptor>> {
        self.items
            .iter()
            .find(|d| d.provider == provider && d.service_type == service_type)
            .cloned()
            .ok_or_else(|| {
                let hint = if self.providers().iter().any(|p| p == provider) {
                    suggestions::unknown_service_hint(service_type, &self.types())
                } else {
                    suggestions::unknown_provider_hint(provider, &self.providers())
                };
                Error::UnknownService {
                    provider: provider.to_string(),
                    service_type: service_type.to_string(),
                    hint,
                }
            })
    }

    /// All registered descriptors, in registration order.
    pub fn all(&self) -> &[Arc<ServiceDescriptor>] {
        &self.items
    }

    /// Descriptors of a specific service type.
    pub fn of_type(&self, service_type: &str) -> Vec<Arc<ServiceDescriptor>> {
        self.items
            .iter()
            .filter(|d| d.service_type == service_type)
            .cloned()
            .collect()
    }

    /// Descriptors of a specific provider.
    pub fn of_provider(&self, provider: &str) -> Vec<Arc<ServiceDescriptor>> {
        self.items
            .iter()
            .filter(|d| d.provider == provider)
            .cloned()
            .collect()
    }

    /// The distinct service types available, in registration order.
    pub fn types(&self) -> Vec<String> {
        let mut types = Vec::new();
        for descriptor in &self.items {
            if !types.contains(&descriptor.service_type) {
                types.push(descriptor.service_type.clone());
            }
        }
        types
    }

    /// The distinct providers available, in registration order.
    pub fn providers(&self) -> Vec<String> {
        let mut providers = Vec::new();
        for descriptor in &self.items {
            if !providers.contains(&descriptor.provider) {
                providers.push(descriptor.provider.clone());
            }
        }
        providers
    }

    /// The regions a provider is available in, unioned across its services.
    pub fn regions(&self, provider: &str) -> Vec<String> {
        let mut regions = Vec::new();
        for descriptor in self.items.iter().filter(|d| d.provider == provider) {
            for region in &descriptor.regions {
                if !regions.contains(region) {
                    regions.push(region.clone());
                }
            }
        }
        regions
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

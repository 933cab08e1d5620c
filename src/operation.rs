//! # Operation
//!
//! The orchestrator that turns a raw service configuration list into the
//! final provisioning artifact. Construction validates the configurations,
//! builds the provisionable set and discovers the association graph; calling
//! [`Operation::process`] then walks that graph, registering every
//! provisionable in dependency order and invoking each resource handler
//! exactly once.
//!
//! ## Graph discovery
//!
//! Association edges are computed, not declared: for every provisionable and
//! every named association on its service kind, every *other* provisionable
//! is tested against the association's `with` type filter and `where`
//! predicate. Matching pairs become edges, bucketed into requirement edges
//! (resolved before the owner registers) and side-effect edges (resolved
//! after). A requirement association that matches more than one candidate
//! fails construction: picking a silent winner would provision against an
//! arbitrary dependency.
//!
//! ## Registration
//!
//! `register` is a recursive, memoized graph walk. The `registered` flag
//! makes diamond dependencies cheap (a shared dependency registers once);
//! a separate in-progress trail catches genuine requirement cycles and
//! reports the cycle path instead of overflowing the stack. Side effects
//! never block their owner; their outputs are informational.
//!
//! Everything here is single-threaded and synchronous: resource handlers
//! are local object-graph mutations, and a whole `process` call either runs
//! to completion or fails with the first resolution error.

use crate::environment::validate_environment;
use crate::error::{Error, Result};
use crate::profile::ProfileStore;
use crate::provisionable::{ProvisionableSet, Provisions};
use crate::registry::{AssociationHandler, ServiceRegistry};
use crate::stack::Stack;
use crate::validation;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;

/// One discovered association edge: the named association of an owning
/// provisionable, resolved against a matching target.
#[derive(Clone)]
struct AssociationEdge {
    name: String,
    target_id: String,
    handler: AssociationHandler,
}

impl std::fmt::Debug for AssociationEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationEdge")
            .field("name", &self.name)
            .field("target_id", &self.target_id)
            .finish_non_exhaustive()
    }
}

/// Orchestrates validation, graph discovery and registration for one run.
#[derive(Debug)]
pub struct Operation {
    provisionables: ProvisionableSet,
    requirements: BTreeMap<String, Vec<AssociationEdge>>,
    side_effects: BTreeMap<String, Vec<AssociationEdge>>,
    stack: Stack,
    variables: BTreeMap<String, String>,
    registering: Vec<String>,
}

impl Operation {
    /// Validates the configurations and prepares the dependency graph.
    ///
    /// Fails with an aggregate validation error, an unknown-service error,
    /// or an ambiguity error; no resource handler runs during construction.
    pub fn new(
        registry: &ServiceRegistry,
        profiles: &dyn ProfileStore,
        configs: &[Value],
        env_name: &str,
        variables: BTreeMap<String, String>,
    ) -> Result<Self> {
        let normalized = validation::validate(registry, profiles, configs)?;

        let mut provisionables = ProvisionableSet::new();
        for config in &normalized {
            provisionables.create(registry, config)?;
        }

        let (requirements, side_effects) = Self::associate(&provisionables)?;

        Ok(Self {
            provisionables,
            requirements,
            side_effects,
            stack: Stack::new(env_name),
            variables,
            registering: Vec::new(),
        })
    }

    /// Like [`Operation::new`], with variables taken from the process
    /// environment.
    pub fn from_env(
        registry: &ServiceRegistry,
        profiles: &dyn ProfileStore,
        configs: &[Value],
        env_name: &str,
    ) -> Result<Self> {
        Self::new(registry, profiles, configs, env_name, std::env::vars().collect())
    }

    /// The provisionable set of this run.
    pub fn provisionables(&self) -> &ProvisionableSet {
        &self.provisionables
    }

    /// The stack being provisioned into.
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Discovers the association graph over the provisionable set.
    fn associate(
        provisionables: &ProvisionableSet,
    ) -> Result<(
        BTreeMap<String, Vec<AssociationEdge>>,
        BTreeMap<String, Vec<AssociationEdge>>,
    )> {
        let mut requirements: BTreeMap<String, Vec<AssociationEdge>> = BTreeMap::new();
        let mut side_effects: BTreeMap<String, Vec<AssociationEdge>> = BTreeMap::new();

        for provisionable in provisionables.values() {
            for (name, association) in &provisionable.service.associations {
                for candidate in provisionables.values() {
                    if candidate.id == provisionable.id {
                        continue;
                    }

                    if let Some(with) = &association.with {
                        if &candidate.service.service_type != with {
                            continue;
                        }
                    }

                    // An absent predicate matches nothing.
                    let matches = association
                        .r#where
                        .as_ref()
                        .is_some_and(|matching| matching(&provisionable.config, &candidate.config));
                    if !matches {
                        continue;
                    }

                    let edge = AssociationEdge {
                        name: name.clone(),
                        target_id: candidate.id.clone(),
                        handler: association.handler.clone(),
                    };

                    if association.is_requirement() {
                        let edges = requirements.entry(provisionable.id.clone()).or_default();
                        if let Some(previous) =
                            edges.iter().find(|existing| existing.name == *name)
                        {
                            let prior = provisionables
                                .get(&previous.target_id)
                                .map(|p| p.resource_id.clone())
                                .unwrap_or_default();
                            return Err(Error::AmbiguousRequirement {
                                requirement: name.clone(),
                                service_type: provisionable.service.service_type.clone(),
                                candidates: vec![prior, candidate.resource_id.clone()],
                            });
                        }
                        edges.push(edge);
                    } else {
                        side_effects
                            .entry(provisionable.id.clone())
                            .or_default()
                            .push(edge);
                    }
                }
            }
        }

        Ok((requirements, side_effects))
    }

    /// Processes the operation, producing the final provisioning artifact.
    ///
    /// The environment gate runs first: when required variables are missing
    /// the call fails before any resource handler is invoked. Registration
    /// order of the top-level iteration does not matter, `register` is
    /// idempotent and recursively pulls in dependencies.
    pub fn process(&mut self) -> Result<Value> {
        validate_environment(self.provisionables.values(), &self.variables)?;

        for id in self.provisionables.ids().to_vec() {
            self.register(&id)?;
        }

        Ok(self.stack.to_object())
    }

    /// Registers one provisionable, resolving its requirements first.
    fn register(&mut self, id: &str) -> Result<Provisions> {
        {
            let provisionable = self
                .provisionables
                .get(id)
                .unwrap_or_else(|| panic!("provisionable {id} disappeared from the set"));
            if provisionable.registered {
                return Ok(provisionable.provisions.clone());
            }
        }

        self.enter(id)?;

        let requirement_edges = self.requirements.get(id).cloned().unwrap_or_default();
        for edge in &requirement_edges {
            self.register(&edge.target_id)?;
            if let Some(output) = self.resolve_edge(id, edge)? {
                if !output.is_null() {
                    self.provisionables
                        .get_mut(id)
                        .expect("owner must exist")
                        .requirements
                        .insert(edge.name.clone(), output);
                }
            }
        }

        self.assert_requirements_satisfied(id)?;

        let provisions = {
            let provisionable = self.provisionables.get(id).expect("owner must exist");
            debug!(
                "Registering {} ({}/{})",
                provisionable.resource_id,
                provisionable.service.provider,
                provisionable.service.service_type
            );
            let handler = provisionable.service.handler.clone();
            handler(provisionable, &mut self.stack)?
        };

        {
            let provisionable = self.provisionables.get_mut(id).expect("owner must exist");
            provisionable.provisions = provisions.clone();
            provisionable.registered = true;
        }

        self.record_environment(id);
        self.leave(id);

        // Side effects resolve after the owner is in the stack; they may
        // themselves depend on not-yet-registered provisionables.
        let side_effect_edges = self.side_effects.get(id).cloned().unwrap_or_default();
        for edge in &side_effect_edges {
            self.register(&edge.target_id)?;
            if let Some(output) = self.resolve_edge(id, edge)? {
                if !output.is_null() {
                    self.provisionables
                        .get_mut(id)
                        .expect("owner must exist")
                        .side_effects
                        .insert(edge.name.clone(), output);
                }
            }
        }

        Ok(provisions)
    }

    /// Invokes one association handler with the edge's target and owner.
    fn resolve_edge(&mut self, owner_id: &str, edge: &AssociationEdge) -> Result<Option<Value>> {
        let target = self
            .provisionables
            .get(&edge.target_id)
            .expect("edge target must exist");
        let owner = self
            .provisionables
            .get(owner_id)
            .expect("edge owner must exist");
        (edge.handler)(target, &mut self.stack, owner)
    }

    /// Fails when a declared requirement association resolved to nothing.
    fn assert_requirements_satisfied(&self, id: &str) -> Result<()> {
        let provisionable = self.provisionables.get(id).expect("owner must exist");
        for (name, association) in &provisionable.service.associations {
            if association.is_requirement() && !provisionable.requirements.contains_key(name) {
                return Err(Error::UnsatisfiedRequirement {
                    requirement: name.clone(),
                    service_type: provisionable.service.service_type.clone(),
                });
            }
        }
        Ok(())
    }

    /// Pushes onto the in-progress trail, failing on a requirement cycle.
    ///
    /// The trail is distinct from the `registered` memoization: `registered`
    /// only prevents duplicate work on diamonds, it cannot catch a cycle
    /// among provisionables that have not finished registering yet.
    fn enter(&mut self, id: &str) -> Result<()> {
        if let Some(position) = self.registering.iter().position(|entry| entry == id) {
            let mut cycle: Vec<String> = self.registering[position..]
                .iter()
                .map(|entry| self.display_id(entry))
                .collect();
            cycle.push(self.display_id(id));
            return Err(Error::CyclicRequirement {
                cycle: cycle.join(" -> "),
            });
        }

        self.registering.push(id.to_string());
        Ok(())
    }

    fn leave(&mut self, id: &str) {
        if let Some(position) = self.registering.iter().position(|entry| entry == id) {
            self.registering.remove(position);
        }
    }

    fn display_id(&self, id: &str) -> String {
        self.provisionables
            .get(id)
            .map(|p| p.resource_id.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Wires the service's declared environment variables into the stack's
    /// locals, so the artifact records the values it was produced with.
    fn record_environment(&mut self, id: &str) {
        let declared: Vec<String> = {
            let provisionable = self.provisionables.get(id).expect("owner must exist");
            provisionable
                .service
                .environment
                .iter()
                .map(|variable| variable.name.clone())
                .collect()
        };

        for name in declared {
            if let Some(value) = self.variables.get(&name) {
                self.stack.set_local(&name, Value::String(value.clone()));
            }
        }
    }
}

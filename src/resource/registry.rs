//! Operations registry
//!
//! Maps a resource type to a constructor for its operations object, so an
//! identifier read from the service can be turned into typed operations
//! without knowing its type at compile time. Types are registered
//! explicitly; nothing is discovered at runtime.

use super::capabilities::Deletable;
use super::identifier::ResourceIdentifier;
use super::operations::ResourceOperations;
use super::resource_type::ResourceType;
use crate::arm::error::{ArmError, ArmResult};
use crate::arm::options::ClientConfig;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Type-erased operations object.
pub trait AnyOperations: Send + Sync {
    fn id(&self) -> &ResourceIdentifier;

    fn resource_type(&self) -> ResourceType {
        self.id().resource_type()
    }

    /// Present when the type supports deletion.
    fn as_deletable(&self) -> Option<&dyn Deletable> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn AnyOperations {
    pub fn downcast_ref<O: ResourceOperations>(&self) -> Option<&O> {
        self.as_any().downcast_ref::<O>()
    }
}

struct Plain<O>(O);

impl<O: ResourceOperations> AnyOperations for Plain<O> {
    fn id(&self) -> &ResourceIdentifier {
        self.0.id()
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

struct WithDelete<O>(O);

impl<O: ResourceOperations + Deletable> AnyOperations for WithDelete<O> {
    fn id(&self) -> &ResourceIdentifier {
        ResourceOperations::id(&self.0)
    }

    fn as_deletable(&self) -> Option<&dyn Deletable> {
        Some(&self.0)
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

pub type OperationsFactory =
    fn(Arc<ClientConfig>, ResourceIdentifier) -> ArmResult<Box<dyn AnyOperations>>;

fn build_plain<O: ResourceOperations>(
    config: Arc<ClientConfig>,
    id: ResourceIdentifier,
) -> ArmResult<Box<dyn AnyOperations>> {
    Ok(Box::new(Plain(O::new(config, id)?)))
}

fn build_deletable<O: ResourceOperations + Deletable>(
    config: Arc<ClientConfig>,
    id: ResourceIdentifier,
) -> ArmResult<Box<dyn AnyOperations>> {
    Ok(Box::new(WithDelete(O::new(config, id)?)))
}

#[derive(Default)]
pub struct OperationsRegistry {
    factories: HashMap<ResourceType, OperationsFactory>,
}

impl OperationsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `O` under its declared type. Re-registering replaces the previous entry.
    pub fn register<O: ResourceOperations>(&mut self) -> &mut Self {
        self.factories.insert(O::resource_type(), build_plain::<O>);
        self
    }

    /// Register `O` and expose its [`Deletable`] capability.
    pub fn register_deletable<O: ResourceOperations + Deletable>(&mut self) -> &mut Self {
        self.factories.insert(O::resource_type(), build_deletable::<O>);
        self
    }

    pub fn contains(&self, resource_type: &ResourceType) -> bool {
        self.factories.contains_key(resource_type)
    }

    /// Operations for `id`, built by the factory registered for its type.
    pub fn resolve(
        &self,
        config: Arc<ClientConfig>,
        id: ResourceIdentifier,
    ) -> ArmResult<Box<dyn AnyOperations>> {
        let resource_type = id.resource_type();
        match self.factories.get(&resource_type) {
            Some(factory) => factory(config, id),
            None => Err(ArmError::UnsupportedResourceType(resource_type.to_string())),
        }
    }

    /// Registered types, sorted for display
    pub fn resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().map(|t| t.to_string()).collect();
        types.sort();
        types
    }
}

/// Global registry of the built-in resource types
static REGISTRY: OnceLock<OperationsRegistry> = OnceLock::new();

/// Get the built-in registry (populated on first access)
pub fn get_registry() -> &'static OperationsRegistry {
    REGISTRY.get_or_init(|| {
        let mut registry = OperationsRegistry::new();
        crate::services::register_builtin_types(&mut registry);
        registry
    })
}

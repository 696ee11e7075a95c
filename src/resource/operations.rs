//! Operations and container skeletons
//!
//! [`ResourceOperations`] is bound to one identified resource, and
//! [`ResourceContainer`] to a parent scope that creates and enumerates
//! children of one type. Both check the identifier's type on construction,
//! so an operations object always denotes the type it claims.

use super::capabilities::Creatable;
use super::identifier::ResourceIdentifier;
use super::model::{ArmResource, ResourceData, TrackedModel};
use super::response::{ArmResponse, Converter};
use super::resource_type::ResourceType;
use super::rest::ResourceRest;
use crate::arm::error::{ArmError, ArmResult};
use crate::arm::options::ClientConfig;
use std::sync::Arc;

/// Configuration plus a type-checked resource id.
#[derive(Debug, Clone)]
pub struct OperationsContext {
    config: Arc<ClientConfig>,
    id: ResourceIdentifier,
}

impl OperationsContext {
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        id: ResourceIdentifier,
        expected: &ResourceType,
    ) -> ArmResult<Self> {
        id.ensure_type(expected)?;
        Ok(Self { config, id })
    }

    pub fn id(&self) -> &ResourceIdentifier {
        &self.id
    }

    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }
}

/// Operations bound to one resource instance.
///
/// Implementors declare their type and api-version and store the context
/// they are built from. Capabilities (get, delete, tags) are opted into by
/// implementing the traits in [`super::capabilities`].
pub trait ResourceOperations: Sized + Send + Sync + 'static {
    const RESOURCE_TYPE: &'static str;
    const API_VERSION: &'static str;

    type Data: ResourceData;

    fn from_context(context: OperationsContext) -> Self;

    fn context(&self) -> &OperationsContext;

    fn resource_type() -> ResourceType {
        ResourceType::from(Self::RESOURCE_TYPE)
    }

    /// Fails with [`ArmError::ResourceTypeMismatch`] unless `id` denotes this type.
    fn new(config: Arc<ClientConfig>, id: ResourceIdentifier) -> ArmResult<Self> {
        OperationsContext::new(config, id, &Self::resource_type()).map(Self::from_context)
    }

    fn id(&self) -> &ResourceIdentifier {
        self.context().id()
    }

    fn config(&self) -> &Arc<ClientConfig> {
        self.context().config()
    }

    fn rest(&self) -> ResourceRest {
        ResourceRest::new(self.config().clone(), &Self::resource_type(), Self::API_VERSION)
    }

    /// Wire model to domain object for this type.
    fn converter(&self) -> Converter<ArmResource<Self>> {
        ArmResource::<Self>::converter(self.config().clone())
    }
}

/// Configuration plus a type-checked parent scope.
#[derive(Debug, Clone)]
pub struct ContainerContext {
    config: Arc<ClientConfig>,
    parent: ResourceIdentifier,
}

impl ContainerContext {
    pub fn parent(&self) -> &ResourceIdentifier {
        &self.parent
    }

    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }
}

/// Operations bound to a parent scope for children of one type.
pub trait ResourceContainer: Sized + Send + Sync + 'static {
    /// Type the parent scope must have
    const PARENT_TYPE: &'static str;

    type Operations: ResourceOperations;

    fn from_context(context: ContainerContext) -> Self;

    fn context(&self) -> &ContainerContext;

    fn parent_type() -> ResourceType {
        ResourceType::from(Self::PARENT_TYPE)
    }

    /// Extension resources override this to accept several parent types.
    fn accepts_parent(parent: &ResourceIdentifier) -> bool {
        parent.matches(&Self::parent_type())
    }

    fn new(config: Arc<ClientConfig>, parent: ResourceIdentifier) -> ArmResult<Self> {
        if !Self::accepts_parent(&parent) {
            return Err(ArmError::ResourceTypeMismatch {
                id: parent.to_string(),
                expected: Self::PARENT_TYPE.to_string(),
            });
        }
        Ok(Self::from_context(ContainerContext { config, parent }))
    }

    fn parent_id(&self) -> &ResourceIdentifier {
        self.context().parent()
    }

    fn config(&self) -> &Arc<ClientConfig> {
        self.context().config()
    }

    fn child_type() -> ResourceType {
        <Self::Operations as ResourceOperations>::resource_type()
    }

    /// Id of the named child under this container's parent.
    fn child_id(&self, name: &str) -> ArmResult<ResourceIdentifier> {
        self.parent_id().child_of_type(&Self::child_type(), name)
    }

    /// Operations for the named child. No request is made.
    fn operations(&self, name: &str) -> ArmResult<Self::Operations> {
        Self::Operations::new(self.config().clone(), self.child_id(name)?)
    }

    fn rest(&self) -> ResourceRest {
        ResourceRest::new(
            self.config().clone(),
            &Self::child_type(),
            <Self::Operations as ResourceOperations>::API_VERSION,
        )
    }
}

/// Create a child of any creatable type under `parent`.
///
/// The target container is picked at compile time through `C`. An empty
/// model location is filled from `location`, then from the configured
/// default location.
pub async fn create_child_resource<C>(
    config: Arc<ClientConfig>,
    parent: ResourceIdentifier,
    name: &str,
    mut model: C::Model,
    location: Option<&str>,
) -> ArmResult<ArmResponse<ArmResource<C::Operations>>>
where
    C: Creatable,
    C::Model: TrackedModel,
{
    if model.location().is_empty() {
        let fallback = location
            .map(str::to_string)
            .or_else(|| config.default_location().map(str::to_string));
        if let Some(location) = fallback {
            model.set_location(location);
        }
    }
    let container = C::new(config, parent)?;
    container.create(name, &model).await
}

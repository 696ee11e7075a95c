//! Resource groups

use super::api_versions;
use super::compute::{AvailabilitySetContainer, VirtualMachineContainer};
use super::generic::{list_resources, GenericResource, ResourceFilter};
use super::network::{PublicIpAddressContainer, VirtualNetworkContainer};
use crate::arm::error::ArmResult;
use crate::resource::capabilities::{
    start_delete_resource, Creatable, Deletable, Gettable, Listable, ResourceResponse, Taggable,
};
use crate::resource::lro::ArmOperation;
use crate::resource::model::{ResourceModel, TrackedModel, TrackedResourceData};
use crate::resource::operations::{
    create_child_resource, ContainerContext, OperationsContext, ResourceContainer,
    ResourceOperations,
};
use crate::resource::pager::Pager;
use crate::resource::response::ArmResponse;
use crate::resource::{ArmResource, ResourceIdentifier, ResourceType};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ResourceGroupOperations {
    context: OperationsContext,
}

impl ResourceOperations for ResourceGroupOperations {
    const RESOURCE_TYPE: &'static str = ResourceType::RESOURCE_GROUP;
    const API_VERSION: &'static str = api_versions::RESOURCES;
    type Data = TrackedResourceData;

    fn from_context(context: OperationsContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &OperationsContext {
        &self.context
    }
}

impl Gettable for ResourceGroupOperations {}

impl Taggable for ResourceGroupOperations {}

#[async_trait]
impl Deletable for ResourceGroupOperations {
    fn deletable_id(&self) -> &ResourceIdentifier {
        self.id()
    }

    async fn start_delete(&self) -> ArmResult<ArmOperation<()>> {
        start_delete_resource(self).await
    }
}

impl ResourceGroupOperations {
    pub fn virtual_machines(&self) -> ArmResult<VirtualMachineContainer> {
        VirtualMachineContainer::new(self.config().clone(), self.id().clone())
    }

    pub fn virtual_networks(&self) -> ArmResult<VirtualNetworkContainer> {
        VirtualNetworkContainer::new(self.config().clone(), self.id().clone())
    }

    pub fn availability_sets(&self) -> ArmResult<AvailabilitySetContainer> {
        AvailabilitySetContainer::new(self.config().clone(), self.id().clone())
    }

    pub fn public_ip_addresses(&self) -> ArmResult<PublicIpAddressContainer> {
        PublicIpAddressContainer::new(self.config().clone(), self.id().clone())
    }

    /// Create any creatable child type in this group.
    ///
    /// The model's location falls back to `location`, then to the
    /// configured default location.
    pub async fn create_resource<C>(
        &self,
        name: &str,
        model: C::Model,
        location: Option<&str>,
    ) -> ArmResult<ArmResponse<ArmResource<C::Operations>>>
    where
        C: Creatable,
        C::Model: TrackedModel,
    {
        create_child_resource::<C>(self.config().clone(), self.id().clone(), name, model, location)
            .await
    }

    /// Resources in this group matching `filter`.
    pub fn list_resources(&self, filter: ResourceFilter) -> ArmResult<Pager<GenericResource>> {
        list_resources(self.config().clone(), self.id(), &filter.into_page_options())
    }
}

/// Resource groups of one subscription.
#[derive(Debug, Clone)]
pub struct ResourceGroupContainer {
    context: ContainerContext,
}

impl ResourceContainer for ResourceGroupContainer {
    const PARENT_TYPE: &'static str = ResourceType::SUBSCRIPTION;
    type Operations = ResourceGroupOperations;

    fn from_context(context: ContainerContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &ContainerContext {
        &self.context
    }
}

impl Creatable for ResourceGroupContainer {
    type Model = ResourceModel;
}

impl Listable for ResourceGroupContainer {}

impl ResourceGroupContainer {
    pub async fn get(&self, name: &str) -> ArmResult<ResourceResponse<ResourceGroupOperations>> {
        self.operations(name)?.get().await
    }

    /// `false` when the service answers 404.
    pub async fn exists(&self, name: &str) -> ArmResult<bool> {
        match self.get(name).await {
            Ok(_) => Ok(true),
            Err(e) if e.status() == Some(404) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

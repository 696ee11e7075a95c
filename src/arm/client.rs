//! Entry-point client
//!
//! Hands out operations and containers bound to a shared [`ClientConfig`].
//! Nothing here talks to the service except
//! [`ArmClient::resolve_default_subscription`] and the listing helpers.

use super::error::{ArmError, ArmResult};
use super::options::ClientConfig;
use crate::resource::capabilities::Creatable;
use crate::resource::model::{ArmResource, TrackedModel};
use crate::resource::operations::{create_child_resource, ResourceContainer, ResourceOperations};
use crate::resource::pager::Pager;
use crate::resource::registry::{get_registry, AnyOperations};
use crate::resource::response::ArmResponse;
use crate::resource::ResourceIdentifier;
use crate::services::authorization::RoleAssignmentContainer;
use crate::services::resource_groups::ResourceGroupOperations;
use crate::services::subscriptions::{LocationData, SubscriptionContainer, SubscriptionOperations};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ArmClient {
    config: Arc<ClientConfig>,
    default_subscription: Option<String>,
}

impl ArmClient {
    pub fn new(config: ClientConfig) -> Self {
        Self::from_shared(Arc::new(config))
    }

    pub fn from_shared(config: Arc<ClientConfig>) -> Self {
        Self {
            config,
            default_subscription: None,
        }
    }

    pub fn with_default_subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.default_subscription = Some(subscription_id.into());
        self
    }

    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }

    /// Operations for the default subscription.
    ///
    /// Fails with [`ArmError::Configuration`] when none was set or resolved.
    pub fn default_subscription(&self) -> ArmResult<SubscriptionOperations> {
        match &self.default_subscription {
            Some(id) => self.subscription(id),
            None => Err(ArmError::Configuration(
                "no default subscription; set one or call resolve_default_subscription".to_string(),
            )),
        }
    }

    /// Pick the first enabled subscription when no default is set, and remember it.
    pub async fn resolve_default_subscription(&mut self) -> ArmResult<SubscriptionOperations> {
        if self.default_subscription.is_none() {
            let first = self.subscriptions()?.first_enabled().await?;
            self.default_subscription = Some(first.subscription_id().to_string());
        }
        self.default_subscription()
    }

    pub fn subscription(&self, subscription_id: &str) -> ArmResult<SubscriptionOperations> {
        SubscriptionOperations::new(
            self.config.clone(),
            ResourceIdentifier::for_subscription(subscription_id)?,
        )
    }

    pub fn subscriptions(&self) -> ArmResult<SubscriptionContainer> {
        SubscriptionContainer::new(self.config.clone(), ResourceIdentifier::tenant())
    }

    pub fn resource_group(&self, subscription_id: &str, name: &str) -> ArmResult<ResourceGroupOperations> {
        ResourceGroupOperations::new(
            self.config.clone(),
            ResourceIdentifier::for_resource_group(subscription_id, name)?,
        )
    }

    /// Typed operations for `id`. Fails with a type mismatch when `id` is not an `O`.
    pub fn operations<O: ResourceOperations>(&self, id: &ResourceIdentifier) -> ArmResult<O> {
        O::new(self.config.clone(), id.clone())
    }

    /// Typed operations for the `O` named `name` in a resource group.
    pub fn operations_by_name<O: ResourceOperations>(
        &self,
        subscription_id: &str,
        resource_group: &str,
        name: &str,
    ) -> ArmResult<O> {
        let id = ResourceIdentifier::for_resource_group(subscription_id, resource_group)?
            .child_of_type(&O::resource_type(), name)?;
        O::new(self.config.clone(), id)
    }

    /// Operations for `id` chosen by its type at runtime.
    pub fn resolve(&self, id: &ResourceIdentifier) -> ArmResult<Box<dyn AnyOperations>> {
        get_registry().resolve(self.config.clone(), id.clone())
    }

    /// Create a child through container `C` under `parent`.
    pub async fn create_resource<C>(
        &self,
        parent: &ResourceIdentifier,
        name: &str,
        model: C::Model,
        location: Option<&str>,
    ) -> ArmResult<ArmResponse<ArmResource<C::Operations>>>
    where
        C: Creatable,
        C::Model: TrackedModel,
    {
        create_child_resource::<C>(self.config.clone(), parent.clone(), name, model, location).await
    }

    /// Container `C` under `parent`, e.g. `client.container::<VirtualMachineContainer>(&rg)`.
    pub fn container<C: ResourceContainer>(&self, parent: &ResourceIdentifier) -> ArmResult<C> {
        C::new(self.config.clone(), parent.clone())
    }

    /// Locations of `subscription_id`, or of the default subscription.
    pub fn list_locations(&self, subscription_id: Option<&str>) -> ArmResult<Pager<LocationData>> {
        let subscription = match subscription_id {
            Some(id) => self.subscription(id)?,
            None => self.default_subscription()?,
        };
        subscription.list_locations()
    }

    pub fn role_assignments_at(&self, scope: &ResourceIdentifier) -> ArmResult<RoleAssignmentContainer> {
        RoleAssignmentContainer::new(self.config.clone(), scope.clone())
    }
}

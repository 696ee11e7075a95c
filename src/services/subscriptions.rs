//! Subscriptions and locations

use super::api_versions;
use super::generic::{list_resources, GenericResource, ResourceFilter};
use super::resource_groups::ResourceGroupContainer;
use crate::arm::error::{ArmError, ArmResult};
use crate::resource::capabilities::{Gettable, Listable, ResourceResponse};
use crate::resource::model::{ArmResource, ResourceData, Tags};
use crate::resource::operations::{
    ContainerContext, OperationsContext, ResourceContainer, ResourceOperations,
};
use crate::resource::pager::{PageOptions, Pager};
use crate::resource::response::deserialize_converter;
use crate::resource::rest::ResourceRest;
use crate::resource::{ResourceIdentifier, ResourceType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionData {
    pub id: ResourceIdentifier,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, deserialize_with = "crate::resource::model::nullable_tags")]
    pub tags: Tags,
}

impl SubscriptionData {
    pub fn is_enabled(&self) -> bool {
        self.state.eq_ignore_ascii_case("Enabled")
    }
}

impl ResourceData for SubscriptionData {
    fn id(&self) -> &ResourceIdentifier {
        &self.id
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}

/// A region available to a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regional_display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderResourceType {
    resource_type: String,
    #[serde(default)]
    locations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderData {
    #[serde(default)]
    resource_types: Vec<ProviderResourceType>,
}

#[derive(Debug, Clone)]
pub struct SubscriptionOperations {
    context: OperationsContext,
}

impl ResourceOperations for SubscriptionOperations {
    const RESOURCE_TYPE: &'static str = ResourceType::SUBSCRIPTION;
    const API_VERSION: &'static str = api_versions::SUBSCRIPTIONS;
    type Data = SubscriptionData;

    fn from_context(context: OperationsContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &OperationsContext {
        &self.context
    }
}

impl Gettable for SubscriptionOperations {}

impl SubscriptionOperations {
    pub fn subscription_id(&self) -> &str {
        self.id().name()
    }

    pub fn resource_groups(&self) -> ArmResult<ResourceGroupContainer> {
        ResourceGroupContainer::new(self.config().clone(), self.id().clone())
    }

    /// Regions available to this subscription. The service returns a single page.
    pub fn list_locations(&self) -> ArmResult<Pager<LocationData>> {
        let rest = self.rest();
        let url = rest.action_url(self.id(), "locations");
        tracing::debug!("list_locations → {}", url);
        Ok(rest.list_url(url, deserialize_converter::<LocationData>()))
    }

    /// Locations where `resource_type` can be deployed, as reported by its provider.
    pub async fn list_available_locations(&self, resource_type: &ResourceType) -> ArmResult<Vec<String>> {
        let rest = ResourceRest::new(self.config().clone(), &Self::resource_type(), api_versions::RESOURCES);
        let url = rest.url(&format!(
            "/subscriptions/{}/providers/{}",
            urlencoding::encode(self.subscription_id()),
            urlencoding::encode(resource_type.namespace())
        ));
        tracing::debug!("list_available_locations({}) → {}", resource_type, url);
        let body = rest.get_url(url).await?.body;
        let provider: ProviderData = serde_json::from_value(body)?;
        let wanted = resource_type.types().join("/");
        Ok(provider
            .resource_types
            .into_iter()
            .find(|t| t.resource_type.eq_ignore_ascii_case(&wanted))
            .map(|t| t.locations)
            .unwrap_or_default())
    }

    /// Every resource in the subscription matching `filter`.
    pub fn list_resources(&self, filter: ResourceFilter) -> ArmResult<Pager<GenericResource>> {
        list_resources(self.config().clone(), self.id(), &filter.into_page_options())
    }
}

/// Subscriptions visible to the caller, listed from the tenant root.
#[derive(Debug, Clone)]
pub struct SubscriptionContainer {
    context: ContainerContext,
}

impl ResourceContainer for SubscriptionContainer {
    const PARENT_TYPE: &'static str = ResourceType::TENANT;
    type Operations = SubscriptionOperations;

    fn from_context(context: ContainerContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &ContainerContext {
        &self.context
    }
}

impl Listable for SubscriptionContainer {}

impl SubscriptionContainer {
    pub async fn get(&self, subscription_id: &str) -> ArmResult<ResourceResponse<SubscriptionOperations>> {
        self.operations(subscription_id)?.get().await
    }

    /// First enabled subscription, in service order.
    pub async fn first_enabled(&self) -> ArmResult<ArmResource<SubscriptionOperations>> {
        let mut pager = self.list(PageOptions::new())?;
        while let Some(subscription) = pager.try_next().await? {
            if subscription.data().is_enabled() {
                tracing::info!(
                    "Using subscription {} ({})",
                    subscription.data().display_name,
                    subscription.subscription_id()
                );
                return Ok(subscription);
            }
        }
        Err(ArmError::Configuration(
            "no enabled subscription is visible to this credential".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::options::ClientConfig;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_subscription_data() {
        let data: SubscriptionData = serde_json::from_value(json!({
            "id": "/subscriptions/0000-1111",
            "subscriptionId": "0000-1111",
            "displayName": "Dev",
            "state": "Enabled",
            "tenantId": "t"
        }))
        .unwrap();
        assert!(data.is_enabled());
        assert_eq!(data.id.subscription_id(), Some("0000-1111"));
        assert!(data.tags.is_empty());
    }

    #[test]
    fn test_container_lives_at_tenant_root() {
        let config = Arc::new(ClientConfig::builder().build().unwrap());
        let container = SubscriptionContainer::new(config.clone(), ResourceIdentifier::tenant()).unwrap();
        let ops = container.operations("0000-1111").unwrap();
        assert_eq!(ops.id().to_string(), "/subscriptions/0000-1111");
        assert_eq!(ops.subscription_id(), "0000-1111");

        let sub = ResourceIdentifier::for_subscription("s").unwrap();
        assert!(SubscriptionContainer::new(config, sub).is_err());
    }
}

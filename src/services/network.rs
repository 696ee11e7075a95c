//! Virtual networks, their subnets and public IP addresses
//!
//! Subnets are nested under a virtual network, so their ids extend the
//! network's provider scope (`.../virtualNetworks/{vnet}/subnets/{name}`).

use super::api_versions;
use crate::arm::error::ArmResult;
use crate::resource::capabilities::{
    get_resource, start_delete_resource, Creatable, Deletable, Gettable, Listable,
    ResourceResponse, Taggable,
};
use crate::resource::lro::ArmOperation;
use crate::resource::model::{ResourceData, ResourceModel, Tags, TrackedModel, TrackedResourceData};
use crate::resource::operations::{
    ContainerContext, OperationsContext, ResourceContainer, ResourceOperations,
};
use crate::resource::{ResourceIdentifier, ResourceType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct VirtualNetworkOperations {
    context: OperationsContext,
}

impl ResourceOperations for VirtualNetworkOperations {
    const RESOURCE_TYPE: &'static str = "Microsoft.Network/virtualNetworks";
    const API_VERSION: &'static str = api_versions::NETWORK;
    type Data = TrackedResourceData;

    fn from_context(context: OperationsContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &OperationsContext {
        &self.context
    }
}

impl Gettable for VirtualNetworkOperations {}

impl Taggable for VirtualNetworkOperations {}

#[async_trait]
impl Deletable for VirtualNetworkOperations {
    fn deletable_id(&self) -> &ResourceIdentifier {
        self.id()
    }

    async fn start_delete(&self) -> ArmResult<ArmOperation<()>> {
        start_delete_resource(self).await
    }
}

impl VirtualNetworkOperations {
    pub fn subnets(&self) -> ArmResult<SubnetContainer> {
        SubnetContainer::new(self.config().clone(), self.id().clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    pub address_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetModel {
    pub properties: SubnetProperties,
}

impl SubnetModel {
    pub fn new(address_prefix: impl Into<String>) -> Self {
        Self {
            properties: SubnetProperties {
                address_prefix: address_prefix.into(),
                provisioning_state: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineSubnet {
    pub name: String,
    pub properties: SubnetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    pub address_space: AddressSpace,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<InlineSubnet>,
}

/// Create body for a virtual network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualNetworkModel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    pub properties: VirtualNetworkProperties,
}

impl VirtualNetworkModel {
    /// Network spanning `address_prefix` (CIDR, e.g. `10.0.0.0/16`).
    pub fn new(address_prefix: impl Into<String>) -> Self {
        Self {
            properties: VirtualNetworkProperties {
                address_space: AddressSpace {
                    address_prefixes: vec![address_prefix.into()],
                },
                subnets: Vec::new(),
            },
            ..Self::default()
        }
    }

    /// Declare a subnet created together with the network.
    pub fn with_subnet(mut self, name: impl Into<String>, address_prefix: impl Into<String>) -> Self {
        self.properties.subnets.push(InlineSubnet {
            name: name.into(),
            properties: SubnetModel::new(address_prefix).properties,
        });
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl TrackedModel for VirtualNetworkModel {
    fn location(&self) -> &str {
        &self.location
    }

    fn set_location(&mut self, location: String) {
        self.location = location;
    }
}

/// Virtual networks of one resource group.
#[derive(Debug, Clone)]
pub struct VirtualNetworkContainer {
    context: ContainerContext,
}

impl ResourceContainer for VirtualNetworkContainer {
    const PARENT_TYPE: &'static str = ResourceType::RESOURCE_GROUP;
    type Operations = VirtualNetworkOperations;

    fn from_context(context: ContainerContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &ContainerContext {
        &self.context
    }
}

impl Creatable for VirtualNetworkContainer {
    type Model = VirtualNetworkModel;
}

impl Listable for VirtualNetworkContainer {}

impl VirtualNetworkContainer {
    pub async fn get(&self, name: &str) -> ArmResult<ResourceResponse<VirtualNetworkOperations>> {
        get_resource(&self.operations(name)?).await
    }
}

/// Public IP address. Static allocation keeps the address across deallocation.
#[derive(Debug, Clone)]
pub struct PublicIpAddressOperations {
    context: OperationsContext,
}

impl ResourceOperations for PublicIpAddressOperations {
    const RESOURCE_TYPE: &'static str = "Microsoft.Network/publicIPAddresses";
    const API_VERSION: &'static str = api_versions::NETWORK;
    type Data = TrackedResourceData;

    fn from_context(context: OperationsContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &OperationsContext {
        &self.context
    }
}

impl Gettable for PublicIpAddressOperations {}

impl Taggable for PublicIpAddressOperations {}

#[async_trait]
impl Deletable for PublicIpAddressOperations {
    fn deletable_id(&self) -> &ResourceIdentifier {
        self.id()
    }

    async fn start_delete(&self) -> ArmResult<ArmOperation<()>> {
        start_delete_resource(self).await
    }
}

/// Assigned address of a public IP, once allocated.
pub fn public_ip_address(data: &TrackedResourceData) -> Option<&str> {
    data.properties.get("ipAddress").and_then(Value::as_str)
}

/// Create body for a public IP with the given allocation method (`Static` or `Dynamic`).
pub fn public_ip_model(allocation: &str) -> ResourceModel {
    ResourceModel::default().with_properties(json!({
        "publicIPAllocationMethod": allocation
    }))
}

/// Public IP addresses of one resource group.
#[derive(Debug, Clone)]
pub struct PublicIpAddressContainer {
    context: ContainerContext,
}

impl ResourceContainer for PublicIpAddressContainer {
    const PARENT_TYPE: &'static str = ResourceType::RESOURCE_GROUP;
    type Operations = PublicIpAddressOperations;

    fn from_context(context: ContainerContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &ContainerContext {
        &self.context
    }
}

impl Creatable for PublicIpAddressContainer {
    type Model = ResourceModel;
}

impl Listable for PublicIpAddressContainer {}

impl PublicIpAddressContainer {
    pub async fn get(&self, name: &str) -> ArmResult<ResourceResponse<PublicIpAddressOperations>> {
        get_resource(&self.operations(name)?).await
    }
}

/// Subnets are proxy resources: no location, no tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetData {
    pub id: ResourceIdentifier,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: Value,
}

impl SubnetData {
    pub fn address_prefix(&self) -> Option<&str> {
        self.properties.get("addressPrefix").and_then(Value::as_str)
    }
}

impl ResourceData for SubnetData {
    fn id(&self) -> &ResourceIdentifier {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub struct SubnetOperations {
    context: OperationsContext,
}

impl ResourceOperations for SubnetOperations {
    const RESOURCE_TYPE: &'static str = "Microsoft.Network/virtualNetworks/subnets";
    const API_VERSION: &'static str = api_versions::NETWORK;
    type Data = SubnetData;

    fn from_context(context: OperationsContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &OperationsContext {
        &self.context
    }
}

impl Gettable for SubnetOperations {}

#[async_trait]
impl Deletable for SubnetOperations {
    fn deletable_id(&self) -> &ResourceIdentifier {
        self.id()
    }

    async fn start_delete(&self) -> ArmResult<ArmOperation<()>> {
        start_delete_resource(self).await
    }
}

impl SubnetOperations {
    /// Operations for the network this subnet belongs to.
    pub fn virtual_network(&self) -> ArmResult<VirtualNetworkOperations> {
        let parent = self.id().parent().ok_or_else(|| {
            crate::arm::error::ArmError::malformed(self.id().to_string(), "subnet without a parent")
        })?;
        VirtualNetworkOperations::new(self.config().clone(), parent)
    }
}

/// Subnets of one virtual network.
#[derive(Debug, Clone)]
pub struct SubnetContainer {
    context: ContainerContext,
}

impl ResourceContainer for SubnetContainer {
    const PARENT_TYPE: &'static str = VirtualNetworkOperations::RESOURCE_TYPE;
    type Operations = SubnetOperations;

    fn from_context(context: ContainerContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &ContainerContext {
        &self.context
    }
}

impl Creatable for SubnetContainer {
    type Model = SubnetModel;
}

impl Listable for SubnetContainer {}

//! Virtual machines (lifecycle, power state, tags) and availability sets

use super::api_versions;
use super::generic::{list_resources, GenericResource, ResourceFilter};
use crate::arm::error::ArmResult;
use crate::resource::capabilities::{
    get_resource, start_delete_resource, Creatable, Deletable, Gettable, Listable,
    ResourceOperation, ResourceResponse, Taggable,
};
use crate::resource::lro::{ArmOperation, WaitOptions};
use crate::resource::model::{ResourceData, Tags, TrackedModel, TrackedResourceData};
use crate::resource::operations::{
    ContainerContext, OperationsContext, ResourceContainer, ResourceOperations,
};
use crate::resource::pager::{PageOptions, Pager};
use crate::resource::response::unit_converter;
use crate::resource::{ArmResource, ResourceIdentifier, ResourceType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
}

/// Typed view of the fields callers commonly read; the rest is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_profile: Option<HardwareProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_view: Option<Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachineData {
    pub id: ResourceIdentifier,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "crate::resource::model::nullable_tags")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
    #[serde(default)]
    pub properties: VirtualMachineProperties,
}

impl VirtualMachineData {
    pub fn vm_size(&self) -> Option<&str> {
        self.properties
            .hardware_profile
            .as_ref()
            .and_then(|p| p.vm_size.as_deref())
    }

    /// `PowerState/...` code from the instance view, when it was expanded.
    pub fn power_state(&self) -> Option<&str> {
        self.properties
            .instance_view
            .as_ref()?
            .get("statuses")?
            .as_array()?
            .iter()
            .filter_map(|s| s.get("code").and_then(Value::as_str))
            .find(|code| code.starts_with("PowerState/"))
    }
}

impl ResourceData for VirtualMachineData {
    fn id(&self) -> &ResourceIdentifier {
        &self.id
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}

/// Create body for a virtual machine. `properties` is passed through as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachineModel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl VirtualMachineModel {
    pub fn new(vm_size: &str) -> Self {
        Self {
            properties: json!({ "hardwareProfile": { "vmSize": vm_size } }),
            ..Self::default()
        }
    }

    pub fn in_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Merge a top-level property (e.g. `osProfile`, `storageProfile`).
    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        if !self.properties.is_object() {
            self.properties = json!({});
        }
        if let Some(map) = self.properties.as_object_mut() {
            map.insert(key.to_string(), value);
        }
        self
    }
}

impl TrackedModel for VirtualMachineModel {
    fn location(&self) -> &str {
        &self.location
    }

    fn set_location(&mut self, location: String) {
        self.location = location;
    }
}

#[derive(Debug, Clone)]
pub struct VirtualMachineOperations {
    context: OperationsContext,
}

impl ResourceOperations for VirtualMachineOperations {
    const RESOURCE_TYPE: &'static str = "Microsoft.Compute/virtualMachines";
    const API_VERSION: &'static str = api_versions::COMPUTE;
    type Data = VirtualMachineData;

    fn from_context(context: OperationsContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &OperationsContext {
        &self.context
    }
}

impl Gettable for VirtualMachineOperations {}

impl Taggable for VirtualMachineOperations {}

#[async_trait]
impl Deletable for VirtualMachineOperations {
    fn deletable_id(&self) -> &ResourceIdentifier {
        self.id()
    }

    async fn start_delete(&self) -> ArmResult<ArmOperation<()>> {
        start_delete_resource(self).await
    }
}

impl VirtualMachineOperations {
    async fn start_action(&self, action: &str, query: &[(&str, &str)]) -> ArmResult<ArmOperation<()>> {
        self.rest()
            .begin_post_action(self.id(), action, query, None, unit_converter())
            .await
    }

    pub async fn start_power_on(&self) -> ArmResult<ArmOperation<()>> {
        self.start_action("start", &[]).await
    }

    pub async fn power_on(&self) -> ArmResult<()> {
        self.start_power_on()
            .await?
            .wait_for_completion(WaitOptions::default())
            .await
    }

    /// `skip_shutdown` powers off without a guest shutdown.
    pub async fn start_power_off(&self, skip_shutdown: bool) -> ArmResult<ArmOperation<()>> {
        let skip = if skip_shutdown { "true" } else { "false" };
        self.start_action("powerOff", &[("skipShutdown", skip)]).await
    }

    pub async fn power_off(&self, skip_shutdown: bool) -> ArmResult<()> {
        self.start_power_off(skip_shutdown)
            .await?
            .wait_for_completion(WaitOptions::default())
            .await
    }

    pub async fn start_restart(&self) -> ArmResult<ArmOperation<()>> {
        self.start_action("restart", &[]).await
    }

    /// Stop and release compute. The VM keeps its disks.
    pub async fn start_deallocate(&self) -> ArmResult<ArmOperation<()>> {
        self.start_action("deallocate", &[]).await
    }

    /// PATCH the VM with a partial body, e.g. `{"properties": {"hardwareProfile": ...}}`.
    pub async fn start_update(&self, patch: Value) -> ArmResult<ResourceOperation<Self>> {
        self.rest()
            .begin_patch(self.id(), patch, self.converter())
            .await
    }

    pub async fn update(&self, patch: Value) -> ArmResult<ResourceResponse<Self>> {
        self.start_update(patch)
            .await?
            .wait_for_response(WaitOptions::default())
            .await
    }

    /// Runtime status (power state, agent and disk statuses).
    pub async fn instance_view(&self) -> ArmResult<Value> {
        let rest = self.rest();
        let url = rest.action_url(self.id(), "instanceView");
        tracing::debug!("instance_view({}) → {}", self.id().name(), url);
        Ok(rest.get_url(url).await?.body)
    }

    pub fn power_on_blocking(&self) -> ArmResult<()> {
        crate::arm::blocking::block_on(self.power_on())
    }

    pub fn power_off_blocking(&self, skip_shutdown: bool) -> ArmResult<()> {
        crate::arm::blocking::block_on(self.power_off(skip_shutdown))
    }
}

/// Virtual machines of one resource group.
#[derive(Debug, Clone)]
pub struct VirtualMachineContainer {
    context: ContainerContext,
}

impl ResourceContainer for VirtualMachineContainer {
    const PARENT_TYPE: &'static str = ResourceType::RESOURCE_GROUP;
    type Operations = VirtualMachineOperations;

    fn from_context(context: ContainerContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &ContainerContext {
        &self.context
    }
}

impl Creatable for VirtualMachineContainer {
    type Model = VirtualMachineModel;
}

impl Listable for VirtualMachineContainer {}

impl VirtualMachineContainer {
    pub async fn get(&self, name: &str) -> ArmResult<ResourceResponse<VirtualMachineOperations>> {
        get_resource(&self.operations(name)?).await
    }

    /// VMs in the group whose name contains `fragment`, as generic resources.
    pub fn list_by_name(&self, fragment: &str, top: Option<u32>) -> ArmResult<Pager<GenericResource>> {
        let filter = ResourceFilter::new()
            .resource_type(&Self::child_type())
            .name_contains(fragment);
        let mut options = filter.into_page_options();
        if let Some(top) = top {
            options = options.top(top);
        }
        list_resources(self.config().clone(), self.parent_id(), &options)
    }

    /// Like [`list_by_name`](Self::list_by_name), then reads the full model of each match.
    pub async fn list_by_name_expanded(
        &self,
        fragment: &str,
        top: Option<u32>,
    ) -> ArmResult<Vec<ArmResource<VirtualMachineOperations>>> {
        let mut pager = self.list_by_name(fragment, top)?;
        let mut machines = Vec::new();
        while let Some(resource) = pager.try_next().await? {
            let ops = resource.as_operations::<VirtualMachineOperations>()?;
            machines.push(get_resource(&ops).await?.into_value()?);
        }
        Ok(machines)
    }

    /// Listing with the instance view expanded, so [`VirtualMachineData::power_state`] is set.
    pub fn list_with_instance_view(&self) -> ArmResult<Pager<ArmResource<VirtualMachineOperations>>> {
        self.list(PageOptions::new().expand("instanceView"))
    }
}

/// Create body for an availability set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySetModel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub sku: Value,
    pub properties: AvailabilitySetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_fault_domain_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_update_domain_count: Option<u32>,
}

impl AvailabilitySetModel {
    /// Set for managed disks (`Aligned` sku).
    pub fn new(fault_domains: u32, update_domains: u32) -> Self {
        Self {
            sku: json!({ "name": "Aligned" }),
            properties: AvailabilitySetProperties {
                platform_fault_domain_count: Some(fault_domains),
                platform_update_domain_count: Some(update_domains),
            },
            ..Self::default()
        }
    }

    pub fn in_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl TrackedModel for AvailabilitySetModel {
    fn location(&self) -> &str {
        &self.location
    }

    fn set_location(&mut self, location: String) {
        self.location = location;
    }
}

#[derive(Debug, Clone)]
pub struct AvailabilitySetOperations {
    context: OperationsContext,
}

impl ResourceOperations for AvailabilitySetOperations {
    const RESOURCE_TYPE: &'static str = "Microsoft.Compute/availabilitySets";
    const API_VERSION: &'static str = api_versions::COMPUTE;
    type Data = TrackedResourceData;

    fn from_context(context: OperationsContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &OperationsContext {
        &self.context
    }
}

impl Gettable for AvailabilitySetOperations {}

impl Taggable for AvailabilitySetOperations {}

#[async_trait]
impl Deletable for AvailabilitySetOperations {
    fn deletable_id(&self) -> &ResourceIdentifier {
        self.id()
    }

    async fn start_delete(&self) -> ArmResult<ArmOperation<()>> {
        start_delete_resource(self).await
    }
}

/// Availability sets of one resource group.
#[derive(Debug, Clone)]
pub struct AvailabilitySetContainer {
    context: ContainerContext,
}

impl ResourceContainer for AvailabilitySetContainer {
    const PARENT_TYPE: &'static str = ResourceType::RESOURCE_GROUP;
    type Operations = AvailabilitySetOperations;

    fn from_context(context: ContainerContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &ContainerContext {
        &self.context
    }
}

impl Creatable for AvailabilitySetContainer {
    type Model = AvailabilitySetModel;
}

impl Listable for AvailabilitySetContainer {}

impl AvailabilitySetContainer {
    pub async fn get(&self, name: &str) -> ArmResult<ResourceResponse<AvailabilitySetOperations>> {
        get_resource(&self.operations(name)?).await
    }
}

//! Role assignments
//!
//! Role assignments are extension resources: they attach to any scope (tenant,
//! subscription, resource group or an individual resource) by appending
//! `/providers/Microsoft.Authorization/roleAssignments/{name}` to its id.
//! [`RoleAssignmentsExt`] gives every operations type access to them.

use super::api_versions;
use crate::arm::error::ArmResult;
use crate::resource::capabilities::{
    start_delete_resource, Creatable, Deletable, Gettable, Listable, ResourceResponse,
};
use crate::resource::lro::ArmOperation;
use crate::resource::model::{ArmResource, ResourceData};
use crate::resource::operations::{
    ContainerContext, OperationsContext, ResourceContainer, ResourceOperations,
};
use crate::resource::pager::{PageOptions, Pager};
use crate::resource::ResourceIdentifier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentProperties {
    pub role_definition_id: String,
    pub principal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignmentData {
    pub id: ResourceIdentifier,
    #[serde(default)]
    pub name: String,
    pub properties: RoleAssignmentProperties,
}

impl RoleAssignmentData {
    /// The scope this assignment is attached to.
    pub fn scope_id(&self) -> Option<ResourceIdentifier> {
        self.id.parent()
    }
}

impl ResourceData for RoleAssignmentData {
    fn id(&self) -> &ResourceIdentifier {
        &self.id
    }
}

/// Create body: grant `role_definition_id` to `principal_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignmentModel {
    pub properties: RoleAssignmentProperties,
}

impl RoleAssignmentModel {
    pub fn new(role_definition_id: impl Into<String>, principal_id: impl Into<String>) -> Self {
        Self {
            properties: RoleAssignmentProperties {
                role_definition_id: role_definition_id.into(),
                principal_id: principal_id.into(),
                principal_type: None,
                scope: None,
            },
        }
    }

    pub fn principal_type(mut self, principal_type: impl Into<String>) -> Self {
        self.properties.principal_type = Some(principal_type.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct RoleAssignmentOperations {
    context: OperationsContext,
}

impl ResourceOperations for RoleAssignmentOperations {
    const RESOURCE_TYPE: &'static str = "Microsoft.Authorization/roleAssignments";
    const API_VERSION: &'static str = api_versions::AUTHORIZATION;
    type Data = RoleAssignmentData;

    fn from_context(context: OperationsContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &OperationsContext {
        &self.context
    }
}

impl Gettable for RoleAssignmentOperations {}

#[async_trait]
impl Deletable for RoleAssignmentOperations {
    fn deletable_id(&self) -> &ResourceIdentifier {
        self.id()
    }

    async fn start_delete(&self) -> ArmResult<ArmOperation<()>> {
        start_delete_resource(self).await
    }
}

/// Role assignments at one scope. Any scope is accepted.
#[derive(Debug, Clone)]
pub struct RoleAssignmentContainer {
    context: ContainerContext,
}

impl ResourceContainer for RoleAssignmentContainer {
    const PARENT_TYPE: &'static str = "Microsoft.Resources/tenants";
    type Operations = RoleAssignmentOperations;

    fn from_context(context: ContainerContext) -> Self {
        Self { context }
    }

    fn context(&self) -> &ContainerContext {
        &self.context
    }

    fn accepts_parent(_parent: &ResourceIdentifier) -> bool {
        true
    }
}

impl Creatable for RoleAssignmentContainer {
    type Model = RoleAssignmentModel;
}

impl Listable for RoleAssignmentContainer {}

impl RoleAssignmentContainer {
    /// Assign a role under a freshly generated assignment name.
    pub async fn assign(
        &self,
        role_definition_id: &str,
        principal_id: &str,
    ) -> ArmResult<ResourceResponse<RoleAssignmentOperations>> {
        let name = Uuid::new_v4().to_string();
        let model = RoleAssignmentModel::new(role_definition_id, principal_id);
        self.create(&name, &model).await
    }

    /// Only assignments made at exactly this scope, not inherited ones.
    pub fn list_at_scope(&self) -> ArmResult<Pager<ArmResource<RoleAssignmentOperations>>> {
        self.list(PageOptions::new().filter("atScope()"))
    }
}

/// Role assignment access for every operations type.
pub trait RoleAssignmentsExt: ResourceOperations {
    fn role_assignments(&self) -> ArmResult<RoleAssignmentContainer> {
        RoleAssignmentContainer::new(self.config().clone(), self.id().clone())
    }

    fn role_assignment(&self, name: &str) -> ArmResult<RoleAssignmentOperations> {
        self.role_assignments()?.operations(name)
    }
}

impl<O: ResourceOperations> RoleAssignmentsExt for O {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::options::ClientConfig;
    use crate::services::compute::VirtualMachineOperations;
    use crate::services::subscriptions::SubscriptionOperations;
    use serde_json::json;
    use std::sync::Arc;

    fn config() -> Arc<ClientConfig> {
        Arc::new(ClientConfig::builder().build().unwrap())
    }

    #[test]
    fn test_assignment_on_resource_scope() {
        let vm = VirtualMachineOperations::new(
            config(),
            ResourceIdentifier::parse(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1",
            )
            .unwrap(),
        )
        .unwrap();
        let assignment = vm.role_assignment("a1").unwrap();
        assert_eq!(
            assignment.id().to_string(),
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1/providers/Microsoft.Authorization/roleAssignments/a1"
        );
        assert_eq!(
            assignment.id().resource_type(),
            "Microsoft.Authorization/roleAssignments"
        );
        assert_eq!(assignment.id().parent().as_ref(), Some(vm.id()));
    }

    #[test]
    fn test_assignment_on_subscription_and_tenant() {
        let sub = SubscriptionOperations::new(config(), ResourceIdentifier::for_subscription("s").unwrap())
            .unwrap();
        let assignment = sub.role_assignment("a1").unwrap();
        assert_eq!(
            assignment.id().to_string(),
            "/subscriptions/s/providers/Microsoft.Authorization/roleAssignments/a1"
        );

        let tenant = RoleAssignmentContainer::new(config(), ResourceIdentifier::tenant()).unwrap();
        assert_eq!(
            tenant.child_id("a2").unwrap().to_string(),
            "/providers/Microsoft.Authorization/roleAssignments/a2"
        );
    }

    #[test]
    fn test_model_body() {
        let model = RoleAssignmentModel::new("/providers/Microsoft.Authorization/roleDefinitions/r", "p")
            .principal_type("User");
        assert_eq!(
            serde_json::to_value(&model).unwrap(),
            json!({"properties": {
                "roleDefinitionId": "/providers/Microsoft.Authorization/roleDefinitions/r",
                "principalId": "p",
                "principalType": "User"
            }})
        );
    }
}

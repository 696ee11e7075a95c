//! Untyped resources and list filters
//!
//! The `resources` collection at a subscription or resource group returns
//! every resource regardless of type. Items come back as [`GenericResource`],
//! which can be turned into typed operations once the caller knows (or the
//! registry resolves) the concrete type.

use super::api_versions;
use crate::arm::error::ArmResult;
use crate::arm::options::ClientConfig;
use crate::resource::model::Tags;
use crate::resource::pager::{PageOptions, Pager};
use crate::resource::registry::{AnyOperations, OperationsRegistry};
use crate::resource::response::Converter;
use crate::resource::rest::ResourceRest;
use crate::resource::{ResourceIdentifier, ResourceOperations, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Envelope common to every resource in a `resources` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericResourceData {
    pub id: ResourceIdentifier,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "crate::resource::model::nullable_tags")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, rename = "managedBy", skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
}

/// A resource of any type plus the configuration to act on it.
#[derive(Clone)]
pub struct GenericResource {
    config: Arc<ClientConfig>,
    data: GenericResourceData,
}

impl GenericResource {
    pub fn new(config: Arc<ClientConfig>, data: GenericResourceData) -> Self {
        Self { config, data }
    }

    pub fn converter(config: Arc<ClientConfig>) -> Converter<Self> {
        Arc::new(move |value: &Value| -> ArmResult<Self> {
            let data = GenericResourceData::deserialize(value)?;
            Ok(Self::new(config.clone(), data))
        })
    }

    pub fn data(&self) -> &GenericResourceData {
        &self.data
    }

    pub fn id(&self) -> &ResourceIdentifier {
        &self.data.id
    }

    /// Type as derived from the id.
    pub fn resource_type(&self) -> ResourceType {
        self.data.id.resource_type()
    }

    /// Typed operations for this resource. Fails with a type mismatch when it is not an `O`.
    pub fn as_operations<O: ResourceOperations>(&self) -> ArmResult<O> {
        O::new(self.config.clone(), self.data.id.clone())
    }

    /// Operations picked by the registry from the resource's type.
    pub fn operations(&self, registry: &OperationsRegistry) -> ArmResult<Box<dyn AnyOperations>> {
        registry.resolve(self.config.clone(), self.data.id.clone())
    }
}

impl fmt::Debug for GenericResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericResource")
            .field("data", &self.data)
            .finish()
    }
}

/// OData `$filter` for the `resources` collection.
///
/// Conditions are joined with `and`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    clauses: Vec<String>,
}

/// Single quotes are doubled inside OData string literals.
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl ResourceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource_type(mut self, resource_type: &ResourceType) -> Self {
        self.clauses
            .push(format!("resourceType eq {}", literal(&resource_type.to_string())));
        self
    }

    /// Resources whose name contains `fragment`.
    pub fn name_contains(mut self, fragment: &str) -> Self {
        self.clauses
            .push(format!("substringof({}, name)", literal(fragment)));
        self
    }

    /// Resources carrying tag `name`, optionally with an exact value.
    pub fn tag(mut self, name: &str, value: Option<&str>) -> Self {
        let mut clause = format!("tagName eq {}", literal(name));
        if let Some(value) = value {
            clause.push_str(&format!(" and tagValue eq {}", literal(value)));
        }
        self.clauses.push(clause);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn to_filter_string(&self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(" and "))
        }
    }

    pub fn into_page_options(self) -> PageOptions {
        match self.to_filter_string() {
            Some(filter) => PageOptions::new().filter(filter),
            None => PageOptions::new(),
        }
    }
}

impl fmt::Display for ResourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_filter_string().unwrap_or_default())
    }
}

/// Lazily list every resource under a subscription or resource group.
pub fn list_resources(
    config: Arc<ClientConfig>,
    scope: &ResourceIdentifier,
    options: &PageOptions,
) -> ArmResult<Pager<GenericResource>> {
    let rest = ResourceRest::new(config.clone(), &scope.resource_type(), api_versions::RESOURCES);
    let mut url = rest.action_url(scope, "resources");
    options.apply(&mut url);
    tracing::debug!("list_resources → {}", url);
    Ok(rest.list_url(url, GenericResource::converter(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::error::ArmError;
    use crate::services::compute::VirtualMachineOperations;
    use crate::services::resource_groups::ResourceGroupOperations;
    use serde_json::json;

    fn config() -> Arc<ClientConfig> {
        Arc::new(ClientConfig::builder().build().unwrap())
    }

    #[test]
    fn test_filter_string() {
        let filter = ResourceFilter::new()
            .resource_type(&"Microsoft.Compute/virtualMachines".into())
            .name_contains("web");
        assert_eq!(
            filter.to_filter_string().as_deref(),
            Some("resourceType eq 'Microsoft.Compute/virtualMachines' and substringof('web', name)")
        );
        assert_eq!(ResourceFilter::new().to_filter_string(), None);
    }

    #[test]
    fn test_filter_tag_and_quoting() {
        let filter = ResourceFilter::new().tag("owner", Some("o'brien"));
        assert_eq!(
            filter.to_string(),
            "tagName eq 'owner' and tagValue eq 'o''brien'"
        );
        assert_eq!(ResourceFilter::new().tag("env", None).to_string(), "tagName eq 'env'");
    }

    #[test]
    fn test_generic_resource_to_typed_operations() {
        let data: GenericResourceData = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1",
            "name": "vm1",
            "type": "Microsoft.Compute/virtualMachines",
            "location": "westus2",
            "tags": null
        }))
        .unwrap();
        let resource = GenericResource::new(config(), data);
        assert!(resource.as_operations::<VirtualMachineOperations>().is_ok());
        let err = resource
            .as_operations::<ResourceGroupOperations>()
            .unwrap_err();
        assert!(matches!(err, ArmError::ResourceTypeMismatch { .. }));
        assert_eq!(resource.resource_type(), "Microsoft.Compute/virtualMachines");
    }

    #[test]
    fn test_list_resources_url() {
        let scope = ResourceIdentifier::for_resource_group("s", "rg").unwrap();
        let options = ResourceFilter::new().tag("env", Some("dev")).into_page_options();
        // Building the pager makes no request.
        let pager = list_resources(config(), &scope, &options).unwrap();
        assert_eq!(pager.pages_fetched(), 0);
    }
}

//! Domain objects and wire models
//!
//! A domain object ([`ArmResource`]) is an operations object bound to the
//! resource's id together with the data the service returned for it.

use super::identifier::ResourceIdentifier;
use super::operations::ResourceOperations;
use super::response::Converter;
use crate::arm::error::ArmResult;
use crate::arm::options::ClientConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub type Tags = BTreeMap<String, String>;

/// Wire model returned by the service for one resource.
pub trait ResourceData: DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> &ResourceIdentifier;

    fn tags(&self) -> Option<&Tags> {
        None
    }
}

/// Create models that carry a location.
pub trait TrackedModel {
    fn location(&self) -> &str;
    fn set_location(&mut self, location: String);
}

/// Services send `"tags": null` for untagged resources.
pub(crate) fn nullable_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tags, D::Error> {
    Ok(Option::<Tags>::deserialize(deserializer)?.unwrap_or_default())
}

/// Common shape of tracked resources (`id`, `name`, `type`, `location`, `tags`, `properties`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedResourceData {
    pub id: ResourceIdentifier,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "nullable_tags")]
    pub tags: Tags,
    #[serde(default, rename = "managedBy", skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default)]
    pub properties: Value,
}

impl TrackedResourceData {
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .get("provisioningState")
            .and_then(Value::as_str)
    }
}

impl ResourceData for TrackedResourceData {
    fn id(&self) -> &ResourceIdentifier {
        &self.id
    }

    fn tags(&self) -> Option<&Tags> {
        Some(&self.tags)
    }
}

/// Body for creating a tracked resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceModel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl ResourceModel {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }
}

impl TrackedModel for ResourceModel {
    fn location(&self) -> &str {
        &self.location
    }

    fn set_location(&mut self, location: String) {
        self.location = location;
    }
}

/// Operations bound to a resource plus the data last read for it.
/// Dereferences to the operations object.
pub struct ArmResource<O: ResourceOperations> {
    operations: O,
    data: O::Data,
}

impl<O: ResourceOperations> ArmResource<O> {
    /// Fails with a type mismatch when the data's id is not an `O` resource.
    pub fn from_data(config: Arc<ClientConfig>, data: O::Data) -> ArmResult<Self> {
        let operations = O::new(config, data.id().clone())?;
        Ok(Self { operations, data })
    }

    /// Wire model to domain object.
    pub fn converter(config: Arc<ClientConfig>) -> Converter<Self> {
        Arc::new(move |value: &Value| -> ArmResult<Self> {
            let data = <O::Data as Deserialize>::deserialize(value)?;
            Self::from_data(config.clone(), data)
        })
    }

    pub fn data(&self) -> &O::Data {
        &self.data
    }

    pub fn operations(&self) -> &O {
        &self.operations
    }

    pub fn into_parts(self) -> (O, O::Data) {
        (self.operations, self.data)
    }
}

impl<O: ResourceOperations> Deref for ArmResource<O> {
    type Target = O;

    fn deref(&self) -> &O {
        &self.operations
    }
}

impl<O> PartialEq for ArmResource<O>
where
    O: ResourceOperations,
    O::Data: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.operations.id() == other.operations.id() && self.data == other.data
    }
}

impl<O> fmt::Debug for ArmResource<O>
where
    O: ResourceOperations,
    O::Data: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmResource")
            .field("id", &self.operations.id().to_string())
            .field("data", &self.data)
            .finish()
    }
}

//! Provider namespace + type chain, e.g. `Microsoft.Network/virtualNetworks/subnets`
//!
//! Comparison and hashing ignore case. Display keeps the casing the value was
//! built with.

use crate::arm::error::{ArmError, ArmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceType {
    namespace: String,
    types: Vec<String>,
}

impl ResourceType {
    pub const TENANT: &'static str = "Microsoft.Resources/tenants";
    pub const SUBSCRIPTION: &'static str = "Microsoft.Resources/subscriptions";
    pub const RESOURCE_GROUP: &'static str = "Microsoft.Resources/resourceGroups";

    /// Build from a namespace and a non-empty type chain.
    pub fn new<I, S>(namespace: impl Into<String>, types: I) -> ArmResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let namespace = namespace.into();
        let types: Vec<String> = types.into_iter().map(Into::into).collect();
        let rendered = format!("{}/{}", namespace, types.join("/"));

        if namespace.is_empty() || namespace.contains('/') {
            return Err(ArmError::malformed(rendered, "invalid provider namespace"));
        }
        if types.is_empty() {
            return Err(ArmError::malformed(rendered, "resource type needs at least one type segment"));
        }
        if types.iter().any(|t| t.is_empty() || t.contains('/')) {
            return Err(ArmError::malformed(rendered, "empty type segment"));
        }
        Ok(Self { namespace, types })
    }

    /// Strict parse of `Namespace/type[/childType...]`.
    pub fn parse(input: &str) -> ArmResult<Self> {
        let trimmed = input.trim_matches('/');
        let mut parts = trimmed.split('/');
        let namespace = parts.next().unwrap_or_default();
        let types: Vec<&str> = parts.collect();
        Self::new(namespace, types).map_err(|e| match e {
            ArmError::MalformedIdentifier { reason, .. } => ArmError::malformed(input, reason),
            other => other,
        })
    }

    pub fn tenant() -> Self {
        Self::builtin("tenants")
    }

    pub fn subscription() -> Self {
        Self::builtin("subscriptions")
    }

    pub fn resource_group() -> Self {
        Self::builtin("resourceGroups")
    }

    fn builtin(last: &str) -> Self {
        Self {
            namespace: "Microsoft.Resources".to_string(),
            types: vec![last.to_string()],
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Last segment of the type chain (`subnets` for `Microsoft.Network/virtualNetworks/subnets`).
    pub fn last_type(&self) -> &str {
        self.types.last().map(String::as_str).unwrap_or_default()
    }

    /// Type one level up the chain, `None` for top-level types.
    pub fn parent(&self) -> Option<ResourceType> {
        if self.types.len() < 2 {
            return None;
        }
        Some(Self {
            namespace: self.namespace.clone(),
            types: self.types[..self.types.len() - 1].to_vec(),
        })
    }

    pub fn child(&self, child_type: impl Into<String>) -> ArmResult<ResourceType> {
        let mut types = self.types.clone();
        types.push(child_type.into());
        Self::new(self.namespace.clone(), types)
    }

    /// Tenant, subscription and resource group are addressed with their own
    /// path keywords rather than under `providers/`.
    pub fn is_builtin_scope(&self) -> bool {
        *self == Self::tenant() || *self == Self::subscription() || *self == Self::resource_group()
    }

    fn key(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.namespace.to_ascii_lowercase())
            .chain(self.types.iter().map(|t| t.to_ascii_lowercase()))
    }
}

impl PartialEq for ResourceType {
    fn eq(&self, other: &Self) -> bool {
        self.namespace.eq_ignore_ascii_case(&other.namespace)
            && self.types.len() == other.types.len()
            && self
                .types
                .iter()
                .zip(&other.types)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for ResourceType {}

impl Hash for ResourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for part in self.key() {
            part.hash(state);
        }
    }
}

impl PartialEq<str> for ResourceType {
    fn eq(&self, other: &str) -> bool {
        ResourceType::parse(other).map(|t| t == *self).unwrap_or(false)
    }
}

impl PartialEq<&str> for ResourceType {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.types.join("/"))
    }
}

impl FromStr for ResourceType {
    type Err = ArmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceType {
    type Error = ArmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.to_string()
    }
}

/// Lenient conversion for declaration sites. Input without a type segment
/// keeps the whole string as namespace and an empty chain, which never
/// matches any identifier.
impl From<&str> for ResourceType {
    fn from(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|_| Self {
            namespace: value.to_string(),
            types: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_nested() {
        let rt = ResourceType::parse("Microsoft.Network/virtualNetworks/subnets").unwrap();
        assert_eq!(rt.namespace(), "Microsoft.Network");
        assert_eq!(rt.types(), &["virtualNetworks", "subnets"]);
        assert_eq!(rt.last_type(), "subnets");
        assert_eq!(rt.to_string(), "Microsoft.Network/virtualNetworks/subnets");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ResourceType::parse("Microsoft.Compute").is_err());
        assert!(ResourceType::parse("").is_err());
        assert!(ResourceType::parse("Microsoft.Compute//disks").is_err());
    }

    #[test]
    fn test_case_insensitive_equality_and_hash() {
        let a = ResourceType::from("Microsoft.Compute/virtualMachines");
        let b = ResourceType::from("microsoft.compute/VIRTUALMACHINES");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_type_chain_length_matters() {
        let vnet = ResourceType::from("Microsoft.Network/virtualNetworks");
        let subnet = ResourceType::from("Microsoft.Network/virtualNetworks/subnets");
        assert_ne!(vnet, subnet);
        assert_eq!(subnet.parent().unwrap(), vnet);
        assert_eq!(vnet.child("subnets").unwrap(), subnet);
        assert!(vnet.parent().is_none());
    }

    #[test]
    fn test_builtin_scopes() {
        assert_eq!(ResourceType::resource_group(), ResourceType::RESOURCE_GROUP);
        assert!(ResourceType::subscription().is_builtin_scope());
        assert!(!ResourceType::from("Microsoft.Compute/disks").is_builtin_scope());
    }

    #[test]
    fn test_lenient_from_never_matches() {
        let bogus = ResourceType::from("nonsense");
        assert!(bogus.types().is_empty());
        assert_ne!(bogus, ResourceType::resource_group());
    }

    #[test]
    fn test_serde_as_string() {
        let rt = ResourceType::from("Microsoft.Compute/virtualMachines");
        let json = serde_json::to_string(&rt).unwrap();
        assert_eq!(json, "\"Microsoft.Compute/virtualMachines\"");
        let back: ResourceType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rt);
    }
}

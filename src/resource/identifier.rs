//! Hierarchical resource identifiers
//!
//! An identifier addresses a resource through an optional subscription, an
//! optional resource group, and zero or more provider scopes:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{ns}/{type}/{name}[/{childType}/{childName}]
//!     [/providers/{extensionNs}/{type}/{name}...]
//! ```
//!
//! Parsing is strict: anything that does not fit the grammar is rejected with
//! [`ArmError::MalformedIdentifier`]. Identifiers compare and hash segment by
//! segment, ignoring ASCII case.

use super::resource_type::ResourceType;
use crate::arm::error::{ArmError, ArmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const PROVIDERS: &str = "providers";

/// One `providers/{namespace}/{type}/{name}...` run inside an identifier.
#[derive(Debug, Clone)]
pub struct ProviderScope {
    namespace: String,
    pairs: Vec<(String, String)>,
}

impl ProviderScope {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `(type, name)` pairs, outermost first.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::new(
            self.namespace.clone(),
            self.pairs.iter().map(|(t, _)| t.clone()),
        )
        .unwrap_or_else(|_| ResourceType::from(self.namespace.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceIdentifier {
    subscription_id: Option<String>,
    resource_group: Option<String>,
    scopes: Vec<ProviderScope>,
}

fn keyword(token: &str, expected: &str) -> bool {
    token.eq_ignore_ascii_case(expected)
}

fn check_segment(input: &str, value: &str, what: &str) -> ArmResult<()> {
    if value.is_empty() {
        return Err(ArmError::malformed(input, format!("empty {}", what)));
    }
    if value.contains('/') {
        return Err(ArmError::malformed(input, format!("{} contains '/'", what)));
    }
    Ok(())
}

impl ResourceIdentifier {
    /// Parse a slash-delimited identifier. `/` alone denotes the tenant root.
    pub fn parse(input: &str) -> ArmResult<Self> {
        let Some(rest) = input.strip_prefix('/') else {
            return Err(ArmError::malformed(input, "identifier must start with '/'"));
        };
        if rest.is_empty() {
            return Ok(Self::tenant());
        }

        let tokens: Vec<&str> = rest.split('/').collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(ArmError::malformed(input, "empty path segment"));
        }

        let mut id = Self::tenant();
        let mut i = 0;

        if keyword(tokens[0], SUBSCRIPTIONS) {
            let sub = tokens
                .get(1)
                .ok_or_else(|| ArmError::malformed(input, "missing subscription id"))?;
            id.subscription_id = Some((*sub).to_string());
            i = 2;

            if tokens.get(i).is_some_and(|t| keyword(t, RESOURCE_GROUPS)) {
                let rg = tokens
                    .get(i + 1)
                    .ok_or_else(|| ArmError::malformed(input, "missing resource group name"))?;
                id.resource_group = Some((*rg).to_string());
                i += 2;
            }
        }

        while i < tokens.len() {
            let token = tokens[i];
            if !keyword(token, PROVIDERS) {
                let reason = if keyword(token, RESOURCE_GROUPS) {
                    "resourceGroups must directly follow a subscription".to_string()
                } else {
                    format!("expected 'providers' but found '{}'", token)
                };
                return Err(ArmError::malformed(input, reason));
            }
            let namespace = tokens
                .get(i + 1)
                .ok_or_else(|| ArmError::malformed(input, "missing provider namespace"))?;
            i += 2;

            let mut pairs = Vec::new();
            while i < tokens.len() && !keyword(tokens[i], PROVIDERS) {
                let name = tokens.get(i + 1).ok_or_else(|| {
                    ArmError::malformed(input, format!("resource type '{}' has no name", tokens[i]))
                })?;
                pairs.push((tokens[i].to_string(), (*name).to_string()));
                i += 2;
            }
            if pairs.is_empty() {
                return Err(ArmError::malformed(
                    input,
                    format!("provider '{}' has no resource type", namespace),
                ));
            }
            id.scopes.push(ProviderScope {
                namespace: (*namespace).to_string(),
                pairs,
            });
        }

        Ok(id)
    }

    pub fn tenant() -> Self {
        Self {
            subscription_id: None,
            resource_group: None,
            scopes: Vec::new(),
        }
    }

    pub fn for_subscription(subscription_id: &str) -> ArmResult<Self> {
        Self::tenant().child(None, SUBSCRIPTIONS, subscription_id)
    }

    pub fn for_resource_group(subscription_id: &str, resource_group: &str) -> ArmResult<Self> {
        Self::for_subscription(subscription_id)?.child(None, RESOURCE_GROUPS, resource_group)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription_id.as_deref()
    }

    pub fn resource_group_name(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    pub fn scopes(&self) -> &[ProviderScope] {
        &self.scopes
    }

    pub fn is_tenant(&self) -> bool {
        self.subscription_id.is_none() && self.resource_group.is_none() && self.scopes.is_empty()
    }

    /// Namespace of the innermost provider scope.
    pub fn provider_namespace(&self) -> Option<&str> {
        self.scopes.last().map(|s| s.namespace.as_str())
    }

    /// Name of the addressed resource. Empty for the tenant root.
    pub fn name(&self) -> &str {
        if let Some((_, name)) = self.scopes.last().and_then(|s| s.pairs.last()) {
            return name;
        }
        self.resource_group
            .as_deref()
            .or(self.subscription_id.as_deref())
            .unwrap_or_default()
    }

    /// Type of the addressed resource: the type chain under the innermost
    /// provider namespace, or one of the built-in scope types.
    pub fn resource_type(&self) -> ResourceType {
        match self.scopes.last() {
            Some(scope) => scope.resource_type(),
            None if self.resource_group.is_some() => ResourceType::resource_group(),
            None if self.subscription_id.is_some() => ResourceType::subscription(),
            None => ResourceType::tenant(),
        }
    }

    pub fn matches(&self, expected: &ResourceType) -> bool {
        self.resource_type() == *expected
    }

    /// Fail with [`ArmError::ResourceTypeMismatch`] unless this id denotes `expected`.
    pub fn ensure_type(&self, expected: &ResourceType) -> ArmResult<()> {
        if self.matches(expected) {
            Ok(())
        } else {
            Err(ArmError::ResourceTypeMismatch {
                id: self.to_string(),
                expected: expected.to_string(),
            })
        }
    }

    /// `(namespace, type, name)` for every provider-scoped segment, outermost first.
    pub fn segments(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.scopes.iter().flat_map(|scope| {
            scope
                .pairs
                .iter()
                .map(move |(t, n)| (scope.namespace.as_str(), t.as_str(), n.as_str()))
        })
    }

    /// Append one type/name pair.
    ///
    /// With a namespace, a new provider scope is opened. Without one, the pair
    /// extends the innermost provider scope, or fills the subscription or
    /// resource group slot when the type is that keyword.
    pub fn child(&self, namespace: Option<&str>, child_type: &str, name: &str) -> ArmResult<Self> {
        let rendered = format!("{}/{}/{}", self.prefix(), child_type, name);
        check_segment(&rendered, child_type, "resource type")?;
        check_segment(&rendered, name, "resource name")?;

        let mut id = self.clone();
        match namespace {
            Some(ns) => {
                check_segment(&rendered, ns, "provider namespace")?;
                id.scopes.push(ProviderScope {
                    namespace: ns.to_string(),
                    pairs: vec![(child_type.to_string(), name.to_string())],
                });
            }
            None => {
                if let Some(scope) = id.scopes.last_mut() {
                    scope.pairs.push((child_type.to_string(), name.to_string()));
                } else if keyword(child_type, RESOURCE_GROUPS)
                    && id.subscription_id.is_some()
                    && id.resource_group.is_none()
                {
                    id.resource_group = Some(name.to_string());
                } else if keyword(child_type, SUBSCRIPTIONS) && id.is_tenant() {
                    id.subscription_id = Some(name.to_string());
                } else {
                    return Err(ArmError::malformed(
                        rendered,
                        "child type needs a provider namespace at this scope",
                    ));
                }
            }
        }
        Ok(id)
    }

    /// Id of a child resource of the given type.
    ///
    /// Nested types (`virtualNetworks/subnets`) extend this id when it denotes
    /// the parent type and fail with a type mismatch otherwise. Top-level types
    /// open a new provider scope.
    pub fn child_of_type(&self, child_type: &ResourceType, name: &str) -> ArmResult<Self> {
        if *child_type == ResourceType::subscription() {
            return self.child(None, SUBSCRIPTIONS, name);
        }
        if *child_type == ResourceType::resource_group() {
            return self.child(None, RESOURCE_GROUPS, name);
        }
        match child_type.parent() {
            Some(parent) => {
                self.ensure_type(&parent)?;
                self.child(None, child_type.last_type(), name)
            }
            None => self.child(Some(child_type.namespace()), child_type.last_type(), name),
        }
    }

    /// Id one level up. `None` for the tenant root.
    pub fn parent(&self) -> Option<Self> {
        let mut id = self.clone();
        if let Some(scope) = id.scopes.last_mut() {
            scope.pairs.pop();
            if scope.pairs.is_empty() {
                id.scopes.pop();
            }
        } else if id.resource_group.is_some() {
            id.resource_group = None;
        } else if id.subscription_id.is_some() {
            id.subscription_id = None;
        } else {
            return None;
        }
        Some(id)
    }

    fn prefix(&self) -> String {
        if self.is_tenant() {
            String::new()
        } else {
            self.to_string()
        }
    }

    fn key_parts(&self) -> Vec<&str> {
        let mut parts: Vec<&str> = Vec::new();
        parts.push(self.subscription_id.as_deref().unwrap_or_default());
        parts.push(self.resource_group.as_deref().unwrap_or_default());
        for scope in &self.scopes {
            parts.push(PROVIDERS);
            parts.push(&scope.namespace);
            for (t, n) in &scope.pairs {
                parts.push(t);
                parts.push(n);
            }
        }
        parts
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tenant() {
            return f.write_str("/");
        }
        if let Some(sub) = &self.subscription_id {
            write!(f, "/{}/{}", SUBSCRIPTIONS, sub)?;
        }
        if let Some(rg) = &self.resource_group {
            write!(f, "/{}/{}", RESOURCE_GROUPS, rg)?;
        }
        for scope in &self.scopes {
            write!(f, "/{}/{}", PROVIDERS, scope.namespace)?;
            for (t, n) in &scope.pairs {
                write!(f, "/{}/{}", t, n)?;
            }
        }
        Ok(())
    }
}

impl PartialEq for ResourceIdentifier {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.key_parts(), other.key_parts());
        a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| x.eq_ignore_ascii_case(y))
    }
}

impl Eq for ResourceIdentifier {}

impl Hash for ResourceIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for part in self.key_parts() {
            part.to_ascii_lowercase().hash(state);
        }
    }
}

impl FromStr for ResourceIdentifier {
    type Err = ArmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceIdentifier {
    type Error = ArmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for ResourceIdentifier {
    type Error = ArmError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ResourceIdentifier> for String {
    fn from(value: ResourceIdentifier) -> Self {
        value.to_string()
    }
}

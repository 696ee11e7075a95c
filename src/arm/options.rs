//! Client configuration shared by every operations and container object
//!
//! A [`ClientConfig`] is built once and then only read. Operations objects
//! hold it behind an `Arc`.

use super::credential::TokenCredential;
use super::error::{ArmError, ArmResult};
use super::http::{HttpTransport, ReqwestTransport};
use super::pipeline::{Pipeline, PolicyPosition, RequestPolicy};
use crate::resource::ResourceType;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Poll interval used when neither the service nor the caller suggests one
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    endpoint: Url,
    pipeline: Pipeline,
    api_versions: HashMap<ResourceType, String>,
    poll_interval: Duration,
    default_location: Option<String>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn default_location(&self) -> Option<&str> {
        self.default_location.as_deref()
    }

    /// api-version for a resource type: the configured override, else `default`.
    pub fn api_version(&self, resource_type: &ResourceType, default: &str) -> String {
        self.api_versions
            .get(resource_type)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

#[derive(Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<Url>,
    transport: Option<Arc<dyn HttpTransport>>,
    credential: Option<Arc<dyn TokenCredential>>,
    scopes: Option<Vec<String>>,
    policies: Vec<(PolicyPosition, Arc<dyn RequestPolicy>)>,
    api_versions: HashMap<ResourceType, String>,
    poll_interval: Option<Duration>,
    default_location: Option<String>,
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("endpoint", &self.endpoint)
            .field("custom_transport", &self.transport.is_some())
            .field("authenticated", &self.credential.is_some())
            .field("scopes", &self.scopes)
            .field("policies", &self.policies.len())
            .field("api_versions", &self.api_versions)
            .field("poll_interval", &self.poll_interval)
            .field("default_location", &self.default_location)
            .finish()
    }
}

impl ClientConfigBuilder {
    pub fn endpoint(mut self, endpoint: &str) -> ArmResult<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| ArmError::Configuration(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        if url.cannot_be_a_base() {
            return Err(ArmError::Configuration(format!(
                "endpoint '{}' cannot be used as a base URL",
                endpoint
            )));
        }
        self.endpoint = Some(url);
        Ok(self)
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn credential(mut self, credential: Arc<dyn TokenCredential>) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    pub fn add_policy(mut self, position: PolicyPosition, policy: Arc<dyn RequestPolicy>) -> Self {
        self.policies.push((position, policy));
        self
    }

    pub fn api_version_override(
        mut self,
        resource_type: impl Into<ResourceType>,
        version: impl Into<String>,
    ) -> Self {
        self.api_versions.insert(resource_type.into(), version.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = Some(location.into());
        self
    }

    pub fn build(self) -> ArmResult<ClientConfig> {
        let endpoint = match self.endpoint {
            Some(url) => url,
            None => Url::parse(DEFAULT_ENDPOINT)
                .map_err(|e| ArmError::Configuration(e.to_string()))?,
        };
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let mut pipeline = Pipeline::new(transport);
        if let Some(credential) = self.credential {
            pipeline = pipeline.with_credential(credential);
        }
        if let Some(scopes) = self.scopes {
            pipeline = pipeline.with_scopes(scopes);
        }
        for (position, policy) in self.policies {
            pipeline = pipeline.with_policy(position, policy);
        }

        Ok(ClientConfig {
            endpoint,
            pipeline,
            api_versions: self.api_versions,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            default_location: self.default_location,
        })
    }
}

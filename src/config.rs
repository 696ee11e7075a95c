//! Configuration Management
//!
//! Persistent settings for armctl, stored as JSON under the user's config
//! directory. Environment variables override the file.

use crate::arm::credential::TokenCredential;
use crate::arm::error::ArmResult;
use crate::arm::options::ClientConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const ENDPOINT_ENV: &str = "ARM_ENDPOINT";
pub const SUBSCRIPTION_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Management endpoint; the public cloud when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Default subscription
    #[serde(default)]
    pub subscription_id: Option<String>,
    /// Location used when a create model leaves it empty
    #[serde(default)]
    pub default_location: Option<String>,
    /// Fallback LRO poll interval
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    /// api-version overrides keyed by resource type
    #[serde(default)]
    pub api_versions: BTreeMap<String, String>,
}

impl Settings {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("armkit").join("config.json"))
    }

    /// Load from the default path, then apply environment overrides.
    /// A missing or unreadable file yields defaults.
    pub fn load() -> Self {
        let settings = match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        };
        settings.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment wins over the file. `lookup` is `std::env::var` outside tests.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            self.endpoint = Some(endpoint);
        }
        if let Some(subscription) = lookup(SUBSCRIPTION_ENV).filter(|v| !v.is_empty()) {
            self.subscription_id = Some(subscription);
        }
        self
    }

    /// Set subscription and save
    pub fn set_subscription(&mut self, subscription_id: &str) -> Result<()> {
        self.subscription_id = Some(subscription_id.to_string());
        self.save()
    }

    /// Client configuration for these settings.
    pub fn client_config(&self, credential: Arc<dyn TokenCredential>) -> ArmResult<ClientConfig> {
        let mut builder = ClientConfig::builder().credential(credential);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint(endpoint)?;
        }
        if let Some(location) = &self.default_location {
            builder = builder.default_location(location.clone());
        }
        if let Some(secs) = self.poll_interval_secs {
            builder = builder.poll_interval(Duration::from_secs(secs));
        }
        for (resource_type, version) in &self.api_versions {
            builder = builder.api_version_override(resource_type.as_str(), version.clone());
        }
        builder.build()
    }
}

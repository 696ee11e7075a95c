//! Generic management-plane REST calls
//!
//! Every resource type is reached through the same route shape: its
//! identifier is the URL path and the api-version goes in the query. This
//! module maps the framework's transport needs (get, create/update, delete,
//! list, actions) onto those routes.

use super::identifier::ResourceIdentifier;
use super::lro::ArmOperation;
use super::pager::{ArmPageSource, PageOptions, Pager};
use super::poller::start_operation;
use super::resource_type::ResourceType;
use super::response::{unit_converter, Converter};
use crate::arm::error::ArmResult;
use crate::arm::http::{ArmRequest, RawResponse};
use crate::arm::options::ClientConfig;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

/// Percent-encode each segment of an identifier's path. The tenant root maps to "".
fn encoded_path(id: &ResourceIdentifier) -> String {
    if id.is_tenant() {
        return String::new();
    }
    id.to_string()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Path of the collection holding resources of `child_type` under `parent`.
fn collection_path(parent: &ResourceIdentifier, child_type: &ResourceType) -> ArmResult<String> {
    let base = encoded_path(parent);
    if child_type.is_builtin_scope() {
        return Ok(format!("{}/{}", base, child_type.last_type()));
    }
    match child_type.parent() {
        Some(parent_type) => {
            parent.ensure_type(&parent_type)?;
            Ok(format!("{}/{}", base, urlencoding::encode(child_type.last_type())))
        }
        None => Ok(format!(
            "{}/providers/{}/{}",
            base,
            urlencoding::encode(child_type.namespace()),
            urlencoding::encode(child_type.last_type())
        )),
    }
}

/// REST calls for one resource type at one api-version.
#[derive(Debug, Clone)]
pub struct ResourceRest {
    config: Arc<ClientConfig>,
    api_version: String,
}

impl ResourceRest {
    pub fn new(config: Arc<ClientConfig>, resource_type: &ResourceType, default_api_version: &str) -> Self {
        let api_version = config.api_version(resource_type, default_api_version);
        Self { config, api_version }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }

    fn url_for_path(&self, path: &str) -> Url {
        let mut url = self.config.endpoint().clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}{}", base, path));
        url.query_pairs_mut().append_pair("api-version", &self.api_version);
        url
    }

    pub fn resource_url(&self, id: &ResourceIdentifier) -> Url {
        self.url_for_path(&encoded_path(id))
    }

    pub fn collection_url(
        &self,
        parent: &ResourceIdentifier,
        child_type: &ResourceType,
        options: &PageOptions,
    ) -> ArmResult<Url> {
        let mut url = self.url_for_path(&collection_path(parent, child_type)?);
        options.apply(&mut url);
        Ok(url)
    }

    pub async fn get(&self, id: &ResourceIdentifier) -> ArmResult<RawResponse> {
        let url = self.resource_url(id);
        self.config
            .pipeline()
            .send(ArmRequest::new(Method::GET, url))
            .await
    }

    async fn begin<T>(
        &self,
        method: Method,
        id: &ResourceIdentifier,
        body: Option<Value>,
        convert: Converter<T>,
    ) -> ArmResult<ArmOperation<T>> {
        let url = self.resource_url(id);
        let mut request = ArmRequest::new(method.clone(), url.clone());
        request.body = body;
        let initial = self.config.pipeline().send(request).await?;
        start_operation(&self.config, method, url, initial, convert)
    }

    /// Create or replace.
    pub async fn begin_put<T>(
        &self,
        id: &ResourceIdentifier,
        body: Value,
        convert: Converter<T>,
    ) -> ArmResult<ArmOperation<T>> {
        tracing::info!("Creating or updating {}", id);
        self.begin(Method::PUT, id, Some(body), convert).await
    }

    pub async fn begin_patch<T>(
        &self,
        id: &ResourceIdentifier,
        body: Value,
        convert: Converter<T>,
    ) -> ArmResult<ArmOperation<T>> {
        self.begin(Method::PATCH, id, Some(body), convert).await
    }

    /// Replace the resource's tags through a PATCH.
    pub async fn begin_update_tags<T>(
        &self,
        id: &ResourceIdentifier,
        tags: &super::model::Tags,
        convert: Converter<T>,
    ) -> ArmResult<ArmOperation<T>> {
        self.begin_patch(id, json!({ "tags": tags }), convert).await
    }

    pub async fn begin_delete(&self, id: &ResourceIdentifier) -> ArmResult<ArmOperation<()>> {
        tracing::info!("Deleting {}", id);
        self.begin(Method::DELETE, id, None, unit_converter()).await
    }

    /// POST `{id}/{action}`, e.g. `start` or `powerOff` on a virtual machine.
    pub async fn begin_post_action<T>(
        &self,
        id: &ResourceIdentifier,
        action: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
        convert: Converter<T>,
    ) -> ArmResult<ArmOperation<T>> {
        let mut url = self.action_url(id, action);
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        tracing::info!("Invoking {} on {}", action, id);

        let mut request = ArmRequest::new(Method::POST, url.clone());
        request.body = body;
        let initial = self.config.pipeline().send(request).await?;
        start_operation(&self.config, Method::POST, url, initial, convert)
    }

    /// Lazy listing of `child_type` resources under `parent`.
    pub fn list<T>(
        &self,
        parent: &ResourceIdentifier,
        child_type: &ResourceType,
        options: &PageOptions,
        convert: Converter<T>,
    ) -> ArmResult<Pager<T>> {
        let url = self.collection_url(parent, child_type, options)?;
        Ok(self.list_url(url, convert))
    }

    /// Lazy listing of an arbitrary collection URL (api-version already set).
    pub fn list_url<T>(&self, url: Url, convert: Converter<T>) -> Pager<T> {
        let source = ArmPageSource::new(self.config.pipeline().clone(), url);
        Pager::new(Arc::new(source), convert)
    }

    /// `{id}/{action}` with the api-version applied.
    pub fn action_url(&self, id: &ResourceIdentifier, action: &str) -> Url {
        self.url_for_path(&format!(
            "{}/{}",
            encoded_path(id),
            urlencoding::encode(action)
        ))
    }

    pub async fn get_url(&self, url: Url) -> ArmResult<RawResponse> {
        self.config
            .pipeline()
            .send(ArmRequest::new(Method::GET, url))
            .await
    }

    /// URL under the endpoint with the api-version applied.
    pub fn url(&self, path: &str) -> Url {
        self.url_for_path(path)
    }
}

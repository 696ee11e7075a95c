//! Capability traits
//!
//! Resource types opt into behavior by implementing these traits; the generic
//! skeleton lives in the free functions at the bottom so each trait default
//! is one call. Blocking variants run the async path on the calling thread.

use super::identifier::ResourceIdentifier;
use super::lro::{ArmOperation, WaitOptions};
use super::model::{ArmResource, ResourceData, Tags};
use super::operations::{ResourceContainer, ResourceOperations};
use super::pager::{BlockingPager, PageOptions, Pager};
use super::response::ArmResponse;
use crate::arm::blocking;
use crate::arm::error::ArmResult;
use async_trait::async_trait;
use serde::Serialize;

pub type ResourceResponse<O> = ArmResponse<ArmResource<O>>;
pub type ResourceOperation<O> = ArmOperation<ArmResource<O>>;

#[async_trait]
pub trait Gettable: ResourceOperations {
    async fn get(&self) -> ArmResult<ResourceResponse<Self>> {
        get_resource(self).await
    }

    fn get_blocking(&self) -> ArmResult<ResourceResponse<Self>> {
        blocking::block_on(self.get())
    }
}

/// Deletion. Object safe, so registry lookups can hand it out as `&dyn Deletable`.
#[async_trait]
pub trait Deletable: Send + Sync {
    fn deletable_id(&self) -> &ResourceIdentifier;

    /// Submit the delete and return without waiting.
    async fn start_delete(&self) -> ArmResult<ArmOperation<()>>;

    async fn delete(&self) -> ArmResult<()> {
        self.start_delete()
            .await?
            .wait_for_completion(WaitOptions::default())
            .await
    }

    fn start_delete_blocking(&self) -> ArmResult<ArmOperation<()>> {
        blocking::block_on(self.start_delete())
    }

    fn delete_blocking(&self) -> ArmResult<()> {
        blocking::block_on(self.delete())
    }
}

#[async_trait]
pub trait Taggable: Gettable {
    /// Merge one tag into the resource's current tags.
    async fn start_add_tag(&self, key: &str, value: &str) -> ArmResult<ResourceOperation<Self>> {
        start_add_tag_resource(self, key, value).await
    }

    async fn add_tag(&self, key: &str, value: &str) -> ArmResult<ResourceResponse<Self>> {
        self.start_add_tag(key, value)
            .await?
            .wait_for_response(WaitOptions::default())
            .await
    }

    fn add_tag_blocking(&self, key: &str, value: &str) -> ArmResult<ResourceResponse<Self>> {
        blocking::block_on(self.add_tag(key, value))
    }

    /// Replace all of the resource's tags with `tags`.
    async fn start_set_tags(&self, tags: &Tags) -> ArmResult<ResourceOperation<Self>> {
        start_set_tags_resource(self, tags).await
    }

    async fn set_tags(&self, tags: &Tags) -> ArmResult<ResourceResponse<Self>> {
        self.start_set_tags(tags)
            .await?
            .wait_for_response(WaitOptions::default())
            .await
    }

    fn set_tags_blocking(&self, tags: &Tags) -> ArmResult<ResourceResponse<Self>> {
        blocking::block_on(self.set_tags(tags))
    }

    /// Drop one tag, keeping the others. A missing key still sends the update.
    async fn start_remove_tag(&self, key: &str) -> ArmResult<ResourceOperation<Self>> {
        start_remove_tag_resource(self, key).await
    }

    async fn remove_tag(&self, key: &str) -> ArmResult<ResourceResponse<Self>> {
        self.start_remove_tag(key)
            .await?
            .wait_for_response(WaitOptions::default())
            .await
    }

    fn remove_tag_blocking(&self, key: &str) -> ArmResult<ResourceResponse<Self>> {
        blocking::block_on(self.remove_tag(key))
    }
}

#[async_trait]
pub trait Creatable: ResourceContainer {
    type Model: Serialize + Send + Sync;

    /// Submit the create and return the operation handle without polling.
    async fn start_create(
        &self,
        name: &str,
        model: &Self::Model,
    ) -> ArmResult<ResourceOperation<Self::Operations>> {
        start_create_child(self, name, model).await
    }

    /// Submit, then wait for a terminal state.
    async fn create(
        &self,
        name: &str,
        model: &Self::Model,
    ) -> ArmResult<ResourceResponse<Self::Operations>> {
        self.start_create(name, model)
            .await?
            .wait_for_response(WaitOptions::default())
            .await
    }

    fn start_create_blocking(
        &self,
        name: &str,
        model: &Self::Model,
    ) -> ArmResult<ResourceOperation<Self::Operations>> {
        blocking::block_on(self.start_create(name, model))
    }

    fn create_blocking(
        &self,
        name: &str,
        model: &Self::Model,
    ) -> ArmResult<ResourceResponse<Self::Operations>> {
        blocking::block_on(self.create(name, model))
    }
}

pub trait Listable: ResourceContainer {
    /// Fresh lazy sequence per call. Nothing is fetched until it is read.
    fn list(&self, options: PageOptions) -> ArmResult<Pager<ArmResource<Self::Operations>>> {
        list_children(self, &options)
    }

    fn list_blocking(
        &self,
        options: PageOptions,
    ) -> ArmResult<BlockingPager<ArmResource<Self::Operations>>> {
        Ok(self.list(options)?.blocking())
    }
}

pub async fn get_resource<O: ResourceOperations>(ops: &O) -> ArmResult<ResourceResponse<O>> {
    let raw = ops.rest().get(ops.id()).await?;
    Ok(ArmResponse::new(raw, ops.converter()))
}

pub async fn start_delete_resource<O: ResourceOperations>(ops: &O) -> ArmResult<ArmOperation<()>> {
    ops.rest().begin_delete(ops.id()).await
}

pub async fn start_add_tag_resource<O: Gettable>(
    ops: &O,
    key: &str,
    value: &str,
) -> ArmResult<ResourceOperation<O>> {
    let mut tags = current_tags(ops).await?;
    tags.insert(key.to_string(), value.to_string());
    start_set_tags_resource(ops, &tags).await
}

async fn current_tags<O: Gettable>(ops: &O) -> ArmResult<Tags> {
    let current = ops.get().await?.into_value()?;
    Ok(current.data().tags().cloned().unwrap_or_default())
}

pub async fn start_set_tags_resource<O: Gettable>(
    ops: &O,
    tags: &Tags,
) -> ArmResult<ResourceOperation<O>> {
    ops.rest()
        .begin_update_tags(ops.id(), tags, ops.converter())
        .await
}

pub async fn start_remove_tag_resource<O: Gettable>(
    ops: &O,
    key: &str,
) -> ArmResult<ResourceOperation<O>> {
    let mut tags = current_tags(ops).await?;
    tags.remove(key);
    start_set_tags_resource(ops, &tags).await
}

pub async fn start_create_child<C: Creatable>(
    container: &C,
    name: &str,
    model: &C::Model,
) -> ArmResult<ResourceOperation<C::Operations>> {
    let id = container.child_id(name)?;
    let body = serde_json::to_value(model)?;
    let convert = ArmResource::<C::Operations>::converter(container.config().clone());
    container.rest().begin_put(&id, body, convert).await
}

pub fn list_children<C: ResourceContainer>(
    container: &C,
    options: &PageOptions,
) -> ArmResult<Pager<ArmResource<C::Operations>>> {
    let convert = ArmResource::<C::Operations>::converter(container.config().clone());
    container
        .rest()
        .list(container.parent_id(), &C::child_type(), options, convert)
}

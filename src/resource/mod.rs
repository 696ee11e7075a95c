//! Resource framework
//!
//! Identifiers, typed operations bound to one resource, containers bound to
//! a parent scope, and the adapters every call returns through: responses
//! with lazy conversion, long-running operations and lazy paged sequences.
//!
//! # Architecture
//!
//! - [`identifier`] / [`resource_type`] - Parsing and building resource ids
//! - [`operations`] - `ResourceOperations` and `ResourceContainer` skeletons
//! - [`capabilities`] - Opt-in get, delete, tag, create and list behavior
//! - [`registry`] - Type-erased operations looked up by resource type
//! - [`rest`] - Generic REST calls shared by every resource type
//! - [`response`] / [`lro`] / [`poller`] / [`pager`] - Result adapters
//! - [`model`] - Domain objects and common wire models
//!
//! # Example
//!
//! ```ignore
//! use armkit::resource::{Gettable, ResourceIdentifier, ResourceOperations};
//! use armkit::services::compute::VirtualMachineOperations;
//!
//! async fn show(config: std::sync::Arc<armkit::arm::ClientConfig>) -> armkit::ArmResult<()> {
//!     let id = ResourceIdentifier::parse(
//!         "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1",
//!     )?;
//!     let vm = VirtualMachineOperations::new(config, id)?.get().await?.into_value()?;
//!     println!("{:?}", vm.data().vm_size());
//!     Ok(())
//! }
//! ```

pub mod capabilities;
pub mod identifier;
pub mod lro;
pub mod model;
pub mod operations;
pub mod pager;
pub mod poller;
pub mod registry;
pub mod resource_type;
pub mod response;
pub mod rest;

pub use capabilities::{Creatable, Deletable, Gettable, Listable, Taggable};
pub use identifier::{ProviderScope, ResourceIdentifier};
pub use lro::{ArmOperation, OperationState, WaitOptions};
pub use model::{ArmResource, ResourceData, ResourceModel, Tags, TrackedResourceData};
pub use operations::{create_child_resource, ResourceContainer, ResourceOperations};
pub use pager::{BlockingPager, PageOptions, Pager};
pub use registry::{get_registry, AnyOperations, OperationsRegistry};
pub use resource_type::ResourceType;
pub use response::ArmResponse;

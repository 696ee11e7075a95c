//! Concrete resource types
//!
//! Each module declares the operations and container types for one
//! provider area and opts them into the capabilities they support.
//!
//! # Module Structure
//!
//! - [`subscriptions`] - Subscriptions, locations and default subscription resolution
//! - [`resource_groups`] - Resource groups and generic child creation
//! - [`compute`] - Virtual machines and availability sets
//! - [`network`] - Virtual networks, subnets and public IP addresses
//! - [`authorization`] - Role assignments at any scope
//! - [`generic`] - Untyped resources and OData list filters

pub mod authorization;
pub mod compute;
pub mod generic;
pub mod network;
pub mod resource_groups;
pub mod subscriptions;

use crate::resource::OperationsRegistry;

/// Default api-versions per provider area
pub mod api_versions {
    pub const RESOURCES: &str = "2024-03-01";
    pub const SUBSCRIPTIONS: &str = "2022-12-01";
    pub const COMPUTE: &str = "2024-03-01";
    pub const NETWORK: &str = "2024-01-01";
    pub const AUTHORIZATION: &str = "2022-04-01";
}

/// Register every built-in operations type.
pub fn register_builtin_types(registry: &mut OperationsRegistry) {
    registry
        .register::<subscriptions::SubscriptionOperations>()
        .register_deletable::<resource_groups::ResourceGroupOperations>()
        .register_deletable::<compute::VirtualMachineOperations>()
        .register_deletable::<compute::AvailabilitySetOperations>()
        .register_deletable::<network::VirtualNetworkOperations>()
        .register_deletable::<network::SubnetOperations>()
        .register_deletable::<network::PublicIpAddressOperations>()
        .register_deletable::<authorization::RoleAssignmentOperations>();
}

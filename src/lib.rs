//! armkit - client framework for the Azure Resource Manager control plane
//!
//! - [`arm`] - Configuration, credentials, the request pipeline and [`ArmClient`]
//! - [`resource`] - Identifiers, typed operations and result adapters
//! - [`services`] - Concrete resource types built on the framework
//! - [`config`] - Persistent settings for the `armctl` binary

pub mod arm;
pub mod config;
pub mod resource;
pub mod services;

pub use arm::{ArmClient, ArmError, ArmResult, ClientConfig};
pub use resource::{ResourceIdentifier, ResourceType};

/// Version injected at compile time via ARMKIT_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("ARMKIT_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

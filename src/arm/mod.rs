//! Management-plane plumbing
//!
//! This module provides the layers below the resource framework: the error
//! taxonomy, client configuration, the request pipeline and the HTTP
//! transport, plus the entry-point client.
//!
//! # Module Structure
//!
//! - [`blocking`] - Runs async calls to completion for thread-blocking callers
//! - [`client`] - Entry-point client handing out operations and containers
//! - [`credential`] - Bearer token sources
//! - [`error`] - Error taxonomy shared by the whole crate
//! - [`http`] - Requests, raw responses and the `reqwest` transport
//! - [`options`] - Client configuration and its builder
//! - [`pipeline`] - Per-call and per-retry request policies
//!
//! # Example
//!
//! ```ignore
//! use armkit::arm::{ArmClient, ClientConfig, StaticTokenCredential};
//! use std::sync::Arc;
//!
//! async fn example() -> armkit::ArmResult<()> {
//!     let config = ClientConfig::builder()
//!         .credential(Arc::new(StaticTokenCredential::new("token")))
//!         .build()?;
//!     let client = ArmClient::new(config).with_default_subscription("my-sub");
//!     let rg = client.default_subscription()?.resource_groups()?.get("rg1").await?;
//!     Ok(())
//! }
//! ```

pub mod blocking;
pub mod client;
pub mod credential;
pub mod error;
pub mod http;
pub mod options;
pub mod pipeline;

pub use client::ArmClient;
pub use credential::{AccessToken, CachedCredential, EnvironmentCredential, StaticTokenCredential, TokenCredential};
pub use error::{ArmError, ArmResult, ServiceError, TransportError};
pub use http::{format_arm_error, ArmRequest, HttpTransport, RawResponse, ReqwestTransport};
pub use options::{ClientConfig, ClientConfigBuilder, DEFAULT_ENDPOINT, DEFAULT_POLL_INTERVAL};
pub use pipeline::{ClientRequestIdPolicy, HeaderPolicy, Pipeline, PolicyPosition, RequestPolicy};

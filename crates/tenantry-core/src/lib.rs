//! Tenantry Core Library
//!
//! This crate provides the domain models, error types, configuration, handle
//! normalization and validation shared by every Tenantry component, plus the
//! persistence seams the provisioning pipeline is written against.

pub mod config;
pub mod credentials;
pub mod error;
pub mod handle;
pub mod models;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::{
    BaseConfig, ChannelJoinPolicy, ContainerConfig, HealthProbeConfig, ProvisionerConfig,
    RoutingConfig, SeedingConfig, SysAdminConfig,
};
pub use credentials::AdminCredentials;
pub use error::{ErrorMetadata, LogLevel, ProvisionError};
pub use handle::{namespace_for_subdomain, normalize_handle, MAX_HANDLE_LENGTH};
pub use store::{NamespaceProvisioner, TenantStore};

//! Validation modules

pub mod org_config;
pub mod subdomain;

pub use org_config::validate_org_config;
pub use subdomain::validate_subdomain;

use crate::error::ProvisionError;
use crate::handle::{is_handle, MAX_HANDLE_LENGTH};

/// Subdomains that would shadow platform hosts.
const RESERVED_SUBDOMAINS: &[&str] = &["www", "api", "admin", "portal", "traefik"];

/// Validate a tenant subdomain: it must already be a handle and not reserved.
pub fn validate_subdomain(subdomain: &str) -> Result<(), ProvisionError> {
    if !is_handle(subdomain) {
        return Err(ProvisionError::Validation(format!(
            "Subdomain \"{}\" must be lowercase letters, digits and single dashes (max {} characters)",
            subdomain, MAX_HANDLE_LENGTH
        )));
    }
    if RESERVED_SUBDOMAINS.contains(&subdomain) {
        return Err(ProvisionError::Validation(format!(
            "Subdomain \"{}\" is reserved",
            subdomain
        )));
    }
    Ok(())
}

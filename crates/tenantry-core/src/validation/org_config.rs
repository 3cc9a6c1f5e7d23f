//! Organization Config validation, applied when a config is attached to a
//! tenant. Structural problems are rejected here so that a deploy never starts
//! from a config that references groups it does not declare.

use std::collections::HashSet;
use validator::Validate;

use crate::error::ProvisionError;
use crate::models::OrganizationConfig;

/// Validate an Organization Config before it is attached to a tenant.
///
/// Rejects configs with no groups, blank or duplicate group / sub-channel
/// codes, members with an invalid email, and members whose group code does
/// not match a declared group.
pub fn validate_org_config(config: &OrganizationConfig) -> Result<(), ProvisionError> {
    if config.groups.is_empty() {
        return Err(ProvisionError::Validation(
            "Organization config must declare at least one group".to_string(),
        ));
    }

    let mut group_codes = HashSet::with_capacity(config.groups.len());
    for (index, group) in config.groups.iter().enumerate() {
        let code = group.code.trim();
        if code.is_empty() {
            return Err(ProvisionError::Validation(format!(
                "Group #{} has an empty code",
                index + 1
            )));
        }
        if !group_codes.insert(code) {
            return Err(ProvisionError::Validation(format!(
                "Duplicate group code \"{}\"",
                code
            )));
        }
    }

    let mut channel_codes = HashSet::with_capacity(config.sub_channels.len());
    for (index, channel) in config.sub_channels.iter().enumerate() {
        let code = channel.code.trim();
        if code.is_empty() {
            return Err(ProvisionError::Validation(format!(
                "Sub-channel #{} has an empty code",
                index + 1
            )));
        }
        if !channel_codes.insert(code) {
            return Err(ProvisionError::Validation(format!(
                "Duplicate sub-channel code \"{}\"",
                code
            )));
        }
    }

    for member in &config.members {
        member.validate().map_err(|e| {
            ProvisionError::Validation(format!("Member {}: {}", member.display_key(), e))
        })?;

        if let Some(code) = member.group() {
            if !group_codes.contains(code) {
                return Err(ProvisionError::Validation(format!(
                    "Member {} references unknown group code \"{}\"",
                    member.display_key(),
                    code
                )));
            }
        }
    }

    Ok(())
}

//! Tenant lifecycle: the status transitions around a deploy.
//!
//! ```text
//! DRAFT --attach--> READY --deploy--> DEPLOYING --ok--> ACTIVE
//!                     ^                   |
//!                     +---- ERROR <--fail-+
//! ```
//!
//! The persisted status is the deploy lock: `claim_for_deploy` is a
//! conditional update, so two concurrent deploys of one tenant cannot both
//! start the pipeline.

use std::sync::Arc;

use serde::Serialize;
use tenantry_core::models::{OrganizationConfig, SeedReport, Tenant, TenantStatus};
use tenantry_core::validation::validate_org_config;
use tenantry_core::{AdminCredentials, ProvisionError, TenantStore};
use uuid::Uuid;

use crate::pipeline::ProvisioningPipeline;

/// What a successful deploy hands back to its caller.
///
/// The admin credentials are only ever returned here; they are not stored.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub tenant: Tenant,
    pub container_id: String,
    pub site_url: String,
    pub admin_email: String,
    pub admin_username: String,
    pub admin_password: String,
    pub report: SeedReport,
}

impl DeployOutcome {
    fn new(
        tenant: Tenant,
        container_id: String,
        site_url: String,
        admin: AdminCredentials,
        report: SeedReport,
    ) -> Self {
        Self {
            tenant,
            container_id,
            site_url,
            admin_email: admin.email,
            admin_username: admin.username,
            admin_password: admin.password,
            report,
        }
    }
}

pub struct TenantLifecycle {
    store: Arc<dyn TenantStore>,
    pipeline: ProvisioningPipeline,
}

impl TenantLifecycle {
    pub fn new(store: Arc<dyn TenantStore>, pipeline: ProvisioningPipeline) -> Self {
        Self { store, pipeline }
    }

    /// Validate `config` and attach it to the tenant, moving it to `READY`.
    ///
    /// Validation runs first; an invalid config leaves the tenant untouched.
    #[tracing::instrument(skip(self, config))]
    pub async fn attach_config(
        &self,
        tenant_id: Uuid,
        config: &OrganizationConfig,
    ) -> Result<Tenant, ProvisionError> {
        validate_org_config(config)?;

        match self.store.attach_config(tenant_id, config).await? {
            Some(tenant) => {
                tracing::info!(
                    groups = config.groups.len(),
                    members = config.members.len(),
                    "Organization config attached"
                );
                Ok(tenant)
            }
            None => {
                Err(self
                    .rejection(tenant_id, "attach config", TenantStatus::can_attach_config)
                    .await)
            }
        }
    }

    /// Deploy the tenant. Fails fast, without any external call, unless the
    /// tenant is `READY` or `ERROR`.
    #[tracing::instrument(skip(self))]
    pub async fn deploy(&self, tenant_id: Uuid) -> Result<DeployOutcome, ProvisionError> {
        let tenant = match self.store.claim_for_deploy(tenant_id).await? {
            Some(tenant) => tenant,
            None => {
                return Err(self
                    .rejection(tenant_id, "deploy", TenantStatus::can_deploy)
                    .await)
            }
        };

        tracing::info!(subdomain = %tenant.subdomain, "Deploy started");

        match self.pipeline.run(&tenant).await {
            Ok(output) => {
                let tenant = self
                    .store
                    .mark_active(tenant_id, &output.container_id)
                    .await
                    .map_err(|e| {
                        tracing::error!(
                            container_id = %output.container_id,
                            error = %e,
                            "Tenant is provisioned but could not be marked ACTIVE; it stays DEPLOYING"
                        );
                        e
                    })?;
                tracing::info!(
                    container_id = %output.container_id,
                    site_url = %output.site_url,
                    "Deploy finished"
                );
                Ok(DeployOutcome::new(
                    tenant,
                    output.container_id,
                    output.site_url,
                    output.admin,
                    output.report,
                ))
            }
            Err(failure) => {
                tracing::error!(
                    error = %failure.error.detailed_message(),
                    "Deploy failed"
                );
                if let Err(e) = self
                    .store
                    .mark_error(tenant_id, failure.container_id.as_deref())
                    .await
                {
                    tracing::error!(error = %e, "Failed to record deploy failure");
                }
                Err(failure.error)
            }
        }
    }

    /// Explain why a conditional update matched nothing.
    ///
    /// A tenant whose current status `permits` the action was changed by a
    /// concurrent caller between the update and this lookup.
    async fn rejection(
        &self,
        tenant_id: Uuid,
        action: &'static str,
        permits: fn(&TenantStatus) -> bool,
    ) -> ProvisionError {
        match self.store.get(tenant_id).await {
            Ok(Some(tenant)) if permits(&tenant.status) => {
                tracing::warn!(status = %tenant.status, action, "Tenant changed concurrently");
                ProvisionError::Conflict(format!(
                    "Tenant {} changed while trying to {}, retry",
                    tenant_id, action
                ))
            }
            Ok(Some(tenant)) => {
                tracing::warn!(status = %tenant.status, action, "Tenant transition rejected");
                ProvisionError::InvalidTransition {
                    tenant_id,
                    status: tenant.status,
                    action,
                }
            }
            Ok(None) => ProvisionError::NotFound(format!("Tenant {} not found", tenant_id)),
            Err(e) => e,
        }
    }
}

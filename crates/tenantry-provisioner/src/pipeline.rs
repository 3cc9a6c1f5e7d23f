//! Provisioning pipeline
//!
//! Runs the external side of a deploy for one tenant:
//! namespace, container, availability, admin session, seeding.
//! Every step is idempotent so a failed run can simply be repeated.
//! The pipeline never touches the tenant's persisted status; that is the
//! lifecycle's job.

use std::sync::Arc;

use tenantry_core::models::{OrganizationConfig, SeedReport, Tenant};
use tenantry_core::{
    AdminCredentials, ContainerConfig, NamespaceProvisioner, ProvisionError, ProvisionerConfig,
    RoutingConfig, SeedingConfig, SysAdminConfig,
};

use crate::admin_api::AdminApiClient;
use crate::container::{ContainerRuntime, ContainerSpec};
use crate::health::HealthProber;
use crate::seeder::SeedingEngine;
use crate::session::AdminSessionBootstrapper;

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub container_id: String,
    pub site_url: String,
    pub admin: AdminCredentials,
    pub report: SeedReport,
}

/// A failed run, with the container id when the container step got that far.
#[derive(Debug)]
pub struct PipelineFailure {
    pub error: ProvisionError,
    pub container_id: Option<String>,
}

impl PipelineFailure {
    fn before_container(error: ProvisionError) -> Self {
        Self {
            error,
            container_id: None,
        }
    }

    fn after_container(error: ProvisionError, container_id: &str) -> Self {
        Self {
            error,
            container_id: Some(container_id.to_string()),
        }
    }
}

pub struct ProvisioningPipeline {
    namespaces: Arc<dyn NamespaceProvisioner>,
    containers: Arc<dyn ContainerRuntime>,
    prober: HealthProber,
    bootstrapper: AdminSessionBootstrapper,
    seeder: SeedingEngine,
    container: ContainerConfig,
    routing: RoutingConfig,
    sysadmin: SysAdminConfig,
    seeding: SeedingConfig,
}

impl ProvisioningPipeline {
    pub fn new(
        config: &ProvisionerConfig,
        namespaces: Arc<dyn NamespaceProvisioner>,
        containers: Arc<dyn ContainerRuntime>,
    ) -> Result<Self, ProvisionError> {
        Ok(Self {
            namespaces,
            containers,
            prober: HealthProber::new(config.health.clone())?,
            bootstrapper: AdminSessionBootstrapper::new(),
            seeder: SeedingEngine::new(config.seeding.clone()),
            container: config.container.clone(),
            routing: config.routing.clone(),
            sysadmin: config.sysadmin.clone(),
            seeding: config.seeding.clone(),
        })
    }

    /// Provision `tenant` end to end.
    #[tracing::instrument(skip_all, fields(tenant_id = %tenant.id, subdomain = %tenant.subdomain))]
    pub async fn run(&self, tenant: &Tenant) -> Result<PipelineOutput, PipelineFailure> {
        let org = tenant
            .org_config
            .as_ref()
            .ok_or_else(|| PipelineFailure::before_container(ProvisionError::MissingConfig(tenant.id)))?;

        self.namespaces
            .ensure_namespace(&tenant.db_schema)
            .await
            .map_err(PipelineFailure::before_container)?;
        tracing::info!(schema = %tenant.db_schema, "Database namespace ready");

        let spec = ContainerSpec::for_tenant(tenant, &self.container, &self.routing);
        let container_id = self
            .containers
            .launch(&spec)
            .await
            .map_err(|e| PipelineFailure::before_container(e.into()))?;

        let (admin, report) = self
            .configure(tenant, org)
            .await
            .map_err(|e| PipelineFailure::after_container(e, &container_id))?;

        Ok(PipelineOutput {
            container_id,
            site_url: self.routing.site_url(&tenant.subdomain),
            admin,
            report,
        })
    }

    /// Steps that talk to the running tenant server.
    async fn configure(
        &self,
        tenant: &Tenant,
        org: &OrganizationConfig,
    ) -> Result<(AdminCredentials, SeedReport), ProvisionError> {
        let api_base_url = self.routing.api_base_url(&tenant.subdomain);
        self.prober.wait_until_ready(&api_base_url).await?;

        let credentials = AdminCredentials::for_tenant(&self.sysadmin, &tenant.subdomain)?;
        let client = AdminApiClient::new(&api_base_url, self.seeding.http_timeout)
            .map_err(|e| ProvisionError::Internal(e.to_string()))?;
        let session = self.bootstrapper.bootstrap(&client, &credentials).await?;

        let report = self.seeder.seed(&session, org).await;
        if report.total_failures() > 0 {
            tracing::warn!(
                failures = report.total_failures(),
                "Seeding finished with per-entity failures"
            );
        }

        Ok((credentials, report))
    }
}

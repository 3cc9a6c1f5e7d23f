//! Persistence seams used by the tenant lifecycle.
//!
//! The Postgres implementations live in `tenantry-db`; tests use in-memory
//! doubles.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ProvisionError;
use crate::models::{OrganizationConfig, Tenant};

/// Tenant record storage with the conditional updates the lifecycle relies on.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get(&self, tenant_id: Uuid) -> Result<Option<Tenant>, ProvisionError>;

    /// Replace the tenant's Organization Config and set it `READY`.
    ///
    /// Only applies while the tenant is `DRAFT`, `READY` or `ERROR`; returns
    /// `None` when the tenant is missing or in any other state.
    async fn attach_config(
        &self,
        tenant_id: Uuid,
        config: &OrganizationConfig,
    ) -> Result<Option<Tenant>, ProvisionError>;

    /// Atomically move the tenant from `READY` or `ERROR` to `DEPLOYING`.
    ///
    /// Returns `None` when the tenant is missing or not in a deployable state,
    /// so at most one concurrent deploy can win the claim.
    async fn claim_for_deploy(&self, tenant_id: Uuid) -> Result<Option<Tenant>, ProvisionError>;

    /// Record a successful deploy: `DEPLOYING` to `ACTIVE` with the container id.
    async fn mark_active(
        &self,
        tenant_id: Uuid,
        container_id: &str,
    ) -> Result<Tenant, ProvisionError>;

    /// Record a failed deploy: `DEPLOYING` to `ERROR`. The container id, if
    /// one was already created, is kept for operator inspection.
    async fn mark_error(
        &self,
        tenant_id: Uuid,
        container_id: Option<&str>,
    ) -> Result<Tenant, ProvisionError>;
}

/// Creates the isolated database namespace a tenant server stores its data in.
#[async_trait]
pub trait NamespaceProvisioner: Send + Sync {
    /// Create the namespace if it does not exist. Idempotent.
    async fn ensure_namespace(&self, name: &str) -> Result<(), ProvisionError>;
}

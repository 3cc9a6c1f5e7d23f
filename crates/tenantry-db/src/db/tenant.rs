use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tenantry_core::models::{NewTenant, OrganizationConfig, Tenant, TenantStatus};
use tenantry_core::validation::validate_subdomain;
use tenantry_core::{namespace_for_subdomain, ProvisionError, TenantStore};
use uuid::Uuid;

use super::is_unique_violation;

const TENANT_COLUMNS: &str = "id, display_name, subdomain, db_schema, admin_email, org_config, \
     container_id, status, lead_id, created_at, updated_at";

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a tenant in `DRAFT`. The namespace name is derived from the subdomain.
    pub async fn create_draft(&self, new_tenant: &NewTenant) -> Result<Tenant, ProvisionError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_draft(&mut conn, new_tenant).await
    }

    /// Insert a `DRAFT` tenant on an existing connection (used inside lead conversion).
    pub(crate) async fn insert_draft(
        conn: &mut PgConnection,
        new_tenant: &NewTenant,
    ) -> Result<Tenant, ProvisionError> {
        validate_subdomain(&new_tenant.subdomain)?;
        let db_schema = namespace_for_subdomain(&new_tenant.subdomain);

        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            INSERT INTO tenants (id, display_name, subdomain, db_schema, admin_email, status, lead_id)
            VALUES ($1, $2, $3, $4, $5, 'DRAFT', $6)
            RETURNING {TENANT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_tenant.display_name)
        .bind(&new_tenant.subdomain)
        .bind(&db_schema)
        .bind(&new_tenant.admin_email)
        .bind(new_tenant.lead_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ProvisionError::Conflict(format!(
                    "Subdomain \"{}\" is already taken",
                    new_tenant.subdomain
                ))
            } else {
                tracing::error!(subdomain = %new_tenant.subdomain, error = %e, "Failed to create tenant");
                ProvisionError::Database(e)
            }
        })?;

        tracing::info!(
            tenant_id = %tenant.id,
            subdomain = %tenant.subdomain,
            "Created draft tenant"
        );
        Ok(tenant)
    }

    /// Get tenant by ID
    pub async fn get_tenant_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, ProvisionError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(tenant_id = %tenant_id, error = %e, "Failed to fetch tenant by ID");
            ProvisionError::Database(e)
        })?;

        Ok(tenant)
    }

    pub async fn get_tenant_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<Tenant>, ProvisionError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE subdomain = $1"
        ))
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// List tenants, newest first, optionally filtered by status.
    pub async fn list_tenants(
        &self,
        status: Option<TenantStatus>,
    ) -> Result<Vec<Tenant>, ProvisionError> {
        let tenants = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            SELECT {TENANT_COLUMNS}
            FROM tenants
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list tenants");
            ProvisionError::Database(e)
        })?;

        Ok(tenants)
    }

    async fn finish_deploy(
        &self,
        tenant_id: Uuid,
        status: TenantStatus,
        container_id: Option<&str>,
    ) -> Result<Tenant, ProvisionError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            UPDATE tenants
            SET status = $2, container_id = COALESCE($3, container_id), updated_at = NOW()
            WHERE id = $1 AND status = 'DEPLOYING'
            RETURNING {TENANT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(status.as_str())
        .bind(container_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(tenant_id = %tenant_id, error = %e, "Failed to update tenant status");
            ProvisionError::Database(e)
        })?;

        match tenant {
            Some(tenant) => {
                tracing::info!(tenant_id = %tenant_id, status = %status, "Updated tenant status");
                Ok(tenant)
            }
            None => {
                let current = self.get_tenant_by_id(tenant_id).await?;
                Err(match current {
                    Some(current) => ProvisionError::InvalidTransition {
                        tenant_id,
                        status: current.status,
                        action: "finish deploying",
                    },
                    None => ProvisionError::NotFound(format!("Tenant {} not found", tenant_id)),
                })
            }
        }
    }
}

#[async_trait]
impl TenantStore for TenantRepository {
    async fn get(&self, tenant_id: Uuid) -> Result<Option<Tenant>, ProvisionError> {
        self.get_tenant_by_id(tenant_id).await
    }

    #[tracing::instrument(skip(self, config))]
    async fn attach_config(
        &self,
        tenant_id: Uuid,
        config: &OrganizationConfig,
    ) -> Result<Option<Tenant>, ProvisionError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            UPDATE tenants
            SET org_config = $2, status = 'READY', updated_at = NOW()
            WHERE id = $1 AND status IN ('DRAFT', 'READY', 'ERROR')
            RETURNING {TENANT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(Json(config))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(tenant_id = %tenant_id, error = %e, "Failed to attach organization config");
            ProvisionError::Database(e)
        })?;

        Ok(tenant)
    }

    #[tracing::instrument(skip(self))]
    async fn claim_for_deploy(&self, tenant_id: Uuid) -> Result<Option<Tenant>, ProvisionError> {
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            UPDATE tenants
            SET status = 'DEPLOYING', updated_at = NOW()
            WHERE id = $1 AND status IN ('READY', 'ERROR')
            RETURNING {TENANT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(tenant_id = %tenant_id, error = %e, "Failed to claim tenant for deploy");
            ProvisionError::Database(e)
        })?;

        Ok(tenant)
    }

    async fn mark_active(
        &self,
        tenant_id: Uuid,
        container_id: &str,
    ) -> Result<Tenant, ProvisionError> {
        self.finish_deploy(tenant_id, TenantStatus::Active, Some(container_id))
            .await
    }

    async fn mark_error(
        &self,
        tenant_id: Uuid,
        container_id: Option<&str>,
    ) -> Result<Tenant, ProvisionError> {
        self.finish_deploy(tenant_id, TenantStatus::Error, container_id)
            .await
    }
}

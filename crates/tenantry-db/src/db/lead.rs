use sqlx::PgPool;
use tenantry_core::models::{CreateLeadRequest, Lead, LeadStatus, NewTenant, Tenant};
use tenantry_core::{normalize_handle, ProvisionError};
use uuid::Uuid;
use validator::Validate;

use super::tenant::TenantRepository;
use super::transaction::TransactionGuard;

const LEAD_COLUMNS: &str =
    "id, school_name, contact_name, email, phone, note, status, created_at";

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_lead(&self, request: &CreateLeadRequest) -> Result<Lead, ProvisionError> {
        request.validate()?;

        let lead = sqlx::query_as::<_, Lead>(&format!(
            r#"
            INSERT INTO leads (id, school_name, contact_name, email, phone, note, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'NEW')
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(request.school_name.trim())
        .bind(request.contact_name.trim())
        .bind(request.email.trim())
        .bind(request.phone.trim())
        .bind(request.note.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create lead");
            ProvisionError::Database(e)
        })?;

        tracing::info!(lead_id = %lead.id, school = %lead.school_name, "Recorded new lead");
        Ok(lead)
    }

    /// List leads, newest first.
    pub async fn list_leads(&self) -> Result<Vec<Lead>, ProvisionError> {
        let leads = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list leads");
            ProvisionError::Database(e)
        })?;

        Ok(leads)
    }

    pub async fn get_lead(&self, lead_id: Uuid) -> Result<Option<Lead>, ProvisionError> {
        let lead = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"
        ))
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    /// Move an open lead to `NEW` or `CONTACTED`.
    ///
    /// `CONVERTED` is only reachable through [`Self::convert_to_tenant`].
    pub async fn update_status(
        &self,
        lead_id: Uuid,
        status: LeadStatus,
    ) -> Result<Lead, ProvisionError> {
        if status == LeadStatus::Converted {
            return Err(ProvisionError::Validation(
                "A lead can only become CONVERTED by converting it to a tenant".to_string(),
            ));
        }

        let lead = sqlx::query_as::<_, Lead>(&format!(
            r#"
            UPDATE leads SET status = $2
            WHERE id = $1 AND status <> 'CONVERTED'
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(lead_id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await?;

        lead.ok_or_else(|| {
            ProvisionError::Conflict(format!(
                "Lead {} does not exist or is already converted",
                lead_id
            ))
        })
    }

    /// Convert a lead into a `DRAFT` tenant.
    ///
    /// The subdomain is the explicit override when given, otherwise derived
    /// from the lead. The tenant insert and the lead status change commit
    /// together.
    #[tracing::instrument(skip(self))]
    pub async fn convert_to_tenant(
        &self,
        lead_id: Uuid,
        subdomain: Option<&str>,
    ) -> Result<Tenant, ProvisionError> {
        let mut tx = TransactionGuard::begin(&self.pool, "convert_lead").await?;

        let lead = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 FOR UPDATE"
        ))
        .bind(lead_id)
        .fetch_optional(tx.conn()?)
        .await?
        .ok_or_else(|| ProvisionError::NotFound(format!("Lead {} not found", lead_id)))?;

        if lead.status == LeadStatus::Converted {
            return Err(ProvisionError::Conflict(format!(
                "Lead {} is already converted",
                lead_id
            )));
        }

        let subdomain = match subdomain {
            Some(explicit) => normalize_handle(explicit),
            None => lead.suggested_subdomain(),
        };
        if subdomain.is_empty() {
            return Err(ProvisionError::Validation(format!(
                "Cannot derive a subdomain for lead {}",
                lead_id
            )));
        }

        let display_name = if lead.school_name.trim().is_empty() {
            subdomain.clone()
        } else {
            lead.school_name.clone()
        };

        let tenant = TenantRepository::insert_draft(
            tx.conn()?,
            &NewTenant {
                display_name,
                subdomain,
                admin_email: lead.email.clone(),
                lead_id: Some(lead.id),
            },
        )
        .await?;

        sqlx::query("UPDATE leads SET status = 'CONVERTED' WHERE id = $1")
            .bind(lead_id)
            .execute(tx.conn()?)
            .await?;

        tx.commit().await?;

        tracing::info!(
            lead_id = %lead_id,
            tenant_id = %tenant.id,
            subdomain = %tenant.subdomain,
            "Converted lead to tenant"
        );
        Ok(tenant)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::OrganizationConfig;

/// Tenant lifecycle status.
///
/// `DRAFT → READY → DEPLOYING → ACTIVE`, with `ERROR` reachable from `DEPLOYING`.
/// The persisted status doubles as the deploy lock: only one caller can move a
/// tenant into `DEPLOYING`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantStatus {
    Draft,
    Ready,
    Deploying,
    Active,
    Error,
}

impl TenantStatus {
    /// Statuses from which an organization config may be (re-)attached.
    pub const CONFIG_ATTACHABLE: [TenantStatus; 3] =
        [TenantStatus::Draft, TenantStatus::Ready, TenantStatus::Error];

    /// Statuses from which a deploy may be started. `ERROR` is a re-entry point
    /// because every pipeline step is idempotent.
    pub const DEPLOYABLE: [TenantStatus; 2] = [TenantStatus::Ready, TenantStatus::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Draft => "DRAFT",
            TenantStatus::Ready => "READY",
            TenantStatus::Deploying => "DEPLOYING",
            TenantStatus::Active => "ACTIVE",
            TenantStatus::Error => "ERROR",
        }
    }

    pub fn can_attach_config(&self) -> bool {
        Self::CONFIG_ATTACHABLE.contains(self)
    }

    pub fn can_deploy(&self) -> bool {
        Self::DEPLOYABLE.contains(self)
    }
}

impl Display for TenantStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(TenantStatus::Draft),
            "READY" => Ok(TenantStatus::Ready),
            "DEPLOYING" => Ok(TenantStatus::Deploying),
            "ACTIVE" => Ok(TenantStatus::Active),
            "ERROR" => Ok(TenantStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid tenant status: {}", s)),
        }
    }
}

/// One customer's isolated deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub display_name: String,
    /// Globally unique; used for routing and container naming.
    pub subdomain: String,
    /// Database namespace, derived from the subdomain.
    pub db_schema: String,
    pub admin_email: String,
    pub org_config: Option<OrganizationConfig>,
    pub container_id: Option<String>,
    pub status: TenantStatus,
    pub lead_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Tenant {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let status: String = row.try_get("status")?;
        let status = status.parse().map_err(|e: anyhow::Error| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;
        let org_config: Option<sqlx::types::Json<OrganizationConfig>> =
            row.try_get("org_config")?;

        Ok(Tenant {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            subdomain: row.try_get("subdomain")?,
            db_schema: row.try_get("db_schema")?,
            admin_email: row.try_get("admin_email")?,
            org_config: org_config.map(|json| json.0),
            container_id: row.try_get("container_id")?,
            status,
            lead_id: row.try_get("lead_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Fields required to create a new tenant in `DRAFT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTenant {
    pub display_name: String,
    pub subdomain: String,
    pub admin_email: String,
    pub lead_id: Option<Uuid>,
}

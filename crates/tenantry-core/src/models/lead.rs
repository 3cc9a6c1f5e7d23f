use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::handle::normalize_handle;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
}

impl Display for LeadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LeadStatus::New => write!(f, "NEW"),
            LeadStatus::Contacted => write!(f, "CONTACTED"),
            LeadStatus::Converted => write!(f, "CONVERTED"),
        }
    }
}

impl FromStr for LeadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(LeadStatus::New),
            "CONTACTED" => Ok(LeadStatus::Contacted),
            "CONVERTED" => Ok(LeadStatus::Converted),
            _ => Err(anyhow::anyhow!("Invalid lead status: {}", s)),
        }
    }
}

/// A sales lead, the origin of every tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub school_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub note: Option<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Subdomain proposed for this lead when the operator gives none.
    pub fn suggested_subdomain(&self) -> String {
        [&self.school_name, &self.contact_name, &self.email]
            .into_iter()
            .map(|candidate| normalize_handle(candidate))
            .find(|handle| !handle.is_empty())
            .unwrap_or_default()
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Lead {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let status: String = row.try_get("status")?;
        let status = status.parse().map_err(|e: anyhow::Error| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;

        Ok(Lead {
            id: row.try_get("id")?,
            school_name: row.try_get("school_name")?,
            contact_name: row.try_get("contact_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            note: row.try_get("note")?,
            status,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Request DTO for recording a new lead
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLeadRequest {
    #[validate(length(min = 1, max = 255, message = "School name must be between 1 and 255 characters"))]
    pub school_name: String,
    #[validate(length(min = 1, max = 255, message = "Contact name must be between 1 and 255 characters"))]
    pub contact_name: String,
    #[validate(email(message = "Invalid contact email"))]
    pub email: String,
    #[validate(length(max = 50, message = "Phone must be at most 50 characters"))]
    pub phone: String,
    pub note: Option<String>,
}

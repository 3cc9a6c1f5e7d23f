use async_trait::async_trait;
use sqlx::PgPool;
use tenantry_core::{NamespaceProvisioner, ProvisionError};

/// Postgres identifiers are truncated past this many bytes.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Creates per-tenant Postgres schemas in the control-plane database.
#[derive(Clone)]
pub struct PgSchemaProvisioner {
    pool: PgPool,
}

impl PgSchemaProvisioner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether a schema with this name exists.
    pub async fn schema_exists(&self, name: &str) -> Result<bool, ProvisionError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

/// Schema names are interpolated into DDL, so only plain lowercase
/// identifiers are accepted.
fn validate_identifier(name: &str) -> Result<(), ProvisionError> {
    let valid_start = name
        .chars()
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false);
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if !valid_start || !valid_chars || name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ProvisionError::Validation(format!(
            "Invalid database namespace name \"{}\"",
            name
        )));
    }
    Ok(())
}

#[async_trait]
impl NamespaceProvisioner for PgSchemaProvisioner {
    #[tracing::instrument(skip(self))]
    async fn ensure_namespace(&self, name: &str) -> Result<(), ProvisionError> {
        validate_identifier(name)?;

        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", name))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(schema = %name, error = %e, "Failed to create schema");
                ProvisionError::InfrastructureWithSource {
                    message: format!("Failed to create database namespace {}", name),
                    source: e.into(),
                }
            })?;

        tracing::info!(schema = %name, "Database namespace ready");
        Ok(())
    }
}

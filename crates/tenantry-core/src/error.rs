//! Error types module
//!
//! All provisioning failures are unified under [`ProvisionError`]. The variants
//! follow the failure taxonomy of the pipeline: validation and precondition
//! failures surface before any external call, infrastructure, availability and
//! auth failures are fatal to a running deploy. Per-entity seeding failures are
//! not errors at all; they are recorded as outcomes in a `SeedReport`.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::models::TenantStatus;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for rejected operations the caller can fix
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// to whoever invoked the operation (controller, CLI).
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "VALIDATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether re-invoking the operation can succeed without operator changes
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the caller
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the caller
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Tenant {0} has no organization config attached")]
    MissingConfig(Uuid),

    #[error("Tenant {tenant_id} cannot {action} while {status}")]
    InvalidTransition {
        tenant_id: Uuid,
        status: TenantStatus,
        action: &'static str,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("Infrastructure error: {message}")]
    InfrastructureWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Server at {url} not reachable after {attempts} attempts")]
    AvailabilityTimeout { url: String, attempts: u32 },

    #[error("Admin session bootstrap failed: {0}")]
    AuthBootstrap(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for ProvisionError {
    fn from(err: SqlxError) -> Self {
        ProvisionError::Database(err)
    }
}

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        ProvisionError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for ProvisionError {
    fn from(err: validator::ValidationErrors) -> Self {
        ProvisionError::Validation(err.to_string())
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn provision_error_static_metadata(
    err: &ProvisionError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        ProvisionError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Fix the rejected input and try again"),
            false,
            LogLevel::Debug,
        ),
        ProvisionError::MissingConfig(_) => (
            409,
            "MISSING_CONFIG",
            false,
            Some("Upload an organization config before deploying"),
            false,
            LogLevel::Warn,
        ),
        ProvisionError::InvalidTransition { .. } => (
            409,
            "INVALID_TRANSITION",
            false,
            Some("Check the tenant status before retrying"),
            false,
            LogLevel::Debug,
        ),
        ProvisionError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        ProvisionError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("Choose a different subdomain or resource"),
            false,
            LogLevel::Debug,
        ),
        ProvisionError::Infrastructure(_) | ProvisionError::InfrastructureWithSource { .. } => (
            502,
            "INFRASTRUCTURE_ERROR",
            true,
            Some("Re-run the deployment once the infrastructure is healthy"),
            true,
            LogLevel::Error,
        ),
        ProvisionError::AvailabilityTimeout { .. } => (
            504,
            "AVAILABILITY_TIMEOUT",
            true,
            Some("Check the tenant container logs, then re-run the deployment"),
            true,
            LogLevel::Error,
        ),
        ProvisionError::AuthBootstrap(_) => (
            502,
            "AUTH_BOOTSTRAP_FAILED",
            true,
            Some("Verify the system administrator credentials, then re-run the deployment"),
            true,
            LogLevel::Error,
        ),
        ProvisionError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        ProvisionError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ProvisionError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            ProvisionError::Validation(_) => "Validation",
            ProvisionError::MissingConfig(_) => "MissingConfig",
            ProvisionError::InvalidTransition { .. } => "InvalidTransition",
            ProvisionError::NotFound(_) => "NotFound",
            ProvisionError::Conflict(_) => "Conflict",
            ProvisionError::Infrastructure(_) => "Infrastructure",
            ProvisionError::InfrastructureWithSource { .. } => "Infrastructure",
            ProvisionError::AvailabilityTimeout { .. } => "AvailabilityTimeout",
            ProvisionError::AuthBootstrap(_) => "AuthBootstrap",
            ProvisionError::Database(_) => "Database",
            ProvisionError::Internal(_) => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for ProvisionError {
    fn http_status_code(&self) -> u16 {
        provision_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        provision_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        provision_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        provision_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        provision_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        provision_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            ProvisionError::Validation(ref msg) => msg.clone(),
            ProvisionError::MissingConfig(_) => "Deployment failed".to_string(),
            ProvisionError::InvalidTransition { status, action, .. } => {
                format!("Tenant cannot {} while {}", action, status)
            }
            ProvisionError::NotFound(ref msg) => msg.clone(),
            ProvisionError::Conflict(ref msg) => msg.clone(),
            ProvisionError::Infrastructure(_)
            | ProvisionError::InfrastructureWithSource { .. }
            | ProvisionError::AvailabilityTimeout { .. }
            | ProvisionError::AuthBootstrap(_) => "Deployment failed".to_string(),
            ProvisionError::Database(_) => "Failed to access database".to_string(),
            ProvisionError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

//! Transport-level errors of the two external HTTP collaborators.
//!
//! Both are converted into `ProvisionError` at the pipeline stage that calls
//! them; the seeding engine instead records them as per-entity outcomes.

use tenantry_core::ProvisionError;

/// Error ids the remote server uses for "already exists" failures reported as 400.
const CONFLICT_ID_MARKERS: &[&str] = &["exists", "existing", "taken"];

#[derive(Debug, thiserror::Error)]
pub enum AdminApiError {
    #[error("{method} {path} returned {status}: {message}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        /// Machine-readable error id from the response body, if any.
        error_id: Option<String>,
        message: String,
    },

    #[error("{method} {path} failed: {source}")]
    Transport {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Login succeeded without a session token")]
    MissingToken,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl AdminApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AdminApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The entity already exists: HTTP 409, or a 400 whose error id says so.
    pub fn is_conflict(&self) -> bool {
        match self {
            AdminApiError::Status {
                status: 409, ..
            } => true,
            AdminApiError::Status {
                status: 400,
                error_id: Some(id),
                ..
            } => {
                let id = id.to_lowercase();
                CONFLICT_ID_MARKERS.iter().any(|marker| id.contains(marker))
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("Container {0} already exists")]
    Conflict(String),

    #[error("Container {0} not found")]
    NotFound(String),

    #[error("Docker API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Docker API request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<ContainerError> for ProvisionError {
    fn from(err: ContainerError) -> Self {
        ProvisionError::InfrastructureWithSource {
            message: "Container runtime failure".to_string(),
            source: err.into(),
        }
    }
}

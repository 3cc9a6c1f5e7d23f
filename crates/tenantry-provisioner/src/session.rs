use tenantry_core::{AdminCredentials, ProvisionError};

use crate::admin_api::{AdminApiClient, NewUser};

/// Obtains a privileged session on a freshly started tenant server.
#[derive(Clone, Debug, Default)]
pub struct AdminSessionBootstrapper;

impl AdminSessionBootstrapper {
    pub fn new() -> Self {
        Self
    }

    /// Ensure the system administrator account exists, then log in once.
    ///
    /// An "already exists" answer to the account creation is expected on
    /// re-deploys and ignored. Any other creation failure is logged and left to
    /// the login to decide: servers that already have users may refuse
    /// anonymous sign-up outright. A failed login is fatal.
    #[tracing::instrument(skip(self, client, credentials), fields(base_url = %client.base_url()))]
    pub async fn bootstrap(
        &self,
        client: &AdminApiClient,
        credentials: &AdminCredentials,
    ) -> Result<AdminApiClient, ProvisionError> {
        let account = NewUser {
            email: &credentials.email,
            username: &credentials.username,
            password: &credentials.password,
            first_name: "",
        };

        match client.create_user(&account).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Created system administrator account");
            }
            Err(e) if e.is_conflict() => {
                tracing::debug!("System administrator account already exists");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not create system administrator account, trying to log in");
            }
        }

        let token = client
            .login(&credentials.email, &credentials.password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "System administrator login failed");
                ProvisionError::AuthBootstrap(e.to_string())
            })?;

        tracing::info!("Admin session established");
        Ok(client.with_token(token))
    }
}

use reqwest::{Client, StatusCode};
use tenantry_core::{HealthProbeConfig, ProvisionError};

/// Liveness endpoint of the tenant server.
pub const PING_PATH: &str = "/api/v4/system/ping";

/// Polls a tenant server until it answers its liveness endpoint.
#[derive(Clone, Debug)]
pub struct HealthProber {
    client: Client,
    config: HealthProbeConfig,
}

impl HealthProber {
    pub fn new(config: HealthProbeConfig) -> Result<Self, ProvisionError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProvisionError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Wait until `base_url` answers 200, returning the attempt that succeeded.
    ///
    /// Non-200 answers and transport errors are both retried. Gives up with
    /// `AvailabilityTimeout` after exactly `max_attempts` attempts.
    #[tracing::instrument(skip(self))]
    pub async fn wait_until_ready(&self, base_url: &str) -> Result<u32, ProvisionError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), PING_PATH);

        for attempt in 1..=self.config.max_attempts {
            match self.client.get(&url).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    tracing::info!(attempt, "Tenant server is up");
                    return Ok(attempt);
                }
                Ok(response) => {
                    tracing::debug!(attempt, status = %response.status(), "Tenant server not ready yet");
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "Tenant server not reachable yet");
                }
            }

            if attempt < self.config.max_attempts {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        tracing::error!(
            attempts = self.config.max_attempts,
            "Tenant server did not become ready"
        );
        Err(ProvisionError::AvailabilityTimeout {
            url: base_url.to_string(),
            attempts: self.config.max_attempts,
        })
    }
}

//! Container runtime: one container per tenant, driven through the Docker
//! Engine HTTP API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tenantry_core::models::Tenant;
use tenantry_core::{ContainerConfig, RoutingConfig};

use crate::error::ContainerError;

/// Everything needed to create a tenant's container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub network: Option<String>,
    pub pids_limit: i64,
}

impl ContainerSpec {
    pub fn for_tenant(
        tenant: &Tenant,
        container: &ContainerConfig,
        routing: &RoutingConfig,
    ) -> Self {
        let name = container.container_name(&tenant.subdomain);
        let separator = if container.tenant_database_url.contains('?') {
            '&'
        } else {
            '?'
        };
        let datasource = format!(
            "{}{}search_path={}&sslmode=disable&connect_timeout=10",
            container.tenant_database_url, separator, tenant.db_schema
        );

        let env = vec![
            "MM_SQLSETTINGS_DRIVERNAME=postgres".to_string(),
            format!("MM_SQLSETTINGS_DATASOURCE={}", datasource),
            format!(
                "MM_SERVICESETTINGS_SITEURL={}",
                routing.site_url(&tenant.subdomain)
            ),
        ];

        let mut labels = BTreeMap::new();
        labels.insert("traefik.enable".to_string(), "true".to_string());
        labels.insert(
            format!("traefik.http.routers.{}.rule", name),
            routing.host_rule(&tenant.subdomain),
        );
        labels.insert(
            format!("traefik.http.services.{}.loadbalancer.server.port", name),
            container.http_port.to_string(),
        );
        labels.insert(
            "managed.by".to_string(),
            container.managed_by_label.clone(),
        );

        Self {
            name,
            image: container.image_reference(),
            env,
            labels,
            network: container.network.clone(),
            pids_limit: container.pids_limit,
        }
    }

    fn create_body(&self) -> CreateContainerBody<'_> {
        let endpoints = self
            .network
            .iter()
            .map(|network| (network.as_str(), EndpointSettings {}))
            .collect();

        CreateContainerBody {
            image: &self.image,
            env: &self.env,
            labels: &self.labels,
            host_config: HostConfig {
                network_mode: self.network.as_deref(),
                restart_policy: RestartPolicy {
                    name: "unless-stopped",
                },
                security_opt: vec!["no-new-privileges:true"],
                pids_limit: self.pids_limit,
            },
            networking_config: NetworkingConfig {
                endpoints_config: endpoints,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateContainerBody<'a> {
    image: &'a str,
    env: &'a [String],
    labels: &'a BTreeMap<String, String>,
    host_config: HostConfig<'a>,
    networking_config: NetworkingConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct HostConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    network_mode: Option<&'a str>,
    restart_policy: RestartPolicy,
    security_opt: Vec<&'static str>,
    pids_limit: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RestartPolicy {
    name: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NetworkingConfig<'a> {
    endpoints_config: BTreeMap<&'a str, EndpointSettings>,
}

#[derive(Serialize)]
struct EndpointSettings {}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerIdResponse {
    id: String,
}

#[derive(Deserialize)]
struct DockerErrorBody {
    message: String,
}

/// Creates and starts tenant containers.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container; `ContainerError::Conflict` when the name is taken.
    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError>;

    /// Id of an existing container looked up by name.
    async fn find_id(&self, name: &str) -> Result<String, ContainerError>;

    /// Start a container. Starting a running container succeeds.
    async fn start(&self, id: &str) -> Result<(), ContainerError>;

    /// Create-or-reuse, then start. Returns the container id.
    ///
    /// A name conflict means an earlier deploy already created the container;
    /// it is looked up and reused.
    async fn launch(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        let id = match self.create(spec).await {
            Ok(id) => {
                tracing::info!(container = %spec.name, container_id = %id, "Container created");
                id
            }
            Err(ContainerError::Conflict(_)) => {
                let id = self.find_id(&spec.name).await?;
                tracing::warn!(
                    container = %spec.name,
                    container_id = %id,
                    "Container already exists, reusing it"
                );
                id
            }
            Err(e) => return Err(e),
        };

        self.start(&id).await?;
        tracing::info!(container = %spec.name, container_id = %id, "Container started");
        Ok(id)
    }
}

/// Docker Engine API client (TCP endpoint).
#[derive(Clone, Debug)]
pub struct DockerEngine {
    client: Client,
    base_url: String,
    api_version: String,
}

impl DockerEngine {
    pub fn new(config: &ContainerConfig) -> Result<Self, ContainerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: config.docker_host.trim_end_matches('/').to_string(),
            api_version: config.api_version.trim_matches('/').to_string(),
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}{}", self.base_url, self.api_version, path)
    }

    async fn api_error(response: reqwest::Response) -> ContainerError {
        let status = response.status().as_u16();
        let message = match response.json::<DockerErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => "Unknown error".to_string(),
        };
        ContainerError::Api { status, message }
    }
}

#[async_trait]
impl ContainerRuntime for DockerEngine {
    #[tracing::instrument(skip(self, spec), fields(container = %spec.name))]
    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        let response = self
            .client
            .post(self.build_url("/containers/create"))
            .query(&[("name", spec.name.as_str())])
            .json(&spec.create_body())
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => {
                let body: ContainerIdResponse = response.json().await?;
                Ok(body.id)
            }
            StatusCode::CONFLICT => Err(ContainerError::Conflict(spec.name.clone())),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn find_id(&self, name: &str) -> Result<String, ContainerError> {
        let response = self
            .client
            .get(self.build_url(&format!(
                "/containers/{}/json",
                urlencoding::encode(name)
            )))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: ContainerIdResponse = response.json().await?;
                Ok(body.id)
            }
            StatusCode::NOT_FOUND => Err(ContainerError::NotFound(name.to_string())),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        let response = self
            .client
            .post(self.build_url(&format!("/containers/{}/start", urlencoding::encode(id))))
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            StatusCode::NOT_MODIFIED => {
                tracing::debug!(container_id = %id, "Container already running");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(ContainerError::NotFound(id.to_string())),
            _ => Err(Self::api_error(response).await),
        }
    }
}

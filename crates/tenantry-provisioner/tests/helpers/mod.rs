#![allow(dead_code)]

pub mod fake_docker;
pub mod fake_server;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tenantry_core::models::{
    Group, Member, OrganizationConfig, SubChannel, Tenant, TenantStatus, Visibility,
};
use tenantry_core::{
    namespace_for_subdomain, NamespaceProvisioner, ProvisionError, ProvisionerConfig, TenantStore,
};
use tenantry_provisioner::{DockerEngine, ProvisioningPipeline, TenantLifecycle};
use uuid::Uuid;

use fake_docker::{FakeDocker, API_VERSION};
use fake_server::FakeTenantServer;

pub const SYSADMIN_PASSWORD: &str = "Sys@dmin-pass1";

/// Tenant store double with the same conditional-update rules as Postgres.
#[derive(Default)]
pub struct MemoryTenantStore {
    tenants: Mutex<HashMap<Uuid, Tenant>>,
}

impl MemoryTenantStore {
    pub fn with_tenant(tenant: Tenant) -> Arc<Self> {
        let store = Self::default();
        store.insert(tenant);
        Arc::new(store)
    }

    pub fn insert(&self, tenant: Tenant) {
        self.tenants
            .lock()
            .expect("store poisoned")
            .insert(tenant.id, tenant);
    }

    pub fn snapshot(&self, tenant_id: Uuid) -> Tenant {
        self.tenants
            .lock()
            .expect("store poisoned")
            .get(&tenant_id)
            .cloned()
            .expect("tenant exists")
    }

    fn update<F>(&self, tenant_id: Uuid, allowed: &[TenantStatus], apply: F) -> Option<Tenant>
    where
        F: FnOnce(&mut Tenant),
    {
        let mut tenants = self.tenants.lock().expect("store poisoned");
        let tenant = tenants.get_mut(&tenant_id)?;
        if !allowed.contains(&tenant.status) {
            return None;
        }
        apply(tenant);
        tenant.updated_at = Utc::now();
        Some(tenant.clone())
    }

    fn finish(
        &self,
        tenant_id: Uuid,
        status: TenantStatus,
        container_id: Option<&str>,
    ) -> Result<Tenant, ProvisionError> {
        self.update(tenant_id, &[TenantStatus::Deploying], |tenant| {
            tenant.status = status;
            if let Some(id) = container_id {
                tenant.container_id = Some(id.to_string());
            }
        })
        .ok_or_else(|| ProvisionError::Internal("tenant was not deploying".to_string()))
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn get(&self, tenant_id: Uuid) -> Result<Option<Tenant>, ProvisionError> {
        Ok(self
            .tenants
            .lock()
            .expect("store poisoned")
            .get(&tenant_id)
            .cloned())
    }

    async fn attach_config(
        &self,
        tenant_id: Uuid,
        config: &OrganizationConfig,
    ) -> Result<Option<Tenant>, ProvisionError> {
        Ok(self.update(tenant_id, &TenantStatus::CONFIG_ATTACHABLE, |tenant| {
            tenant.org_config = Some(config.clone());
            tenant.status = TenantStatus::Ready;
        }))
    }

    async fn claim_for_deploy(&self, tenant_id: Uuid) -> Result<Option<Tenant>, ProvisionError> {
        Ok(self.update(tenant_id, &TenantStatus::DEPLOYABLE, |tenant| {
            tenant.status = TenantStatus::Deploying;
        }))
    }

    async fn mark_active(&self, tenant_id: Uuid, container_id: &str) -> Result<Tenant, ProvisionError> {
        self.finish(tenant_id, TenantStatus::Active, Some(container_id))
    }

    async fn mark_error(
        &self,
        tenant_id: Uuid,
        container_id: Option<&str>,
    ) -> Result<Tenant, ProvisionError> {
        self.finish(tenant_id, TenantStatus::Error, container_id)
    }
}

/// Store double that delegates to a [`MemoryTenantStore`] but can lose the
/// deploy claim to a concurrent writer or fail to record activation.
pub struct FaultyStore {
    pub inner: Arc<MemoryTenantStore>,
    pub lose_claims: bool,
    pub fail_activation: bool,
}

#[async_trait]
impl TenantStore for FaultyStore {
    async fn get(&self, tenant_id: Uuid) -> Result<Option<Tenant>, ProvisionError> {
        self.inner.get(tenant_id).await
    }

    async fn attach_config(
        &self,
        tenant_id: Uuid,
        config: &OrganizationConfig,
    ) -> Result<Option<Tenant>, ProvisionError> {
        self.inner.attach_config(tenant_id, config).await
    }

    async fn claim_for_deploy(&self, tenant_id: Uuid) -> Result<Option<Tenant>, ProvisionError> {
        if self.lose_claims {
            return Ok(None);
        }
        self.inner.claim_for_deploy(tenant_id).await
    }

    async fn mark_active(&self, tenant_id: Uuid, container_id: &str) -> Result<Tenant, ProvisionError> {
        if self.fail_activation {
            return Err(ProvisionError::Internal("connection reset".to_string()));
        }
        self.inner.mark_active(tenant_id, container_id).await
    }

    async fn mark_error(
        &self,
        tenant_id: Uuid,
        container_id: Option<&str>,
    ) -> Result<Tenant, ProvisionError> {
        self.inner.mark_error(tenant_id, container_id).await
    }
}

/// Namespace double recording every call.
#[derive(Default)]
pub struct RecordingNamespaces {
    pub calls: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNamespaces {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls poisoned").len()
    }
}

#[async_trait]
impl NamespaceProvisioner for RecordingNamespaces {
    async fn ensure_namespace(&self, name: &str) -> Result<(), ProvisionError> {
        self.calls
            .lock()
            .expect("calls poisoned")
            .push(name.to_string());
        if self.fail {
            return Err(ProvisionError::Infrastructure(format!(
                "cannot create schema {}",
                name
            )));
        }
        Ok(())
    }
}

pub fn tenant(subdomain: &str, status: TenantStatus, org: Option<OrganizationConfig>) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        display_name: "Green Valley School".to_string(),
        subdomain: subdomain.to_string(),
        db_schema: namespace_for_subdomain(subdomain),
        admin_email: "principal@green-valley.edu".to_string(),
        org_config: org,
        container_id: None,
        status,
        lead_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn member(email: &str, username: &str, role: &str, group: Option<&str>) -> Member {
    Member {
        email: email.to_string(),
        username: username.to_string(),
        password: "Student#2024".to_string(),
        full_name: username.replace('.', " "),
        role: role.to_string(),
        group_code: group.map(str::to_string),
    }
}

/// Two classes, three subjects (two restricted) and one member of each role.
pub fn school_config() -> OrganizationConfig {
    OrganizationConfig {
        groups: vec![
            Group {
                code: "10A1".to_string(),
                display_name: "Class 10A1".to_string(),
                description: String::new(),
            },
            Group {
                code: "10A2".to_string(),
                display_name: "Class 10A2".to_string(),
                description: String::new(),
            },
        ],
        sub_channels: vec![
            SubChannel {
                code: "MATH".to_string(),
                display_name: "Mathematics".to_string(),
                visibility: Visibility::Public,
            },
            SubChannel {
                code: "PARENTS".to_string(),
                display_name: "Parents".to_string(),
                visibility: Visibility::Restricted,
            },
            SubChannel {
                code: "TEACHERS".to_string(),
                display_name: "Teachers".to_string(),
                visibility: Visibility::Restricted,
            },
        ],
        members: vec![
            member("t.nguyen@school.edu", "t.nguyen", "teacher", Some("10A1")),
            member("s.tran@school.edu", "s.tran", "student", Some("10A1")),
            member("p.le@school.edu", "p.le", "parent", Some("10A2")),
            member("h.vo@school.edu", "h.vo", "student", None),
        ],
    }
}

/// Provisioner config pointing at the fakes, with fast health checks.
pub fn test_config(docker: &FakeDocker, server: &FakeTenantServer) -> ProvisionerConfig {
    let mut config = ProvisionerConfig::default();
    config.container.docker_host = docker.host();
    config.container.api_version = API_VERSION.to_string();
    config.container.network = None;
    config.routing.api_url_template = Some(server.base_url());
    config.health.interval = Duration::from_millis(20);
    config.health.request_timeout = Duration::from_millis(500);
    config.health.max_attempts = 10;
    config.sysadmin.password = Some(SYSADMIN_PASSWORD.to_string());
    config.seeding.http_timeout = Duration::from_secs(5);
    config
}

pub fn lifecycle(
    config: &ProvisionerConfig,
    store: Arc<dyn TenantStore>,
    namespaces: Arc<dyn NamespaceProvisioner>,
) -> TenantLifecycle {
    let docker = DockerEngine::new(&config.container).expect("docker client");
    let pipeline = ProvisioningPipeline::new(config, namespaces, Arc::new(docker))
        .expect("pipeline");
    TenantLifecycle::new(store, pipeline)
}

//! Tenantry Provisioner
//!
//! The deploy side of Tenantry: everything that happens between a tenant
//! being claimed for deployment and it becoming `ACTIVE`.
//!
//! - [`container`]: per-tenant containers through the Docker Engine API
//! - [`health`]: availability probing of a started tenant server
//! - [`admin_api`]: client for the tenant server's administrative REST API
//! - [`session`]: system administrator account and session bootstrap
//! - [`seeder`]: idempotent, best-effort seeding of an Organization Config
//! - [`pipeline`]: the ordered provisioning steps
//! - [`lifecycle`]: status transitions and the deploy lock around the pipeline

pub mod admin_api;
pub mod container;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod pipeline;
pub mod seeder;
pub mod session;

pub use admin_api::AdminApiClient;
pub use container::{ContainerRuntime, ContainerSpec, DockerEngine};
pub use error::{AdminApiError, ContainerError};
pub use health::HealthProber;
pub use lifecycle::{DeployOutcome, TenantLifecycle};
pub use pipeline::{PipelineFailure, PipelineOutput, ProvisioningPipeline};
pub use seeder::SeedingEngine;
pub use session::AdminSessionBootstrapper;

//! Tenantry Database Layer
//!
//! Postgres repositories for leads and tenants, the schema provisioner used to
//! create per-tenant namespaces, and pool / migration helpers.

// Module declarations
pub mod db;

// Re-exports: repositories
pub use db::{LeadRepository, PgSchemaProvisioner, TenantRepository};

// Re-exports: pool and migrations
pub use db::pool::{connect, run_migrations};

// Re-exports: Transaction utilities
pub use db::transaction::TransactionGuard;

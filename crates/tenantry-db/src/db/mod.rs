//! Database repositories for data access layer
//!
//! Each repository owns the queries for one table. `TenantRepository` also
//! implements the `TenantStore` seam the tenant lifecycle is written against,
//! and `PgSchemaProvisioner` implements `NamespaceProvisioner`.
//
// Lead and tenant repositories
pub mod lead;
pub mod tenant;
//
// Per-tenant database namespaces
pub mod schema;
//
// Pool construction and migrations
pub mod pool;
//
// Transaction utilities
pub mod transaction;

pub use lead::LeadRepository;
pub use schema::PgSchemaProvisioner;
pub use tenant::TenantRepository;

/// Postgres SQLSTATE for unique constraint violations.
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}
